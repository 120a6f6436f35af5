//! `ApiClient` against a local axum server standing in for the remote API.

use std::{sync::Arc, time::Duration};

use axum::{
  Json, Router,
  extract::{Path, RawQuery, State},
  http::StatusCode,
  response::IntoResponse,
  routing::get,
};
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use grimoire_core::{
  filter::{FilterField, FilterSelection, compile_query},
  remote::{CharacterSource, FetchError},
};

use crate::{ApiClient, ApiConfig};

type Seen = Arc<Mutex<Vec<String>>>;

async fn serve(router: Router) -> ApiClient {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
  ApiClient::new(ApiConfig {
    base_url: format!("http://{addr}/v1/"),
    timeout:  Duration::from_secs(5),
  })
  .unwrap()
}

async fn list(State(seen): State<Seen>, RawQuery(query): RawQuery) -> Json<serde_json::Value> {
  seen.lock().await.push(query.unwrap_or_default());
  Json(json!({
    "data": [{
      "id": "1",
      "type": "character",
      "attributes": { "slug": "harry-potter", "name": "Harry Potter", "image": null }
    }],
    "meta": { "pagination": { "current": 1, "next": 2, "last": 9, "records": 450 } }
  }))
}

async fn detail(Path(slug): Path<String>) -> impl IntoResponse {
  if slug != "dobby" {
    return Err(StatusCode::NOT_FOUND);
  }
  Ok(Json(json!({
    "data": {
      "id": "2",
      "type": "character",
      "attributes": {
        "slug": "dobby",
        "name": "Dobby",
        "species": "House-elf",
        "family_members": [],
        "wands": []
      }
    }
  })))
}

fn api(seen: Seen) -> Router {
  Router::new()
    .route("/v1/characters", get(list))
    .route("/v1/characters/{slug}", get(detail))
    .with_state(seen)
}

/// Decode a raw query string into name/value pairs.
fn pairs(raw: &str) -> Vec<(String, String)> {
  reqwest::Url::parse(&format!("http://localhost/?{raw}"))
    .unwrap()
    .query_pairs()
    .map(|(k, v)| (k.into_owned(), v.into_owned()))
    .collect()
}

#[tokio::test]
async fn list_sends_every_parameter() {
  let seen = Seen::default();
  let client = serve(api(seen.clone())).await;

  let mut selection = FilterSelection::default();
  selection.toggle(FilterField::Species, "Human");
  selection.toggle(FilterField::Species, "Goblin");
  let mut params = compile_query("har", &selection);
  params.set("page[number]", "1");

  let page = client.list_characters(params, CancellationToken::new()).await.unwrap();
  assert_eq!(page.data[0].attributes.name, "Harry Potter");
  assert_eq!(page.next_page(), Some(2));

  let raw = seen.lock().await[0].clone();
  let sent = pairs(&raw);
  let species: Vec<_> = sent
    .iter()
    .filter(|(k, _)| k == "filter[species_cont_any][]")
    .map(|(_, v)| v.as_str())
    .collect();
  assert_eq!(species, ["Human", "Goblin"]);
  assert!(sent.contains(&("filter[name_cont]".into(), "har".into())));
  assert!(sent.contains(&("page[number]".into(), "1".into())));
}

#[tokio::test]
async fn detail_decodes_attributes() {
  let client = serve(api(Seen::default())).await;
  let dobby = client.get_character("dobby".into(), CancellationToken::new()).await.unwrap();
  assert_eq!(dobby.name, "Dobby");
  assert_eq!(dobby.species.as_deref(), Some("House-elf"));
}

#[tokio::test]
async fn missing_character_is_not_found() {
  let client = serve(api(Seen::default())).await;
  let err = client
    .get_character("nobody".into(), CancellationToken::new())
    .await
    .unwrap_err();
  assert_eq!(err, FetchError::NotFound);
}

#[tokio::test]
async fn server_errors_are_transient() {
  let router = Router::new().route(
    "/v1/characters/{slug}",
    get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
  );
  let client = serve(router).await;

  let err = client
    .get_character("dobby".into(), CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(err, FetchError::Transient(_)));
}

#[tokio::test]
async fn undecodable_bodies_are_invalid() {
  let router = Router::new().route("/v1/characters/{slug}", get(|| async { "<html>oops</html>" }));
  let client = serve(router).await;

  let err = client
    .get_character("dobby".into(), CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(err, FetchError::Invalid(_)));
}

#[tokio::test]
async fn unreachable_host_is_transient() {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let client = ApiClient::new(ApiConfig {
    base_url: format!("http://{addr}"),
    timeout:  Duration::from_secs(5),
  })
  .unwrap();
  let err = client
    .get_character("dobby".into(), CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(err, FetchError::Transient(_)));
}

#[tokio::test]
async fn cancellation_abandons_the_request() {
  let router = Router::new().route(
    "/v1/characters/{slug}",
    get(|| async {
      tokio::time::sleep(Duration::from_secs(30)).await;
      StatusCode::OK
    }),
  );
  let client = serve(router).await;

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    trigger.cancel();
  });

  let err = client.get_character("dobby".into(), cancel).await.unwrap_err();
  assert_eq!(err, FetchError::Cancelled);
}

#[tokio::test]
async fn slugs_are_sent_as_one_path_segment() {
  let seen = Seen::default();
  let router = Router::new()
    .route(
      "/v1/characters/{slug}",
      get(|State(seen): State<Seen>, Path(slug): Path<String>, RawQuery(query): RawQuery| async move {
        seen.lock().await.push(format!("{slug}|{}", query.unwrap_or_default()));
        StatusCode::NOT_FOUND
      }),
    )
    .with_state(seen.clone());
  let client = serve(router).await;

  let err = client
    .get_character("a/b?c=d".into(), CancellationToken::new())
    .await
    .unwrap_err();
  assert_eq!(err, FetchError::NotFound);
  assert_eq!(seen.lock().await.as_slice(), ["a/b?c=d|"]);
}

#[test]
fn malformed_base_url_is_rejected() {
  let config = ApiConfig { base_url: "not a url".into(), timeout: Duration::from_secs(1) };
  assert!(matches!(ApiClient::new(config), Err(crate::Error::BaseUrl { .. })));
}
