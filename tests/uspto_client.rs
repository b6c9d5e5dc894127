mod common;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use common::{serve, Hits};
use ind::http::Backoff;
use ind::uspto::{Download, MethodStrategy, SearchRequest, UsptoClient, UsptoConfig};
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Clone, Default)]
struct Calls {
    gets: Hits,
    posts: Hits,
}

fn key(headers: &HeaderMap) -> String {
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

async fn search_get(State(calls): State<Calls>) -> (StatusCode, Json<Value>) {
    calls.gets.bump();
    (StatusCode::BAD_REQUEST, Json(json!({"error": "Bad Request", "errorDetails": "GET not supported"})))
}

async fn search_post(State(calls): State<Calls>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    calls.posts.bump();
    Json(json!({"count": 1, "echo": body, "key": key(&headers)}))
}

async fn download_get(Query(params): Query<HashMap<String, String>>) -> String {
    format!("q={};limit={}", params.get("q").map_or("", |s| s.as_str()), params.get("limit").map_or("", |s| s.as_str()))
}

async fn application(Path(number): Path<String>) -> (StatusCode, Json<Value>) {
    if number == "00000000" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"message": "Missing Authentication Token", "requestIdentifier": "req-42"})),
        );
    }
    (StatusCode::OK, Json(json!({"patentFileWrapperDataBag": [{"applicationNumberText": number}]})))
}

async fn status_codes() -> Json<Value> {
    Json(json!([{"applicationStatusCode": 150}]))
}

async fn setup() -> (UsptoClient, Calls) {
    let calls = Calls::default();
    let app = Router::new()
        .route(
            "/api/v1/patent/applications/search",
            get(search_get).post(search_post),
        )
        .route("/api/v1/patent/applications/search/download", get(download_get))
        .route("/api/v1/patent/applications/:number", get(application))
        .route("/api/v1/patent/status-codes", get(status_codes))
        .with_state(calls.clone());
    let base = serve(app).await;
    let config = UsptoConfig::default()
        .with_base_url(&base)
        .with_api_key(Some("odp-key".to_string()))
        .with_retries(0, Backoff::immediate());
    (UsptoClient::new(config).unwrap(), calls)
}

#[tokio::test]
async fn test_auto_falls_back_to_post() {
    let (client, calls) = setup().await;
    let request = SearchRequest::new().q(Some("applicationMetaData.applicationTypeLabelName:Utility")).page(0, 5);
    let value = client.search_applications(&request, MethodStrategy::Auto).await.unwrap();

    assert_eq!(calls.gets.get(), 1);
    assert_eq!(calls.posts.get(), 1);
    assert_eq!(value["key"], "odp-key");
    assert_eq!(value["echo"]["pagination"], json!({"offset": 0, "limit": 5}));
}

#[tokio::test]
async fn test_get_strategy_surfaces_error_detail() {
    let (client, calls) = setup().await;
    let err = client
        .search_applications(&SearchRequest::new(), MethodStrategy::Get)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.to_string(), "HTTP 400 Bad Request - GET not supported");
    assert_eq!(calls.posts.get(), 0);
}

#[tokio::test]
async fn test_error_message_includes_request_id() {
    let (client, _) = setup().await;
    let err = client.get_application("00000000").await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(
        err.to_string(),
        "HTTP 403 Forbidden - Missing Authentication Token (request id: req-42)"
    );
}

#[tokio::test]
async fn test_get_application_and_raw_wrapping() {
    let (client, _) = setup().await;
    let app = client.get_application("14412875").await.unwrap();
    assert_eq!(app["patentFileWrapperDataBag"][0]["applicationNumberText"], "14412875");

    let codes = client.get_status_codes(None, MethodStrategy::Get).await.unwrap();
    assert_eq!(codes["_raw"][0]["applicationStatusCode"], 150);
}

#[tokio::test]
async fn test_download_search_saves_or_returns_bytes() {
    let (client, _) = setup().await;
    let request = SearchRequest::new().q(Some("x")).page(0, 3);

    match client.download_search(&request, MethodStrategy::Get, None).await.unwrap() {
        Download::Bytes(bytes) => assert_eq!(String::from_utf8(bytes).unwrap(), "q=x;limit=3"),
        other => panic!("unexpected {:?}", other),
    }

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out/search.json");
    let saved = client.download_search(&request, MethodStrategy::Get, Some(&dest)).await.unwrap();
    assert_eq!(saved.describe(), format!("[saved] {}", dest.display()));
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "q=x;limit=3");
}
