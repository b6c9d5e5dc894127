mod common;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use common::serve;
use ind::error::ApiError;
use ind::seer::{ListQuery, SeerClient, SeerConfig};
use serde_json::{json, Value};
use std::collections::HashMap;

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("x-seerapi-key").and_then(|v| v.to_str().ok()) == Some("seer-key")
}

async fn disease_versions(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "bad key"})));
    }
    (StatusCode::OK, Json(json!([{"version": "2024"}, {"version": "2018"}])))
}

async fn diseases(
    headers: HeaderMap,
    Path(version): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "bad key"})));
    }
    (
        StatusCode::OK,
        Json(json!({"version": version, "params": params, "results": []})),
    )
}

async fn base() -> String {
    let app = Router::new()
        .route("/rest/disease/versions", get(disease_versions))
        .route("/rest/disease/:version", get(diseases));
    serve(app).await
}

fn client(base: &str, key: &str) -> SeerClient {
    SeerClient::new(SeerConfig::default().with_base_url(base).with_api_key(key)).unwrap()
}

#[test]
fn test_missing_key_refused_before_any_request() {
    let err = SeerClient::new(SeerConfig::default()).unwrap_err();
    assert!(matches!(err, ApiError::MissingCredential(_)));
    assert!(err.to_string().contains("ind config set SEER_API_KEY"));
}

#[tokio::test]
async fn test_latest_resolves_to_first_version() {
    let client = client(&base().await, "seer-key");
    assert_eq!(client.resolve_version("disease", "latest").await, "2024");
    assert_eq!(client.resolve_version("disease", "2018").await, "2018");
}

#[tokio::test]
async fn test_list_diseases_sends_key_and_defaults_type() {
    let client = client(&base().await, "seer-key");
    let query = ListQuery::new().q(Some("melanoma")).page(5, 10);
    let value = client.list_diseases("2024", &query).await.unwrap();

    assert_eq!(value["version"], "2024");
    assert_eq!(value["params"]["q"], "melanoma");
    assert_eq!(value["params"]["type"], "HEMATO");
    assert_eq!(value["params"]["count"], "5");
    assert_eq!(value["params"]["offset"], "10");
}

#[tokio::test]
async fn test_wrong_key_is_status_error_and_latest_kept() {
    let client = client(&base().await, "other");
    let err = client.list_diseases("2024", &ListQuery::new()).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(client.resolve_version("disease", "latest").await, "latest");
}
