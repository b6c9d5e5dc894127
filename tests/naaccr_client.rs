mod common;

use axum::extract::{Path, Query};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use common::serve;
use ind::naaccr::NaaccrClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

fn host(headers: &HeaderMap) -> String {
    headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("127.0.0.1")
        .to_string()
}

async fn data_items(
    Path(version): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let next = (page < 3).then(|| format!("http://{}/data_item/{}/?format=json&page={}", host(&headers), version, page + 1));
    Json(json!({
        "count": 3,
        "next": next,
        "previous": null,
        "results": [{
            "ItemNumber": 100 + page,
            "ItemName": format!("Item {}", page),
            "q": params.get("q"),
            "minimize": params.get("minimize_results"),
        }]
    }))
}

async fn versions() -> Json<Value> {
    Json(json!([{"Version": "25"}, {"Version": "24"}]))
}

async fn setup() -> NaaccrClient {
    let app = Router::new()
        .route("/data_item/:version/", get(data_items))
        .route("/naaccr_versions/", get(versions));
    let base = serve(app).await;
    NaaccrClient::new(Some(&base), 5.0).unwrap()
}

#[tokio::test]
async fn test_search_follows_next_links() {
    let client = setup().await;
    let items = client
        .search_data_items("22", Some("stage"), false, 5, Duration::ZERO)
        .await
        .unwrap();
    let numbers: Vec<u64> = items.iter().filter_map(|i| i["ItemNumber"].as_u64()).collect();
    assert_eq!(numbers, vec![101, 102, 103]);
    assert_eq!(items[0]["q"], "stage");
}

#[tokio::test]
async fn test_search_stops_at_page_limit() {
    let client = setup().await;
    let items = client.search_data_items("22", None, false, 2, Duration::ZERO).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["q"], Value::Null);
}

#[tokio::test]
async fn test_minimize_results_keeps_quotes() {
    let client = setup().await;
    let items = client.search_data_items("22", None, true, 1, Duration::ZERO).await.unwrap();
    assert_eq!(items[0]["minimize"], "\"true\"");
}

#[tokio::test]
async fn test_versions_from_bare_array() {
    let client = setup().await;
    let versions = client.list_versions().await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["Version"], "25");
}

#[tokio::test]
async fn test_unknown_path_is_status_error() {
    let client = setup().await;
    let err = client.get_operation_history("22", "400").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().starts_with("NAACCR HTTP 404"));
}
