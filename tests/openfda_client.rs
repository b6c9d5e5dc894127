mod common;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use common::{serve, Hits};
use ind::openfda::{Endpoint, OpenFdaClient, OpenFdaConfig, QueryParams};
use serde_json::{json, Value};
use std::collections::HashMap;

const TOTAL: usize = 5;

async fn events(
    State(hits): State<Hits>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    hits.bump();
    if params.get("search").map(String::as_str) == Some("nothing") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": "NOT_FOUND", "message": "No matches found!"}})),
        );
    }
    let skip: usize = params.get("skip").and_then(|s| s.parse().ok()).unwrap_or(0);
    let limit: usize = params.get("limit").and_then(|s| s.parse().ok()).unwrap_or(1);
    let key = headers.get("x-api-key").and_then(|v| v.to_str().ok()).unwrap_or("");
    let results: Vec<Value> = (skip..TOTAL.min(skip + limit))
        .map(|i| json!({"safetyreportid": i.to_string(), "key": key}))
        .collect();
    (
        StatusCode::OK,
        Json(json!({
            "meta": {"results": {"skip": skip, "limit": limit, "total": TOTAL}},
            "results": results
        })),
    )
}

async fn setup() -> (OpenFdaClient, Hits) {
    let hits = Hits::default();
    let app = Router::new().route("/drug/event.json", get(events)).with_state(hits.clone());
    let base = serve(app).await;
    let config = OpenFdaConfig::default()
        .with_base_url(&base)
        .with_api_key(Some("secret".to_string()))
        .with_retries(0);
    (OpenFdaClient::new(config).unwrap(), hits)
}

#[tokio::test]
async fn test_paginate_advances_skip_until_total() {
    let (client, hits) = setup().await;
    let params = QueryParams::new().search("patient.drug.medicinalproduct:aspirin").limit(2);
    let records = client.paginate(Endpoint::DrugEvent, &params, None).await.unwrap();

    let ids: Vec<&str> = records.iter().filter_map(|r| r["safetyreportid"].as_str()).collect();
    assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    assert_eq!(hits.get(), 3);
    assert_eq!(records[0]["key"], "secret");
}

#[tokio::test]
async fn test_paginate_respects_max_records() {
    let (client, _) = setup().await;
    let params = QueryParams::new().limit(2);
    let records = client.paginate(Endpoint::DrugEvent, &params, Some(3)).await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2]["safetyreportid"], "2");
}

#[tokio::test]
async fn test_no_matches_is_empty_for_paginate_but_error_for_query() {
    let (client, _) = setup().await;
    let params = QueryParams::new().search("nothing").limit(2);

    let records = client.paginate(Endpoint::DrugEvent, &params, None).await.unwrap();
    assert!(records.is_empty());

    let err = client.query(Endpoint::DrugEvent, &params).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("No matches found!"));
}

#[tokio::test]
async fn test_query_decodes_meta() {
    let (client, _) = setup().await;
    let resp = client
        .query(Endpoint::DrugEvent, &QueryParams::new().limit(4).skip(3))
        .await
        .unwrap();
    assert_eq!(resp.total(), Some(TOTAL as u64));
    assert_eq!(resp.results.len(), 2);
}
