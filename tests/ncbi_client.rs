mod common;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Form, Json, Router};
use common::{serve, Hits};
use ind::ncbi::{ESummary, EntrezClient, NcbiConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone, Default)]
struct Calls {
    gets: Hits,
    posts: Hits,
}

fn summary(params: &HashMap<String, String>) -> Json<Value> {
    let ids: Vec<&str> = params.get("id").map(|s| s.split(',').collect()).unwrap_or_default();
    Json(json!({
        "result": {"uids": ids},
        "email": params.get("email"),
        "tool": params.get("tool"),
    }))
}

async fn esummary_get(State(calls): State<Calls>, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    calls.gets.bump();
    summary(&params)
}

async fn esummary_post(State(calls): State<Calls>, Form(params): Form<HashMap<String, String>>) -> Json<Value> {
    calls.posts.bump();
    summary(&params)
}

async fn espell() -> &'static str {
    "<eSpellResult><Database>pubmed</Database><Query>asthmaa</Query>\
     <CorrectedQuery>asthma</CorrectedQuery></eSpellResult>"
}

async fn setup() -> (EntrezClient, Calls) {
    let calls = Calls::default();
    let app = Router::new()
        .route("/esummary.fcgi", get(esummary_get).post(esummary_post))
        .route("/espell.fcgi", get(espell))
        .with_state(calls.clone());
    let base = serve(app).await;
    let config = NcbiConfig::new("me@example.org")
        .with_base_url(&base)
        .with_base_delay(Duration::ZERO)
        .with_retries(0);
    (EntrezClient::new(config).unwrap(), calls)
}

fn ids(n: usize) -> Vec<String> {
    (1..=n).map(|i| i.to_string()).collect()
}

#[tokio::test]
async fn test_short_id_list_uses_get_with_identity() {
    let (client, calls) = setup().await;
    let body = client.esummary(&ESummary::new("pubmed", &ids(3))).await.unwrap();
    let value = body.as_json().unwrap();

    assert_eq!(value["result"]["uids"], json!(["1", "2", "3"]));
    assert_eq!(value["email"], "me@example.org");
    assert_eq!(value["tool"], "ind-ncbi");
    assert_eq!((calls.gets.get(), calls.posts.get()), (1, 0));
}

#[tokio::test]
async fn test_long_id_list_posts_form() {
    let (client, calls) = setup().await;
    let body = client.esummary(&ESummary::new("pubmed", &ids(250))).await.unwrap();
    let value = body.as_json().unwrap();

    assert_eq!(value["result"]["uids"].as_array().map(|a| a.len()), Some(250));
    assert_eq!(value["email"], "me@example.org");
    assert_eq!((calls.gets.get(), calls.posts.get()), (0, 1));
}

#[tokio::test]
async fn test_espell_parses_correction() {
    let (client, _) = setup().await;
    let spell = client.espell("pubmed", "asthmaa").await.unwrap();
    assert_eq!(spell.query, "asthmaa");
    assert_eq!(spell.corrected, "asthma");
}

#[tokio::test]
async fn test_http_error_mentions_script() {
    let (client, _) = setup().await;
    let err = client.call("einfo.fcgi", Vec::new()).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().starts_with("NCBI einfo.fcgi failed: HTTP 404"));
}
