mod common;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use common::serve;
use ind::clinical_trials::{ClinicalTrialsClient, ClinicalTrialsConfig, Paging, StudyFormat, StudyQuery};
use serde_json::{json, Value};
use std::collections::HashMap;

async fn studies(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let token = params.get("pageToken").map(String::as_str);
    let (page, next) = match token {
        None => (1, Some("t2")),
        Some("t2") => (2, Some("t3")),
        _ => (3, None),
    };
    let mut body = json!({
        "studies": [{"protocolSection": {"identificationModule": {"nctId": format!("NCT0000000{}", page)}}}],
        "pageSize": params.get("pageSize"),
        "countTotal": params.get("countTotal"),
        "cond": params.get("query.cond"),
    });
    if let Some(next) = next {
        body["nextPageToken"] = json!(next);
    }
    if page == 1 && params.get("countTotal").map(String::as_str) == Some("true") {
        body["totalCount"] = json!(3);
    }
    Json(body)
}

async fn study(Path(nct_id): Path<String>) -> (StatusCode, Json<Value>) {
    if nct_id == "NCT99999999" {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "not found"})));
    }
    (StatusCode::OK, Json(json!({"protocolSection": {"identificationModule": {"nctId": nct_id}}})))
}

async fn setup() -> ClinicalTrialsClient {
    let app = Router::new()
        .route("/studies", get(studies))
        .route("/studies/:nct_id", get(study));
    let base = serve(app).await;
    ClinicalTrialsClient::new(ClinicalTrialsConfig::default().with_base_url(&base)).unwrap()
}

fn paging(max_pages: Option<usize>) -> Paging {
    Paging {
        first_page_size: 10,
        next_page_size: Some(50),
        max_pages,
        include_total_on_first_page: true,
    }
}

#[tokio::test]
async fn test_iterate_follows_page_tokens() {
    let client = setup().await;
    let query = StudyQuery::new().query("cond", "asthma");
    let pages = client.iterate_studies(&query, &paging(None)).await.unwrap();

    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0]["totalCount"], 3);
    assert_eq!(pages[0]["pageSize"], "10");
    assert_eq!(pages[0]["countTotal"], "true");
    assert_eq!(pages[1]["pageSize"], "50");
    assert_eq!(pages[1]["countTotal"], "false");
    assert_eq!(pages[2]["cond"], "asthma");
    assert!(pages[2].get("nextPageToken").is_none());
}

#[tokio::test]
async fn test_iterate_stops_at_max_pages() {
    let client = setup().await;
    let pages = client.iterate_studies(&StudyQuery::new(), &paging(Some(2))).await.unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1]["nextPageToken"], "t3");
}

#[tokio::test]
async fn test_get_study_and_missing_study() {
    let client = setup().await;
    let found = client
        .get_study("NCT01234567", StudyFormat::Json, "markdown", None)
        .await
        .unwrap();
    assert_eq!(found["protocolSection"]["identificationModule"]["nctId"], "NCT01234567");

    let err = client
        .get_study("NCT99999999", StudyFormat::Json, "markdown", None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("/studies/NCT99999999"));
}
