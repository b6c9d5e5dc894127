mod common;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use common::{serve, Hits};
use ind::aggregator::{build_company_intel, IntelOptions, IntelSources};
use ind::clinical_trials::{ClinicalTrialsClient, ClinicalTrialsConfig};
use ind::openfda::{OpenFdaClient, OpenFdaConfig};
use serde_json::{json, Value};
use std::collections::HashMap;

async fn drugsfda(State(hits): State<Hits>) -> (StatusCode, Json<Value>) {
    hits.bump();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": {"code": "SERVER_ERROR", "message": "backend down"}})),
    )
}

async fn studies(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    assert_eq!(params.get("query.spons").map(String::as_str), Some("Acme"));
    Json(json!({
        "studies": [{
            "protocolSection": {
                "identificationModule": {"nctId": "NCT01234567", "briefTitle": "Zapro in lymphoma"},
                "statusModule": {"overallStatus": "RECRUITING"},
                "sponsorCollaboratorsModule": {"leadSponsor": {"name": "Other Pharma"}}
            }
        }]
    }))
}

#[tokio::test]
async fn test_failing_source_degrades_to_empty_section() {
    let hits = Hits::default();
    let base = serve(
        Router::new()
            .route("/drug/drugsfda.json", get(drugsfda))
            .route("/studies", get(studies))
            .with_state(hits.clone()),
    )
    .await;

    let sources = IntelSources {
        openfda: Some(OpenFdaClient::new(OpenFdaConfig::default().with_base_url(&base).with_retries(0)).unwrap()),
        trials: Some(ClinicalTrialsClient::new(ClinicalTrialsConfig::default().with_base_url(&base)).unwrap()),
        ..Default::default()
    };
    let intel = build_company_intel("Acme", &sources, &IntelOptions::default()).await;

    assert_eq!(hits.get(), 1);
    assert!(intel.drugs_approved.is_empty());
    assert_eq!(intel.in_trials.len(), 1);
    let trial = &intel.in_trials[0];
    assert_eq!(trial.nct_id, "NCT01234567");
    assert_eq!(trial.status.as_deref(), Some("RECRUITING"));
    assert_eq!(intel.competitors, vec!["Other Pharma"]);
    assert!(intel.patents.is_empty() && intel.substances.is_empty());
    assert!(intel.generated_at.is_some());
}
