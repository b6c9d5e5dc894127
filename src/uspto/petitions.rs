// Petition decisions (/api/v1/petition/decisions/*)

use super::client::{Download, UsptoClient};
use super::types::{MethodStrategy, SearchRequest};
use crate::error::{ApiError, ApiResult};
use crate::http::Params;
use serde_json::Value;
use std::path::Path;

const DECISIONS: &str = "/api/v1/petition/decisions";

/// Formats accepted by `/search/download`
pub const DOWNLOAD_FORMATS: [&str; 2] = ["json", "csv"];

impl UsptoClient {
    pub async fn search_decisions(&self, request: &SearchRequest, method: MethodStrategy) -> ApiResult<Value> {
        let body = request.to_body();
        self.troubleshoot("Petition Decisions Search Body", &body);
        self.search_json(&format!("{}/search", DECISIONS), &body, method).await
    }

    /// `format` (json or csv) travels in the body or as a GET param
    pub async fn download_search_decisions(
        &self,
        request: &SearchRequest,
        method: MethodStrategy,
        dest: Option<&Path>,
    ) -> ApiResult<Download> {
        if let Some(fmt) = request.format.as_deref() {
            if !DOWNLOAD_FORMATS.contains(&fmt) {
                return Err(ApiError::invalid(format!(
                    "download format must be one of {} (got '{}')",
                    DOWNLOAD_FORMATS.join(", "),
                    fmt
                )));
            }
        }
        let body = request.to_body();
        self.troubleshoot("Petition Decisions Download Body", &body);
        self.search_download(&format!("{}/search/download", DECISIONS), &body, method, dest)
            .await
    }

    /// `include_documents` adds `documentBag` when true; `None` leaves the server default
    pub async fn get_decision(&self, record_identifier: &str, include_documents: Option<bool>) -> ApiResult<Value> {
        let id = record_identifier.trim();
        if id.is_empty() {
            return Err(ApiError::invalid("petition decision identifier must not be empty"));
        }
        let params = Params::new().put_bool("includeDocuments", include_documents);
        let path = format!("{}/{}", DECISIONS, urlencoding::encode(id));
        self.get_json(&path, params.into_pairs()).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::UsptoConfig;
    use super::*;

    #[tokio::test]
    async fn test_download_rejects_unknown_format() {
        let client = UsptoClient::new(UsptoConfig::default().with_api_key(Some("k".into()))).unwrap();
        let request = SearchRequest::new().format(Some("xml"));
        let err = client
            .download_search_decisions(&request, MethodStrategy::Post, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("json, csv"));
    }

    #[tokio::test]
    async fn test_get_decision_requires_id() {
        let client = UsptoClient::new(UsptoConfig::default().with_api_key(Some("k".into()))).unwrap();
        assert!(client.get_decision(" ", Some(true)).await.is_err());
    }
}
