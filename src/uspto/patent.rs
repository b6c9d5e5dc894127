// Patent application endpoints (/api/v1/patent/*)

use super::client::{Download, UsptoClient};
use super::types::{MethodStrategy, SearchRequest};
use crate::error::{ApiError, ApiResult};
use serde_json::{json, Value};
use std::path::Path;

const APPLICATIONS: &str = "/api/v1/patent/applications";
const STATUS_CODES: &str = "/api/v1/patent/status-codes";

/// Per-application sub-resources under `/applications/{number}/`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationResource {
    MetaData,
    Adjustment,
    Assignment,
    Attorney,
    Continuity,
    ForeignPriority,
    Transactions,
    Documents,
    AssociatedDocuments,
}

impl ApplicationResource {
    pub const ALL: [ApplicationResource; 9] = [
        ApplicationResource::MetaData,
        ApplicationResource::Adjustment,
        ApplicationResource::Assignment,
        ApplicationResource::Attorney,
        ApplicationResource::Continuity,
        ApplicationResource::ForeignPriority,
        ApplicationResource::Transactions,
        ApplicationResource::Documents,
        ApplicationResource::AssociatedDocuments,
    ];

    /// Path segment
    pub fn name(&self) -> &'static str {
        match self {
            ApplicationResource::MetaData => "meta-data",
            ApplicationResource::Adjustment => "adjustment",
            ApplicationResource::Assignment => "assignment",
            ApplicationResource::Attorney => "attorney",
            ApplicationResource::Continuity => "continuity",
            ApplicationResource::ForeignPriority => "foreign-priority",
            ApplicationResource::Transactions => "transactions",
            ApplicationResource::Documents => "documents",
            ApplicationResource::AssociatedDocuments => "associated-documents",
        }
    }

    /// Accepts the path segment or `meta`
    pub fn parse(s: &str) -> ApiResult<Self> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        if key == "meta" {
            return Ok(ApplicationResource::MetaData);
        }
        ApplicationResource::ALL
            .iter()
            .copied()
            .find(|r| r.name() == key)
            .ok_or_else(|| ApiError::invalid(format!("unknown application resource '{}'", s)))
    }
}

fn application_path(number: &str) -> ApiResult<String> {
    let number = number.trim();
    if number.is_empty() {
        return Err(ApiError::invalid("application number must not be empty"));
    }
    Ok(format!("{}/{}", APPLICATIONS, urlencoding::encode(number)))
}

impl UsptoClient {
    /// GET/POST `/applications/search`
    pub async fn search_applications(&self, request: &SearchRequest, method: MethodStrategy) -> ApiResult<Value> {
        let body = request.to_body();
        self.troubleshoot("Patent Applications Search Body", &body);
        self.search_json(&format!("{}/search", APPLICATIONS), &body, method).await
    }

    /// GET/POST `/applications/search/download`
    pub async fn download_search(
        &self,
        request: &SearchRequest,
        method: MethodStrategy,
        dest: Option<&Path>,
    ) -> ApiResult<Download> {
        let body = request.to_body();
        self.troubleshoot("Patent Applications Download Body", &body);
        self.search_download(&format!("{}/search/download", APPLICATIONS), &body, method, dest)
            .await
    }

    pub async fn get_application(&self, application_number: &str) -> ApiResult<Value> {
        self.get_json(&application_path(application_number)?, Vec::new()).await
    }

    pub async fn get_application_resource(
        &self,
        application_number: &str,
        resource: ApplicationResource,
    ) -> ApiResult<Value> {
        let path = format!("{}/{}", application_path(application_number)?, resource.name());
        self.get_json(&path, Vec::new()).await
    }

    pub async fn get_meta_data(&self, application_number: &str) -> ApiResult<Value> {
        self.get_application_resource(application_number, ApplicationResource::MetaData)
            .await
    }

    pub async fn get_adjustment(&self, application_number: &str) -> ApiResult<Value> {
        self.get_application_resource(application_number, ApplicationResource::Adjustment)
            .await
    }

    pub async fn get_assignment(&self, application_number: &str) -> ApiResult<Value> {
        self.get_application_resource(application_number, ApplicationResource::Assignment)
            .await
    }

    pub async fn get_attorney(&self, application_number: &str) -> ApiResult<Value> {
        self.get_application_resource(application_number, ApplicationResource::Attorney)
            .await
    }

    pub async fn get_continuity(&self, application_number: &str) -> ApiResult<Value> {
        self.get_application_resource(application_number, ApplicationResource::Continuity)
            .await
    }

    pub async fn get_foreign_priority(&self, application_number: &str) -> ApiResult<Value> {
        self.get_application_resource(application_number, ApplicationResource::ForeignPriority)
            .await
    }

    pub async fn get_transactions(&self, application_number: &str) -> ApiResult<Value> {
        self.get_application_resource(application_number, ApplicationResource::Transactions)
            .await
    }

    pub async fn get_documents(&self, application_number: &str) -> ApiResult<Value> {
        self.get_application_resource(application_number, ApplicationResource::Documents)
            .await
    }

    pub async fn get_associated_documents(&self, application_number: &str) -> ApiResult<Value> {
        self.get_application_resource(application_number, ApplicationResource::AssociatedDocuments)
            .await
    }

    /// `/status-codes`, optionally filtered by `q`
    pub async fn get_status_codes(&self, q: Option<&str>, method: MethodStrategy) -> ApiResult<Value> {
        let body = match q.filter(|s| !s.is_empty()) {
            Some(q) => json!({ "q": q }),
            None => json!({}),
        };
        self.troubleshoot("Patent Status Codes Body", &body);
        self.search_json(STATUS_CODES, &body, method).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_names() {
        assert_eq!(ApplicationResource::parse("meta").unwrap(), ApplicationResource::MetaData);
        assert_eq!(
            ApplicationResource::parse("foreign_priority").unwrap(),
            ApplicationResource::ForeignPriority
        );
        assert_eq!(ApplicationResource::AssociatedDocuments.name(), "associated-documents");
        assert!(ApplicationResource::parse("claims").is_err());
    }

    #[test]
    fn test_application_path() {
        assert_eq!(application_path("16123456").unwrap(), "/api/v1/patent/applications/16123456");
        assert_eq!(application_path("PCT/US2020").unwrap(), "/api/v1/patent/applications/PCT%2FUS2020");
        assert!(application_path("  ").is_err());
    }
}
