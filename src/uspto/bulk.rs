// Bulk dataset products (/api/v1/datasets/products/*)

use super::client::{Download, UsptoClient};
use super::types::comma_param;
use crate::error::{ApiError, ApiResult};
use crate::http::Params;
use serde_json::Value;
use std::path::Path;

const PRODUCTS: &str = "/api/v1/datasets/products";

/// Query for `/products/search`; `filters`/`range_filters` are sent as given
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductSearch {
    pub q: Option<String>,
    /// `"<field> <order>"`, e.g. `lastModifiedDateTime desc`
    pub sort: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub facets: Vec<String>,
    pub fields: Vec<String>,
    pub filters: Option<String>,
    pub range_filters: Option<String>,
}

impl ProductSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn q(mut self, q: Option<&str>) -> Self {
        self.q = q.filter(|s| !s.is_empty()).map(String::from);
        self
    }

    pub fn limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: Option<u32>) -> Self {
        self.offset = offset;
        self
    }

    /// Structured filters are encoded as compact JSON
    pub fn filters_json(mut self, filters: &Value) -> Self {
        self.filters = Some(filters.to_string());
        self
    }

    pub fn params(&self) -> Params {
        Params::new()
            .put("q", self.q.as_deref())
            .put("sort", self.sort.as_deref().filter(|s| !s.is_empty()))
            .put("offset", self.offset)
            .put("limit", self.limit)
            .put("facets", comma_param(&self.facets))
            .put("fields", comma_param(&self.fields))
            .put("filters", self.filters.as_deref().filter(|s| !s.is_empty()))
            .put("rangeFilters", self.range_filters.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Options for `/products/{productIdentifier}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    /// yyyy-MM-dd
    pub file_data_from_date: Option<String>,
    pub file_data_to_date: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub include_files: Option<bool>,
    pub latest: Option<bool>,
}

impl ProductQuery {
    pub fn params(&self) -> Params {
        Params::new()
            .put("fileDataFromDate", self.file_data_from_date.as_deref())
            .put("fileDataToDate", self.file_data_to_date.as_deref())
            .put("offset", self.offset)
            .put("limit", self.limit)
            .put_bool("includeFiles", self.include_files)
            .put_bool("latest", self.latest)
    }
}

impl UsptoClient {
    /// With no parameters the API returns the top 25 products
    pub async fn search_products(&self, search: &ProductSearch) -> ApiResult<Value> {
        let params = search.params();
        self.troubleshoot("Bulk Dataset Search Params", &pairs_value(&params));
        self.get_json(&format!("{}/search", PRODUCTS), params.into_pairs()).await
    }

    pub async fn get_product(&self, product_identifier: &str, query: &ProductQuery) -> ApiResult<Value> {
        let id = product_identifier.trim();
        if id.is_empty() {
            return Err(ApiError::invalid("product identifier must not be empty"));
        }
        let params = query.params();
        self.troubleshoot("Bulk Get Product Params", &pairs_value(&params));
        let path = format!("{}/{}", PRODUCTS, urlencoding::encode(id));
        self.get_json(&path, params.into_pairs()).await
    }

    /// Fetch a `fileDownloadURI` taken from a product's `fileDataBag`
    pub async fn download_product_file(&self, file_download_uri: &str, dest: Option<&Path>) -> ApiResult<Download> {
        if !file_download_uri.starts_with("http://") && !file_download_uri.starts_with("https://") {
            return Err(ApiError::invalid(format!(
                "fileDownloadURI must be an absolute URL, got '{}'",
                file_download_uri
            )));
        }
        self.download_url(file_download_uri, dest).await
    }
}

fn pairs_value(params: &Params) -> Value {
    let map: serde_json::Map<String, Value> = params
        .clone()
        .into_pairs()
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_search_params() {
        let search = ProductSearch {
            facets: vec!["productLabelArrayText".into()],
            fields: vec!["a".into(), "b".into()],
            ..ProductSearch::new().q(Some("patent")).limit(Some(10))
        }
        .filters_json(&json!([{"name": "productFrequencyText", "value": ["WEEKLY"]}]));
        let params = search.params();
        assert_eq!(params.get("q"), Some("patent"));
        assert_eq!(params.get("limit"), Some("10"));
        assert_eq!(params.get("fields"), Some("a,b"));
        assert_eq!(params.get("offset"), None);
        assert_eq!(
            params.get("filters"),
            Some(r#"[{"name":"productFrequencyText","value":["WEEKLY"]}]"#)
        );
    }

    #[test]
    fn test_product_query_bools() {
        let q = ProductQuery {
            include_files: Some(true),
            latest: Some(false),
            ..Default::default()
        };
        let params = q.params();
        assert_eq!(params.get("includeFiles"), Some("true"));
        assert_eq!(params.get("latest"), Some("false"));
        assert!(ProductQuery::default().params().is_empty());
    }

    #[tokio::test]
    async fn test_download_requires_absolute_uri() {
        let client = UsptoClient::new(
            super::super::client::UsptoConfig::default().with_api_key(Some("k".into())),
        )
        .unwrap();
        let err = client.download_product_file("files/x.zip", None).await.unwrap_err();
        assert!(err.to_string().contains("absolute URL"));
    }
}
