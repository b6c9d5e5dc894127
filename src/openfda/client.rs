// openFDA client: query, count, paginate

use super::endpoints::Endpoint;
use super::query::{q, QueryParams};
use crate::config::{resolve_credential, OPENFDA_API_KEY};
use crate::error::{snippet, ApiError, ApiResult};
use crate::http::{Backoff, HttpClient, HttpConfig, RequestSpec, RetryPolicy};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.fda.gov";
const SERVICE: &str = "openfda";

// ============================================================================
// RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsMeta {
    pub total: Option<u64>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub disclaimer: Option<String>,
    pub terms: Option<String>,
    pub license: Option<String>,
    pub last_updated: Option<String>,
    pub results: Option<ResultsMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenFdaResponse {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub results: Vec<Value>,
}

impl OpenFdaResponse {
    pub fn total(&self) -> Option<u64> {
        self.meta.results.as_ref().and_then(|r| r.total)
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone)]
pub struct OpenFdaConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_factor: f64,
}

impl Default for OpenFdaConfig {
    fn default() -> Self {
        OpenFdaConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff_factor: 1.5,
        }
    }
}

impl OpenFdaConfig {
    /// Key from the argument, `OPENFDA_API_KEY`, or the config store
    pub fn resolved(api_key: Option<&str>) -> Self {
        OpenFdaConfig {
            api_key: resolve_credential(api_key, OPENFDA_API_KEY, OPENFDA_API_KEY),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_timeout(mut self, secs: f64) -> Self {
        self.timeout = Duration::from_secs_f64(secs.max(0.0));
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }
}

#[derive(Debug)]
pub struct OpenFdaClient {
    http: HttpClient,
}

impl OpenFdaClient {
    pub fn new(config: OpenFdaConfig) -> ApiResult<Self> {
        let mut http_config = HttpConfig::new(SERVICE, &config.base_url)
            .with_timeout(config.timeout)
            .with_header("Accept", "application/json")
            .with_retry(RetryPolicy::new(
                config.max_retries,
                &[429, 500, 502, 503, 504],
                Backoff::new(1.0, config.backoff_factor),
            ));
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            http_config = http_config.with_header("X-Api-Key", key);
        }
        Ok(OpenFdaClient {
            http: HttpClient::new(http_config)?,
        })
    }

    /// Raw GET of `/{endpoint}.json` with the given query pairs
    pub async fn request_json(&self, path: &str, pairs: Vec<(String, String)>) -> ApiResult<Value> {
        let request = RequestSpec::get(self.http.url(path)).queries(pairs);
        let resp = self.http.send(&request).await?;
        if !resp.is_success() {
            let detail = resp
                .json_opt()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or_else(|| snippet(&resp.text(), 300));
            let message = format!("HTTP {} {} for {}: {}", resp.status, resp.reason, resp.url, detail);
            return Err(resp.into_error(SERVICE, message));
        }
        resp.json()
            .map_err(|e| ApiError::Decode(format!("Invalid JSON from {}: {}", resp.url, e)))
    }

    pub async fn query(&self, endpoint: Endpoint, params: &QueryParams) -> ApiResult<OpenFdaResponse> {
        let value = self.request_json(&endpoint.path(), params.to_pairs()).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::Decode(format!("Unexpected openFDA payload for {}: {}", endpoint.name(), e)))
    }

    /// Like `query`, but a 404 (openFDA's "no matches") yields an empty response
    pub async fn query_or_empty(&self, endpoint: Endpoint, params: &QueryParams) -> ApiResult<OpenFdaResponse> {
        match self.query(endpoint, params).await {
            Err(e) if e.status() == Some(404) => {
                debug!("openFDA {}: no matches", endpoint.name());
                Ok(OpenFdaResponse::default())
            }
            other => other,
        }
    }

    /// Facet counts on `field` (suffixing `.exact` when asked)
    pub async fn count(
        &self,
        endpoint: Endpoint,
        search: Option<&str>,
        field: &str,
        exact: bool,
        limit: Option<u32>,
    ) -> ApiResult<OpenFdaResponse> {
        let field = if exact && !field.ends_with(".exact") {
            format!("{}.exact", field)
        } else {
            field.to_string()
        };
        let mut params = QueryParams::new().count(&field);
        if let Some(s) = search {
            params = params.search(s);
        }
        if let Some(l) = limit {
            params = params.limit(l);
        }
        self.query(endpoint, &params).await
    }

    /// Fetch pages by advancing `skip` until a short page, `max_records`, or the reported total
    pub async fn paginate(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
        max_records: Option<usize>,
    ) -> ApiResult<Vec<Value>> {
        let page_size = params.page_size() as usize;
        let mut out: Vec<Value> = Vec::new();
        let mut skip = params.skip.unwrap_or(0) as usize;
        loop {
            let remaining = max_records.map(|m| m.saturating_sub(out.len()));
            let page_limit = remaining.map_or(page_size, |r| r.min(page_size));
            if page_limit == 0 {
                break;
            }
            let page_params = QueryParams {
                limit: Some(page_limit as u32),
                skip: Some(skip as u32),
                ..params.clone()
            };
            let page = self.query_or_empty(endpoint, &page_params).await?;
            let batch = page.results.len();
            let total = page.total();
            out.extend(page.results);
            debug!("openFDA {}: fetched {} (skip {})", endpoint.name(), batch, skip);
            if batch < page_limit {
                break;
            }
            if total.is_some_and(|t| (skip + batch) as u64 >= t) {
                break;
            }
            skip += batch;
        }
        if let Some(m) = max_records {
            out.truncate(m);
        }
        info!("openFDA {}: {} records", endpoint.name(), out.len());
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Convenience searches
    // ------------------------------------------------------------------------

    /// Drugs@FDA applications for a sponsor (upper-cased, exact phrase)
    pub async fn search_drugsfda_by_sponsor(&self, sponsor: &str, max_records: usize) -> ApiResult<Vec<Value>> {
        let search = format!("sponsor_name:\"{}\"", sponsor.to_uppercase().replace('"', ""));
        let params = QueryParams::new().search(&search).limit(100);
        self.paginate(Endpoint::DrugDrugsFda, &params, Some(max_records)).await
    }

    /// Labels for an application number such as `NDA021436`
    pub async fn search_labels_by_application_number(&self, application_number: &str, limit: u32) -> ApiResult<Vec<Value>> {
        let params = QueryParams::new()
            .search(&q("openfda.application_number", application_number))
            .limit(limit);
        Ok(self.query_or_empty(Endpoint::DrugLabel, &params).await?.results)
    }

    /// Adverse events where `field` matches `term`
    pub async fn search_events_by_field(&self, field: &str, term: &str, limit: u32) -> ApiResult<OpenFdaResponse> {
        let params = QueryParams::new().search(&q(field, term)).limit(limit);
        self.query(Endpoint::DrugEvent, &params).await
    }

    /// Adverse event counts per reaction term
    pub async fn count_events_by_reaction(&self, limit: u32) -> ApiResult<OpenFdaResponse> {
        self.count(Endpoint::DrugEvent, None, "patient.reaction.reactionmeddrapt", true, Some(limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_deserializes_partial_meta() {
        let raw = serde_json::json!({
            "meta": {"last_updated": "2024-01-01", "results": {"skip": 0, "limit": 1, "total": 42}},
            "results": [{"term": "HEADACHE", "count": 7}]
        });
        let resp: OpenFdaResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.total(), Some(42));
        assert_eq!(resp.results[0]["count"], 7);

        let empty: OpenFdaResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(empty.results.is_empty());
        assert_eq!(empty.total(), None);
    }

    #[test]
    fn test_config_defaults() {
        let cfg = OpenFdaConfig::default();
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.backoff_factor, 1.5);
    }
}
