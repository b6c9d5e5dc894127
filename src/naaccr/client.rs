// NAACCR Data Dictionary client

use crate::error::{snippet, ApiError, ApiResult};
use crate::http::{HttpClient, HttpConfig, HttpResponse, RequestSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://apps.naaccr.org/data-dictionary/api/1.0";
const SERVICE: &str = "naaccr";

/// Paginated envelope of list endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<Value>,
}

impl Page {
    /// Accepts the envelope, a bare array, or a single object
    pub fn from_value(value: Value) -> Page {
        match value {
            Value::Array(results) => Page {
                results,
                ..Default::default()
            },
            Value::Object(map) if map.contains_key("results") => {
                let value = Value::Object(map);
                serde_json::from_value(value.clone()).unwrap_or_else(|_| Page {
                    results: vec![value],
                    ..Default::default()
                })
            }
            Value::Null => Page::default(),
            other => Page {
                results: vec![other],
                ..Default::default()
            },
        }
    }
}

#[derive(Debug)]
pub struct NaaccrClient {
    http: HttpClient,
}

impl NaaccrClient {
    pub fn new(base_url: Option<&str>, timeout_secs: f64) -> ApiResult<Self> {
        let config = HttpConfig::new(SERVICE, base_url.unwrap_or(DEFAULT_BASE_URL))
            .with_timeout(Duration::from_secs_f64(timeout_secs.max(0.0)))
            .with_header("Accept", "application/json");
        Ok(NaaccrClient {
            http: HttpClient::new(config)?,
        })
    }

    pub fn default_client() -> ApiResult<Self> {
        Self::new(None, 15.0)
    }

    pub fn url(&self, path: &str) -> String {
        self.http.url(path)
    }

    /// `minimize_results="true"` keeps its quotes, so it is appended unencoded
    pub async fn request_json(&self, path: &str, pairs: Vec<(String, String)>, minimize_results: bool) -> ApiResult<Value> {
        let mut request = RequestSpec::get(self.http.url(path)).queries(pairs);
        if minimize_results {
            request = request.raw_query("minimize_results=\"true\"");
        }
        let resp = self.http.send(&request).await?;
        decode(resp)
    }

    /// Follow an absolute `next` link
    pub async fn get_url(&self, url: &str) -> ApiResult<Value> {
        decode(self.http.get_absolute(url).await?)
    }
}

fn decode(resp: HttpResponse) -> ApiResult<Value> {
    if !resp.is_success() {
        let message = format!(
            "NAACCR HTTP {} {} for {}: {}",
            resp.status,
            resp.reason,
            resp.url,
            snippet(&resp.text(), 300)
        );
        return Err(resp.into_error(SERVICE, message));
    }
    resp.json()
        .map_err(|e| ApiError::Decode(format!("Invalid JSON from {}: {}", resp.url, e)))
}
