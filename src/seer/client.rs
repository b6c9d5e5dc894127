// SEER client: API-key headers and /rest/{category}/{endpoint} dispatch

use crate::config::{resolve_credential, SEER_API_KEY};
use crate::error::{snippet, ApiError, ApiResult};
use crate::http::{HttpClient, HttpConfig, Params, RequestSpec};
use log::{debug, warn};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.seer.cancer.gov";
pub const USER_AGENT: &str = "ind/seer (https://github.com/marczepeda/ind)";
const SERVICE: &str = "seer";

pub const MISSING_KEY_HELP: &str = "SEER_API_KEY not provided; either...
    - set SEER_API_KEY in configuration (once): ind config set SEER_API_KEY your_api_key
    - pass --api-key (every time)
    - set SEER_API_KEY environment variable (every session): export SEER_API_KEY=your_api_key
Refer to https://api.seer.cancer.gov/usage to retrieve your SEER_API_KEY.";

#[derive(Debug, Clone)]
pub struct SeerConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub rate_limit: Option<f64>,
}

impl Default for SeerConfig {
    fn default() -> Self {
        SeerConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            rate_limit: None,
        }
    }
}

impl SeerConfig {
    /// Key from the argument, `SEER_API_KEY`, or the config store
    pub fn resolved(api_key: Option<&str>) -> Self {
        SeerConfig {
            api_key: resolve_credential(api_key, SEER_API_KEY, SEER_API_KEY),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_timeout(mut self, secs: f64) -> Self {
        self.timeout = Duration::from_secs_f64(secs.max(0.0));
        self
    }

    pub fn with_rate_limit(mut self, per_second: Option<f64>) -> Self {
        self.rate_limit = per_second.filter(|r| *r > 0.0);
        self
    }
}

#[derive(Debug)]
pub struct SeerClient {
    http: HttpClient,
}

impl SeerClient {
    pub fn new(config: SeerConfig) -> ApiResult<Self> {
        let key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ApiError::MissingCredential(MISSING_KEY_HELP.to_string()))?;
        let mut http_config = HttpConfig::new(SERVICE, &config.base_url)
            .with_timeout(config.timeout)
            .with_user_agent(USER_AGENT)
            .with_header("Accept", "application/json")
            .with_header("X-SEERAPI-Key", key)
            .with_header("X-SEER-API-KEY", key);
        if let Some(rate) = config.rate_limit {
            http_config = http_config.with_rate(rate);
        }
        Ok(SeerClient {
            http: HttpClient::new(http_config)?,
        })
    }

    /// GET `/rest/{category}/{endpoint}`; an empty endpoint targets the category root
    pub async fn get(&self, category: &str, endpoint: &str, params: Params) -> ApiResult<Value> {
        let path = category_path(category, endpoint);
        let request = RequestSpec::get(self.http.url(&path)).queries(params.into_pairs());
        let resp = self.http.send(&request).await?;
        if !resp.is_success() {
            let message = format!(
                "HTTP error ({}): {} {}; body: {}",
                path,
                resp.status,
                resp.reason,
                snippet(&resp.text(), 500)
            );
            return Err(resp.into_error(SERVICE, message));
        }
        debug!("[seer] {} -> {} bytes", path, resp.body.len());
        resp.json().map_err(|_| {
            ApiError::Decode(format!(
                "Invalid JSON for {}; body starts with: {}",
                path,
                snippet(&resp.text(), 500)
            ))
        })
    }

    /// `latest` becomes the first entry of the category's versions endpoint
    pub async fn resolve_version(&self, category: &str, version: &str) -> String {
        if !version.eq_ignore_ascii_case("latest") {
            return version.to_string();
        }
        match self.get(category, "versions", Params::new()).await {
            Ok(resp) => first_version(&resp).unwrap_or_else(|| version.to_string()),
            Err(e) => {
                warn!("[seer] could not resolve latest {} version: {}", category, e);
                version.to_string()
            }
        }
    }
}

pub fn category_path(category: &str, endpoint: &str) -> String {
    let category = category.trim_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    if endpoint.is_empty() {
        format!("/rest/{}", category)
    } else {
        format!("/rest/{}/{}", category, endpoint)
    }
}

fn version_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => ["version", "dbVersion", "name", "id"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str).map(String::from)),
        _ => None,
    }
}

/// First version label in a versions payload (bare list or wrapped in versions/items/data/results)
pub fn first_version(resp: &Value) -> Option<String> {
    if let Some(first) = resp.as_array().and_then(|a| a.first()) {
        return version_of(first);
    }
    ["versions", "items", "data", "results"].iter().find_map(|k| {
        resp.get(*k)
            .and_then(Value::as_array)
            .and_then(|a| a.first())
            .and_then(version_of)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_key_is_error() {
        let err = SeerClient::new(SeerConfig::default()).unwrap_err();
        assert!(matches!(err, ApiError::MissingCredential(_)));
        assert!(err.to_string().contains("api.seer.cancer.gov/usage"));
        assert!(SeerClient::new(SeerConfig::default().with_api_key("k")).is_ok());
    }

    #[test]
    fn test_category_path() {
        assert_eq!(category_path("disease", "latest/id/1"), "/rest/disease/latest/id/1");
        assert_eq!(category_path("/ndc/", ""), "/rest/ndc");
        assert_eq!(category_path("mph", "/groups"), "/rest/mph/groups");
    }

    #[test]
    fn test_first_version_shapes() {
        assert_eq!(first_version(&json!(["v2", "v1"])), Some("v2".into()));
        assert_eq!(first_version(&json!([{"version": "2.1"}])), Some("2.1".into()));
        assert_eq!(first_version(&json!({"items": [{"name": "cs"}]})), Some("cs".into()));
        assert_eq!(first_version(&json!({"other": []})), None);
        assert_eq!(first_version(&json!([])), None);
    }
}
