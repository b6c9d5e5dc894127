// ClinicalTrials.gov client: plain JSON GETs with an optional throttle

use crate::error::{snippet, ApiError, ApiResult};
use crate::http::{HttpClient, HttpConfig, RequestSpec};
use log::debug;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://clinicaltrials.gov/api/v2";
pub const USER_AGENT: &str = "ind/clinical_trials (https://github.com/marczepeda/ind)";
const SERVICE: &str = "clinical_trials";

#[derive(Debug, Clone)]
pub struct ClinicalTrialsConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    /// Requests per second; `None` disables throttling
    pub rate_limit: Option<f64>,
}

impl Default for ClinicalTrialsConfig {
    fn default() -> Self {
        ClinicalTrialsConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.to_string(),
            rate_limit: None,
        }
    }
}

impl ClinicalTrialsConfig {
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
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
pub struct ClinicalTrialsClient {
    http: HttpClient,
}

impl ClinicalTrialsClient {
    pub fn new(config: ClinicalTrialsConfig) -> ApiResult<Self> {
        let mut http_config = HttpConfig::new(SERVICE, &config.base_url)
            .with_timeout(config.timeout)
            .with_user_agent(&config.user_agent)
            .with_header("Accept", "application/json");
        if let Some(rate) = config.rate_limit {
            http_config = http_config.with_rate(rate);
        }
        Ok(ClinicalTrialsClient {
            http: HttpClient::new(http_config)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// GET `path` and parse the JSON body
    pub async fn request_json(&self, path: &str, pairs: Vec<(String, String)>) -> ApiResult<Value> {
        let request = RequestSpec::get(self.http.url(path)).queries(pairs);
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
        debug!("[{}] {} -> {} bytes", SERVICE, resp.url, resp.body.len());
        resp.json().map_err(|_| {
            ApiError::Decode(format!(
                "Invalid JSON for {}; body starts with: {}",
                path,
                snippet(&resp.text(), 500)
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_rate() {
        let cfg = ClinicalTrialsConfig::default();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.user_agent, USER_AGENT);
        assert!(cfg.rate_limit.is_none());

        let cfg = cfg.with_rate_limit(Some(2.0)).with_timeout(20.0);
        assert_eq!(cfg.rate_limit, Some(2.0));
        assert_eq!(cfg.timeout, Duration::from_secs(20));
        assert!(ClinicalTrialsConfig::default().with_rate_limit(Some(0.0)).rate_limit.is_none());
    }

    #[test]
    fn test_client_trims_base() {
        let client = ClinicalTrialsClient::new(ClinicalTrialsConfig::default().with_base_url("http://x/api/")).unwrap();
        assert_eq!(client.base_url(), "http://x/api");
    }
}
