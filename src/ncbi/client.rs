// Entrez client: identification params, spacing between calls, retries

use crate::config::{resolve_credential, NCBI_API_KEY, NCBI_EMAIL};
use crate::error::{snippet, ApiError, ApiResult};
use crate::http::{form_encode, Backoff, HttpClient, HttpConfig, HttpResponse, RequestSpec, RetryPolicy};
use log::debug;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_TOOL: &str = "ind-ncbi";
const SERVICE: &str = "ncbi";

/// ~2.5 requests/s without a key
const ANON_DELAY: Duration = Duration::from_millis(400);
/// Stays under the 10 requests/s allowed with a key
const KEYED_DELAY: Duration = Duration::from_millis(120);

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct NcbiConfig {
    pub email: String,
    pub api_key: Option<String>,
    pub tool: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Overrides the spacing derived from `api_key`
    pub base_delay: Option<Duration>,
    pub max_retries: u32,
    pub backoff: f64,
}

impl NcbiConfig {
    pub fn new(email: &str) -> Self {
        NcbiConfig {
            email: email.to_string(),
            api_key: None,
            tool: DEFAULT_TOOL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            base_delay: None,
            max_retries: 3,
            backoff: 2.0,
        }
    }

    /// Email and key from the arguments, then `NCBI_EMAIL`/`NCBI_API_KEY`, then the config store
    pub fn resolve(email: Option<&str>, api_key: Option<&str>) -> ApiResult<Self> {
        let email = resolve_credential(email, NCBI_EMAIL, NCBI_EMAIL).ok_or_else(|| {
            ApiError::MissingCredential(
                "NCBI requires a contact email. Provide --email, set NCBI_EMAIL, or run `ind config set NCBI_EMAIL you@example.org`"
                    .to_string(),
            )
        })?;
        Ok(NcbiConfig::new(&email).with_api_key(resolve_credential(api_key, NCBI_API_KEY, NCBI_API_KEY)))
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_tool(mut self, tool: &str) -> Self {
        self.tool = tool.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_timeout(mut self, secs: f64) -> Self {
        self.timeout = Duration::from_secs_f64(secs.max(0.0));
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn delay(&self) -> Duration {
        self.base_delay.unwrap_or(if self.api_key.is_some() { KEYED_DELAY } else { ANON_DELAY })
    }
}

// ============================================================================
// BODY
// ============================================================================

/// E-utility payload: parsed JSON for `retmode=json`, raw text otherwise
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EutilsBody {
    Json(Value),
    Text(String),
}

impl EutilsBody {
    pub fn from_response(resp: &HttpResponse, retmode: &str) -> Self {
        if retmode.eq_ignore_ascii_case("json") {
            if let Some(v) = resp.json_opt() {
                return EutilsBody::Json(v);
            }
        }
        EutilsBody::Text(resp.text())
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            EutilsBody::Json(v) => Some(v),
            EutilsBody::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EutilsBody::Text(s) => Some(s),
            EutilsBody::Json(_) => None,
        }
    }

    /// Text as-is, JSON pretty-printed
    pub fn render(&self) -> String {
        match self {
            EutilsBody::Text(s) => s.clone(),
            EutilsBody::Json(v) => serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug)]
pub struct EntrezClient {
    config: NcbiConfig,
    http: HttpClient,
}

impl EntrezClient {
    pub fn new(config: NcbiConfig) -> ApiResult<Self> {
        if config.email.trim().is_empty() {
            return Err(ApiError::MissingCredential("NCBI email is required".to_string()));
        }
        let http_config = HttpConfig::new(SERVICE, &config.base_url)
            .with_timeout(config.timeout)
            .with_min_interval(config.delay())
            .with_retry(RetryPolicy::new(
                config.max_retries,
                &[429, 500, 502, 503, 504],
                Backoff::new(0.5, config.backoff),
            ));
        Ok(EntrezClient {
            http: HttpClient::new(http_config)?,
            config,
        })
    }

    pub fn config(&self) -> &NcbiConfig {
        &self.config
    }

    fn identity(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("tool".to_string(), self.config.tool.clone()),
            ("email".to_string(), self.config.email.clone()),
        ];
        if let Some(key) = &self.config.api_key {
            pairs.push(("api_key".to_string(), key.clone()));
        }
        pairs
    }

    /// GET `{base}/{script}` with `params` plus identification
    pub async fn call(&self, script: &str, params: Vec<(String, String)>) -> ApiResult<HttpResponse> {
        let request = RequestSpec::get(self.http.url(script))
            .queries(params)
            .queries(self.identity());
        self.finish(script, self.http.send(&request).await?)
    }

    /// POST the parameters as a form (long id lists)
    pub async fn call_post(&self, script: &str, params: Vec<(String, String)>) -> ApiResult<HttpResponse> {
        let mut all = params;
        all.extend(self.identity());
        let borrowed: Vec<(&str, &str)> = all.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let request = RequestSpec::post(self.http.url(script)).form(form_encode(&borrowed));
        self.finish(script, self.http.send(&request).await?)
    }

    /// Absolute URL outside the eutils path (EGQuery lives at `/gquery`)
    pub async fn call_absolute(&self, url: &str, params: Vec<(String, String)>) -> ApiResult<HttpResponse> {
        let request = RequestSpec::get(url).queries(params).queries(self.identity());
        self.finish(url, self.http.send(&request).await?)
    }

    pub fn gquery_url(&self) -> String {
        let base = self.http.base_url();
        match base.strip_suffix("/entrez/eutils") {
            Some(host) => format!("{}/gquery", host),
            None => self.http.url("gquery"),
        }
    }

    fn finish(&self, script: &str, resp: HttpResponse) -> ApiResult<HttpResponse> {
        if resp.is_success() {
            debug!("[{}] {} -> {} bytes", SERVICE, script, resp.body.len());
            return Ok(resp);
        }
        let message = format!(
            "NCBI {} failed: HTTP {} {}: {}",
            script,
            resp.status,
            resp.reason,
            snippet(&resp.text(), 300)
        );
        Err(resp.into_error(SERVICE, message))
    }
}
