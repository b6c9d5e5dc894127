// USPTO Open Data Portal client: JSON requests, throttled downloads, error mapping

use super::types::{encode_get_params, MethodStrategy};
use crate::config::{resolve_credential, USPTO_API_KEY};
use crate::error::{ApiError, ApiResult};
use crate::http::{Backoff, HttpClient, HttpConfig, HttpResponse, RequestSpec, RetryPolicy, WindowLimiter};
use log::{debug, info, warn};
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_BASE_URL: &str = "https://api.uspto.gov";
pub const USER_AGENT: &str = "ind/uspto (https://github.com/marczepeda/ind)";
const SERVICE: &str = "uspto";

/// Download starts allowed per window
pub const DOWNLOAD_LIMIT: usize = 5;
pub const DOWNLOAD_WINDOW: Duration = Duration::from_secs(10);

/// Per-file counts that trigger a heads-up and a quota warning
pub const FILE_NOTICE_AT: u32 = 15;
pub const FILE_WARN_AT: u32 = 20;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct UsptoConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Backoff,
    /// Print request bodies and params to stderr before sending
    pub troubleshoot: bool,
}

impl Default for UsptoConfig {
    fn default() -> Self {
        UsptoConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff: Backoff::new(5.0, 2.0),
            troubleshoot: false,
        }
    }
}

impl UsptoConfig {
    /// Key from the argument, `USPTO_API_KEY`, or the config store
    pub fn resolved(api_key: Option<&str>) -> Self {
        UsptoConfig {
            api_key: resolve_credential(api_key, USPTO_API_KEY, USPTO_API_KEY),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, secs: f64) -> Self {
        self.timeout = Duration::from_secs_f64(secs.max(0.0));
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff: Backoff) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    pub fn with_troubleshoot(mut self, troubleshoot: bool) -> Self {
        self.troubleshoot = troubleshoot;
        self
    }
}

/// Where a download ended up
#[derive(Debug, Clone, PartialEq)]
pub enum Download {
    Saved(PathBuf),
    Bytes(Vec<u8>),
}

impl Download {
    /// `[saved] path` or `[download] N bytes`
    pub fn describe(&self) -> String {
        match self {
            Download::Saved(path) => format!("[saved] {}", path.display()),
            Download::Bytes(bytes) => format!("[download] {} bytes", bytes.len()),
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug)]
pub struct UsptoClient {
    http: HttpClient,
    troubleshoot: bool,
    downloads: WindowLimiter,
    per_file: Mutex<HashMap<String, u32>>,
}

impl UsptoClient {
    pub fn new(config: UsptoConfig) -> ApiResult<Self> {
        let mut http_config = HttpConfig::new(SERVICE, &config.base_url)
            .with_timeout(config.timeout)
            .with_user_agent(USER_AGENT)
            .with_header("Accept", "application/json")
            .with_retry(RetryPolicy::new(
                config.max_retries,
                &[429, 500, 502, 503, 504],
                config.backoff,
            ));
        match config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(key) => http_config = http_config.with_header("x-api-key", key),
            None => warn!("[uspto] no {} configured; the ODP will likely answer 403", USPTO_API_KEY),
        }
        Ok(UsptoClient {
            http: HttpClient::new(http_config)?,
            troubleshoot: config.troubleshoot,
            downloads: WindowLimiter::new(DOWNLOAD_LIMIT, DOWNLOAD_WINDOW),
            per_file: Mutex::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    pub(crate) fn troubleshoot(&self, header: &str, value: &Value) {
        if self.troubleshoot {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            eprintln!("\n{}:\n{}\n", header, pretty);
        }
    }

    fn build_request(&self, method: Method, path: &str, pairs: Vec<(String, String)>, body: Option<&Value>) -> RequestSpec {
        let mut request = RequestSpec::new(method, self.http.url(path)).queries(pairs);
        if let Some(b) = body {
            request = request.json(b.clone());
        }
        request
    }

    /// JSON request; non-object payloads are wrapped as `{"_raw": ...}`
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        pairs: Vec<(String, String)>,
        body: Option<&Value>,
    ) -> ApiResult<Value> {
        let resp = self.http.send(&self.build_request(method, path, pairs, body)).await?;
        if !resp.is_success() {
            return Err(status_error(resp));
        }
        let data: Value = resp
            .json()
            .map_err(|e| ApiError::Decode(format!("Invalid JSON from {}: {}", resp.url, e)))?;
        Ok(if data.is_object() { data } else { json!({ "_raw": data }) })
    }

    pub async fn get_json(&self, path: &str, pairs: Vec<(String, String)>) -> ApiResult<Value> {
        self.request_json(Method::GET, path, pairs, None).await
    }

    /// Throttled file-like request, saved to `dest` when given
    pub async fn download(
        &self,
        method: Method,
        path: &str,
        pairs: Vec<(String, String)>,
        body: Option<&Value>,
        dest: Option<&Path>,
    ) -> ApiResult<Download> {
        self.downloads.acquire().await;
        let resp = self.http.send(&self.build_request(method, path, pairs, body)).await?;
        finish_download(resp, dest)
    }

    /// Stream an absolute URL such as a bulk `fileDownloadURI`
    pub async fn download_url(&self, url: &str, dest: Option<&Path>) -> ApiResult<Download> {
        self.downloads.acquire().await;
        let count = self.count_file(url).await;
        if count == FILE_NOTICE_AT {
            warn!("[uspto] heads-up: this file has been downloaded {} times in this process", count);
        } else if count >= FILE_WARN_AT {
            warn!(
                "[uspto] you may exceed the USPTO annual per-file limit ({}/year per key)",
                FILE_WARN_AT
            );
        }
        let resp = self.http.get_absolute(url).await?;
        finish_download(resp, dest)
    }

    /// Increment and return the per-file counter (query string ignored)
    pub async fn count_file(&self, url: &str) -> u32 {
        let key = url.split('?').next().unwrap_or(url).to_string();
        let mut counts = self.per_file.lock().await;
        let entry = counts.entry(key).or_insert(0);
        *entry += 1;
        *entry
    }

    // ------------------------------------------------------------------------
    // GET/POST bridging for search-like endpoints
    // ------------------------------------------------------------------------

    pub async fn search_json(&self, path: &str, body: &Value, strategy: MethodStrategy) -> ApiResult<Value> {
        match strategy {
            MethodStrategy::Post => self.request_json(Method::POST, path, Vec::new(), Some(body)).await,
            MethodStrategy::Get => self.get_json(path, encode_get_params(body)).await,
            MethodStrategy::Auto => match self.get_json(path, encode_get_params(body)).await {
                Ok(v) => Ok(v),
                Err(e) => {
                    debug!("[uspto] GET {} failed ({}); retrying as POST", path, e);
                    self.request_json(Method::POST, path, Vec::new(), Some(body)).await
                }
            },
        }
    }

    pub async fn search_download(
        &self,
        path: &str,
        body: &Value,
        strategy: MethodStrategy,
        dest: Option<&Path>,
    ) -> ApiResult<Download> {
        match strategy {
            MethodStrategy::Post => self.download(Method::POST, path, Vec::new(), Some(body), dest).await,
            MethodStrategy::Get => self.download(Method::GET, path, encode_get_params(body), None, dest).await,
            MethodStrategy::Auto => match self.download(Method::GET, path, encode_get_params(body), None, dest).await {
                Ok(d) => Ok(d),
                Err(e) => {
                    debug!("[uspto] GET {} failed ({}); retrying as POST", path, e);
                    self.download(Method::POST, path, Vec::new(), Some(body), dest).await
                }
            },
        }
    }
}

fn finish_download(resp: HttpResponse, dest: Option<&Path>) -> ApiResult<Download> {
    if resp.status >= 400 {
        return Err(status_error(resp));
    }
    match dest {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &resp.body)?;
            info!("[uspto] wrote {} bytes → {}", resp.body.len(), path.display());
            Ok(Download::Saved(path.to_path_buf()))
        }
        None => Ok(Download::Bytes(resp.body)),
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

/// `HTTP {status} {reason} - {detail} (request id: {id})`, omitting absent parts
pub fn format_error_message(status: u16, reason: &str, data: Option<&Value>) -> String {
    let detail = data.and_then(|d| {
        ["errorDetails", "detailedMessage", "message", "error"]
            .iter()
            .filter_map(|k| d.get(*k))
            .find(|v| !v.is_null() && v.as_str() != Some(""))
            .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
    });
    let request_id = data
        .and_then(|d| d.get("requestIdentifier"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());

    let mut parts = vec![format!("HTTP {}", status)];
    if !reason.is_empty() {
        parts.push(reason.to_string());
    }
    if let Some(d) = detail {
        parts.push(format!("- {}", d));
    }
    if let Some(id) = request_id {
        parts.push(format!("(request id: {})", id));
    }
    parts.join(" ")
}

fn status_error(resp: HttpResponse) -> ApiError {
    let data = resp
        .json_opt()
        .filter(Value::is_object)
        .unwrap_or_else(|| json!({ "message": &resp.reason }));
    let message = format_error_message(resp.status, &resp.reason, Some(&data));
    resp.into_error(SERVICE, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    fn response(status: u16, reason: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            reason: reason.to_string(),
            content_type: Some("application/json".to_string()),
            url: "https://api.uspto.gov/x".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_format_error_message_full() {
        let data = json!({"error": "Bad", "errorDetails": "q is malformed", "requestIdentifier": "abc-1"});
        assert_eq!(
            format_error_message(400, "Bad Request", Some(&data)),
            "HTTP 400 Bad Request - q is malformed (request id: abc-1)"
        );
    }

    #[test]
    fn test_format_error_message_minimal() {
        assert_eq!(format_error_message(500, "", None), "HTTP 500");
        let data = json!({"message": "Forbidden"});
        assert_eq!(format_error_message(403, "Forbidden", Some(&data)), "HTTP 403 Forbidden - Forbidden");
    }

    #[test]
    fn test_status_error_classes() {
        let err = status_error(response(413, "Payload Too Large", "{\"detailedMessage\":\"too big\"}"));
        assert_eq!(err.class(), Some(ErrorClass::PayloadTooLarge));
        assert_eq!(err.to_string(), "HTTP 413 Payload Too Large - too big");

        let err = status_error(response(502, "Bad Gateway", "<html>oops</html>"));
        assert_eq!(err.class(), Some(ErrorClass::Server));
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway - Bad Gateway");
    }

    #[test]
    fn test_finish_download_bytes_and_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("nested").join("file.csv");
        let saved = finish_download(response(200, "OK", "a,b\n1,2\n"), Some(&out)).unwrap();
        assert_eq!(saved, Download::Saved(out.clone()));
        assert_eq!(fs::read_to_string(&out).unwrap(), "a,b\n1,2\n");

        let bytes = finish_download(response(200, "OK", "xyz"), None).unwrap();
        assert_eq!(bytes.describe(), "[download] 3 bytes");
        assert!(finish_download(response(404, "Not Found", "{}"), None).is_err());
    }

    #[tokio::test]
    async fn test_per_file_counter_ignores_query() {
        let client = UsptoClient::new(UsptoConfig::default().with_api_key(Some("k".into()))).unwrap();
        assert_eq!(client.count_file("https://x/f.zip?sig=1").await, 1);
        assert_eq!(client.count_file("https://x/f.zip?sig=2").await, 2);
        assert_eq!(client.count_file("https://x/g.zip").await, 1);
    }

    #[test]
    fn test_config_defaults() {
        let cfg = UsptoConfig::default();
        assert_eq!(cfg.max_retries, 2);
        assert_eq!(cfg.backoff.delay(0), Duration::from_secs(5));
        assert_eq!(cfg.backoff.delay(1), Duration::from_secs(10));
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }
}
