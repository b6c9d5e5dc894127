// Shared async HTTP plumbing for every service client
//
// Each API module wraps an HttpClient configured with its own base URL,
// headers, retry policy and rate limit. The client returns the final
// response whatever its status; mapping to ApiError is service-specific.

pub mod ratelimit;
pub mod retry;

pub use ratelimit::{RateLimiter, WindowLimiter};
pub use retry::{Backoff, RetryPolicy};

use crate::error::{ApiError, ApiResult, ErrorClass};
use log::{debug, warn};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub service: &'static str,
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
    pub retry: RetryPolicy,
    pub min_interval: Option<Duration>,
}

impl HttpConfig {
    pub fn new(service: &'static str, base_url: &str) -> Self {
        HttpConfig {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("ind/{}", env!("CARGO_PKG_VERSION")),
            headers: Vec::new(),
            retry: RetryPolicy::none(),
            min_interval: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = Some(interval);
        self
    }

    /// Requests per second; non-positive disables limiting
    pub fn with_rate(mut self, per_second: f64) -> Self {
        self.min_interval = if per_second > 0.0 && per_second.is_finite() {
            Some(Duration::from_secs_f64(1.0 / per_second))
        } else {
            None
        };
        self
    }
}

// ============================================================================
// REQUEST
// ============================================================================

#[derive(Debug, Clone)]
pub enum Body {
    /// Already form-encoded payload
    Form(String),
    Json(Value),
    Raw { content_type: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    /// Appended verbatim after the encoded query
    pub raw_query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        RequestSpec {
            method,
            url: url.into(),
            query: Vec::new(),
            raw_query: None,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        RequestSpec::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        RequestSpec::new(Method::POST, url)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn queries<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn raw_query(mut self, raw: impl Into<String>) -> Self {
        self.raw_query = Some(raw.into());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn form(mut self, encoded: impl Into<String>) -> Self {
        self.body = Some(Body::Form(encoded.into()));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(Body::Json(value));
        self
    }

    pub fn raw_body(mut self, content_type: &str, bytes: Vec<u8>) -> Self {
        self.body = Some(Body::Raw {
            content_type: content_type.to_string(),
            bytes,
        });
        self
    }

    /// Full URL with percent-encoded query pairs and any raw suffix
    pub fn full_url(&self) -> String {
        let mut parts: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        if let Some(raw) = &self.raw_query {
            if !raw.is_empty() {
                parts.push(raw.clone());
            }
        }
        if parts.is_empty() {
            return self.url.clone();
        }
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, sep, parts.join("&"))
    }
}

/// Ordered query parameters that skip unset values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: ToString>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(v) = value {
            self.pairs.push((key.to_string(), v.to_string()));
        }
        self
    }

    pub fn set<T: ToString>(self, key: &str, value: T) -> Self {
        self.put(key, Some(value))
    }

    /// `"true"` / `"false"`
    pub fn put_bool(self, key: &str, value: Option<bool>) -> Self {
        self.put(key, value.map(|b| if b { "true" } else { "false" }))
    }

    /// Comma-joined; empty lists are skipped
    pub fn put_list<S: AsRef<str>>(self, key: &str, values: &[S]) -> Self {
        let kept: Vec<&str> = values.iter().map(|v| v.as_ref()).filter(|v| !v.is_empty()).collect();
        if kept.is_empty() {
            return self;
        }
        let joined = kept.join(",");
        self.set(key, joined)
    }

    /// Append `pairs`, replacing earlier values of the same key
    pub fn merge(mut self, pairs: &[(String, String)]) -> Self {
        for (key, value) in pairs {
            self.pairs.retain(|(k, _)| k != key);
            self.pairs.push((key.clone(), value.clone()));
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }
}

// ============================================================================
// RESPONSE
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub content_type: Option<String>,
    pub url: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as JSON if it parses, otherwise `None`
    pub fn json_opt(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn snippet(&self, max_chars: usize) -> String {
        crate::error::snippet(&self.text(), max_chars)
    }

    pub fn into_error(self, service: &'static str, message: String) -> ApiError {
        let body = self.json_opt();
        ApiError::Status {
            service,
            status: self.status,
            class: ErrorClass::from_status(self.status),
            message,
            body,
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug)]
pub struct HttpClient {
    config: HttpConfig,
    inner: reqwest::Client,
    limiter: Option<RateLimiter>,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> ApiResult<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;
        let limiter = config.min_interval.map(RateLimiter::new);
        Ok(HttpClient {
            config,
            inner,
            limiter,
        })
    }

    pub fn service(&self) -> &'static str {
        self.config.service
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Join base URL and path with exactly one slash
    pub fn url(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }

    /// Send with retries; returns the last response regardless of status
    pub async fn send(&self, request: &RequestSpec) -> ApiResult<HttpResponse> {
        let url = request.full_url();
        let retry = &self.config.retry;
        let mut attempt: u32 = 0;

        loop {
            if let Some(limiter) = &self.limiter {
                limiter.acquire().await;
            }
            debug!(
                "[{}] {} {} (attempt {})",
                self.config.service,
                request.method,
                url,
                attempt + 1
            );

            match self.build(request, &url).send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if retry.should_retry_status(status, attempt) {
                        let wait = retry.backoff.delay(attempt);
                        warn!(
                            "[{}] HTTP {} from {}; retrying in {:?}",
                            self.config.service, status, url, wait
                        );
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                        continue;
                    }
                    return self.read(resp, &url).await;
                }
                Err(source) => {
                    if retry.should_retry_transport(attempt) {
                        let wait = retry.backoff.delay(attempt);
                        warn!(
                            "[{}] transport error for {}: {}; retrying in {:?}",
                            self.config.service, url, source, wait
                        );
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(ApiError::Transport {
                        service: self.config.service,
                        url,
                        source,
                    });
                }
            }
        }
    }

    /// GET an absolute URL (e.g. pagination `next` links, download URIs)
    pub async fn get_absolute(&self, url: &str) -> ApiResult<HttpResponse> {
        self.send(&RequestSpec::get(url)).await
    }

    fn build(&self, request: &RequestSpec, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.inner.request(request.method.clone(), url);
        for (name, value) in self.config.headers.iter().chain(request.headers.iter()) {
            req = req.header(name.as_str(), value.as_str());
        }
        match &request.body {
            Some(Body::Form(encoded)) => req
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(encoded.clone()),
            Some(Body::Json(value)) => req.json(value),
            Some(Body::Raw {
                content_type,
                bytes,
            }) => req
                .header("Content-Type", content_type.as_str())
                .body(bytes.clone()),
            None => req,
        }
    }

    async fn read(&self, resp: reqwest::Response, url: &str) -> ApiResult<HttpResponse> {
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = resp.bytes().await.map_err(|source| ApiError::Transport {
            service: self.config.service,
            url: url.to_string(),
            source,
        })?;
        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            content_type,
            url: url.to_string(),
            body: body.to_vec(),
        })
    }
}

pub fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.trim_end_matches('/').to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Encode `pairs` as an `application/x-www-form-urlencoded` body
pub fn form_encode(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_single_slash() {
        assert_eq!(join_url("https://a.b/", "/x/y"), "https://a.b/x/y");
        assert_eq!(join_url("https://a.b", "x"), "https://a.b/x");
        assert_eq!(join_url("https://a.b/", ""), "https://a.b");
    }

    #[test]
    fn test_full_url_encodes_query() {
        let request = RequestSpec::get("https://h/p")
            .query("search", "brand_name:\"a b\"")
            .query("limit", 5);
        assert_eq!(
            request.full_url(),
            "https://h/p?search=brand_name%3A%22a%20b%22&limit=5"
        );
    }

    #[test]
    fn test_full_url_raw_query_and_existing_params() {
        let request = RequestSpec::get("https://h/p?format=json")
            .query("q", "x")
            .raw_query("minimize_results=\"true\"");
        assert_eq!(
            request.full_url(),
            "https://h/p?format=json&q=x&minimize_results=\"true\""
        );
        assert_eq!(RequestSpec::get("https://h/p").full_url(), "https://h/p");
    }

    #[test]
    fn test_query_opt_skips_none() {
        let request = RequestSpec::get("u")
            .query_opt("a", Some(1))
            .query_opt::<i32>("b", None);
        assert_eq!(request.query, vec![("a".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_params_skip_unset() {
        let params = Params::new()
            .put("a", Some(1))
            .put::<&str>("b", None)
            .put_bool("c", Some(false))
            .put_list("d", &["x", "", "y"])
            .put_list::<&str>("e", &[]);
        assert_eq!(params.get("c"), Some("false"));
        assert_eq!(params.get("d"), Some("x,y"));
        assert_eq!(params.get("b"), None);
        assert_eq!(params.into_pairs().len(), 3);
    }

    #[test]
    fn test_form_encode() {
        assert_eq!(form_encode(&[("cid", "1,2,3")]), "cid=1%2C2%2C3");
    }

    #[test]
    fn test_response_helpers() {
        let resp = HttpResponse {
            status: 404,
            reason: "Not Found".into(),
            content_type: Some("application/json".into()),
            url: "u".into(),
            body: br#"{"message":"nope"}"#.to_vec(),
        };
        assert!(!resp.is_success());
        assert_eq!(resp.json_opt().unwrap()["message"], "nope");
        let err = resp.into_error("test", "HTTP 404".into());
        assert_eq!(err.class(), Some(ErrorClass::NotFound));
    }

    #[test]
    fn test_config_rate() {
        let cfg = HttpConfig::new("t", "http://x/").with_rate(2.0);
        assert_eq!(cfg.min_interval, Some(Duration::from_millis(500)));
        assert_eq!(cfg.base_url, "http://x");
        let cfg = cfg.with_rate(0.0);
        assert!(cfg.min_interval.is_none());
    }
}
