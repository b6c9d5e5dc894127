// PubChem PUG-REST client: throttled, retried requests plus file output

use super::urls::{pug_rest_url, DEFAULT_BASE};
use crate::error::{snippet, ApiError, ApiResult};
use crate::http::{form_encode, Backoff, HttpClient, HttpConfig, HttpResponse, RequestSpec, RetryPolicy};
use anyhow::{Context, Result};
use log::info;
use reqwest::Method;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SERVICE: &str = "pubchem";
const USER_AGENT: &str = "ind.pubchem/1.0 (+https://github.com/marczepeda/ind)";

/// Accept header for an output format name
pub fn accept_for(format: &str) -> Option<&'static str> {
    match format.trim().to_ascii_uppercase().as_str() {
        "XML" => Some("application/xml"),
        "JSON" => Some("application/json"),
        "JSONP" => Some("application/javascript"),
        "ASNB" => Some("application/ber-encoded"),
        "SDF" => Some("chemical/x-mdl-sdfile"),
        "CSV" => Some("text/csv"),
        "PNG" => Some("image/png"),
        "TXT" => Some("text/plain"),
        _ => None,
    }
}

pub fn status_hint(code: u16) -> &'static str {
    match code {
        202 => "Accepted (asynchronous operation pending).",
        400 => "Bad request (URL or POST body syntax).",
        404 => "Not found (e.g., invalid identifier).",
        405 => "Not allowed (possibly invalid Accept header).",
        500 => "Server-side problem or unknown error.",
        501 => "Not implemented.",
        503 => "Server busy; retry later.",
        504 => "Timeout from server or request too broad.",
        _ => "HTTP error.",
    }
}

/// `{code} {reason}: {hint}\n{body snippet}`
pub fn pug_rest_error(resp: HttpResponse) -> ApiError {
    let body = resp.text();
    let message = format!(
        "{} {}: {}\n{}",
        resp.status,
        resp.reason,
        status_hint(resp.status),
        snippet(body.trim(), 500)
    );
    resp.into_error(SERVICE, message)
}

pub(crate) fn is_text_like(content_type: Option<&str>) -> bool {
    let ct = content_type.unwrap_or_default().to_ascii_lowercase();
    ["json", "xml", "csv", "text", "javascript"].iter().any(|t| ct.contains(t))
}

// ============================================================================
// REQUEST
// ============================================================================

/// One PUG-REST call: `<input>/<operation>/<output>?options`
#[derive(Debug, Clone)]
pub struct PugRequest {
    pub input: String,
    pub operation: Option<String>,
    pub output: Option<String>,
    pub options: Vec<(String, String)>,
    pub method: Method,
    pub accept: Option<String>,
    /// Form fields for POST
    pub post: Vec<(String, String)>,
    /// Raw POST body with its content type
    pub data: Option<(String, Vec<u8>)>,
}

impl PugRequest {
    pub fn new(input: &str) -> Self {
        PugRequest {
            input: input.to_string(),
            operation: None,
            output: Some("JSON".to_string()),
            options: Vec::new(),
            method: Method::GET,
            accept: None,
            post: Vec::new(),
            data: None,
        }
    }

    pub fn operation(mut self, op: Option<&str>) -> Self {
        self.operation = op.map(String::from);
        self
    }

    pub fn output(mut self, output: Option<&str>) -> Self {
        self.output = output.map(String::from);
        self
    }

    pub fn option(mut self, key: &str, value: impl ToString) -> Self {
        self.options.push((key.to_string(), value.to_string()));
        self
    }

    pub fn options(mut self, pairs: Vec<(String, String)>) -> Self {
        self.options.extend(pairs);
        self
    }

    pub fn post(mut self, fields: Vec<(String, String)>) -> Self {
        self.method = Method::POST;
        self.post = fields;
        self
    }

    pub fn data(mut self, content_type: &str, bytes: Vec<u8>) -> Self {
        self.method = Method::POST;
        self.data = Some((content_type.to_string(), bytes));
        self
    }

    pub fn accept(mut self, accept: Option<&str>) -> Self {
        self.accept = accept.map(String::from);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone)]
pub struct PubChemConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_rps: f64,
    pub max_retries: u32,
    pub backoff_factor: f64,
}

impl Default for PubChemConfig {
    fn default() -> Self {
        PubChemConfig {
            base_url: DEFAULT_BASE.to_string(),
            timeout: Duration::from_secs(60),
            max_rps: 5.0,
            max_retries: 3,
            backoff_factor: 0.75,
        }
    }
}

impl PubChemConfig {
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_timeout(mut self, secs: f64) -> Self {
        self.timeout = Duration::from_secs_f64(secs.max(0.0));
        self
    }

    pub fn with_max_rps(mut self, max_rps: f64) -> Self {
        self.max_rps = max_rps;
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
pub struct PubChemClient {
    http: HttpClient,
}

impl PubChemClient {
    pub fn new(config: PubChemConfig) -> ApiResult<Self> {
        let http_config = HttpConfig::new(SERVICE, &config.base_url)
            .with_timeout(config.timeout)
            .with_user_agent(USER_AGENT)
            .with_rate(config.max_rps)
            .with_retry(RetryPolicy::new(
                config.max_retries,
                &[500, 503, 504],
                Backoff::new(config.backoff_factor, 2.0),
            ));
        Ok(PubChemClient {
            http: HttpClient::new(http_config)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    pub fn url_for(&self, req: &PugRequest) -> String {
        pug_rest_url(
            &req.input,
            req.operation.as_deref(),
            req.output.as_deref(),
            &req.options,
            self.http.base_url(),
        )
    }

    /// Execute `req`. With `raise` unset, non-2xx responses are returned as-is.
    pub async fn request(&self, req: &PugRequest, raise: bool) -> ApiResult<HttpResponse> {
        if req.method != Method::GET && req.method != Method::POST {
            return Err(ApiError::invalid("method must be 'GET' or 'POST'"));
        }
        let mut request = RequestSpec::new(req.method.clone(), self.url_for(req));
        let accept = req
            .accept
            .as_deref()
            .or_else(|| req.output.as_deref().and_then(accept_for));
        if let Some(accept) = accept {
            request = request.header("Accept", accept);
        }
        if req.method == Method::POST {
            request = match &req.data {
                Some((content_type, bytes)) => request.raw_body(content_type, bytes.clone()),
                None => {
                    let pairs: Vec<(&str, &str)> =
                        req.post.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                    request.form(form_encode(&pairs))
                }
            };
        }

        let resp = self.http.send(&request).await?;
        if raise && !resp.is_success() {
            return Err(pug_rest_error(resp));
        }
        Ok(resp)
    }

    pub async fn get_json(&self, req: &PugRequest) -> ApiResult<Value> {
        let resp = self.request(req, true).await?;
        resp.json()
            .map_err(|e| ApiError::Decode(format!("Invalid JSON from {}: {}", resp.url, e)))
    }

    pub async fn get_text(&self, req: &PugRequest) -> ApiResult<String> {
        Ok(self.request(req, true).await?.text())
    }

    pub async fn get_bytes(&self, req: &PugRequest) -> ApiResult<Vec<u8>> {
        Ok(self.request(req, true).await?.body)
    }
}

/// Write a response to `path`: text-like content as UTF-8, anything else as raw bytes
pub fn save(resp: &HttpResponse, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let written = if is_text_like(resp.content_type.as_deref()) {
        fs::write(path, resp.text())
    } else {
        fs::write(path, &resp.body)
    };
    written.with_context(|| format!("Failed to write {}", path.display()))?;
    let shown = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    info!(
        "[ind.pubchem] wrote {:.1} KB → {}",
        resp.body.len() as f64 / 1024.0,
        shown.display()
    );
    Ok(shown)
}
