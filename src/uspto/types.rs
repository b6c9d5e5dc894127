// Shared request schema for the ODP search endpoints

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// SCHEMA PIECES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub value: Vec<String>,
}

impl Filter {
    pub fn new(name: &str, values: &[&str]) -> Self {
        Filter {
            name: name.to_string(),
            value: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Dates are `yyyy-MM-dd`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeFilter {
    pub field: String,
    pub value_from: String,
    pub value_to: String,
}

impl RangeFilter {
    pub fn new(field: &str, value_from: &str, value_to: &str) -> Self {
        RangeFilter {
            field: field.to_string(),
            value_from: value_from.to_string(),
            value_to: value_to.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn name(&self) -> &'static str {
        match self {
            SortOrder::Asc => "Asc",
            SortOrder::Desc => "Desc",
        }
    }

    pub fn parse(s: &str) -> ApiResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(ApiError::invalid(format!("sort order must be Asc or Desc, got '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn new(field: &str, order: SortOrder) -> Self {
        Sort {
            field: field.to_string(),
            order,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination { offset: 0, limit: 25 }
    }
}

impl Pagination {
    pub fn new(offset: u32, limit: u32) -> Self {
        Pagination { offset, limit }
    }
}

// ============================================================================
// SEARCH REQUEST
// ============================================================================

/// POST body shared by the patent and petition search endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub filters: Vec<Filter>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub range_filters: Vec<RangeFilter>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sort: Vec<Sort>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub facets: Vec<String>,
    /// Only meaningful for `/search/download` (`json` or `csv`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn q(mut self, q: Option<&str>) -> Self {
        self.q = q.map(String::from);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn range_filter(mut self, range: RangeFilter) -> Self {
        self.range_filters.push(range);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn fields(mut self, fields: &[String]) -> Self {
        self.fields = fields.to_vec();
        self
    }

    pub fn facets(mut self, facets: &[String]) -> Self {
        self.facets = facets.to_vec();
        self
    }

    pub fn page(mut self, offset: u32, limit: u32) -> Self {
        self.pagination = Some(Pagination::new(offset, limit));
        self
    }

    pub fn format(mut self, format: Option<&str>) -> Self {
        self.format = format.map(String::from);
        self
    }

    pub fn to_body(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

// ============================================================================
// GET ENCODING
// ============================================================================

const STRUCTURED_KEYS: [&str; 7] = ["q", "pagination", "fields", "facets", "sort", "filters", "rangeFilters"];

/// Flatten a POST-style body into GET query pairs.
///
/// `pagination` becomes `offset`/`limit`, `fields` and `facets` are comma-joined,
/// `sort`/`filters`/`rangeFilters` are compact JSON, and remaining scalars pass
/// through (`false` and null are dropped).
pub fn encode_get_params(body: &Value) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    let Some(obj) = body.as_object() else {
        return out;
    };

    if let Some(q) = obj.get("q").and_then(scalar) {
        out.push(("q".to_string(), q));
    }
    if let Some(pag) = obj.get("pagination").and_then(Value::as_object) {
        for key in ["offset", "limit"] {
            if let Some(n) = pag.get(key).and_then(Value::as_i64) {
                out.push((key.to_string(), n.to_string()));
            }
        }
    }
    for key in ["fields", "facets"] {
        if let Some(list) = obj.get(key).and_then(Value::as_array).filter(|l| !l.is_empty()) {
            let joined: Vec<String> = list.iter().filter_map(scalar).collect();
            out.push((key.to_string(), joined.join(",")));
        }
    }
    for key in ["sort", "filters", "rangeFilters"] {
        if let Some(val) = obj.get(key).filter(|v| !is_empty(v)) {
            out.push((key.to_string(), val.to_string()));
        }
    }
    for (key, val) in obj {
        if STRUCTURED_KEYS.contains(&key.as_str()) || matches!(val, Value::Bool(false)) {
            continue;
        }
        if let Some(s) = scalar(val) {
            out.push((key.clone(), s));
        }
    }
    out
}

fn scalar(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Comma-join a list parameter; `None` when nothing is left
pub fn comma_param<S: AsRef<str>>(values: &[S]) -> Option<String> {
    let kept: Vec<&str> = values.iter().map(|v| v.as_ref()).filter(|v| !v.is_empty()).collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(","))
    }
}

// ============================================================================
// METHOD STRATEGY
// ============================================================================

/// How search endpoints that accept both GET and POST are called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodStrategy {
    /// GET with encoded params, then POST on any error
    #[default]
    Auto,
    Get,
    Post,
}

impl MethodStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            MethodStrategy::Auto => "auto",
            MethodStrategy::Get => "GET",
            MethodStrategy::Post => "POST",
        }
    }

    pub fn parse(s: &str) -> ApiResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(MethodStrategy::Auto),
            "get" => Ok(MethodStrategy::Get),
            "post" => Ok(MethodStrategy::Post),
            other => Err(ApiError::invalid(format!(
                "method must be one of auto, GET, POST (got '{}')",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_request_body_skips_empty() {
        let body = SearchRequest::new().q(Some("x:1")).page(10, 5).to_body();
        assert_eq!(body, json!({"q": "x:1", "pagination": {"offset": 10, "limit": 5}}));
        assert_eq!(SearchRequest::new().to_body(), json!({}));
    }

    #[test]
    fn test_range_filter_camel_case() {
        let body = SearchRequest::new()
            .range_filter(RangeFilter::new("filingDate", "2020-01-01", "2020-12-31"))
            .sort(Sort::new("filingDate", SortOrder::Desc))
            .to_body();
        assert_eq!(body["rangeFilters"][0]["valueFrom"], "2020-01-01");
        assert_eq!(body["sort"][0]["order"], "Desc");
    }

    #[test]
    fn test_encode_get_params() {
        let body = SearchRequest::new()
            .q(Some("applicationMetaData.applicationTypeLabelName:Utility"))
            .fields(&["a".to_string(), "b".to_string()])
            .filter(Filter::new("status", &["Patented Case"]))
            .page(0, 25)
            .format(Some("csv"))
            .to_body();
        let pairs = encode_get_params(&body);
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("offset"), Some("0"));
        assert_eq!(get("limit"), Some("25"));
        assert_eq!(get("fields"), Some("a,b"));
        assert_eq!(get("filters"), Some(r#"[{"name":"status","value":["Patented Case"]}]"#));
        assert_eq!(get("format"), Some("csv"));
        assert_eq!(get("pagination"), None);
    }

    #[test]
    fn test_encode_drops_false_scalars() {
        let pairs = encode_get_params(&json!({"flag": false, "other": true, "n": 3, "nested": {"a": 1}}));
        assert_eq!(
            pairs,
            vec![("other".to_string(), "true".to_string()), ("n".to_string(), "3".to_string())]
        );
    }

    #[test]
    fn test_method_strategy_parse() {
        assert_eq!(MethodStrategy::parse("GET").unwrap(), MethodStrategy::Get);
        assert_eq!(MethodStrategy::parse("auto").unwrap(), MethodStrategy::Auto);
        assert!(MethodStrategy::parse("PUT").is_err());
        assert_eq!(SortOrder::parse("desc").unwrap(), SortOrder::Desc);
    }

    #[test]
    fn test_comma_param() {
        assert_eq!(comma_param(&["a", "", "b"]), Some("a,b".to_string()));
        assert_eq!(comma_param::<&str>(&[]), None);
    }
}
