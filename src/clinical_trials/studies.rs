// /studies endpoints: search, paging, single study, data-model metadata

use super::client::ClinicalTrialsClient;
use crate::error::{ApiError, ApiResult};
use log::{debug, info};
use serde_json::Value;

// ============================================================================
// QUERY
// ============================================================================

/// `filter.*` or `postFilter.*` block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyFilter {
    pub overall_status: Vec<String>,
    pub geo: Option<String>,
    pub ids: Vec<String>,
    pub advanced: Option<String>,
    pub synonyms: Vec<String>,
}

impl StudyFilter {
    fn push_pairs(&self, prefix: &str, pairs: &mut Vec<(String, String)>) {
        put(pairs, &format!("{}.overallStatus", prefix), join(&self.overall_status));
        put(pairs, &format!("{}.geo", prefix), self.geo.clone());
        put(pairs, &format!("{}.ids", prefix), join(&self.ids));
        put(pairs, &format!("{}.advanced", prefix), self.advanced.clone());
        put(pairs, &format!("{}.synonyms", prefix), join(&self.synonyms));
    }
}

/// Parameters for `GET /studies`
///
/// Keep everything but `count_total`, `page_size` and `page_token` fixed
/// across pages of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyQuery {
    pub markup_format: String,
    /// `query.{area}` Essie expressions, in insertion order
    pub query: Vec<(String, String)>,
    pub filter: StudyFilter,
    pub post_filter: StudyFilter,
    pub agg_filters: Option<String>,
    pub geo_decay: Option<String>,
    pub fields: Option<Vec<String>>,
    pub sort: Option<Vec<String>>,
    pub count_total: bool,
    pub page_size: u32,
    pub page_token: Option<String>,
    /// Copied verbatim, replacing any parameter of the same name
    pub passthrough: Vec<(String, String)>,
}

pub const QUERY_AREAS: [&str; 10] = [
    "cond", "term", "locn", "titles", "intr", "outc", "spons", "lead", "id", "patient",
];

impl Default for StudyQuery {
    fn default() -> Self {
        StudyQuery {
            markup_format: "markdown".to_string(),
            query: Vec::new(),
            filter: StudyFilter::default(),
            post_filter: StudyFilter::default(),
            agg_filters: None,
            geo_decay: None,
            fields: None,
            sort: None,
            count_total: false,
            page_size: 10,
            page_token: None,
            passthrough: Vec::new(),
        }
    }
}

impl StudyQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// `query.{area}=expr`; `area` is one of `QUERY_AREAS`
    pub fn query(mut self, area: &str, expr: &str) -> Self {
        if !expr.is_empty() {
            self.query.retain(|(a, _)| a != area);
            self.query.push((area.to_string(), expr.to_string()));
        }
        self
    }

    pub fn cond(self, expr: &str) -> Self {
        self.query("cond", expr)
    }

    pub fn term(self, expr: &str) -> Self {
        self.query("term", expr)
    }

    pub fn intr(self, expr: &str) -> Self {
        self.query("intr", expr)
    }

    pub fn spons(self, expr: &str) -> Self {
        self.query("spons", expr)
    }

    pub fn with_filter(mut self, filter: StudyFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_post_filter(mut self, filter: StudyFilter) -> Self {
        self.post_filter = filter;
        self
    }

    pub fn agg_filters(mut self, value: &str) -> Self {
        self.agg_filters = Some(value.to_string());
        self
    }

    pub fn geo_decay(mut self, value: &str) -> Self {
        self.geo_decay = Some(value.to_string());
        self
    }

    pub fn markup_format(mut self, format: &str) -> Self {
        self.markup_format = format.to_string();
        self
    }

    pub fn fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.as_ref().to_string()).collect());
        self
    }

    pub fn sort<S: AsRef<str>>(mut self, sort: &[S]) -> Self {
        self.sort = Some(sort.iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    pub fn count_total(mut self, count_total: bool) -> Self {
        self.count_total = count_total;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page_token(mut self, token: Option<String>) -> Self {
        self.page_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.passthrough.push((key.to_string(), value.to_string()));
        self
    }

    /// Validate and flatten into query pairs
    pub fn to_pairs(&self) -> ApiResult<Vec<(String, String)>> {
        let mut pairs: Vec<(String, String)> = vec![
            ("format".to_string(), "json".to_string()),
            ("markupFormat".to_string(), self.markup_format.clone()),
        ];

        for (area, expr) in &self.query {
            if !QUERY_AREAS.contains(&area.as_str()) {
                return Err(ApiError::invalid(format!("unknown query area 'query.{}'", area)));
            }
            put(&mut pairs, &format!("query.{}", area), Some(expr.clone()));
        }

        self.filter.push_pairs("filter", &mut pairs);
        self.post_filter.push_pairs("postFilter", &mut pairs);
        put(&mut pairs, "aggFilters", self.agg_filters.clone());
        put(&mut pairs, "geoDecay", self.geo_decay.clone());

        if let Some(fields) = &self.fields {
            let joined = join(fields)
                .ok_or_else(|| ApiError::invalid("`fields` must be a non-empty list when provided"))?;
            put(&mut pairs, "fields", Some(joined));
        }
        if let Some(sort) = &self.sort {
            if sort.len() > 2 {
                return Err(ApiError::invalid(
                    "`sort` accepts at most 2 items (e.g. @relevance, LastUpdatePostDate:desc)",
                ));
            }
            put(&mut pairs, "sort", join(sort));
        }

        put(&mut pairs, "countTotal", Some(bool_str(self.count_total)));
        put(&mut pairs, "pageSize", Some(self.page_size.to_string()));
        put(&mut pairs, "pageToken", self.page_token.clone());

        for (key, value) in &self.passthrough {
            pairs.retain(|(k, _)| k != key);
            pairs.push((key.clone(), value.clone()));
        }
        Ok(pairs)
    }
}

fn put(pairs: &mut Vec<(String, String)>, key: &str, value: Option<String>) {
    if let Some(v) = value {
        pairs.push((key.to_string(), v));
    }
}

fn join(values: &[String]) -> Option<String> {
    let kept: Vec<&str> = values.iter().map(|v| v.as_str()).filter(|v| !v.is_empty()).collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(","))
    }
}

fn bool_str(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

// ============================================================================
// PAGING
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Paging {
    pub first_page_size: u32,
    /// Falls back to `first_page_size`
    pub next_page_size: Option<u32>,
    /// `None` follows tokens until they run out
    pub max_pages: Option<usize>,
    pub include_total_on_first_page: bool,
}

impl Default for Paging {
    fn default() -> Self {
        Paging {
            first_page_size: 100,
            next_page_size: None,
            max_pages: None,
            include_total_on_first_page: true,
        }
    }
}

// ============================================================================
// SINGLE STUDY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyFormat {
    Json,
    FhirJson,
}

impl StudyFormat {
    pub fn name(&self) -> &str {
        match self {
            StudyFormat::Json => "json",
            StudyFormat::FhirJson => "fhir.json",
        }
    }

    pub fn parse(s: &str) -> ApiResult<Self> {
        match s {
            "json" => Ok(StudyFormat::Json),
            "fhir.json" => Ok(StudyFormat::FhirJson),
            _ => Err(ApiError::invalid("only 'json' and 'fhir.json' are supported")),
        }
    }
}

fn study_pairs(
    format: StudyFormat,
    markup_format: &str,
    fields: Option<&[String]>,
) -> ApiResult<Vec<(String, String)>> {
    let mut pairs = vec![("format".to_string(), format.name().to_string())];
    match format {
        StudyFormat::Json => {
            pairs.push(("markupFormat".to_string(), markup_format.to_string()));
            if let Some(fields) = fields {
                let joined = join(fields)
                    .ok_or_else(|| ApiError::invalid("`fields` must be a non-empty list when provided"))?;
                pairs.push(("fields".to_string(), joined));
            }
        }
        StudyFormat::FhirJson => {
            if fields.is_some() {
                return Err(ApiError::invalid("`fields` must be omitted when format is fhir.json"));
            }
        }
    }
    Ok(pairs)
}

// ============================================================================
// ENDPOINTS
// ============================================================================

impl ClinicalTrialsClient {
    /// One page of `GET /studies`
    pub async fn list_studies(&self, query: &StudyQuery) -> ApiResult<Value> {
        self.request_json("/studies", query.to_pairs()?).await
    }

    /// Follow `nextPageToken`; only the first page asks for `countTotal`
    pub async fn iterate_studies(&self, query: &StudyQuery, paging: &Paging) -> ApiResult<Vec<Value>> {
        let next_size = paging.next_page_size.unwrap_or(paging.first_page_size);
        let mut pages: Vec<Value> = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let first = pages.is_empty();
            let page_query = query
                .clone()
                .page_token(token.take())
                .page_size(if first { paging.first_page_size } else { next_size })
                .count_total(first && paging.include_total_on_first_page);
            let page = self.list_studies(&page_query).await?;
            token = page["nextPageToken"].as_str().map(String::from).filter(|t| !t.is_empty());
            debug!(
                "[clinical_trials] page {}: {} studies",
                pages.len() + 1,
                page["studies"].as_array().map_or(0, |s| s.len())
            );
            pages.push(page);

            if token.is_none() {
                break;
            }
            if paging.max_pages.is_some_and(|m| pages.len() >= m) {
                break;
            }
        }
        info!("[clinical_trials] fetched {} page(s)", pages.len());
        Ok(pages)
    }

    /// `GET /studies/{nctId}`
    pub async fn get_study(
        &self,
        nct_id: &str,
        format: StudyFormat,
        markup_format: &str,
        fields: Option<&[String]>,
    ) -> ApiResult<Value> {
        let nct_id = nct_id.trim();
        if nct_id.is_empty() {
            return Err(ApiError::invalid("NCT ID must not be empty"));
        }
        let pairs = study_pairs(format, markup_format, fields)?;
        self.request_json(&format!("/studies/{}", urlencoding::encode(nct_id)), pairs)
            .await
    }

    /// Data-model field definitions
    pub async fn metadata(&self, include_indexed_only: bool, include_historic_only: bool) -> ApiResult<Value> {
        let pairs = vec![
            ("includeIndexedOnly".to_string(), bool_str(include_indexed_only)),
            ("includeHistoricOnly".to_string(), bool_str(include_historic_only)),
        ];
        self.request_json("/studies/metadata", pairs).await
    }

    pub async fn search_areas(&self) -> ApiResult<Value> {
        self.request_json("/studies/search-areas", Vec::new()).await
    }

    pub async fn enums(&self) -> ApiResult<Value> {
        self.request_json("/studies/enums", Vec::new()).await
    }
}
