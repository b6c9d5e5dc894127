// Query builders shared by the SEER categories

use crate::http::Params;

/// Maximum `count` accepted by changelog endpoints
pub const CHANGELOG_MAX_COUNT: u32 = 10;

/// Search parameters for the disease, glossary and rx list endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub q: Option<String>,
    pub status: Vec<String>,
    pub assigned_to: Option<String>,
    /// `type`: SOLID_TUMOR/HEMATO/NON_NEOPLASTIC for disease, DRUG/REGIMEN for rx
    pub kind: Option<String>,
    /// `site_category` for disease, `category` elsewhere
    pub categories: Vec<String>,
    pub modified_from: Option<String>,
    pub modified_to: Option<String>,
    pub published_from: Option<String>,
    pub published_to: Option<String>,
    pub been_published: Option<bool>,
    pub hidden: Option<bool>,
    pub mode: Option<String>,
    pub count: Option<u32>,
    pub offset: Option<u32>,
    pub order: Option<String>,
    pub output_type: Option<String>,
    pub glossary: Option<bool>,
    /// rx only: YES, NO or SEE_REMARKS
    pub do_not_code: Option<String>,
    pub passthrough: Vec<(String, String)>,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            q: None,
            status: Vec::new(),
            assigned_to: None,
            kind: None,
            categories: Vec::new(),
            modified_from: None,
            modified_to: None,
            published_from: None,
            published_to: None,
            been_published: None,
            hidden: None,
            mode: None,
            count: Some(25),
            offset: Some(0),
            order: None,
            output_type: None,
            glossary: None,
            do_not_code: None,
            passthrough: Vec::new(),
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn q(mut self, q: Option<&str>) -> Self {
        self.q = q.map(String::from);
        self
    }

    pub fn kind(mut self, kind: Option<&str>) -> Self {
        self.kind = kind.map(String::from);
        self
    }

    pub fn categories(mut self, categories: &[String]) -> Self {
        self.categories = categories.to_vec();
        self
    }

    pub fn page(mut self, count: u32, offset: u32) -> Self {
        self.count = Some(count);
        self.offset = Some(offset);
        self
    }

    pub fn order(mut self, order: Option<&str>) -> Self {
        self.order = order.map(String::from);
        self
    }

    pub fn params(&self, category_key: &str) -> Params {
        Params::new()
            .put("q", self.q.as_ref())
            .put("assigned_to", self.assigned_to.as_ref())
            .put("type", self.kind.as_ref())
            .put("modified_from", self.modified_from.as_ref())
            .put("modified_to", self.modified_to.as_ref())
            .put("published_from", self.published_from.as_ref())
            .put("published_to", self.published_to.as_ref())
            .put_bool("been_published", self.been_published)
            .put_bool("hidden", self.hidden)
            .put("mode", self.mode.as_ref())
            .put_list("status", &self.status)
            .put_list(category_key, &self.categories)
            .put("count", self.count)
            .put("offset", self.offset)
            .put("order", self.order.as_ref())
            .put("output_type", self.output_type.as_ref())
            .put_bool("glossary", self.glossary)
            .put("do_not_code", self.do_not_code.as_ref())
            .merge(&self.passthrough)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangelogQuery {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    /// Capped at `CHANGELOG_MAX_COUNT`
    pub count: Option<u32>,
    pub offset: Option<u32>,
    pub id: Option<String>,
    pub order: Option<String>,
}

impl ChangelogQuery {
    pub fn params(&self) -> Params {
        Params::new()
            .put("from", self.from_date.as_ref())
            .put("to", self.to_date.as_ref())
            .put("count", self.count.map(|c| c.min(CHANGELOG_MAX_COUNT)))
            .put("offset", self.offset)
            .put("id", self.id.as_ref())
            .put("order", self.order.as_ref())
    }
}

/// NDC and HCPCS searches
#[derive(Debug, Clone, PartialEq)]
pub struct CodeSearch {
    pub q: Option<String>,
    pub categories: Vec<String>,
    /// NDC only
    pub has_seer_info: Option<bool>,
    /// NDC only
    pub include_removed: Option<bool>,
    pub page: u32,
    pub per_page: u32,
    pub order: Option<String>,
    pub added_since: Option<String>,
    pub modified_since: Option<String>,
    /// NDC only
    pub removed_since: Option<String>,
}

impl Default for CodeSearch {
    fn default() -> Self {
        CodeSearch {
            q: None,
            categories: Vec::new(),
            has_seer_info: None,
            include_removed: None,
            page: 1,
            per_page: 25,
            order: None,
            added_since: None,
            modified_since: None,
            removed_since: None,
        }
    }
}

impl CodeSearch {
    pub fn params(&self) -> Params {
        Params::new()
            .put("q", self.q.as_ref())
            .put_bool("has_seer_info", self.has_seer_info)
            .put_list("category", &self.categories)
            .put_bool("include_removed", self.include_removed)
            .set("page", self.page)
            .set("per_page", self.per_page)
            .put("order", self.order.as_ref())
            .put("added_since", self.added_since.as_ref())
            .put("modified_since", self.modified_since.as_ref())
            .put("removed_since", self.removed_since.as_ref())
    }
}

/// Paging for staging history endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub page: u32,
    pub per_page: u32,
    pub order: Option<String>,
}

impl Default for HistoryPage {
    fn default() -> Self {
        HistoryPage {
            page: 1,
            per_page: 25,
            order: None,
        }
    }
}

impl HistoryPage {
    pub fn params(&self) -> Params {
        Params::new()
            .set("page", self.page)
            .set("per_page", self.per_page)
            .put("order", self.order.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let params = ListQuery::new().params("site_category");
        assert_eq!(params.get("count"), Some("25"));
        assert_eq!(params.get("offset"), Some("0"));
        assert_eq!(params.get("type"), None);
    }

    #[test]
    fn test_list_query_lists_bools_and_passthrough() {
        let mut query = ListQuery::new()
            .q(Some("lymphoma"))
            .kind(Some("HEMATO"))
            .categories(&["lung".to_string(), "breast".to_string()]);
        query.status = vec!["PUBLISHED".into(), "".into()];
        query.hidden = Some(false);
        query.passthrough = vec![("count".into(), "5".into())];
        let params = query.params("site_category");
        assert_eq!(params.get("site_category"), Some("lung,breast"));
        assert_eq!(params.get("status"), Some("PUBLISHED"));
        assert_eq!(params.get("hidden"), Some("false"));
        assert_eq!(params.get("count"), Some("5"));
        assert_eq!(params.clone().into_pairs().iter().filter(|(k, _)| k == "count").count(), 1);
    }

    #[test]
    fn test_changelog_count_capped() {
        let q = ChangelogQuery {
            count: Some(50),
            ..Default::default()
        };
        assert_eq!(q.params().get("count"), Some("10"));
        assert!(ChangelogQuery::default().params().is_empty());
    }

    #[test]
    fn test_code_search_defaults() {
        let params = CodeSearch::default().params();
        assert_eq!(params.get("page"), Some("1"));
        assert_eq!(params.get("per_page"), Some("25"));
        assert_eq!(params.get("has_seer_info"), None);
    }
}
