// Category endpoints

use super::client::SeerClient;
use super::query::{ChangelogQuery, CodeSearch, HistoryPage, ListQuery};
use crate::error::{ApiError, ApiResult};
use crate::http::Params;
use serde_json::{json, Value};

fn seg(value: &str) -> String {
    urlencoding::encode(value.trim()).into_owned()
}

// ============================================================================
// DISEASE
// ============================================================================

impl SeerClient {
    /// `type` defaults to HEMATO when the query leaves it unset
    pub async fn list_diseases(&self, version: &str, query: &ListQuery) -> ApiResult<Value> {
        let mut query = query.clone();
        if query.kind.is_none() {
            query.kind = Some("HEMATO".to_string());
        }
        self.get("disease", &seg(version), query.params("site_category")).await
    }

    pub async fn get_disease_by_id(&self, version: &str, id: &str, glossary: Option<bool>) -> ApiResult<Value> {
        let endpoint = format!("{}/id/{}", seg(version), seg(id));
        self.get("disease", &endpoint, Params::new().put_bool("glossary", glossary)).await
    }

    /// Disease as of a diagnosis year
    pub async fn get_disease_by_id_year(&self, version: &str, id: &str, year: &str) -> ApiResult<Value> {
        let endpoint = format!("{}/id/{}/{}", seg(version), seg(id), seg(year));
        self.get("disease", &endpoint, Params::new()).await
    }

    pub async fn list_disease_changelog(&self, version: &str, query: &ChangelogQuery) -> ApiResult<Value> {
        self.get("disease", &format!("{}/changelog", seg(version)), query.params()).await
    }

    pub async fn list_disease_keywords(&self, version: &str, q: Option<&str>, count: Option<u32>) -> ApiResult<Value> {
        let params = Params::new().put("q", q).put("count", count);
        self.get("disease", &format!("{}/keywords", seg(version)), params).await
    }

    pub async fn list_disease_status_summary(&self, version: &str) -> ApiResult<Value> {
        self.get("disease", &format!("{}/status_summary", seg(version)), Params::new()).await
    }

    /// Whether two ICD-O-3 morphologies (with diagnosis years) are the same primary
    pub async fn is_same_disease(&self, version: &str, d1: &str, year1: &str, d2: &str, year2: &str) -> ApiResult<Value> {
        let params = Params::new()
            .set("d1", d1)
            .set("year1", year1)
            .set("d2", d2)
            .set("year2", year2);
        self.get("disease", &format!("{}/same_primary", seg(version)), params).await
    }

    pub async fn list_disease_primary_sites(&self) -> ApiResult<Value> {
        self.get("disease", "primary_site", Params::new()).await
    }

    pub async fn get_disease_primary_site(&self, code: &str) -> ApiResult<Value> {
        self.get("disease", &format!("primary_site/{}", seg(code)), Params::new()).await
    }

    /// Solid tumor site categories for the search API
    pub async fn list_disease_site_categories(&self) -> ApiResult<Value> {
        self.get("disease", "site_categories", Params::new()).await
    }

    pub async fn list_disease_versions(&self) -> ApiResult<Value> {
        self.get("disease", "versions", Params::new()).await
    }
}

// ============================================================================
// GLOSSARY
// ============================================================================

impl SeerClient {
    pub async fn list_glossary(&self, version: &str, query: &ListQuery) -> ApiResult<Value> {
        self.get("glossary", &seg(version), query.params("category")).await
    }

    pub async fn get_glossary_by_id(&self, version: &str, id: &str, glossary: Option<bool>) -> ApiResult<Value> {
        let endpoint = format!("{}/id/{}", seg(version), seg(id));
        self.get("glossary", &endpoint, Params::new().put_bool("glossary", glossary)).await
    }

    pub async fn list_glossary_changelog(&self, version: &str, query: &ChangelogQuery) -> ApiResult<Value> {
        self.get("glossary", &format!("{}/changelog", seg(version)), query.params()).await
    }

    pub async fn list_glossary_keywords(&self, version: &str, q: Option<&str>, count: Option<u32>) -> ApiResult<Value> {
        let params = Params::new().put("q", q).put("count", count);
        self.get("glossary", &format!("{}/keywords", seg(version)), params).await
    }

    pub async fn list_glossary_versions(&self) -> ApiResult<Value> {
        self.get("glossary", "versions", Params::new()).await
    }
}

// ============================================================================
// RX
// ============================================================================

impl SeerClient {
    pub async fn list_rx(&self, version: &str, query: &ListQuery) -> ApiResult<Value> {
        self.get("rx", &seg(version), query.params("category")).await
    }

    pub async fn get_rx_by_id(&self, version: &str, id: &str, glossary: Option<bool>) -> ApiResult<Value> {
        let endpoint = format!("{}/id/{}", seg(version), seg(id));
        self.get("rx", &endpoint, Params::new().put_bool("glossary", glossary)).await
    }

    /// Regimens containing a drug
    pub async fn list_rx_regimens(&self, version: &str, id: &str) -> ApiResult<Value> {
        let endpoint = format!("{}/id/{}/regimens", seg(version), seg(id));
        self.get("rx", &endpoint, Params::new()).await
    }

    pub async fn list_rx_changelog(&self, version: &str, query: &ChangelogQuery) -> ApiResult<Value> {
        self.get("rx", &format!("{}/changelog", seg(version)), query.params()).await
    }

    pub async fn list_rx_keywords(&self, version: &str, q: Option<&str>, count: Option<u32>) -> ApiResult<Value> {
        let params = Params::new().put("q", q).put("count", count);
        self.get("rx", &format!("{}/keywords", seg(version)), params).await
    }

    pub async fn list_rx_versions(&self) -> ApiResult<Value> {
        self.get("rx", "versions", Params::new()).await
    }
}

// ============================================================================
// NDC + HCPCS
// ============================================================================

impl SeerClient {
    pub async fn search_ndc(&self, search: &CodeSearch) -> ApiResult<Value> {
        self.get("ndc", "", search.params()).await
    }

    pub async fn get_ndc(&self, code: &str) -> ApiResult<Value> {
        self.get("ndc", &format!("code/{}", seg(code)), Params::new()).await
    }

    pub async fn search_hcpcs(&self, search: &CodeSearch) -> ApiResult<Value> {
        let params = Params::new()
            .put("q", search.q.as_ref())
            .put_list("category", &search.categories)
            .set("page", search.page)
            .set("per_page", search.per_page)
            .put("order", search.order.as_ref())
            .put("added_since", search.added_since.as_ref())
            .put("modified_since", search.modified_since.as_ref());
        self.get("hcpcs", "", params).await
    }

    pub async fn get_hcpcs(&self, code: &str) -> ApiResult<Value> {
        self.get("hcpcs", &format!("code/{}", seg(code)), Params::new()).await
    }
}

// ============================================================================
// NAACCR
// ============================================================================

impl SeerClient {
    pub async fn list_naaccr_items(
        &self,
        version: &str,
        version_implemented: Option<&str>,
        q: Option<&str>,
        count: Option<u32>,
    ) -> ApiResult<Value> {
        let params = Params::new()
            .put("version_implemented", version_implemented)
            .put("q", q)
            .put("count", count);
        self.get("naaccr", &seg(version), params).await
    }

    pub async fn get_naaccr_item(&self, version: &str, id: &str) -> ApiResult<Value> {
        self.get("naaccr", &format!("{}/{}", seg(version), seg(id)), Params::new()).await
    }

    pub async fn list_naaccr_versions(&self) -> ApiResult<Value> {
        self.get("naaccr", "versions", Params::new()).await
    }
}

// ============================================================================
// STAGING
// ============================================================================

impl SeerClient {
    pub async fn list_staging_algorithms(&self) -> ApiResult<Value> {
        self.get("staging", "algorithms", Params::new()).await
    }

    pub async fn list_staging_versions(&self, algorithm: &str) -> ApiResult<Value> {
        self.get("staging", &format!("{}/versions", seg(algorithm)), Params::new()).await
    }

    pub async fn list_staging_schemas(&self, algorithm: &str, version: &str, q: Option<&str>) -> ApiResult<Value> {
        let endpoint = format!("{}/{}/schemas", seg(algorithm), seg(version));
        self.get("staging", &endpoint, Params::new().put("q", q)).await
    }

    pub async fn get_staging_schema(&self, algorithm: &str, version: &str, id: &str) -> ApiResult<Value> {
        let endpoint = format!("{}/{}/schema/{}", seg(algorithm), seg(version), seg(id));
        self.get("staging", &endpoint, Params::new()).await
    }

    pub async fn list_staging_schema_tables(&self, algorithm: &str, version: &str, id: &str) -> ApiResult<Value> {
        let endpoint = format!("{}/{}/schema/{}/tables", seg(algorithm), seg(version), seg(id));
        self.get("staging", &endpoint, Params::new()).await
    }

    pub async fn get_staging_schema_history(
        &self,
        algorithm: &str,
        version: &str,
        id: &str,
        page: &HistoryPage,
    ) -> ApiResult<Value> {
        let endpoint = format!("{}/{}/schema/{}/history", seg(algorithm), seg(version), seg(id));
        self.get("staging", &endpoint, page.params()).await
    }

    pub async fn list_staging_tables(
        &self,
        algorithm: &str,
        version: &str,
        q: Option<&str>,
        unused: Option<bool>,
    ) -> ApiResult<Value> {
        let endpoint = format!("{}/{}/tables", seg(algorithm), seg(version));
        self.get("staging", &endpoint, Params::new().put("q", q).put_bool("unused", unused))
            .await
    }

    pub async fn get_staging_table(&self, algorithm: &str, version: &str, id: &str) -> ApiResult<Value> {
        let endpoint = format!("{}/{}/table/{}", seg(algorithm), seg(version), seg(id));
        self.get("staging", &endpoint, Params::new()).await
    }

    /// Glossary hits for a schema (`kind` = "schema") or a table (`kind` = "table")
    pub async fn get_staging_glossary(
        &self,
        algorithm: &str,
        version: &str,
        kind: &str,
        id: &str,
        categories: &[String],
        whole_words_only: bool,
    ) -> ApiResult<Value> {
        if kind != "schema" && kind != "table" {
            return Err(ApiError::invalid("staging glossary kind must be 'schema' or 'table'"));
        }
        let endpoint = format!("{}/{}/{}/{}/glossary", seg(algorithm), seg(version), kind, seg(id));
        let params = Params::new()
            .put_list("category", categories)
            .put_bool("wholeWordsOnly", Some(whole_words_only));
        self.get("staging", &endpoint, params).await
    }
}

// ============================================================================
// SURGERY, MPH, RECODE
// ============================================================================

impl SeerClient {
    pub async fn list_surgery_versions(&self) -> ApiResult<Value> {
        self.get("surgery", "versions", Params::new()).await
    }

    pub async fn list_surgery_tables(&self, year: &str) -> ApiResult<Value> {
        self.get("surgery", &format!("{}/tables", seg(year)), Params::new()).await
    }

    /// Needs either `title` or both `site` and `hist`
    pub async fn get_surgery_table(
        &self,
        year: &str,
        title: Option<&str>,
        site: Option<&str>,
        hist: Option<&str>,
    ) -> ApiResult<Value> {
        if title.is_none() && (site.is_none() || hist.is_none()) {
            return Err(ApiError::invalid("Either `title` or both `site` and `hist` must be provided."));
        }
        let params = Params::new().put("title", title).put("site", site).put("hist", hist);
        self.get("surgery", &format!("{}/table", seg(year)), params).await
    }

    pub async fn list_mph_groups(&self) -> ApiResult<Value> {
        self.get("mph", "groups", Params::new()).await
    }

    pub async fn get_mph_group(&self, id: &str) -> ApiResult<Value> {
        self.get("mph", &format!("group/{}", seg(id)), Params::new()).await
    }

    pub async fn list_sitegroup_algorithms(&self) -> ApiResult<Value> {
        self.get("recode", "sitegroup/algorithms", Params::new()).await
    }

    /// Site group for site/histology/behavior under `seer`, `iccc` or `aya`
    pub async fn get_site_group(&self, algorithm: &str, site: &str, hist: &str, behavior: Option<&str>) -> ApiResult<Value> {
        let params = Params::new().set("site", site).set("hist", hist).put("behavior", behavior);
        self.get("recode", &format!("sitegroup/{}", seg(algorithm)), params).await
    }

    /// Versions and algorithms across the main categories
    pub async fn versions_overview(&self) -> ApiResult<Value> {
        Ok(json!({
            "glossary_versions": self.list_glossary_versions().await?,
            "disease_versions": self.list_disease_versions().await?,
            "rx_versions": self.list_rx_versions().await?,
            "staging_algorithms": self.list_staging_algorithms().await?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seer::SeerConfig;

    fn offline() -> SeerClient {
        SeerClient::new(SeerConfig::default().with_api_key("k").with_base_url("http://127.0.0.1:9")).unwrap()
    }

    #[test]
    fn test_seg_encodes() {
        assert_eq!(seg(" 8000/3 "), "8000%2F3");
        assert_eq!(seg("latest"), "latest");
    }

    #[tokio::test]
    async fn test_surgery_table_needs_title_or_site_hist() {
        let err = offline().get_surgery_table("2023", None, Some("C50"), None).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_staging_glossary_kind_checked() {
        let err = offline()
            .get_staging_glossary("cs", "02.05.50", "chart", "x", &[], true)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }
}
