// Convenience wrappers over common PUG-REST operations

use super::client::{PubChemClient, PugRequest};
use crate::error::{ApiError, ApiResult};
use crate::http::HttpResponse;

/// CID lists longer than this go in a POST body
const POST_THRESHOLD_CHARS: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastSearch {
    Identity,
    Similarity2d,
    Similarity3d,
    Substructure,
    Superstructure,
    Formula,
}

impl FastSearch {
    pub fn name(&self) -> &'static str {
        match self {
            FastSearch::Identity => "fastidentity",
            FastSearch::Similarity2d => "fastsimilarity_2d",
            FastSearch::Similarity3d => "fastsimilarity_3d",
            FastSearch::Substructure => "fastsubstructure",
            FastSearch::Superstructure => "fastsuperstructure",
            FastSearch::Formula => "fastformula",
        }
    }

    pub fn parse(s: &str) -> ApiResult<Self> {
        match s {
            "fastidentity" => Ok(FastSearch::Identity),
            "fastsimilarity_2d" => Ok(FastSearch::Similarity2d),
            "fastsimilarity_3d" => Ok(FastSearch::Similarity3d),
            "fastsubstructure" => Ok(FastSearch::Substructure),
            "fastsuperstructure" => Ok(FastSearch::Superstructure),
            "fastformula" => Ok(FastSearch::Formula),
            other => Err(ApiError::invalid(format!("unknown fast search '{}'", other))),
        }
    }
}

/// Input path for a fast search; `fastformula` takes no namespace
pub fn fast_search_input(kind: FastSearch, namespace: &str, query: &str, return_kind: &str) -> String {
    match kind {
        FastSearch::Formula => format!("compound/{}/{}/{}", kind.name(), query, return_kind),
        _ => format!("compound/{}/{}/{}/{}", kind.name(), namespace, query, return_kind),
    }
}

impl PubChemClient {
    /// Full compound record(s): `compound/cid/<cids>/<output>`
    pub async fn get_compound_record(
        &self,
        cids: &str,
        output: &str,
        record_type: Option<&str>,
        image_size: Option<&str>,
    ) -> ApiResult<HttpResponse> {
        let mut req = PugRequest::new(&format!("compound/cid/{}", cids)).output(Some(output));
        if let Some(rt) = record_type {
            req = req.option("record_type", rt);
        }
        if let Some(size) = image_size {
            req = req.option("image_size", size);
        }
        self.request(&req, true).await
    }

    /// Property table; CIDs move to a `cid=` form body when `use_post` is set or the list is long
    pub async fn get_compound_properties(
        &self,
        cids: &str,
        properties: &str,
        output: &str,
        use_post: bool,
    ) -> ApiResult<HttpResponse> {
        let req = if use_post || cids.len() > POST_THRESHOLD_CHARS {
            PugRequest::new(&format!("compound/cid/property/{}", properties))
                .output(Some(output))
                .post(vec![("cid".to_string(), cids.to_string())])
        } else {
            PugRequest::new(&format!("compound/cid/{}/property/{}", cids, properties)).output(Some(output))
        };
        self.request(&req, true).await
    }

    /// `{domain}/{namespace}/{id}/synonyms`
    pub async fn get_synonyms(&self, domain: &str, namespace: &str, identifier: &str) -> ApiResult<HttpResponse> {
        let req = PugRequest::new(&format!("{}/{}/{}/synonyms", domain, namespace, identifier));
        self.request(&req, true).await
    }

    /// Identifier conversion, `target` is one of sids | cids | aids
    pub async fn get_ids(
        &self,
        domain: &str,
        namespace: &str,
        identifiers: &str,
        target: &str,
        options: Vec<(String, String)>,
    ) -> ApiResult<HttpResponse> {
        if !matches!(target, "sids" | "cids" | "aids") {
            return Err(ApiError::invalid(format!("id type must be sids, cids or aids, got '{}'", target)));
        }
        let req = PugRequest::new(&format!("{}/{}/{}/{}", domain, namespace, identifiers, target)).options(options);
        self.request(&req, true).await
    }

    pub async fn get_assaysummary(
        &self,
        domain: &str,
        namespace: &str,
        identifiers: &str,
        output: &str,
    ) -> ApiResult<HttpResponse> {
        let req = PugRequest::new(&format!("{}/{}/{}/assaysummary", domain, namespace, identifiers))
            .output(Some(output));
        self.request(&req, true).await
    }

    /// Synchronous structure or formula search
    pub async fn fast_search(
        &self,
        kind: FastSearch,
        namespace: &str,
        query: &str,
        output: &str,
        options: Vec<(String, String)>,
    ) -> ApiResult<HttpResponse> {
        let req = PugRequest::new(&fast_search_input(kind, namespace, query, "cids"))
            .output(Some(output))
            .options(options);
        self.request(&req, true).await
    }

    /// CIDs for a compound name (empty when PubChem has none)
    pub async fn cids_for_name(&self, name: &str) -> ApiResult<Vec<u64>> {
        let req = PugRequest::new(&format!("compound/name/{}/cids", name));
        let resp = self.request(&req, false).await?;
        if resp.status == 404 {
            return Ok(Vec::new());
        }
        if !resp.is_success() {
            return Err(super::client::pug_rest_error(resp));
        }
        let value = resp.json_opt().unwrap_or_default();
        Ok(value["IdentifierList"]["CID"]
            .as_array()
            .map(|ids| ids.iter().filter_map(|v| v.as_u64()).collect())
            .unwrap_or_default())
    }

    /// First `limit` synonyms of a CID
    pub async fn synonyms_for_cid(&self, cid: u64, limit: usize) -> ApiResult<Vec<String>> {
        let resp = self.get_synonyms("compound", "cid", &cid.to_string()).await?;
        let value = resp.json_opt().unwrap_or_default();
        Ok(value["InformationList"]["Information"][0]["Synonym"]
            .as_array()
            .map(|s| s.iter().filter_map(|v| v.as_str()).take(limit).map(String::from).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_search_input() {
        assert_eq!(
            fast_search_input(FastSearch::Formula, "smiles", "C10H21N", "cids"),
            "compound/fastformula/C10H21N/cids"
        );
        assert_eq!(
            fast_search_input(FastSearch::Similarity2d, "cid", "2244", "cids"),
            "compound/fastsimilarity_2d/cid/2244/cids"
        );
    }

    #[test]
    fn test_fast_search_parse_roundtrip_names() {
        for kind in [FastSearch::Identity, FastSearch::Substructure, FastSearch::Formula] {
            assert_eq!(FastSearch::parse(kind.name()).unwrap(), kind);
        }
        assert!(FastSearch::parse("slowsearch").is_err());
    }
}
