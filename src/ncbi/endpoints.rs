// Core E-utilities

use super::client::{EntrezClient, EutilsBody};
use crate::error::{ApiError, ApiResult};
use crate::http::Params;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static WEBENV_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<WebEnv>\s*([^<]+?)\s*</WebEnv>").expect("valid WebEnv regex"));
static QUERY_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<QueryKey>\s*(\d+)\s*</QueryKey>").expect("valid QueryKey regex"));
static CORRECTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<CorrectedQuery>\s*([^<]*?)\s*</CorrectedQuery>").expect("valid CorrectedQuery regex")
});
static QUERY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<Query>\s*([^<]*?)\s*</Query>").expect("valid Query regex"));
static ERROR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<ERROR>\s*([^<]*?)\s*</ERROR>").expect("valid ERROR regex"));

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|c| c[1].to_string())
}

fn ids_param(ids: &[String]) -> Option<String> {
    let kept: Vec<&str> = ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(","))
    }
}

// ============================================================================
// REQUEST TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ESearch {
    pub db: String,
    pub term: String,
    pub retmax: u32,
    pub retstart: u32,
    pub usehistory: bool,
    pub sort: Option<String>,
    pub field: Option<String>,
    pub datetype: Option<String>,
    pub mindate: Option<String>,
    pub maxdate: Option<String>,
    pub webenv: Option<String>,
    pub query_key: Option<String>,
    /// `uilist` or `count`
    pub rettype: Option<String>,
    pub retmode: String,
    pub idtype: Option<String>,
    pub reldate: Option<u32>,
}

impl ESearch {
    pub fn new(db: &str, term: &str) -> Self {
        ESearch {
            db: db.to_string(),
            term: term.to_string(),
            retmax: 20,
            retstart: 0,
            usehistory: true,
            sort: None,
            field: None,
            datetype: None,
            mindate: None,
            maxdate: None,
            webenv: None,
            query_key: None,
            rettype: None,
            retmode: "json".to_string(),
            idtype: None,
            reldate: None,
        }
    }

    pub fn page(mut self, retstart: u32, retmax: u32) -> Self {
        self.retstart = retstart;
        self.retmax = retmax;
        self
    }

    pub fn params(&self) -> Params {
        Params::new()
            .set("db", &self.db)
            .set("term", &self.term)
            .set("retmax", self.retmax)
            .set("retstart", self.retstart)
            .put("usehistory", self.usehistory.then_some("y"))
            .put("sort", self.sort.as_ref())
            .put("field", self.field.as_ref())
            .put("datetype", self.datetype.as_ref())
            .put("mindate", self.mindate.as_ref())
            .put("maxdate", self.maxdate.as_ref())
            .put("WebEnv", self.webenv.as_ref())
            .put("query_key", self.query_key.as_ref())
            .put("rettype", self.rettype.as_ref())
            .set("retmode", &self.retmode)
            .put("idtype", self.idtype.as_ref())
            .put("reldate", self.reldate)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ESummary {
    pub db: String,
    pub ids: Vec<String>,
    pub webenv: Option<String>,
    pub query_key: Option<String>,
    pub retstart: u32,
    pub retmax: Option<u32>,
    pub retmode: String,
    pub version: Option<String>,
}

impl ESummary {
    pub fn new(db: &str, ids: &[String]) -> Self {
        ESummary {
            db: db.to_string(),
            ids: ids.to_vec(),
            webenv: None,
            query_key: None,
            retstart: 0,
            retmax: None,
            retmode: "json".to_string(),
            version: None,
        }
    }

    pub fn params(&self) -> Params {
        Params::new()
            .set("db", &self.db)
            .put("id", ids_param(&self.ids))
            .put("WebEnv", self.webenv.as_ref())
            .put("query_key", self.query_key.as_ref())
            .set("retstart", self.retstart)
            .put("retmax", self.retmax)
            .set("retmode", &self.retmode)
            .put("version", self.version.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EFetch {
    pub db: String,
    pub ids: Vec<String>,
    pub rettype: Option<String>,
    pub retmode: String,
    pub webenv: Option<String>,
    pub query_key: Option<String>,
    pub retstart: u32,
    pub retmax: Option<u32>,
    /// 1 (plus) or 2 (minus)
    pub strand: Option<u8>,
    pub seq_start: Option<u64>,
    pub seq_stop: Option<u64>,
    /// 0..=4
    pub complexity: Option<u8>,
}

impl EFetch {
    pub fn new(db: &str, ids: &[String]) -> Self {
        EFetch {
            db: db.to_string(),
            ids: ids.to_vec(),
            rettype: None,
            retmode: "xml".to_string(),
            webenv: None,
            query_key: None,
            retstart: 0,
            retmax: None,
            strand: None,
            seq_start: None,
            seq_stop: None,
            complexity: None,
        }
    }

    pub fn text(mut self, rettype: &str) -> Self {
        self.rettype = Some(rettype.to_string());
        self.retmode = "text".to_string();
        self
    }

    pub fn params(&self) -> ApiResult<Params> {
        if self.strand.is_some_and(|s| s != 1 && s != 2) {
            return Err(ApiError::invalid("strand must be 1 (plus) or 2 (minus)"));
        }
        if self.complexity.is_some_and(|c| c > 4) {
            return Err(ApiError::invalid("complexity must be in 0..=4"));
        }
        Ok(Params::new()
            .set("db", &self.db)
            .put("id", ids_param(&self.ids))
            .put("rettype", self.rettype.as_ref())
            .set("retmode", &self.retmode)
            .put("WebEnv", self.webenv.as_ref())
            .put("query_key", self.query_key.as_ref())
            .set("retstart", self.retstart)
            .put("retmax", self.retmax)
            .put("strand", self.strand)
            .put("seq_start", self.seq_start)
            .put("seq_stop", self.seq_stop)
            .put("complexity", self.complexity))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ELink {
    pub dbfrom: String,
    pub db: Option<String>,
    pub ids: Vec<String>,
    pub linkname: Option<String>,
    /// neighbor, neighbor_score, neighbor_history, acheck, ncheck, lcheck, llinks, llinkslib, prlinks
    pub cmd: Option<String>,
    pub webenv: Option<String>,
    pub query_key: Option<String>,
    pub term: Option<String>,
    pub holding: Option<String>,
    pub datetype: Option<String>,
    pub reldate: Option<u32>,
    pub mindate: Option<String>,
    pub maxdate: Option<String>,
    pub idtype: Option<String>,
    pub retmode: String,
}

impl ELink {
    pub fn new(dbfrom: &str, ids: &[String]) -> Self {
        ELink {
            dbfrom: dbfrom.to_string(),
            ids: ids.to_vec(),
            retmode: "json".to_string(),
            ..Default::default()
        }
    }

    pub fn params(&self) -> Params {
        Params::new()
            .set("dbfrom", &self.dbfrom)
            .put("db", self.db.as_ref())
            .put("id", ids_param(&self.ids))
            .put("linkname", self.linkname.as_ref())
            .put("cmd", self.cmd.as_ref())
            .put("WebEnv", self.webenv.as_ref())
            .put("query_key", self.query_key.as_ref())
            .put("term", self.term.as_ref())
            .put("holding", self.holding.as_ref())
            .put("datetype", self.datetype.as_ref())
            .put("reldate", self.reldate)
            .put("mindate", self.mindate.as_ref())
            .put("maxdate", self.maxdate.as_ref())
            .put("idtype", self.idtype.as_ref())
            .set("retmode", &self.retmode)
    }
}

// ============================================================================
// PARSED RESULTS
// ============================================================================

/// History-server handle returned by EPost
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostResult {
    #[serde(rename = "WebEnv")]
    pub web_env: String,
    #[serde(rename = "QueryKey")]
    pub query_key: String,
}

impl PostResult {
    pub fn parse(xml: &str) -> ApiResult<Self> {
        if let Some(err) = capture(&ERROR_RE, xml) {
            return Err(ApiError::Decode(format!("EPost error: {}", err)));
        }
        match (capture(&WEBENV_RE, xml), capture(&QUERY_KEY_RE, xml)) {
            (Some(web_env), Some(query_key)) => Ok(PostResult { web_env, query_key }),
            _ => Err(ApiError::Decode("EPost response lacks WebEnv/QueryKey".to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpellResult {
    pub query: String,
    /// Empty when ESpell has no suggestion
    pub corrected: String,
    pub raw: String,
}

impl SpellResult {
    pub fn parse(xml: &str) -> Self {
        SpellResult {
            query: capture(&QUERY_RE, xml).unwrap_or_default(),
            corrected: capture(&CORRECTED_RE, xml).unwrap_or_default(),
            raw: xml.to_string(),
        }
    }
}

// ============================================================================
// ENDPOINTS
// ============================================================================

impl EntrezClient {
    pub async fn esearch(&self, req: &ESearch) -> ApiResult<EutilsBody> {
        let resp = self.call("esearch.fcgi", req.params().into_pairs()).await?;
        Ok(EutilsBody::from_response(&resp, &req.retmode))
    }

    /// Long id lists go out as a POST form
    pub async fn esummary(&self, req: &ESummary) -> ApiResult<EutilsBody> {
        let pairs = req.params().into_pairs();
        let resp = if req.ids.len() > 200 {
            self.call_post("esummary.fcgi", pairs).await?
        } else {
            self.call("esummary.fcgi", pairs).await?
        };
        Ok(EutilsBody::from_response(&resp, &req.retmode))
    }

    pub async fn efetch(&self, req: &EFetch) -> ApiResult<EutilsBody> {
        let pairs = req.params()?.into_pairs();
        let resp = if req.ids.len() > 200 {
            self.call_post("efetch.fcgi", pairs).await?
        } else {
            self.call("efetch.fcgi", pairs).await?
        };
        Ok(EutilsBody::from_response(&resp, &req.retmode))
    }

    pub async fn elink(&self, req: &ELink) -> ApiResult<EutilsBody> {
        let resp = self.call("elink.fcgi", req.params().into_pairs()).await?;
        Ok(EutilsBody::from_response(&resp, &req.retmode))
    }

    /// Database list when `db` is None, field and link info otherwise
    pub async fn einfo(&self, db: Option<&str>, version: Option<&str>, retmode: &str) -> ApiResult<EutilsBody> {
        let params = Params::new().put("db", db).put("version", version).set("retmode", retmode);
        let resp = self.call("einfo.fcgi", params.into_pairs()).await?;
        Ok(EutilsBody::from_response(&resp, retmode))
    }

    /// Global query counts (XML only)
    pub async fn egquery(&self, term: &str) -> ApiResult<String> {
        let params = Params::new().set("term", term).set("retmode", "xml");
        let resp = self.call_absolute(&self.gquery_url(), params.into_pairs()).await?;
        Ok(resp.text())
    }

    pub async fn espell(&self, db: &str, term: &str) -> ApiResult<SpellResult> {
        let params = Params::new().set("db", db).set("term", term);
        let resp = self.call("espell.fcgi", params.into_pairs()).await?;
        Ok(SpellResult::parse(&resp.text()))
    }

    /// `bdata`: one `journal|year|volume|first_page|author|key|` citation per line
    pub async fn ecitmatch(&self, bdata: &str, retmode: &str) -> ApiResult<String> {
        let bdata = bdata.trim_end();
        if bdata.is_empty() {
            return Err(ApiError::invalid("ecitmatch needs at least one citation line"));
        }
        let params = Params::new().set("db", "pubmed").set("bdata", bdata).set("retmode", retmode);
        let resp = self.call("ecitmatch.cgi", params.into_pairs()).await?;
        Ok(resp.text())
    }

    pub async fn epost(&self, db: &str, ids: &[String]) -> ApiResult<PostResult> {
        let id = ids_param(ids).ok_or_else(|| ApiError::invalid("epost needs at least one id"))?;
        let params = Params::new().set("db", db).set("id", id);
        let resp = self.call_post("epost.fcgi", params.into_pairs()).await?;
        PostResult::parse(&resp.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_esearch_params() {
        let params = ESearch::new("pubmed", "asthma").page(40, 20).params();
        assert_eq!(params.get("usehistory"), Some("y"));
        assert_eq!(params.get("retstart"), Some("40"));
        assert_eq!(params.get("retmode"), Some("json"));
        assert_eq!(params.get("sort"), None);

        let mut req = ESearch::new("pubmed", "asthma");
        req.usehistory = false;
        assert_eq!(req.params().get("usehistory"), None);
    }

    #[test]
    fn test_efetch_validation() {
        let ids = vec!["1".to_string(), " ".to_string(), "2".to_string()];
        let mut req = EFetch::new("nucleotide", &ids).text("fasta");
        assert_eq!(req.params().unwrap().get("id"), Some("1,2"));
        assert_eq!(req.params().unwrap().get("retmode"), Some("text"));
        req.strand = Some(3);
        assert!(req.params().is_err());
        req.strand = Some(2);
        req.complexity = Some(5);
        assert!(req.params().is_err());
    }

    #[test]
    fn test_epost_parse() {
        let xml = "<?xml version=\"1.0\"?>\n<ePostResult>\n\t<QueryKey>1</QueryKey>\n\t<WebEnv>MCID_abc</WebEnv>\n</ePostResult>";
        let res = PostResult::parse(xml).unwrap();
        assert_eq!(res.web_env, "MCID_abc");
        assert_eq!(res.query_key, "1");

        assert!(PostResult::parse("<ePostResult><ERROR>bad id</ERROR></ePostResult>").is_err());
        assert!(PostResult::parse("<ePostResult/>").is_err());
    }

    #[test]
    fn test_espell_parse() {
        let xml = "<eSpellResult><Database>pubmed</Database><Query>asthmaa</Query>\
                   <CorrectedQuery>asthma</CorrectedQuery></eSpellResult>";
        let res = SpellResult::parse(xml);
        assert_eq!(res.query, "asthmaa");
        assert_eq!(res.corrected, "asthma");

        let none = SpellResult::parse("<eSpellResult><Query>ok</Query><CorrectedQuery></CorrectedQuery></eSpellResult>");
        assert_eq!(none.corrected, "");
    }
}
