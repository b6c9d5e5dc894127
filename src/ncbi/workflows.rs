// Multi-call helpers built on the core E-utilities

use super::client::{EntrezClient, EutilsBody};
use super::endpoints::{EFetch, ELink, ESearch, ESummary};
use crate::error::ApiResult;
use log::{debug, info};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const FETCH_CHUNK: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Abstract {
    pub pmid: String,
    #[serde(rename = "abstract")]
    pub text: String,
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(o) => o.get("Id").or_else(|| o.get("id")).and_then(id_string),
        _ => None,
    }
}

/// `esearchresult.idlist` from a JSON ESearch body
pub fn esearch_ids(body: &EutilsBody) -> Vec<String> {
    body.as_json()
        .and_then(|v| v["esearchresult"]["idlist"].as_array())
        .map(|ids| ids.iter().filter_map(id_string).collect())
        .unwrap_or_default()
}

/// `{source uid: [linked uid, ...]}` from ELink JSON; links with no source ids land under `_`
pub fn normalize_linksets(value: &Value) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let linksets = value["linksets"].as_array().cloned().unwrap_or_default();

    for linkset in &linksets {
        let mut sources: Vec<String> = linkset["ids"]
            .as_array()
            .map(|ids| ids.iter().filter_map(id_string).collect())
            .unwrap_or_default();
        if sources.is_empty() {
            sources.push("_".to_string());
        }
        for src in &sources {
            out.entry(src.clone()).or_default();
        }
        let links: Vec<String> = linkset["linksetdbs"]
            .as_array()
            .into_iter()
            .flatten()
            .flat_map(|db| db["links"].as_array().cloned().unwrap_or_default())
            .filter_map(|l| id_string(&l))
            .collect();
        for src in &sources {
            out.entry(src.clone()).or_default().extend(links.iter().cloned());
        }
    }
    out
}

/// Split `efetch rettype=abstract retmode=text` output into records
pub fn split_abstract_blocks(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(String::from)
        .collect()
}

impl EntrezClient {
    /// All UIDs for `term`, paging `retstart` by `chunk` until exhausted or `limit`
    pub async fn paged_esearch_uids(
        &self,
        db: &str,
        term: &str,
        chunk: usize,
        limit: Option<usize>,
    ) -> ApiResult<Vec<String>> {
        let chunk = chunk.max(1);
        let mut out: Vec<String> = Vec::new();
        loop {
            let want = limit.map_or(chunk, |l| chunk.min(l.saturating_sub(out.len())));
            if want == 0 {
                break;
            }
            let req = ESearch::new(db, term).page(out.len() as u32, want as u32);
            let ids = esearch_ids(&self.esearch(&req).await?);
            let got = ids.len();
            debug!("[ncbi] esearch {}: {} ids at {}", db, got, out.len());
            out.extend(ids);
            if got < want {
                break;
            }
        }
        if let Some(l) = limit {
            out.truncate(l);
        }
        Ok(out)
    }

    /// PMIDs zipped with their plain-text abstracts
    pub async fn search_then_fetch_abstracts(&self, term: &str, db: &str, limit: usize) -> ApiResult<Vec<Abstract>> {
        let pmids = self.paged_esearch_uids(db, term, 1000, Some(limit)).await?;
        let mut out = Vec::with_capacity(pmids.len());
        for group in pmids.chunks(FETCH_CHUNK) {
            let body = self.efetch(&EFetch::new(db, group).text("abstract")).await?;
            let blocks = split_abstract_blocks(&body.render());
            for (i, pmid) in group.iter().enumerate() {
                out.push(Abstract {
                    pmid: pmid.clone(),
                    text: blocks.get(i).cloned().unwrap_or_default(),
                });
            }
        }
        info!("[ncbi] fetched {} abstracts for '{}'", out.len(), term);
        Ok(out)
    }

    pub async fn linked_uids(
        &self,
        dbfrom: &str,
        ids: &[String],
        db: Option<&str>,
        linkname: Option<&str>,
        cmd: Option<&str>,
    ) -> ApiResult<BTreeMap<String, Vec<String>>> {
        let mut req = ELink::new(dbfrom, ids);
        req.db = db.map(String::from);
        req.linkname = linkname.map(String::from);
        req.cmd = cmd.map(String::from);
        let body = self.elink(&req).await?;
        Ok(body.as_json().map(normalize_linksets).unwrap_or_default())
    }

    /// FASTA text per Gene ID via `gene_nuccore` links
    pub async fn download_fasta_for_gene_ids(&self, gene_ids: &[String]) -> ApiResult<BTreeMap<String, String>> {
        let mapping = self
            .linked_uids("gene", gene_ids, Some("nucleotide"), Some("gene_nuccore"), None)
            .await?;
        let mut out = BTreeMap::new();
        for (gene_id, nuccore_ids) in mapping {
            let mut fasta = String::new();
            for group in nuccore_ids.chunks(FETCH_CHUNK) {
                let body = self.efetch(&EFetch::new("nucleotide", group).text("fasta")).await?;
                fasta.push_str(&body.render());
            }
            out.insert(gene_id, fasta);
        }
        Ok(out)
    }

    /// ESearch, then ESummary over the hits in chunks
    pub async fn search_then_summary(&self, db: &str, term: &str, limit: u32) -> ApiResult<Value> {
        let search = self.esearch(&ESearch::new(db, term).page(0, limit)).await?;
        let ids = esearch_ids(&search);
        let mut summaries = Vec::new();
        for group in ids.chunks(FETCH_CHUNK) {
            let body = self.esummary(&ESummary::new(db, group)).await?;
            summaries.push(serde_json::to_value(&body).unwrap_or(Value::Null));
        }
        Ok(json!({
            "search": serde_json::to_value(&search).unwrap_or(Value::Null),
            "summaries": summaries,
        }))
    }
}
