// Company intelligence: drugs, trials, populations, patents, substances, competitors

use crate::clinical_trials::{ClinicalTrialsClient, Paging, StudyQuery};
use crate::error::ApiResult;
use crate::naaccr::NaaccrClient;
use crate::openfda::OpenFdaClient;
use crate::pubchem::PubChemClient;
use crate::uspto::{MethodStrategy, SearchRequest, UsptoClient};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

pub const TRIAL_FIELDS: [&str; 7] = [
    "NCTId",
    "BriefTitle",
    "Phase",
    "OverallStatus",
    "Condition",
    "InterventionName",
    "LeadSponsorName",
];

pub const ONCOLOGY_TERMS: [&str; 4] = ["cancer", "carcinoma", "lymphoma", "leukemia"];

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugRecord {
    pub brand_name: Option<String>,
    pub active_ingredient: Option<String>,
    pub application: Option<String>,
    /// YYYY-MM-DD
    pub approval_date: Option<String>,
    pub indications: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub nct_id: String,
    pub title: String,
    pub phase: Option<String>,
    pub status: Option<String>,
    pub conditions: Vec<String>,
    pub interventions: Vec<String>,
    pub sponsor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatentRecord {
    pub number: String,
    pub title: String,
    pub filing_date: Option<String>,
    pub issue_date: Option<String>,
    pub ipc: Vec<String>,
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub disease: String,
    pub region: String,
    /// The NAACCR dictionary carries item metadata, not counts
    pub incidence_per_year: Option<u64>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubstanceRecord {
    pub name: String,
    pub cid: Option<u64>,
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyIntel {
    pub company: String,
    pub drugs_approved: Vec<DrugRecord>,
    pub in_trials: Vec<TrialRecord>,
    pub populations: Vec<PopulationRecord>,
    pub patents: Vec<PatentRecord>,
    pub substances: Vec<SubstanceRecord>,
    pub competitors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl CompanyIntel {
    pub fn new(company: &str) -> Self {
        CompanyIntel {
            company: company.to_string(),
            ..Default::default()
        }
    }

    /// `generated_at` as `YYYY-MM-DD HH:MM UTC`, empty when unset
    pub fn generated_label(&self) -> String {
        self.generated_at
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_default()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} drugs, {} trials, {} populations, {} patents, {} substances, {} competitors",
            self.company,
            self.drugs_approved.len(),
            self.in_trials.len(),
            self.populations.len(),
            self.patents.len(),
            self.substances.len(),
            self.competitors.len()
        )
    }
}

// ============================================================================
// SOURCES
// ============================================================================

/// Clients used by `build_company_intel`; a `None` source yields an empty section
#[derive(Debug, Default)]
pub struct IntelSources {
    pub openfda: Option<OpenFdaClient>,
    pub trials: Option<ClinicalTrialsClient>,
    pub naaccr: Option<NaaccrClient>,
    pub uspto: Option<UsptoClient>,
    pub pubchem: Option<PubChemClient>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntelOptions {
    pub trial_limit: usize,
    pub max_drugs: usize,
    pub patent_limit: u32,
    pub naaccr_version: String,
    pub region: String,
    pub synonym_limit: usize,
}

impl Default for IntelOptions {
    fn default() -> Self {
        IntelOptions {
            trial_limit: 50,
            max_drugs: 100,
            patent_limit: 50,
            naaccr_version: "22".to_string(),
            region: "US".to_string(),
            synonym_limit: 5,
        }
    }
}

impl IntelOptions {
    pub fn with_trial_limit(mut self, limit: usize) -> Self {
        self.trial_limit = limit;
        self
    }
}

// ============================================================================
// ORCHESTRATION
// ============================================================================

pub async fn build_company_intel(company: &str, sources: &IntelSources, options: &IntelOptions) -> CompanyIntel {
    let mut intel = CompanyIntel::new(company);

    if let Some(client) = &sources.openfda {
        intel.drugs_approved = degrade("openFDA drugs", drug_approvals(client, company, options.max_drugs).await);
    }
    if let Some(client) = &sources.trials {
        intel.in_trials = degrade(
            "ClinicalTrials.gov",
            search_trials(client, company, &intel.drugs_approved, options.trial_limit).await,
        );
    }
    if let Some(client) = &sources.naaccr {
        for indication in infer_indications(&intel.drugs_approved) {
            if is_oncology(&indication) {
                intel
                    .populations
                    .push(estimate_population(client, &indication, options).await);
            }
        }
    }
    if let Some(client) = &sources.uspto {
        intel.patents = degrade(
            "USPTO",
            patents_by_applicant(client, company, options.patent_limit).await,
        );
    }
    if let Some(client) = &sources.pubchem {
        intel.substances = degrade(
            "PubChem",
            lookup_substances(client, &intel.drugs_approved, options.synonym_limit).await,
        );
    }
    intel.competitors = infer_competitors(&intel.in_trials, company);
    intel.generated_at = Some(Utc::now());
    info!("[intel] {}", intel.summary());
    intel
}

fn degrade<T>(source: &str, result: ApiResult<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!("[intel] {} unavailable: {}", source, e);
        Vec::new()
    })
}

// ------------------------------------------------------------------------
// Drugs (openFDA)
// ------------------------------------------------------------------------

async fn drug_approvals(client: &OpenFdaClient, sponsor: &str, max_records: usize) -> ApiResult<Vec<DrugRecord>> {
    let applications = client.search_drugsfda_by_sponsor(sponsor, max_records).await?;
    let mut drugs = Vec::with_capacity(applications.len());
    for app in &applications {
        let mut drug = drug_from_application(app);
        if let Some(number) = drug.application.clone() {
            match client.search_labels_by_application_number(&number, 1).await {
                Ok(labels) => drug.indications = labels.first().and_then(label_indication).into_iter().collect(),
                Err(e) => warn!("[intel] no label for {}: {}", number, e),
            }
        }
        drugs.push(drug);
    }
    Ok(drugs)
}

/// `YYYYMMDD` or `YYYY-MM-DD` to `YYYY-MM-DD`
pub fn normalize_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    let b = s.as_bytes();
    if b.len() == 8 && b.iter().all(u8::is_ascii_digit) {
        return Some(format!("{}-{}-{}", &s[0..4], &s[4..6], &s[6..8]));
    }
    if b.len() == 10 && b[4] == b'-' && b[7] == b'-' {
        return Some(s.to_string());
    }
    None
}

/// Earliest ORIG submission date, else the earliest action date
pub fn approval_date(submissions: &[Value]) -> Option<String> {
    let mut original: Vec<String> = Vec::new();
    let mut all: Vec<String> = Vec::new();
    for sub in submissions {
        let Some(date) = sub["action_date"].as_str().and_then(normalize_date) else {
            continue;
        };
        let kind = sub["submission_type"]
            .as_str()
            .filter(|s| !s.is_empty())
            .or_else(|| sub["submissionclass"].as_str())
            .unwrap_or_default()
            .to_uppercase();
        if kind.contains("ORIG") {
            original.push(date.clone());
        }
        all.push(date);
    }
    original.into_iter().min().or_else(|| all.into_iter().min())
}

pub fn drug_from_application(app: &Value) -> DrugRecord {
    let submissions = app["submissions"].as_array().map(Vec::as_slice).unwrap_or_default();
    let (brand_name, active_ingredient) = match app["products"].as_array().and_then(|p| p.first()) {
        Some(first) => {
            let names: Vec<&str> = first["active_ingredients"]
                .as_array()
                .map(|a| a.iter().filter_map(|i| i["name"].as_str()).filter(|n| !n.is_empty()).collect())
                .unwrap_or_default();
            (
                first["brand_name"].as_str().map(String::from),
                Some(names.join(", ")).filter(|s| !s.is_empty()),
            )
        }
        None => (
            first_str(&app["openfda"]["brand_name"]),
            first_str(&app["openfda"]["generic_name"]),
        ),
    };
    DrugRecord {
        brand_name,
        active_ingredient,
        application: app["application_number"].as_str().map(String::from),
        approval_date: approval_date(submissions),
        indications: Vec::new(),
    }
}

/// First sentence of the label's `indications_and_usage`
pub fn label_indication(label: &Value) -> Option<String> {
    let text = first_str(&label["indications_and_usage"])?;
    let short = text.split('.').next().unwrap_or_default().trim();
    Some(short.to_string()).filter(|s| !s.is_empty())
}

fn first_str(v: &Value) -> Option<String> {
    match v {
        Value::Array(items) => items.first().and_then(Value::as_str).map(String::from),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

// ------------------------------------------------------------------------
// Trials (ClinicalTrials.gov)
// ------------------------------------------------------------------------

/// Brand names and split active ingredients, deduplicated case-insensitively
pub fn intervention_terms(drugs: &[DrugRecord]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut terms = Vec::new();
    for drug in drugs {
        let actives = drug.active_ingredient.as_deref().unwrap_or_default().split(',');
        for term in drug.brand_name.iter().map(String::as_str).chain(actives) {
            let term = term.trim();
            if !term.is_empty() && seen.insert(term.to_lowercase()) {
                terms.push(term.to_string());
            }
        }
    }
    terms
}

pub fn trial_query(company: &str, drugs: &[DrugRecord], first_page: u32) -> StudyQuery {
    StudyQuery::new()
        .spons(company)
        .intr(&intervention_terms(drugs).join(" OR "))
        .fields(&TRIAL_FIELDS)
        .sort(&["@relevance", "LastUpdatePostDate:desc"])
        .page_size(first_page)
}

async fn search_trials(
    client: &ClinicalTrialsClient,
    company: &str,
    drugs: &[DrugRecord],
    limit: usize,
) -> ApiResult<Vec<TrialRecord>> {
    let first = limit.clamp(1, 100);
    let extra_pages = limit.saturating_sub(first).div_ceil(100);
    let paging = Paging {
        first_page_size: first as u32,
        next_page_size: Some(100),
        max_pages: Some(1 + extra_pages),
        include_total_on_first_page: true,
    };
    let pages = client
        .iterate_studies(&trial_query(company, drugs, first as u32), &paging)
        .await?;
    Ok(pages
        .iter()
        .flat_map(|p| p["studies"].as_array().cloned().unwrap_or_default())
        .filter_map(|s| trial_from_study(&s))
        .take(limit)
        .collect())
}

/// Flat projection key, or its nested `protocolSection` location
fn study_field<'a>(study: &'a Value, key: &str) -> Option<&'a Value> {
    if let Some(v) = study.get(key).filter(|v| !v.is_null()) {
        return Some(v);
    }
    let ps = &study["protocolSection"];
    let nested = match key {
        "NCTId" => &ps["identificationModule"]["nctId"],
        "BriefTitle" => &ps["identificationModule"]["briefTitle"],
        "Phase" => &ps["designModule"]["phases"],
        "OverallStatus" => &ps["statusModule"]["overallStatus"],
        "Condition" => &ps["conditionsModule"]["conditions"],
        "LeadSponsorName" => &ps["sponsorCollaboratorsModule"]["leadSponsor"]["name"],
        _ => return None,
    };
    Some(nested).filter(|v| !v.is_null())
}

fn string_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(String::from).collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

pub fn trial_from_study(study: &Value) -> Option<TrialRecord> {
    let first = |key: &str| string_list(study_field(study, key)).into_iter().next();
    let nct_id = first("NCTId")?;
    let title = first("BriefTitle")?;
    let mut interventions = string_list(study_field(study, "InterventionName"));
    if interventions.is_empty() {
        interventions = study["protocolSection"]["armsInterventionsModule"]["interventions"]
            .as_array()
            .map(|a| a.iter().filter_map(|i| i["name"].as_str()).map(String::from).collect())
            .unwrap_or_default();
    }
    Some(TrialRecord {
        nct_id,
        title,
        phase: first("Phase"),
        status: first("OverallStatus"),
        conditions: string_list(study_field(study, "Condition")),
        interventions,
        sponsor: first("LeadSponsorName"),
    })
}

// ------------------------------------------------------------------------
// Populations (NAACCR)
// ------------------------------------------------------------------------

pub fn infer_indications(drugs: &[DrugRecord]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for indication in drugs.iter().flat_map(|d| d.indications.iter()) {
        if !indication.is_empty() && !out.contains(indication) {
            out.push(indication.clone());
        }
    }
    out
}

pub fn is_oncology(indication: &str) -> bool {
    let lower = indication.to_lowercase();
    ONCOLOGY_TERMS.iter().any(|t| lower.contains(t))
}

/// Item whose `ItemName` contains the term, else the first item
pub fn best_item<'a>(items: &'a [Value], disease: &str) -> Option<&'a Value> {
    let target = disease.to_lowercase();
    items
        .iter()
        .find(|it| it["ItemName"].as_str().unwrap_or_default().to_lowercase().contains(&target))
        .or_else(|| items.first())
}

pub fn population_source(version: &str, item: Option<&Value>) -> String {
    match item {
        Some(it) => format!(
            "NAACCR v{} item {} ({}): {}",
            version,
            display(&it["ItemNumber"]),
            display(&it["XmlNaaccrId"]),
            display(&it["ItemName"])
        ),
        None => "NAACCR".to_string(),
    }
}

fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

async fn estimate_population(client: &NaaccrClient, disease: &str, options: &IntelOptions) -> PopulationRecord {
    let items = client
        .search_data_items(&options.naaccr_version, Some(disease), true, 1, Duration::from_millis(250))
        .await;
    let items = degrade("NAACCR", items);
    PopulationRecord {
        disease: disease.to_string(),
        region: options.region.clone(),
        incidence_per_year: None,
        source: Some(population_source(&options.naaccr_version, best_item(&items, disease))),
    }
}

// ------------------------------------------------------------------------
// Patents (USPTO)
// ------------------------------------------------------------------------

pub fn patent_query(company: &str) -> String {
    format!("applicantBag.applicantNameText:\"{}\"", company.replace('"', ""))
}

async fn patents_by_applicant(client: &UsptoClient, company: &str, limit: u32) -> ApiResult<Vec<PatentRecord>> {
    let request = SearchRequest::new().q(Some(&patent_query(company))).page(0, limit);
    let resp = client.search_applications(&request, MethodStrategy::Auto).await?;
    Ok(resp["patentFileWrapperDataBag"]
        .as_array()
        .map(|bag| bag.iter().filter_map(|w| patent_from_wrapper(w, company)).collect())
        .unwrap_or_default())
}

pub fn patent_from_wrapper(wrapper: &Value, company: &str) -> Option<PatentRecord> {
    let meta = &wrapper["applicationMetaData"];
    let number = wrapper["applicationNumberText"].as_str()?.to_string();
    Some(PatentRecord {
        number,
        title: meta["inventionTitle"].as_str().unwrap_or_default().to_string(),
        filing_date: meta["filingDate"].as_str().map(String::from),
        issue_date: meta["grantDate"].as_str().map(String::from),
        ipc: string_list(meta.get("cpcClassificationBag")),
        assignee: meta["firstApplicantName"]
            .as_str()
            .map(String::from)
            .or_else(|| Some(company.to_string())),
    })
}

// ------------------------------------------------------------------------
// Substances (PubChem)
// ------------------------------------------------------------------------

/// Unique active ingredient names across drugs
pub fn active_ingredients(drugs: &[DrugRecord]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    drugs
        .iter()
        .filter_map(|d| d.active_ingredient.as_deref())
        .flat_map(|a| a.split(','))
        .map(str::trim)
        .filter(|a| !a.is_empty() && seen.insert(a.to_lowercase()))
        .map(String::from)
        .collect()
}

async fn lookup_substances(client: &PubChemClient, drugs: &[DrugRecord], synonym_limit: usize) -> ApiResult<Vec<SubstanceRecord>> {
    let mut out = Vec::new();
    for name in active_ingredients(drugs) {
        let cid = client.cids_for_name(&name).await?.first().copied();
        let synonyms = match cid {
            Some(cid) => client.synonyms_for_cid(cid, synonym_limit).await.unwrap_or_else(|e| {
                warn!("[intel] no synonyms for CID {}: {}", cid, e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        out.push(SubstanceRecord { name, cid, synonyms });
    }
    Ok(out)
}

// ------------------------------------------------------------------------
// Competitors
// ------------------------------------------------------------------------

/// Sorted unique lead sponsors that do not contain the company name
pub fn infer_competitors(trials: &[TrialRecord], company: &str) -> Vec<String> {
    let company = company.to_lowercase();
    trials
        .iter()
        .filter_map(|t| t.sponsor.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.to_lowercase().contains(&company))
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("20200115").as_deref(), Some("2020-01-15"));
        assert_eq!(normalize_date("2020-01-15").as_deref(), Some("2020-01-15"));
        assert_eq!(normalize_date("Jan 2020"), None);
    }

    #[test]
    fn test_approval_date_prefers_original() {
        let subs = vec![
            json!({"action_date": "20150101", "submission_type": "SUPPL"}),
            json!({"action_date": "20180301", "submission_type": "ORIG"}),
            json!({"action_date": "20170301", "submission_type": "ORIG"}),
        ];
        assert_eq!(approval_date(&subs).as_deref(), Some("2017-03-01"));
        let suppl_only = vec![json!({"action_date": "20190101", "submission_type": "SUPPL"})];
        assert_eq!(approval_date(&suppl_only).as_deref(), Some("2019-01-01"));
        assert_eq!(approval_date(&[]), None);
    }

    #[test]
    fn test_drug_from_application() {
        let app = json!({
            "application_number": "BLA125514",
            "products": [{"brand_name": "KEYTRUDA", "active_ingredients": [{"name": "PEMBROLIZUMAB"}]}],
            "submissions": [{"action_date": "20140904", "submission_type": "ORIG"}]
        });
        let drug = drug_from_application(&app);
        assert_eq!(drug.brand_name.as_deref(), Some("KEYTRUDA"));
        assert_eq!(drug.active_ingredient.as_deref(), Some("PEMBROLIZUMAB"));
        assert_eq!(drug.approval_date.as_deref(), Some("2014-09-04"));

        let fallback = drug_from_application(&json!({
            "openfda": {"brand_name": ["ZOCOR"], "generic_name": ["SIMVASTATIN"]}
        }));
        assert_eq!(fallback.brand_name.as_deref(), Some("ZOCOR"));
        assert_eq!(fallback.active_ingredient.as_deref(), Some("SIMVASTATIN"));
        assert_eq!(fallback.application, None);
    }

    #[test]
    fn test_label_indication_first_sentence() {
        let label = json!({"indications_and_usage": ["KEYTRUDA is indicated for melanoma. Also more."]});
        assert_eq!(label_indication(&label).as_deref(), Some("KEYTRUDA is indicated for melanoma"));
        assert_eq!(label_indication(&json!({})), None);
    }

    #[test]
    fn test_intervention_terms_dedup() {
        let drugs = vec![
            DrugRecord {
                brand_name: Some("Keytruda".into()),
                active_ingredient: Some("pembrolizumab, X".into()),
                ..Default::default()
            },
            DrugRecord {
                brand_name: Some("KEYTRUDA".into()),
                active_ingredient: Some("x".into()),
                ..Default::default()
            },
        ];
        assert_eq!(intervention_terms(&drugs), vec!["Keytruda", "pembrolizumab", "X"]);
        let pairs = trial_query("Merck", &drugs, 50).to_pairs().unwrap();
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone());
        assert_eq!(get("query.spons").as_deref(), Some("Merck"));
        assert_eq!(get("query.intr").as_deref(), Some("Keytruda OR pembrolizumab OR X"));
        assert_eq!(get("sort").as_deref(), Some("@relevance,LastUpdatePostDate:desc"));
    }

    #[test]
    fn test_trial_from_flat_and_nested() {
        let flat = json!({"NCTId": ["NCT1"], "BriefTitle": "A", "Phase": ["PHASE2"], "LeadSponsorName": "Acme"});
        let t = trial_from_study(&flat).unwrap();
        assert_eq!(t.nct_id, "NCT1");
        assert_eq!(t.phase.as_deref(), Some("PHASE2"));

        let nested = json!({"protocolSection": {
            "identificationModule": {"nctId": "NCT2", "briefTitle": "B"},
            "statusModule": {"overallStatus": "RECRUITING"},
            "conditionsModule": {"conditions": ["Melanoma"]},
            "armsInterventionsModule": {"interventions": [{"name": "Drug A"}]}
        }});
        let t = trial_from_study(&nested).unwrap();
        assert_eq!(t.status.as_deref(), Some("RECRUITING"));
        assert_eq!(t.conditions, vec!["Melanoma"]);
        assert_eq!(t.interventions, vec!["Drug A"]);
        assert!(trial_from_study(&json!({"NCTId": "NCT3"})).is_none());
    }

    #[test]
    fn test_best_item_and_source() {
        let items = vec![
            json!({"ItemName": "Primary Site", "ItemNumber": 400, "XmlNaaccrId": "primarySite"}),
            json!({"ItemName": "Lymphoma Subtype", "ItemNumber": 999, "XmlNaaccrId": "lymphomaSubtype"}),
        ];
        let best = best_item(&items, "lymphoma");
        assert_eq!(
            population_source("22", best),
            "NAACCR v22 item 999 (lymphomaSubtype): Lymphoma Subtype"
        );
        assert_eq!(best_item(&items, "sarcoma").unwrap()["ItemNumber"], 400);
        assert_eq!(population_source("22", None), "NAACCR");
        assert!(is_oncology("Treatment of non-small cell lung CANCER"));
        assert!(!is_oncology("hypertension"));
    }

    #[test]
    fn test_patent_from_wrapper() {
        let w = json!({"applicationNumberText": "16123456", "applicationMetaData": {
            "inventionTitle": "Antibodies", "filingDate": "2017-05-10", "cpcClassificationBag": ["C07K16/28"]
        }});
        let p = patent_from_wrapper(&w, "Acme").unwrap();
        assert_eq!(p.number, "16123456");
        assert_eq!(p.ipc, vec!["C07K16/28"]);
        assert_eq!(p.assignee.as_deref(), Some("Acme"));
        assert_eq!(patent_query("Acme \"Bio\""), "applicantBag.applicantNameText:\"Acme Bio\"");
    }

    #[test]
    fn test_infer_competitors() {
        let trials = vec![
            TrialRecord { sponsor: Some("Merck Sharp & Dohme LLC".into()), ..Default::default() },
            TrialRecord { sponsor: Some("Bristol-Myers Squibb".into()), ..Default::default() },
            TrialRecord { sponsor: Some("Amgen".into()), ..Default::default() },
            TrialRecord { sponsor: Some("Amgen".into()), ..Default::default() },
        ];
        assert_eq!(infer_competitors(&trials, "merck"), vec!["Amgen", "Bristol-Myers Squibb"]);
    }

    #[tokio::test]
    async fn test_no_sources_gives_empty_report() {
        let intel = build_company_intel("Acme", &IntelSources::default(), &IntelOptions::default()).await;
        assert_eq!(intel.company, "Acme");
        assert!(intel.drugs_approved.is_empty() && intel.competitors.is_empty());
        assert!(intel.generated_at.is_some());
    }
}
