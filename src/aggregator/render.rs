// Report renderers: json, text table, standalone html, csv directory

use super::service::CompanyIntel;
use crate::gen::html::escape;
use crate::gen::io::save_table;
use crate::gen::tidy::Table;
use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table as TextTable};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Table,
    Html,
    Csv,
}

impl ReportFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Table => "table",
            ReportFormat::Html => "html",
            ReportFormat::Csv => "csv",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "table" => Ok(ReportFormat::Table),
            "html" => Ok(ReportFormat::Html),
            "csv" => Ok(ReportFormat::Csv),
            other => bail!("Unknown report format '{}' (json, table, html, csv)", other),
        }
    }
}

// ============================================================================
// JSON / TABLE
// ============================================================================

pub fn render_json(intel: &CompanyIntel) -> Result<String> {
    serde_json::to_string_pretty(intel).context("Failed to serialize report")
}

fn text_table(header: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut t = TextTable::new();
    t.load_preset(UTF8_FULL);
    t.set_content_arrangement(ContentArrangement::Dynamic);
    t.set_header(header.to_vec());
    if rows.is_empty() {
        t.add_row(vec!["(none)".to_string()]);
    }
    for row in rows {
        t.add_row(row);
    }
    t.to_string()
}

fn opt(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

pub fn render_table(intel: &CompanyIntel) -> String {
    let mut out = vec![format!("Company: {}", intel.company)];
    if intel.generated_at.is_some() {
        out.push(format!("Generated: {}", intel.generated_label()));
    }

    out.push("\nApproved Drugs:".to_string());
    out.push(text_table(
        &["Brand", "Ingredient", "Indications", "Application", "Approval"],
        drug_rows(intel),
    ));

    out.push("\nClinical Trials:".to_string());
    out.push(text_table(
        &["NCT", "Title", "Phase", "Status"],
        intel
            .in_trials
            .iter()
            .map(|t| vec![t.nct_id.clone(), t.title.clone(), opt(&t.phase), opt(&t.status)])
            .collect(),
    ));

    out.push("\nPatents:".to_string());
    out.push(text_table(&["Number", "Title", "Filed", "Issued"], patent_rows(intel)));

    out.push("\nPatient Population (US):".to_string());
    out.push(text_table(&["Disease", "Incidence/yr", "Source"], population_rows(intel)));

    out.push("\nSubstances:".to_string());
    out.push(text_table(&["Name", "CID", "Synonyms"], substance_rows(intel)));

    out.push("\nCompetitors (inferred):".to_string());
    if intel.competitors.is_empty() {
        out.push("  (none)".to_string());
    }
    out.extend(intel.competitors.iter().map(|c| format!("  - {}", c)));
    out.join("\n")
}

fn drug_rows(intel: &CompanyIntel) -> Vec<Vec<String>> {
    intel
        .drugs_approved
        .iter()
        .map(|d| {
            vec![
                opt(&d.brand_name),
                opt(&d.active_ingredient),
                d.indications.join("; "),
                opt(&d.application),
                opt(&d.approval_date),
            ]
        })
        .collect()
}

fn patent_rows(intel: &CompanyIntel) -> Vec<Vec<String>> {
    intel
        .patents
        .iter()
        .map(|p| vec![p.number.clone(), p.title.clone(), opt(&p.filing_date), opt(&p.issue_date)])
        .collect()
}

fn population_rows(intel: &CompanyIntel) -> Vec<Vec<String>> {
    intel
        .populations
        .iter()
        .map(|p| {
            vec![
                p.disease.clone(),
                p.incidence_per_year.map(|n| n.to_string()).unwrap_or_default(),
                opt(&p.source),
            ]
        })
        .collect()
}

fn substance_rows(intel: &CompanyIntel) -> Vec<Vec<String>> {
    intel
        .substances
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.cid.map(|c| c.to_string()).unwrap_or_default(),
                s.synonyms.join("; "),
            ]
        })
        .collect()
}

// ============================================================================
// HTML
// ============================================================================

const HTML_STYLE: &str = r#":root { font-family: system-ui, -apple-system, Segoe UI, Roboto, Helvetica, Arial; }
body { margin:0; background:#0b1220; color:#e6edf3; }
header { padding:16px 24px; border-bottom:1px solid #1f2a44; position:sticky; top:0; background:#0b1220; }
.container { padding:24px; display:grid; gap:16px; }
.card { background:#0f172a; border:1px solid #1f2a44; border-radius:14px; padding:16px; }
.title { font-size:20px; margin:0 0 8px; }
.grid { display:grid; gap:12px; }
.grid.cols-2 { grid-template-columns: repeat(2, minmax(0,1fr)); }
.pill { display:inline-block; padding:4px 8px; border-radius:999px; border:1px solid #32456b; margin:2px; font-size:12px; }
table { width:100%; border-collapse: collapse; }
th, td { text-align:left; border-bottom:1px solid #1f2a44; padding:8px; }
th { font-weight:600; }
.muted { color:#a4b1c6; }"#;

fn html_card(title: &str, header: &[&str], rows: Vec<Vec<String>>) -> String {
    let head: String = header.iter().map(|h| format!("<th>{}</th>", escape(h))).collect();
    let body = if rows.is_empty() {
        format!("<tr><td colspan={}>(none)</td></tr>", header.len())
    } else {
        rows.iter()
            .map(|r| {
                let cells: String = r.iter().map(|c| format!("<td>{}</td>", escape(c))).collect();
                format!("<tr>{}</tr>", cells)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "    <div class=\"card\">\n      <h3 class=\"title\">{}</h3>\n      <table><thead><tr>{}</tr></thead>\n      <tbody>{}</tbody></table>\n    </div>",
        escape(title),
        head,
        body
    )
}

pub fn render_html(intel: &CompanyIntel) -> String {
    let company = escape(&intel.company);
    let competitors = if intel.competitors.is_empty() {
        "<span class='muted'>(none)</span>".to_string()
    } else {
        intel
            .competitors
            .iter()
            .map(|c| format!("<span class='pill'>{}</span>", escape(c)))
            .collect()
    };
    let trial_rows = intel
        .in_trials
        .iter()
        .map(|t| vec![t.nct_id.clone(), t.title.clone(), opt(&t.phase), opt(&t.status)])
        .collect();
    let cards = [
        html_card(
            "Approved Drugs",
            &["Brand", "Ingredient", "Indications", "Application", "Approval"],
            drug_rows(intel),
        ),
        html_card("Clinical Trials", &["NCT", "Title", "Phase", "Status"], trial_rows),
        html_card("Patent Portfolio", &["Number", "Title", "Filed", "Issued"], patent_rows(intel)),
        html_card(
            "Patient Population (US)",
            &["Disease", "Incidence / yr", "Source"],
            population_rows(intel),
        ),
        html_card("Substances", &["Name", "CID", "Synonyms"], substance_rows(intel)),
    ]
    .join("\n");

    format!(
        r#"<!doctype html>
<html><head><meta charset="utf-8"><title>{company}</title>
<style>
{style}
</style></head>
<body>
<header><strong>IND Intelligence</strong></header>
<div class="container">
  <div class="card">
    <h2 class="title">Summary</h2>
    <div class="muted">Company</div>
    <div style="font-size:24px; margin-bottom:8px;">{company}</div>
    <div class="muted" style="margin-top:6px;">Competitors (inferred)</div>
    <div>{competitors}</div>
    <div class="muted" style="margin-top:6px;">{generated}</div>
  </div>
  <div class="grid cols-2">
{cards}
  </div>
</div>
</body></html>"#,
        company = company,
        style = HTML_STYLE,
        competitors = competitors,
        generated = escape(&intel.generated_label()),
        cards = cards
    )
}

pub fn write_html(intel: &CompanyIntel, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, render_html(intel)).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path.to_path_buf())
}

// ============================================================================
// CSV
// ============================================================================

fn section_table(columns: &[&str], rows: Vec<Vec<String>>) -> Result<Table> {
    Table::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows)
}

/// One CSV per section under `dir`
pub fn write_csv_dir(intel: &CompanyIntel, dir: &Path) -> Result<Vec<PathBuf>> {
    let drugs = section_table(
        &["brand_name", "active_ingredient", "indications", "application", "approval_date"],
        drug_rows(intel),
    )?;
    let trials = section_table(
        &["nct_id", "title", "phase", "status", "conditions", "interventions", "sponsor"],
        intel
            .in_trials
            .iter()
            .map(|t| {
                vec![
                    t.nct_id.clone(),
                    t.title.clone(),
                    opt(&t.phase),
                    opt(&t.status),
                    t.conditions.join("; "),
                    t.interventions.join("; "),
                    opt(&t.sponsor),
                ]
            })
            .collect(),
    )?;
    let patents = section_table(
        &["number", "title", "filing_date", "issue_date", "ipc", "assignee"],
        intel
            .patents
            .iter()
            .map(|p| {
                vec![
                    p.number.clone(),
                    p.title.clone(),
                    opt(&p.filing_date),
                    opt(&p.issue_date),
                    p.ipc.join("; "),
                    opt(&p.assignee),
                ]
            })
            .collect(),
    )?;
    let populations = section_table(
        &["disease", "region", "incidence_per_year", "source"],
        intel
            .populations
            .iter()
            .map(|p| {
                vec![
                    p.disease.clone(),
                    p.region.clone(),
                    p.incidence_per_year.map(|n| n.to_string()).unwrap_or_default(),
                    opt(&p.source),
                ]
            })
            .collect(),
    )?;
    let substances = section_table(&["name", "cid", "synonyms"], substance_rows(intel))?;
    let competitors = section_table(
        &["competitor"],
        intel.competitors.iter().map(|c| vec![c.clone()]).collect(),
    )?;

    let sections = [
        ("drugs_approved.csv", drugs),
        ("in_trials.csv", trials),
        ("patents.csv", patents),
        ("populations.csv", populations),
        ("substances.csv", substances),
        ("competitors.csv", competitors),
    ];
    let mut written = Vec::with_capacity(sections.len());
    for (file, table) in &sections {
        written.push(save_table(dir, file, table)?);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::super::service::{DrugRecord, TrialRecord};
    use super::*;
    use tempfile::TempDir;

    fn sample() -> CompanyIntel {
        CompanyIntel {
            company: "Acme <Bio>".to_string(),
            drugs_approved: vec![DrugRecord {
                brand_name: Some("ZAPRO".into()),
                active_ingredient: Some("zaprotinib".into()),
                application: Some("NDA000001".into()),
                approval_date: Some("2020-01-01".into()),
                indications: vec!["ZAPRO is indicated for lymphoma".into()],
            }],
            in_trials: vec![TrialRecord {
                nct_id: "NCT0001".into(),
                title: "Zapro in lymphoma".into(),
                sponsor: Some("Other Pharma".into()),
                ..Default::default()
            }],
            competitors: vec!["Other Pharma".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ReportFormat::parse("HTML").unwrap(), ReportFormat::Html);
        assert!(ReportFormat::parse("xlsx").is_err());
    }

    #[test]
    fn test_render_table_sections() {
        let text = render_table(&sample());
        assert!(text.starts_with("Company: Acme <Bio>"));
        assert!(text.contains("ZAPRO"));
        assert!(text.contains("(none)"));
        assert!(text.contains("  - Other Pharma"));
    }

    #[test]
    fn test_render_html_escapes() {
        let html = render_html(&sample());
        assert!(html.contains("<strong>IND Intelligence</strong>"));
        assert!(html.contains("Acme &lt;Bio&gt;"));
        assert!(html.contains("<span class='pill'>Other Pharma</span>"));
        assert!(html.contains("<tr><td colspan=4>(none)</td></tr>"));
    }

    #[test]
    fn test_generated_at_rendered() {
        use chrono::{TimeZone, Utc};
        let intel = CompanyIntel {
            generated_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()),
            ..sample()
        };
        assert!(render_table(&intel).contains("Generated: 2024-03-01 09:30 UTC"));
        assert!(render_html(&intel).contains("2024-03-01 09:30 UTC"));
        let json: serde_json::Value = serde_json::from_str(&render_json(&intel).unwrap()).unwrap();
        assert_eq!(json["generated_at"], "2024-03-01T09:30:00Z");
        assert!(!render_table(&sample()).contains("Generated:"));
    }

    #[test]
    fn test_json_roundtrip_keys() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&sample()).unwrap()).unwrap();
        assert_eq!(json["drugs_approved"][0]["approval_date"], "2020-01-01");
        assert!(json["patents"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_write_csv_dir() {
        let dir = TempDir::new().unwrap();
        let written = write_csv_dir(&sample(), dir.path()).unwrap();
        assert_eq!(written.len(), 6);
        let trials = fs::read_to_string(dir.path().join("in_trials.csv")).unwrap();
        assert!(trials.starts_with("nct_id,title,phase"));
        assert!(trials.contains("NCT0001"));
        let patents = fs::read_to_string(dir.path().join("patents.csv")).unwrap();
        assert_eq!(patents.trim(), "number,title,filing_date,issue_date,ipc,assignee");
    }
}
