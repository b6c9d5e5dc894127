use crate::clinical_trials::stats::FIELD_TYPES;
use crate::clinical_trials::{ClinicalTrialsClient, ClinicalTrialsConfig, Paging, StudyFilter, StudyFormat, StudyQuery};
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde_json::{json, Value};

use super::print_json;

#[derive(Args, Debug, Clone)]
pub struct TrialsClientArgs {
    #[clap(long, default_value_t = 20.0)]
    pub timeout: f64,
    /// Requests per second; 0 disables throttling
    #[clap(long, default_value_t = 2.0)]
    pub rate: f64,
    #[clap(long)]
    pub compact: bool,
}

impl TrialsClientArgs {
    fn client(&self) -> Result<ClinicalTrialsClient> {
        let config = ClinicalTrialsConfig::default()
            .with_timeout(self.timeout)
            .with_rate_limit(Some(self.rate));
        Ok(ClinicalTrialsClient::new(config)?)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct StudySearchArgs {
    #[clap(long)]
    pub q_cond: Option<String>,
    #[clap(long)]
    pub q_term: Option<String>,
    #[clap(long)]
    pub q_locn: Option<String>,
    #[clap(long)]
    pub q_titles: Option<String>,
    #[clap(long)]
    pub q_intr: Option<String>,
    #[clap(long)]
    pub q_outc: Option<String>,
    #[clap(long)]
    pub q_spons: Option<String>,
    #[clap(long)]
    pub q_lead: Option<String>,
    #[clap(long)]
    pub q_id: Option<String>,
    #[clap(long)]
    pub q_patient: Option<String>,
    #[clap(long, num_args = 0..)]
    pub filter_overall_status: Vec<String>,
    #[clap(long)]
    pub filter_geo: Option<String>,
    #[clap(long, num_args = 0..)]
    pub filter_ids: Vec<String>,
    #[clap(long)]
    pub filter_advanced: Option<String>,
    #[clap(long, num_args = 1.., default_values = ["NCTId", "BriefTitle", "OverallStatus"])]
    pub fields: Vec<String>,
    /// Up to two sort keys, e.g. LastUpdatePostDate:desc
    #[clap(long, num_args = 1..)]
    pub sort: Vec<String>,
    #[clap(long)]
    pub count_total: bool,
    #[clap(long, default_value_t = 50)]
    pub page_size: u32,
}

impl StudySearchArgs {
    fn query(&self) -> StudyQuery {
        let areas = [
            ("cond", &self.q_cond),
            ("term", &self.q_term),
            ("locn", &self.q_locn),
            ("titles", &self.q_titles),
            ("intr", &self.q_intr),
            ("outc", &self.q_outc),
            ("spons", &self.q_spons),
            ("lead", &self.q_lead),
            ("id", &self.q_id),
            ("patient", &self.q_patient),
        ];
        let mut query = StudyQuery::new();
        for (area, expr) in areas {
            if let Some(expr) = expr {
                query = query.query(area, expr);
            }
        }
        query = query.with_filter(StudyFilter {
            overall_status: self.filter_overall_status.clone(),
            geo: self.filter_geo.clone(),
            ids: self.filter_ids.clone(),
            advanced: self.filter_advanced.clone(),
            synonyms: Vec::new(),
        });
        query = query.fields(&self.fields).count_total(self.count_total).page_size(self.page_size);
        if !self.sort.is_empty() {
            query = query.sort(&self.sort);
        }
        query
    }
}

#[derive(Subcommand, Debug)]
pub enum TrialsCmd {
    /// List studies (one page, or every page with --paginate)
    Studies {
        #[command(flatten)]
        search: StudySearchArgs,
        #[clap(long)]
        paginate: bool,
        #[clap(long, default_value_t = 100)]
        next_page_size: u32,
        #[clap(long)]
        max_pages: Option<usize>,
        #[command(flatten)]
        client: TrialsClientArgs,
    },
    /// One study by NCT ID
    Study {
        nct_id: String,
        /// json or fhir.json
        #[clap(long, default_value = "json")]
        format: String,
        #[clap(long, num_args = 1..)]
        fields: Vec<String>,
        /// markdown or legacy
        #[clap(long, default_value = "markdown")]
        markup_format: String,
        #[command(flatten)]
        client: TrialsClientArgs,
    },
    /// Data model field definitions
    Metadata {
        #[clap(long)]
        indexed_only: bool,
        #[clap(long)]
        historic_only: bool,
        #[command(flatten)]
        client: TrialsClientArgs,
    },
    /// Enumeration types and their values
    Enums {
        #[command(flatten)]
        client: TrialsClientArgs,
    },
    /// Search areas per document section
    #[command(name = "search-areas")]
    SearchAreas {
        #[command(flatten)]
        client: TrialsClientArgs,
    },
    /// Study JSON size statistics
    Size {
        #[command(flatten)]
        client: TrialsClientArgs,
    },
    /// Value statistics for leaf fields
    #[command(name = "field-values")]
    FieldValues {
        #[clap(long, num_args = 1..)]
        fields: Vec<String>,
        /// ENUM, STRING, DATE, INTEGER, NUMBER or BOOLEAN
        #[clap(long, num_args = 1..)]
        types: Vec<String>,
        /// Print at most this many entries
        #[clap(long, default_value_t = 15)]
        limit: usize,
        #[command(flatten)]
        client: TrialsClientArgs,
    },
    /// Size statistics for list fields
    #[command(name = "field-sizes")]
    FieldSizes {
        #[clap(long, num_args = 1..)]
        fields: Vec<String>,
        #[clap(long, default_value_t = 15)]
        limit: usize,
        #[command(flatten)]
        client: TrialsClientArgs,
    },
}

fn non_empty(values: &[String]) -> Option<&[String]> {
    Some(values).filter(|v| !v.is_empty())
}

fn check_types(types: &[String]) -> Result<()> {
    if let Some(bad) = types.iter().find(|t| !FIELD_TYPES.contains(&t.as_str())) {
        bail!("unknown field type '{}' (expected one of {})", bad, FIELD_TYPES.join(", "));
    }
    Ok(())
}

fn head(mut items: Vec<Value>, limit: usize) -> Vec<Value> {
    items.truncate(limit);
    items
}

pub async fn run(cmd: TrialsCmd) -> Result<()> {
    match cmd {
        TrialsCmd::Studies {
            search,
            paginate,
            next_page_size,
            max_pages,
            client,
        } => {
            let api = client.client()?;
            let query = search.query();
            if paginate {
                let paging = Paging {
                    first_page_size: search.page_size,
                    next_page_size: Some(next_page_size),
                    max_pages,
                    include_total_on_first_page: search.count_total,
                };
                let pages = api.iterate_studies(&query, &paging).await?;
                print_json(&json!({ "pages": pages }), client.compact)
            } else {
                print_json(&api.list_studies(&query).await?, client.compact)
            }
        }
        TrialsCmd::Study {
            nct_id,
            format,
            fields,
            markup_format,
            client,
        } => {
            let format = StudyFormat::parse(&format)?;
            let (fields, markup) = match format {
                StudyFormat::Json => (non_empty(&fields), markup_format.as_str()),
                StudyFormat::FhirJson => (None, "markdown"),
            };
            let study = client.client()?.get_study(&nct_id, format, markup, fields).await?;
            print_json(&study, client.compact)
        }
        TrialsCmd::Metadata {
            indexed_only,
            historic_only,
            client,
        } => print_json(&client.client()?.metadata(indexed_only, historic_only).await?, client.compact),
        TrialsCmd::Enums { client } => print_json(&client.client()?.enums().await?, client.compact),
        TrialsCmd::SearchAreas { client } => print_json(&client.client()?.search_areas().await?, client.compact),
        TrialsCmd::Size { client } => print_json(&client.client()?.size_stats().await?, client.compact),
        TrialsCmd::FieldValues {
            fields,
            types,
            limit,
            client,
        } => {
            check_types(&types)?;
            let values = client.client()?.field_values(non_empty(&fields), non_empty(&types)).await?;
            print_json(&head(values, limit), client.compact)
        }
        TrialsCmd::FieldSizes { fields, limit, client } => {
            let sizes = client.client()?.field_sizes(non_empty(&fields)).await?;
            print_json(&head(sizes, limit), client.compact)
        }
    }
}
