use crate::seer::client::DEFAULT_BASE_URL;
use crate::seer::{CodeSearch, ListQuery, SeerClient, SeerConfig};
use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use super::print_json;

const DISEASE_TYPES: [&str; 3] = ["SOLID_TUMOR", "HEMATO", "NON_NEOPLASTIC"];
const RX_TYPES: [&str; 2] = ["DRUG", "REGIMEN"];
const DO_NOT_CODE: [&str; 3] = ["YES", "NO", "SEE_REMARKS"];

#[derive(Args, Debug)]
pub struct SeerArgs {
    #[clap(long, global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
    #[clap(long, global = true, default_value_t = 30.0)]
    pub timeout: f64,
    /// Falls back to SEER_API_KEY, then the config store
    #[clap(long, global = true)]
    pub api_key: Option<String>,
    #[clap(long, global = true)]
    pub compact: bool,
    #[command(subcommand)]
    pub command: SeerCmd,
}

#[derive(Subcommand, Debug)]
pub enum SeerCmd {
    /// Versions and algorithms across categories
    Versions,
    /// Search diseases
    #[command(name = "disease-search")]
    DiseaseSearch {
        /// Disease version, or `latest`
        version: String,
        #[clap(long)]
        q: Option<String>,
        /// SOLID_TUMOR, HEMATO or NON_NEOPLASTIC
        #[clap(long = "type")]
        kind: Option<String>,
        #[clap(long, num_args = 1..)]
        site_category: Vec<String>,
        #[clap(long, default_value_t = 25)]
        count: u32,
        #[clap(long, default_value_t = 0)]
        offset: u32,
        #[clap(long)]
        order: Option<String>,
    },
    /// Whether two morphologies are the same disease
    #[command(name = "disease-same")]
    DiseaseSame {
        version: String,
        #[clap(long)]
        d1: String,
        #[clap(long)]
        year1: String,
        #[clap(long)]
        d2: String,
        #[clap(long)]
        year2: String,
    },
    /// List glossary entries
    #[command(name = "glossary-list")]
    GlossaryList {
        version: String,
        #[clap(long)]
        q: Option<String>,
        #[clap(long, num_args = 1..)]
        category: Vec<String>,
        #[clap(long, default_value_t = 25)]
        count: u32,
        #[clap(long)]
        order: Option<String>,
    },
    /// Search NDC products
    #[command(name = "ndc-search")]
    NdcSearch {
        #[command(flatten)]
        search: CodeSearchArgs,
        #[clap(long)]
        has_seer_info: bool,
    },
    /// Search SEER*Rx entries
    #[command(name = "rx-search")]
    RxSearch {
        version: String,
        #[clap(long)]
        q: Option<String>,
        /// DRUG or REGIMEN
        #[clap(long = "type")]
        kind: Option<String>,
        #[clap(long, num_args = 1..)]
        category: Vec<String>,
        /// YES, NO or SEE_REMARKS
        #[clap(long)]
        do_not_code: Option<String>,
        #[clap(long, default_value_t = 25)]
        count: u32,
        #[clap(long, default_value_t = 0)]
        offset: u32,
        #[clap(long)]
        order: Option<String>,
    },
    /// One staging schema
    #[command(name = "staging-schema")]
    StagingSchema {
        algorithm: String,
        version: String,
        schema_id: String,
    },
    /// One surgery table, by title or by site and histology
    #[command(name = "surgery-table")]
    SurgeryTable {
        year: String,
        #[clap(long, conflicts_with = "site")]
        title: Option<String>,
        #[clap(long, requires = "hist")]
        site: Option<String>,
        #[clap(long)]
        hist: Option<String>,
    },
    /// NAACCR items for a version
    #[command(name = "naaccr-items")]
    NaaccrItems {
        version: String,
        #[clap(long)]
        q: Option<String>,
        #[clap(long, default_value_t = 25)]
        count: u32,
    },
    /// Search HCPCS procedures
    #[command(name = "hcpcs-search")]
    HcpcsSearch {
        #[command(flatten)]
        search: CodeSearchArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CodeSearchArgs {
    #[clap(long)]
    pub q: Option<String>,
    #[clap(long, num_args = 1..)]
    pub category: Vec<String>,
    #[clap(long, default_value_t = 1)]
    pub page: u32,
    #[clap(long, default_value_t = 25)]
    pub per_page: u32,
    #[clap(long)]
    pub order: Option<String>,
}

impl CodeSearchArgs {
    fn search(&self) -> CodeSearch {
        CodeSearch {
            q: self.q.clone(),
            categories: self.category.clone(),
            page: self.page,
            per_page: self.per_page,
            order: self.order.clone(),
            ..Default::default()
        }
    }
}

fn check_choice(flag: &str, value: Option<&str>, allowed: &[&str]) -> Result<()> {
    match value {
        Some(v) if !allowed.contains(&v) => bail!("{} must be one of {}, got '{}'", flag, allowed.join(", "), v),
        _ => Ok(()),
    }
}

pub async fn run(args: SeerArgs) -> Result<()> {
    let config = SeerConfig::resolved(args.api_key.as_deref())
        .with_base_url(&args.base_url)
        .with_timeout(args.timeout);
    let client = SeerClient::new(config)?;
    let compact = args.compact;

    let value = match args.command {
        SeerCmd::Versions => client.versions_overview().await?,
        SeerCmd::DiseaseSearch {
            version,
            q,
            kind,
            site_category,
            count,
            offset,
            order,
        } => {
            check_choice("--type", kind.as_deref(), &DISEASE_TYPES)?;
            let version = client.resolve_version("disease", &version).await;
            let query = ListQuery::new()
                .q(q.as_deref())
                .kind(kind.as_deref())
                .categories(&site_category)
                .page(count, offset)
                .order(order.as_deref());
            client.list_diseases(&version, &query).await?
        }
        SeerCmd::DiseaseSame {
            version,
            d1,
            year1,
            d2,
            year2,
        } => {
            let version = client.resolve_version("disease", &version).await;
            client.is_same_disease(&version, &d1, &year1, &d2, &year2).await?
        }
        SeerCmd::GlossaryList {
            version,
            q,
            category,
            count,
            order,
        } => {
            let version = client.resolve_version("glossary", &version).await;
            let query = ListQuery::new()
                .q(q.as_deref())
                .categories(&category)
                .page(count, 0)
                .order(order.as_deref());
            client.list_glossary(&version, &query).await?
        }
        SeerCmd::NdcSearch { search, has_seer_info } => {
            let search = CodeSearch {
                has_seer_info: has_seer_info.then_some(true),
                ..search.search()
            };
            client.search_ndc(&search).await?
        }
        SeerCmd::RxSearch {
            version,
            q,
            kind,
            category,
            do_not_code,
            count,
            offset,
            order,
        } => {
            check_choice("--type", kind.as_deref(), &RX_TYPES)?;
            check_choice("--do-not-code", do_not_code.as_deref(), &DO_NOT_CODE)?;
            let version = client.resolve_version("rx", &version).await;
            let query = ListQuery {
                do_not_code,
                ..ListQuery::new()
                    .q(q.as_deref())
                    .kind(kind.as_deref())
                    .categories(&category)
                    .page(count, offset)
                    .order(order.as_deref())
            };
            client.list_rx(&version, &query).await?
        }
        SeerCmd::StagingSchema {
            algorithm,
            version,
            schema_id,
        } => client.get_staging_schema(&algorithm, &version, &schema_id).await?,
        SeerCmd::SurgeryTable { year, title, site, hist } => {
            client
                .get_surgery_table(&year, title.as_deref(), site.as_deref(), hist.as_deref())
                .await?
        }
        SeerCmd::NaaccrItems { version, q, count } => {
            let version = client.resolve_version("naaccr", &version).await;
            client.list_naaccr_items(&version, None, q.as_deref(), Some(count)).await?
        }
        SeerCmd::HcpcsSearch { search } => client.search_hcpcs(&search.search()).await?,
    };
    print_json(&value, compact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn seer(args: &[&str]) -> Result<SeerArgs, clap::Error> {
        let mut argv = vec!["ind", "seer"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).map(|cli| match cli.command {
            Commands::Seer(args) => args,
            other => panic!("unexpected {:?}", other),
        })
    }

    #[test]
    fn test_disease_search_flags() {
        let args = seer(&["disease-search", "latest", "--type", "SOLID_TUMOR", "--site-category", "a", "b"]).unwrap();
        assert_eq!(args.base_url, DEFAULT_BASE_URL);
        match args.command {
            SeerCmd::DiseaseSearch {
                version,
                kind,
                site_category,
                count,
                ..
            } => {
                assert_eq!(version, "latest");
                assert_eq!(kind.as_deref(), Some("SOLID_TUMOR"));
                assert_eq!(site_category, vec!["a", "b"]);
                assert_eq!(count, 25);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_surgery_table_title_conflicts_with_site() {
        assert!(seer(&["surgery-table", "2023", "--title", "Breast"]).is_ok());
        assert!(seer(&["surgery-table", "2023", "--site", "C500", "--hist", "8000"]).is_ok());
        assert!(seer(&["surgery-table", "2023", "--title", "x", "--site", "C500", "--hist", "8000"]).is_err());
        assert!(seer(&["surgery-table", "2023", "--site", "C500"]).is_err());
    }

    #[test]
    fn test_check_choice() {
        assert!(check_choice("--type", Some("DRUG"), &RX_TYPES).is_ok());
        assert!(check_choice("--type", None, &RX_TYPES).is_ok());
        assert!(check_choice("--type", Some("drug"), &RX_TYPES).is_err());
    }

    #[test]
    fn test_code_search_args() {
        let args = CodeSearchArgs {
            q: Some("imatinib".to_string()),
            category: vec!["CHEMOTHERAPY".to_string()],
            page: 2,
            per_page: 10,
            order: None,
        };
        let params = args.search().params();
        assert_eq!(params.get("q"), Some("imatinib"));
        assert_eq!(params.get("page"), Some("2"));
        assert_eq!(params.get("per_page"), Some("10"));
    }
}
