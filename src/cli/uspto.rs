use crate::uspto::{
    ApplicationResource, Download, MethodStrategy, ProductQuery, ProductSearch, SearchRequest, UsptoClient, UsptoConfig,
};
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use super::print_json;

#[derive(Args, Debug)]
pub struct UsptoArgs {
    /// Falls back to USPTO_API_KEY, then the config store
    #[clap(long, global = true)]
    pub api_key: Option<String>,
    /// auto, GET or POST for search endpoints
    #[clap(long, global = true, default_value = "auto")]
    pub method: String,
    #[clap(long, global = true)]
    pub compact: bool,
    /// Print request bodies and params to stderr
    #[clap(long, global = true)]
    pub troubleshoot: bool,
    #[command(subcommand)]
    pub command: UsptoCmd,
}

#[derive(Subcommand, Debug)]
pub enum UsptoCmd {
    /// Patent file wrapper applications
    #[command(subcommand)]
    Patent(PatentCmd),
    /// Bulk dataset products
    #[command(subcommand)]
    Bulk(BulkCmd),
    /// Petition decisions
    #[command(subcommand)]
    Petitions(PetitionsCmd),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Query, e.g. applicationMetaData.applicationTypeLabelName:Utility
    #[clap(short, long)]
    pub q: Option<String>,
    #[clap(long, default_value_t = 0)]
    pub offset: u32,
    #[clap(long, default_value_t = 25)]
    pub limit: u32,
    #[clap(long, num_args = 1..)]
    pub fields: Vec<String>,
}

impl SearchArgs {
    fn request(&self) -> SearchRequest {
        SearchRequest::new()
            .q(self.q.as_deref())
            .fields(&self.fields)
            .page(self.offset, self.limit)
    }
}

#[derive(Subcommand, Debug)]
pub enum PatentCmd {
    /// Search applications
    Search {
        #[command(flatten)]
        search: SearchArgs,
        #[clap(long = "facet", num_args = 1..)]
        facets: Vec<String>,
    },
    /// Download search results
    Download {
        #[command(flatten)]
        search: SearchArgs,
        #[clap(long = "facet", num_args = 1..)]
        facets: Vec<String>,
        /// File to write; without it only the byte count is printed
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// Full file wrapper for one application
    Get { application_number: String },
    #[command(name = "meta-data")]
    MetaData { application_number: String },
    Adjustment { application_number: String },
    Assignment { application_number: String },
    Attorney { application_number: String },
    Continuity { application_number: String },
    #[command(name = "foreign-priority")]
    ForeignPriority { application_number: String },
    Transactions { application_number: String },
    Documents { application_number: String },
    #[command(name = "associated-documents")]
    AssociatedDocuments { application_number: String },
    /// Application status codes
    #[command(name = "status-codes")]
    StatusCodes {
        #[clap(short, long)]
        q: Option<String>,
    },
}

impl PatentCmd {
    /// Resource subcommands map onto one `/applications/{n}/{resource}` call
    fn resource(&self) -> Option<(&str, ApplicationResource)> {
        let (number, resource) = match self {
            PatentCmd::MetaData { application_number } => (application_number, ApplicationResource::MetaData),
            PatentCmd::Adjustment { application_number } => (application_number, ApplicationResource::Adjustment),
            PatentCmd::Assignment { application_number } => (application_number, ApplicationResource::Assignment),
            PatentCmd::Attorney { application_number } => (application_number, ApplicationResource::Attorney),
            PatentCmd::Continuity { application_number } => (application_number, ApplicationResource::Continuity),
            PatentCmd::ForeignPriority { application_number } => {
                (application_number, ApplicationResource::ForeignPriority)
            }
            PatentCmd::Transactions { application_number } => (application_number, ApplicationResource::Transactions),
            PatentCmd::Documents { application_number } => (application_number, ApplicationResource::Documents),
            PatentCmd::AssociatedDocuments { application_number } => {
                (application_number, ApplicationResource::AssociatedDocuments)
            }
            _ => return None,
        };
        Some((number.as_str(), resource))
    }
}

#[derive(Subcommand, Debug)]
pub enum BulkCmd {
    /// Search bulk data products
    Search {
        #[clap(short, long)]
        q: Option<String>,
        #[clap(long, default_value_t = 10)]
        limit: u32,
    },
    /// One product by identifier
    Get {
        product_identifier: String,
        #[clap(long)]
        include_files: bool,
        #[clap(long)]
        latest: bool,
        #[clap(long)]
        limit: Option<u32>,
    },
    /// Download a product file by its fileDownloadURI
    #[command(name = "download-file")]
    DownloadFile {
        file_download_uri: String,
        #[clap(long)]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum PetitionsCmd {
    /// Search petition decisions
    Search {
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Download decision search results
    Download {
        #[command(flatten)]
        search: SearchArgs,
        /// json or csv
        #[clap(long, default_value = "json")]
        format: String,
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// One decision by record identifier
    Get {
        decision_id: String,
        #[clap(long)]
        include_documents: bool,
    },
}

fn report(download: &Download) {
    println!("{}", download.describe());
}

pub async fn run(args: UsptoArgs) -> Result<()> {
    let method = MethodStrategy::parse(&args.method)?;
    let config = UsptoConfig::resolved(args.api_key.as_deref()).with_troubleshoot(args.troubleshoot);
    let client = UsptoClient::new(config)?;
    let compact = args.compact;

    match args.command {
        UsptoCmd::Patent(cmd) => {
            if let Some((number, resource)) = cmd.resource() {
                return print_json(&client.get_application_resource(number, resource).await?, compact);
            }
            let value = match cmd {
                PatentCmd::Search { search, facets } => {
                    let request = search.request().facets(&facets);
                    client.search_applications(&request, method).await?
                }
                PatentCmd::Download { search, facets, out } => {
                    let request = search.request().facets(&facets);
                    let download = client.download_search(&request, method, out.as_deref()).await?;
                    report(&download);
                    return Ok(());
                }
                PatentCmd::Get { application_number } => client.get_application(&application_number).await?,
                PatentCmd::StatusCodes { q } => client.get_status_codes(q.as_deref(), method).await?,
                other => bail!("unhandled patent command {:?}", other),
            };
            print_json(&value, compact)
        }
        UsptoCmd::Bulk(cmd) => match cmd {
            BulkCmd::Search { q, limit } => {
                let search = ProductSearch::new().q(q.as_deref()).limit(Some(limit));
                print_json(&client.search_products(&search).await?, compact)
            }
            BulkCmd::Get {
                product_identifier,
                include_files,
                latest,
                limit,
            } => {
                let query = ProductQuery {
                    include_files: include_files.then_some(true),
                    latest: latest.then_some(true),
                    limit,
                    ..Default::default()
                };
                print_json(&client.get_product(&product_identifier, &query).await?, compact)
            }
            BulkCmd::DownloadFile { file_download_uri, out } => {
                let download = client.download_product_file(&file_download_uri, Some(&out)).await?;
                report(&download);
                Ok(())
            }
        },
        UsptoCmd::Petitions(cmd) => match cmd {
            PetitionsCmd::Search { search } => {
                print_json(&client.search_decisions(&search.request(), method).await?, compact)
            }
            PetitionsCmd::Download { search, format, out } => {
                let request = search.request().format(Some(&format));
                let download = client.download_search_decisions(&request, method, out.as_deref()).await?;
                report(&download);
                Ok(())
            }
            PetitionsCmd::Get {
                decision_id,
                include_documents,
            } => print_json(
                &client.get_decision(&decision_id, include_documents.then_some(true)).await?,
                compact,
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use serde_json::json;

    fn uspto(args: &[&str]) -> UsptoArgs {
        let mut argv = vec!["ind", "uspto"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Uspto(args) => args,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_patent_search_request() {
        let args = uspto(&["patent", "search", "-q", "Utility", "--limit", "5", "--facet", "applicationTypeCode"]);
        assert_eq!(args.method, "auto");
        let UsptoCmd::Patent(PatentCmd::Search { search, facets }) = args.command else {
            panic!("expected patent search");
        };
        let body = search.request().facets(&facets).to_body();
        assert_eq!(body["q"], json!("Utility"));
        assert_eq!(body["pagination"], json!({"offset": 0, "limit": 5}));
        assert_eq!(body["facets"], json!(["applicationTypeCode"]));
    }

    #[test]
    fn test_resource_subcommands() {
        let UsptoCmd::Patent(cmd) = uspto(&["patent", "foreign-priority", "14412875"]).command else {
            panic!("expected patent");
        };
        assert_eq!(cmd.resource(), Some(("14412875", ApplicationResource::ForeignPriority)));

        let UsptoCmd::Patent(cmd) = uspto(&["patent", "get", "14412875"]).command else {
            panic!("expected patent");
        };
        assert_eq!(cmd.resource(), None);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = uspto(&["bulk", "search", "--method", "POST", "--troubleshoot"]);
        assert_eq!(MethodStrategy::parse(&args.method).unwrap(), MethodStrategy::Post);
        assert!(args.troubleshoot);
        match args.command {
            UsptoCmd::Bulk(BulkCmd::Search { q, limit }) => {
                assert!(q.is_none());
                assert_eq!(limit, 10);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_download_file_requires_out() {
        let argv = ["ind", "uspto", "bulk", "download-file", "https://data.uspto.gov/x.zip"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_petitions_download_format() {
        let UsptoCmd::Petitions(PetitionsCmd::Download { search, format, out }) =
            uspto(&["petitions", "download", "--format", "csv"]).command
        else {
            panic!("expected petitions download");
        };
        assert_eq!(format, "csv");
        assert!(out.is_none());
        let body = search.request().format(Some(&format)).to_body();
        assert_eq!(body["format"], json!("csv"));
    }
}
