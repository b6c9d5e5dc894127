use crate::naaccr::endpoints::summarize_item;
use crate::naaccr::NaaccrClient;
use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::Value;
use std::time::Duration;

use super::print_json;

#[derive(Args, Debug, Clone)]
pub struct NaaccrClientArgs {
    #[clap(long)]
    pub base_url: Option<String>,
    #[clap(long, default_value_t = 15.0)]
    pub timeout: f64,
    #[clap(long)]
    pub compact: bool,
}

impl NaaccrClientArgs {
    fn client(&self) -> Result<NaaccrClient> {
        Ok(NaaccrClient::new(self.base_url.as_deref(), self.timeout)?)
    }
}

#[derive(Subcommand, Debug)]
pub enum NaaccrCmd {
    /// List NAACCR versions
    Versions {
        #[command(flatten)]
        client: NaaccrClientArgs,
    },
    /// One data item by ItemNumber or XmlNaaccrId
    Item {
        /// NAACCR version, e.g. 22
        #[clap(long = "naaccr-version", alias = "ver")]
        version: String,
        #[clap(long)]
        id: String,
        #[clap(long)]
        minimize: bool,
        #[command(flatten)]
        client: NaaccrClientArgs,
    },
    /// Search data items, following `next` links
    Search {
        #[clap(long = "naaccr-version", alias = "ver")]
        version: String,
        #[clap(long)]
        q: Option<String>,
        #[clap(long)]
        minimize: bool,
        /// Max pages to fetch
        #[clap(long, default_value_t = 1)]
        pages: usize,
        /// Seconds between page requests
        #[clap(long, default_value_t = 0.25)]
        delay: f64,
        /// Print only the summary fields of each item
        #[clap(long)]
        summary: bool,
        #[command(flatten)]
        client: NaaccrClientArgs,
    },
    /// Attribute history of an item across versions
    #[command(alias = "attr-history")]
    History {
        #[clap(long)]
        id: String,
        /// e.g. ItemLength
        #[clap(long)]
        attribute: String,
        #[command(flatten)]
        client: NaaccrClientArgs,
    },
    /// Operation history of an item in one version
    #[command(alias = "op-history")]
    Operations {
        #[clap(long = "naaccr-version", alias = "ver")]
        version: String,
        #[clap(long)]
        id: String,
        #[command(flatten)]
        client: NaaccrClientArgs,
    },
}

pub async fn run(cmd: NaaccrCmd) -> Result<()> {
    match cmd {
        NaaccrCmd::Versions { client } => print_json(&client.client()?.list_versions().await?, client.compact),
        NaaccrCmd::Item {
            version,
            id,
            minimize,
            client,
        } => print_json(&client.client()?.get_data_item(&version, &id, minimize).await?, client.compact),
        NaaccrCmd::Search {
            version,
            q,
            minimize,
            pages,
            delay,
            summary,
            client,
        } => {
            let items = client
                .client()?
                .search_data_items(&version, q.as_deref(), minimize, pages, Duration::from_secs_f64(delay.max(0.0)))
                .await?;
            let items: Vec<Value> = if summary { items.iter().map(summarize_item).collect() } else { items };
            print_json(&items, client.compact)
        }
        NaaccrCmd::History { id, attribute, client } => {
            print_json(&client.client()?.get_attribute_history(&id, &attribute).await?, client.compact)
        }
        NaaccrCmd::Operations { version, id, client } => {
            print_json(&client.client()?.get_operation_history(&version, &id).await?, client.compact)
        }
    }
}
