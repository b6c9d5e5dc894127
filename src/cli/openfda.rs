use crate::openfda::client::DEFAULT_BASE_URL;
use crate::openfda::{Endpoint, OpenFdaClient, OpenFdaConfig, QueryParams};
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde_json::json;

use super::{key_values, print_json};

#[derive(Args, Debug, Clone)]
pub struct FdaClientArgs {
    /// Falls back to OPENFDA_API_KEY, then the config store
    #[clap(long)]
    pub api_key: Option<String>,
    #[clap(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
    #[clap(long, default_value_t = 30.0)]
    pub timeout: f64,
    #[clap(long, default_value_t = 3)]
    pub retries: u32,
    #[clap(long, default_value_t = 1.5)]
    pub backoff: f64,
    /// Extra query parameter, repeatable
    #[clap(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
    #[clap(long)]
    pub compact: bool,
}

impl FdaClientArgs {
    fn client(&self) -> Result<OpenFdaClient> {
        let config = OpenFdaConfig::resolved(self.api_key.as_deref())
            .with_base_url(&self.base_url)
            .with_timeout(self.timeout)
            .with_retries(self.retries)
            .with_backoff_factor(self.backoff);
        Ok(OpenFdaClient::new(config)?)
    }

    fn apply(&self, mut params: QueryParams) -> Result<QueryParams> {
        for (k, v) in key_values(&self.params)? {
            params = params.param(&k, &v);
        }
        Ok(params)
    }
}

#[derive(Subcommand, Debug)]
pub enum OpenfdaCmd {
    /// Search an endpoint: `ind openfda query drug/event --search 'patient.reaction.reactionmeddrapt:"Headache"'`
    Query {
        /// Endpoint path, e.g. drug/label
        endpoint: String,
        /// Lucene-style search expression
        #[clap(long)]
        search: Option<String>,
        /// Records per request (max 1000)
        #[clap(long)]
        limit: Option<u32>,
        #[clap(long)]
        skip: Option<u32>,
        #[clap(long)]
        sort: Option<String>,
        /// asc or desc, appended to --sort
        #[clap(long)]
        order: Option<String>,
        /// Follow `skip` across pages up to this many records
        #[clap(long)]
        max_records: Option<usize>,
        #[command(flatten)]
        client: FdaClientArgs,
    },
    /// Facet counts: `ind openfda count drug/label openfda.brand_name --exact`
    Count {
        endpoint: String,
        /// Field to facet on
        field: String,
        #[clap(long)]
        search: Option<String>,
        #[clap(long)]
        limit: Option<u32>,
        #[clap(long)]
        skip: Option<u32>,
        /// Suffix the field with `.exact`
        #[clap(long)]
        exact: bool,
        #[command(flatten)]
        client: FdaClientArgs,
    },
    /// List the known endpoints
    Endpoints,
}

/// `field` plus an optional `asc|desc` → `field:asc`
fn sort_expr(sort: Option<&str>, order: Option<&str>) -> Result<Option<String>> {
    match (sort, order) {
        (Some(s), Some(o)) if o == "asc" || o == "desc" => Ok(Some(format!("{}:{}", s, o))),
        (_, Some(o)) if o != "asc" && o != "desc" => bail!("--order must be asc or desc, got '{}'", o),
        (None, Some(_)) => bail!("--order needs --sort"),
        (s, _) => Ok(s.map(String::from)),
    }
}

pub async fn run(cmd: OpenfdaCmd) -> Result<()> {
    match cmd {
        OpenfdaCmd::Query {
            endpoint,
            search,
            limit,
            skip,
            sort,
            order,
            max_records,
            client,
        } => {
            let endpoint = Endpoint::parse(&endpoint)?;
            let mut params = QueryParams::new();
            if let Some(s) = &search {
                params = params.search(s);
            }
            if let Some(l) = limit {
                params = params.limit(l);
            }
            if let Some(s) = skip {
                params = params.skip(s);
            }
            if let Some(s) = sort_expr(sort.as_deref(), order.as_deref())? {
                params = params.sort(&s);
            }
            let params = client.apply(params)?;
            let api = client.client()?;
            match max_records {
                Some(max) => {
                    let results = api.paginate(endpoint, &params, Some(max)).await?;
                    print_json(&json!({ "results": results }), client.compact)
                }
                None => {
                    let value = api.request_json(&endpoint.path(), params.to_pairs()).await?;
                    print_json(&value, client.compact)
                }
            }
        }
        OpenfdaCmd::Count {
            endpoint,
            field,
            search,
            limit,
            skip,
            exact,
            client,
        } => {
            let endpoint = Endpoint::parse(&endpoint)?;
            let field = if exact && !field.ends_with(".exact") {
                format!("{}.exact", field)
            } else {
                field
            };
            let mut params = QueryParams::new().count(&field);
            if let Some(s) = &search {
                params = params.search(s);
            }
            if let Some(l) = limit {
                params = params.limit(l);
            }
            if let Some(s) = skip {
                params = params.skip(s);
            }
            let params = client.apply(params)?;
            let value = client.client()?.request_json(&endpoint.path(), params.to_pairs()).await?;
            print_json(&value, client.compact)
        }
        OpenfdaCmd::Endpoints => {
            for endpoint in Endpoint::ALL {
                println!("{:<32} {}", endpoint.name(), endpoint.description());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_sort_expr() {
        assert_eq!(sort_expr(Some("receivedate"), Some("desc")).unwrap().as_deref(), Some("receivedate:desc"));
        assert_eq!(sort_expr(Some("receivedate"), None).unwrap().as_deref(), Some("receivedate"));
        assert_eq!(sort_expr(None, None).unwrap(), None);
        assert!(sort_expr(Some("x"), Some("up")).is_err());
        assert!(sort_expr(None, Some("asc")).is_err());
    }

    #[test]
    fn test_count_parses_positionals() {
        let cli = Cli::try_parse_from([
            "ind", "openfda", "count", "drug/label", "openfda.brand_name", "--exact", "--limit", "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Openfda(OpenfdaCmd::Count {
                endpoint, field, exact, limit, client, ..
            }) => {
                assert_eq!(endpoint, "drug/label");
                assert_eq!(field, "openfda.brand_name");
                assert!(exact);
                assert_eq!(limit, Some(10));
                assert_eq!(client.base_url, DEFAULT_BASE_URL);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_extra_params_appended() {
        let args = FdaClientArgs {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: 30.0,
            retries: 3,
            backoff: 1.5,
            params: vec!["foo=bar".to_string()],
            compact: false,
        };
        let params = args.apply(QueryParams::new().search("x:y")).unwrap();
        let pairs = params.to_pairs();
        assert!(pairs.contains(&("foo".to_string(), "bar".to_string())));
        assert!(pairs.contains(&("search".to_string(), "x:y".to_string())));
    }
}
