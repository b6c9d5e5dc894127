use crate::pubchem::client::is_text_like;
use crate::pubchem::{save, PubChemClient, PubChemConfig, PugRequest};
use anyhow::{bail, Context, Result};
use clap::Args;
use reqwest::Method;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use super::key_values;

/// Raw PUG-REST call: `ind pubchem compound/cid/2244 property/MolecularFormula JSON`
#[derive(Args, Debug)]
pub struct PubchemArgs {
    /// <domain>/<namespace>/<identifiers>, e.g. compound/name/aspirin
    pub input_spec: String,
    /// record, synonyms, property/<tags>, cids, ...
    pub operation_spec: Option<String>,
    /// JSON (default), XML, CSV, SDF, PNG, TXT, ...
    pub output_spec: Option<String>,
    /// Operation option, repeatable: --opt record_type=3d
    #[clap(long = "opt", value_name = "KEY=VALUE")]
    pub opts: Vec<String>,
    /// Form field for POST, repeatable
    #[clap(long = "post", value_name = "KEY=VALUE")]
    pub post: Vec<String>,
    /// GET or POST
    #[clap(long, default_value = "GET")]
    pub method: String,
    #[clap(long)]
    pub accept: Option<String>,
    /// Content type of --data-file
    #[clap(long)]
    pub content_type: Option<String>,
    /// Raw POST body (e.g. an SDF) read from this file
    #[clap(long)]
    pub data_file: Option<PathBuf>,
    #[clap(long, default_value_t = 60.0)]
    pub timeout: f64,
    #[clap(long, default_value_t = 5.0)]
    pub max_rps: f64,
    #[clap(long, default_value_t = 3)]
    pub retries: u32,
    /// Write the response here instead of stdout
    #[clap(short, long)]
    pub output: Option<PathBuf>,
    #[clap(short, long)]
    pub quiet: bool,
    /// Return non-2xx responses instead of failing
    #[clap(long)]
    pub no_raise: bool,
}

impl PubchemArgs {
    fn method(&self) -> Result<Method> {
        match self.method.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            other => bail!("--method must be GET or POST, got '{}'", other),
        }
    }

    fn request(&self) -> Result<PugRequest> {
        let mut req = PugRequest::new(&self.input_spec)
            .operation(self.operation_spec.as_deref())
            .options(key_values(&self.opts)?)
            .accept(self.accept.as_deref())
            .method(self.method()?);
        if let Some(output) = &self.output_spec {
            req = req.output(Some(output));
        }
        if !self.post.is_empty() {
            req = req.post(key_values(&self.post)?);
        }
        if let Some(path) = &self.data_file {
            let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let content_type = self.content_type.as_deref().unwrap_or("application/octet-stream");
            req = req.data(content_type, bytes);
        }
        Ok(req)
    }
}

pub async fn run(args: PubchemArgs) -> Result<()> {
    let client = PubChemClient::new(
        PubChemConfig::default()
            .with_timeout(args.timeout)
            .with_max_rps(args.max_rps)
            .with_retries(args.retries),
    )?;
    let req = args.request()?;
    let resp = client.request(&req, !args.no_raise).await?;

    if let Some(path) = &args.output {
        let written = save(&resp, path)?;
        if !args.quiet {
            println!("✓ Saved {}", written.display());
        }
    } else if !args.quiet {
        if is_text_like(resp.content_type.as_deref()) {
            println!("{}", resp.text());
        } else {
            std::io::stdout().write_all(&resp.body)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(args: &[&str]) -> PubchemArgs {
        let mut argv = vec!["ind", "pubchem"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Pubchem(args) => args,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_request_from_positionals() {
        let args = parse(&["compound/name/aspirin", "cids", "TXT", "--opt", "name_type=word"]);
        let req = args.request().unwrap();
        assert_eq!(req.input, "compound/name/aspirin");
        assert_eq!(req.operation.as_deref(), Some("cids"));
        assert_eq!(req.output.as_deref(), Some("TXT"));
        assert_eq!(req.options, vec![("name_type".to_string(), "word".to_string())]);
        assert_eq!(req.method, Method::GET);
    }

    #[test]
    fn test_output_defaults_to_json() {
        let req = parse(&["compound/cid/2244"]).request().unwrap();
        assert_eq!(req.output.as_deref(), Some("JSON"));
        assert_eq!(req.operation, None);
    }

    #[test]
    fn test_post_fields_switch_method() {
        let args = parse(&["compound/cid/property/MolecularWeight", "--post", "cid=1,2,3"]);
        let req = args.request().unwrap();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.post, vec![("cid".to_string(), "1,2,3".to_string())]);
    }

    #[test]
    fn test_bad_method_and_option() {
        assert!(parse(&["compound/cid/1", "--method", "PUT"]).request().is_err());
        assert!(parse(&["compound/cid/1", "--opt", "novalue"]).request().is_err());
    }
}
