use crate::aggregator::{
    build_company_intel, render_json, render_table, write_csv_dir, write_html, IntelOptions, IntelSources, ReportFormat,
};
use crate::clinical_trials::{ClinicalTrialsClient, ClinicalTrialsConfig};
use crate::naaccr::NaaccrClient;
use crate::openfda::{OpenFdaClient, OpenFdaConfig};
use crate::pubchem::{PubChemClient, PubChemConfig};
use crate::uspto::{UsptoClient, UsptoConfig};
use crate::utils::Timer;
use anyhow::{bail, Context, Result};
use clap::Args;
use log::info;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct IntelArgs {
    /// Company or sponsor name
    pub company: String,
    #[clap(long, default_value_t = 50)]
    pub trial_limit: usize,
    /// json, table, html or csv
    #[clap(long, default_value = "table")]
    pub format: String,
    /// Output file (directory for csv); required for html and csv
    #[clap(short, long)]
    pub output: Option<PathBuf>,
    #[clap(long)]
    pub openfda_api_key: Option<String>,
    #[clap(long)]
    pub uspto_api_key: Option<String>,
    #[clap(long)]
    pub no_openfda: bool,
    #[clap(long)]
    pub no_trials: bool,
    #[clap(long)]
    pub no_naaccr: bool,
    #[clap(long)]
    pub no_uspto: bool,
    #[clap(long)]
    pub no_pubchem: bool,
}

impl IntelArgs {
    /// USPTO is only queried when a key resolves
    fn sources(&self) -> Result<IntelSources> {
        let mut sources = IntelSources::default();
        if !self.no_openfda {
            sources.openfda = Some(OpenFdaClient::new(OpenFdaConfig::resolved(self.openfda_api_key.as_deref()))?);
        }
        if !self.no_trials {
            let config = ClinicalTrialsConfig::default().with_rate_limit(Some(2.0));
            sources.trials = Some(ClinicalTrialsClient::new(config)?);
        }
        if !self.no_naaccr {
            sources.naaccr = Some(NaaccrClient::default_client()?);
        }
        if !self.no_uspto {
            let config = UsptoConfig::resolved(self.uspto_api_key.as_deref());
            if config.api_key.is_some() {
                sources.uspto = Some(UsptoClient::new(config)?);
            } else {
                info!("[intel] no USPTO key; patents section left empty");
            }
        }
        if !self.no_pubchem {
            sources.pubchem = Some(PubChemClient::new(PubChemConfig::default())?);
        }
        Ok(sources)
    }
}

pub async fn run(args: IntelArgs) -> Result<()> {
    let format = ReportFormat::parse(&args.format)?;
    if matches!(format, ReportFormat::Html | ReportFormat::Csv) && args.output.is_none() {
        bail!("Please provide -o/--output for --format {}", format.name());
    }

    let sources = args.sources()?;
    let options = IntelOptions::default().with_trial_limit(args.trial_limit);
    let timer = Timer::start("[intel] report");
    let intel = build_company_intel(&args.company, &sources, &options).await;
    timer.stop();

    match (format, args.output.as_deref()) {
        (ReportFormat::Table, _) => println!("{}", render_table(&intel)),
        (ReportFormat::Json, None) => println!("{}", render_json(&intel)?),
        (ReportFormat::Json, Some(path)) => {
            fs::write(path, render_json(&intel)?).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        (ReportFormat::Html, path) => {
            let path = path.context("Please provide -o/--output for --format html")?;
            println!("Wrote {}", write_html(&intel, path)?.display());
        }
        (ReportFormat::Csv, dir) => {
            let dir = dir.context("Please provide -o/--output for --format csv")?;
            for path in write_csv_dir(&intel, dir)? {
                println!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn intel(args: &[&str]) -> IntelArgs {
        let mut argv = vec!["ind", "intel"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Intel(args) => args,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let args = intel(&["Pfizer"]);
        assert_eq!(args.company, "Pfizer");
        assert_eq!(args.trial_limit, 50);
        assert_eq!(args.format, "table");
        assert!(args.output.is_none());
    }

    #[test]
    fn test_disabled_sources_stay_empty() {
        let args = intel(&[
            "Acme",
            "--no-openfda",
            "--no-trials",
            "--no-naaccr",
            "--no-uspto",
            "--no-pubchem",
        ]);
        let sources = args.sources().unwrap();
        assert!(sources.openfda.is_none());
        assert!(sources.trials.is_none());
        assert!(sources.naaccr.is_none());
        assert!(sources.uspto.is_none());
        assert!(sources.pubchem.is_none());
    }

    #[tokio::test]
    async fn test_html_requires_output() {
        let err = run(intel(&["Acme", "--format", "html"])).await.unwrap_err();
        assert!(err.to_string().contains("-o/--output"));
    }

    #[tokio::test]
    async fn test_csv_dir_with_no_sources() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report");
        let out_arg = out.to_string_lossy().to_string();
        let args = intel(&[
            "Acme",
            "--format",
            "csv",
            "-o",
            &out_arg,
            "--no-openfda",
            "--no-trials",
            "--no-naaccr",
            "--no-uspto",
            "--no-pubchem",
        ]);
        run(args).await.unwrap();
        assert!(out.join("drugs_approved.csv").exists());
        assert!(out.join("competitors.csv").exists());
    }
}
