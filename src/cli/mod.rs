// Command-line surface: clap derive tree plus per-service dispatch

pub mod config;
pub mod gen;
pub mod intel;
pub mod naaccr;
pub mod ncbi;
pub mod openfda;
pub mod pubchem;
pub mod seer;
pub mod trials;
pub mod uspto;

use crate::autocomplete::{self, detect_shell, Shell};
use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ind",
    version,
    about = "Investigational New Drug toolkit: biomedical and regulatory APIs plus tabular helpers"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); falls back to IND_LOG, then warn
    #[clap(long, global = true)]
    pub log_level: Option<String>,
    /// Also write rotating log files into this directory
    #[clap(long, global = true)]
    pub log_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install shell completion for ind
    Autocomplete(AutocompleteArgs),
    /// Read and write ~/.config/ind/.config.json
    #[command(subcommand)]
    Config(config::ConfigCmd),
    /// Local table, statistics, plotting and file helpers
    #[command(subcommand)]
    Gen(gen::GenCmd),
    /// PubChem PUG-REST
    Pubchem(pubchem::PubchemArgs),
    /// openFDA endpoints
    #[command(subcommand)]
    Openfda(openfda::OpenfdaCmd),
    /// ClinicalTrials.gov API v2
    #[command(subcommand)]
    Trials(trials::TrialsCmd),
    /// NCBI Entrez E-utilities
    Ncbi(ncbi::NcbiArgs),
    /// NAACCR data dictionary
    #[command(subcommand)]
    Naaccr(naaccr::NaaccrCmd),
    /// SEER API
    Seer(seer::SeerArgs),
    /// USPTO Open Data Portal
    Uspto(uspto::UsptoArgs),
    /// Company intelligence report across all sources
    Intel(intel::IntelArgs),
}

#[derive(Args, Debug)]
pub struct AutocompleteArgs {
    /// bash or zsh; detected from $SHELL when omitted
    #[clap(long)]
    pub shell: Option<String>,
    /// Write the script to stdout instead of installing it
    #[clap(long)]
    pub print: bool,
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Autocomplete(args) => run_autocomplete(&args),
        Commands::Config(cmd) => config::run(cmd),
        Commands::Gen(cmd) => gen::run(cmd),
        Commands::Pubchem(args) => pubchem::run(args).await,
        Commands::Openfda(cmd) => openfda::run(cmd).await,
        Commands::Trials(cmd) => trials::run(cmd).await,
        Commands::Ncbi(args) => ncbi::run(args).await,
        Commands::Naaccr(cmd) => naaccr::run(cmd).await,
        Commands::Seer(args) => seer::run(args).await,
        Commands::Uspto(args) => uspto::run(args).await,
        Commands::Intel(args) => intel::run(args).await,
    }
}

fn run_autocomplete(args: &AutocompleteArgs) -> Result<()> {
    let shell = match &args.shell {
        Some(s) => Shell::parse(s)?,
        None => detect_shell()?,
    };
    let cmd = Cli::command();
    if args.print {
        print!("{}", autocomplete::completion_script(shell, &cmd));
        return Ok(());
    }
    let report = autocomplete::install(shell, &cmd)?;
    println!("✓ Shell completion: {}", report.summary());
    println!("  Restart your shell or run: source {}", report.rc_file.display());
    Ok(())
}

// ============================================================================
// OUTPUT HELPERS
// ============================================================================

/// JSON to stdout, pretty unless `compact`
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", text);
    Ok(())
}

/// `a,b , c` → `["a", "b", "c"]`, dropping empties
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub(crate) fn split_opt(raw: Option<&str>) -> Option<Vec<String>> {
    raw.map(split_list).filter(|v| !v.is_empty())
}

/// `key=value` pairs from repeated `--param` flags
pub(crate) fn key_values(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|kv| {
            kv.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| anyhow::anyhow!("expected key=value, got '{}'", kv))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ind", "config", "get", "X", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Commands::Config(_)));
    }

    #[test]
    fn test_autocomplete_flags() {
        let cli = Cli::try_parse_from(["ind", "autocomplete", "--shell", "zsh", "--print"]).unwrap();
        match cli.command {
            Commands::Autocomplete(args) => {
                assert_eq!(args.shell.as_deref(), Some("zsh"));
                assert!(args.print);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_split_helpers() {
        assert_eq!(split_list("a, b,,c "), vec!["a", "b", "c"]);
        assert_eq!(split_opt(Some(" , ")), None);
        assert_eq!(split_opt(None), None);
        let kv = key_values(&["a=1".to_string(), "b=x=y".to_string()]).unwrap();
        assert_eq!(kv, vec![("a".to_string(), "1".to_string()), ("b".to_string(), "x=y".to_string())]);
        assert!(key_values(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_completion_covers_nested_commands() {
        let script = autocomplete::completion_script(Shell::Bash, &Cli::command());
        assert!(script.contains("\"ind gen stat\""));
        assert!(script.contains("\"ind uspto patent\""));
    }
}
