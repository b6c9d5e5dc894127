use anyhow::Result;
use clap::Parser;
use ind::cli::{self, Cli};
use ind::config::maybe_first_run_notice;
use ind::logging::{init_logging, resolve_level};
use ind::VERSION;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&resolve_level(cli.log_level.as_deref()), cli.log_dir.as_deref())?;

    if let Some(notice) = maybe_first_run_notice(VERSION) {
        eprintln!("{}", notice);
    }

    cli::run(cli).await
}
