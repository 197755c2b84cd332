//! converge - declarative Google Workspace and SCIM account management
//!
//! Prints the run's result document as JSON on stdout; logs go to stderr.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use converge_cli::commands::{self, Commands, Report};
use converge_cli::config::Config;
use converge_cli::error::{CliError, CliResult};

/// Converge one directory resource to its declared state
#[derive(Parser)]
#[command(name = "converge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load .env if present
    let _ = dotenvy::dotenv();

    match run(cli).await {
        Ok(report) => {
            if let Some(e) = report.failure() {
                e.print();
                std::process::exit(e.exit_code());
            }
            std::process::exit(0);
        }
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<Report> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let report = commands::execute(cli.command, &config).await?;
    let rendered = serde_json::to_string_pretty(&report).map_err(CliError::from)?;
    println!("{rendered}");
    Ok(report)
}
