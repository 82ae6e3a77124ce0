//! Storefront harness CLI
//!
//! Operator commands around the UI test harness: inspecting results,
//! resetting login rate-limits, managing screenshot evidence and checking
//! that a WebDriver endpoint accepts sessions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use storefront_e2e::{init_tracing, HarnessConfig};

mod commands;
mod output;

use commands::{driver, evidence, logins, results};

/// Storefront UI test harness
#[derive(Parser)]
#[command(name = "storefront")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Harness configuration file (defaults apply when missing)
    #[arg(short, long, default_value = "storefront.toml", global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the results of the last run
    Results(results::ResultsArgs),

    /// Clear login rate-limit records for an account
    ResetLogins(logins::ResetLoginsArgs),

    /// Manage captured screenshots
    #[command(subcommand)]
    Evidence(evidence::EvidenceCommands),

    /// Open and close a WebDriver session
    CheckDriver,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let mut config = HarnessConfig::load_or_default(&cli.config)?;
    config.apply_env_overrides();

    let ok = match cli.command {
        Commands::Results(args) => results::execute(args, &config, cli.format)?,
        Commands::ResetLogins(args) => logins::execute(args, &config)?,
        Commands::Evidence(cmd) => evidence::execute(cmd, &config)?,
        Commands::CheckDriver => driver::execute(&config)?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
