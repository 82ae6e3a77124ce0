//! Results Commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use storefront_e2e::report::read_results;
use storefront_e2e::HarnessConfig;

use crate::output::{print_error, print_info, print_list, print_success, OutputFormat};

#[derive(Args)]
pub struct ResultsArgs {
    /// Results file (defaults to the configured one)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Print the failure reason of every failed scenario
    #[arg(long)]
    details: bool,
}

/// Returns false when the run had failures.
pub fn execute(args: ResultsArgs, config: &HarnessConfig, format: OutputFormat) -> Result<bool> {
    let path = args.file.unwrap_or_else(|| config.results_path());
    let suite = read_results(&path).with_context(|| format!("reading {}", path.display()))?;

    print_list(&suite.results, format);

    if args.details {
        for result in suite.results.iter().filter(|r| !r.passed()) {
            println!();
            println!("{}", result.node_id);
            println!("{}", result.error.as_deref().unwrap_or("unknown error"));
        }
    }

    let summary = format!(
        "{} passed, {} failed ({} ms)",
        suite.passed, suite.failed, suite.duration_ms
    );
    if suite.total == 0 {
        print_info("No scenarios in results");
    } else if suite.success() {
        print_success(&summary);
    } else {
        print_error(&summary);
    }

    Ok(suite.success())
}
