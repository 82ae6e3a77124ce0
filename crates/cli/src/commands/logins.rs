//! Login-attempt Commands

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use storefront_e2e::db::LoginAttemptStore;
use storefront_e2e::HarnessConfig;

use crate::output::print_success;

#[derive(Args)]
pub struct ResetLoginsArgs {
    /// Account whose attempts are cleared
    #[arg(short, long)]
    email: String,

    /// Database file (defaults to the configured one)
    #[arg(long)]
    db: Option<PathBuf>,
}

pub fn execute(args: ResetLoginsArgs, config: &HarnessConfig) -> Result<bool> {
    let path = args.db.unwrap_or_else(|| config.database.path.clone());
    let store = LoginAttemptStore::open(&path, &config.database.login_table)?;

    let removed = store.reset_login_attempts(&args.email)?;
    print_success(&format!(
        "Removed {} login attempt record(s) for {}",
        removed, args.email
    ));
    Ok(true)
}
