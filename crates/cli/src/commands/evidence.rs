//! Evidence Commands

use anyhow::Result;
use clap::Subcommand;
use storefront_e2e::{EvidenceStore, HarnessConfig};

use crate::output::{print_info, print_success};

#[derive(Subcommand)]
pub enum EvidenceCommands {
    /// List captured screenshots
    List,

    /// Delete captured screenshots
    Clean,
}

pub fn execute(cmd: EvidenceCommands, config: &HarnessConfig) -> Result<bool> {
    let store = EvidenceStore::from_config(config)?;

    match cmd {
        EvidenceCommands::List => {
            let files = store.list()?;
            if files.is_empty() {
                print_info(&format!("No screenshots in {}", store.dir().display()));
            }
            for file in files {
                println!("{}", file.display());
            }
        }
        EvidenceCommands::Clean => {
            let removed = store.clean()?;
            print_success(&format!("Removed {} screenshot(s)", removed));
        }
    }

    Ok(true)
}
