//! WebDriver Commands

use anyhow::Result;
use storefront_e2e::webdriver::Browser;
use storefront_e2e::{HarnessConfig, WebDriverClient};
use tracing::info;

use crate::output::{print_error, print_success};

pub fn execute(config: &HarnessConfig) -> Result<bool> {
    info!("Checking WebDriver at {}", config.webdriver.url);

    let mut client = match WebDriverClient::connect(&config.webdriver) {
        Ok(client) => client,
        Err(e) => {
            print_error(&format!("Cannot start a session at {}: {}", config.webdriver.url, e));
            return Ok(false);
        }
    };

    let session = client.session_id().unwrap_or_default().to_string();
    client.quit()?;
    print_success(&format!("Session {} opened and closed at {}", session, config.webdriver.url));
    Ok(true)
}
