//! Harness configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::logging::DEFAULT_LOGGER;
use crate::soft_assert::CapturePolicy;

/// Top-level harness configuration, usually read from `storefront.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root of everything the harness writes (screenshots, results)
    pub reports_dir: PathBuf,

    /// Evidence directory, relative to `reports_dir`
    pub screenshots_subdir: String,

    /// Results file name, relative to `reports_dir`
    pub results_file: String,

    /// Logger used by soft assertions
    pub logger_name: String,

    /// Which failing checks capture a screenshot
    pub capture_policy: CapturePolicy,

    pub webdriver: WebDriverConfig,

    pub database: DatabaseConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            screenshots_subdir: "screenshots".to_string(),
            results_file: "test-results.json".to_string(),
            logger_name: DEFAULT_LOGGER.to_string(),
            capture_policy: CapturePolicy::default(),
            webdriver: WebDriverConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Read a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: HarnessConfig = toml::from_str(&raw)?;
        info!("Loaded harness config from {}", path.display());
        Ok(config)
    }

    /// Read a TOML config file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Apply `STOREFRONT_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("STOREFRONT_WEBDRIVER_URL") {
            self.webdriver.url = url;
        }
        if let Some(base_url) = lookup("STOREFRONT_BASE_URL") {
            self.webdriver.base_url = base_url;
        }
        if let Some(dir) = lookup("STOREFRONT_REPORTS_DIR") {
            self.reports_dir = PathBuf::from(dir);
        }
        if let Some(db) = lookup("STOREFRONT_DB_PATH") {
            self.database.path = PathBuf::from(db);
        }
    }

    /// Directory where evidence screenshots are written.
    pub fn screenshot_dir(&self) -> PathBuf {
        self.reports_dir.join(&self.screenshots_subdir)
    }

    /// Where suite results are persisted.
    pub fn results_path(&self) -> PathBuf {
        self.reports_dir.join(&self.results_file)
    }
}

/// Browser session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// WebDriver endpoint (chromedriver, Selenium grid)
    pub url: String,

    /// Storefront root the scenarios navigate relative to
    pub base_url: String,

    /// Browser name sent in the capabilities
    pub browser: String,

    pub headless: bool,

    pub start_maximized: bool,

    /// Turn off password manager, credential service and autofill prompts
    pub disable_credential_prompts: bool,

    /// Floor applied to every element lookup
    pub implicit_wait_secs: u64,

    /// Default timeout for explicit waits
    pub explicit_wait_secs: u64,

    pub poll_interval_ms: u64,

    /// HTTP timeout for a single WebDriver command
    pub request_timeout_secs: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9515".to_string(),
            base_url: "http://localhost/opencart/upload/".to_string(),
            browser: "chrome".to_string(),
            headless: false,
            start_maximized: true,
            disable_credential_prompts: true,
            implicit_wait_secs: 10,
            explicit_wait_secs: 15,
            poll_interval_ms: 500,
            request_timeout_secs: 30,
        }
    }
}

impl WebDriverConfig {
    pub fn implicit_wait(&self) -> Duration {
        Duration::from_secs(self.implicit_wait_secs)
    }

    pub fn explicit_wait(&self) -> Duration {
        Duration::from_secs(self.explicit_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Storefront database used by the login-attempt reset helper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,

    /// Table holding rate-limiting records
    pub login_table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("opencart.db"),
            login_table: "oc_customer_login".to_string(),
        }
    }
}
