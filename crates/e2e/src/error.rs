//! Error types for the storefront harness

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Header line of the aggregated soft-assertion failure.
pub const AGGREGATED_FAILURE_HEADER: &str = "Soft assertion errors occurred:";

/// Separator between individual failure messages. Log scrapers split on it.
pub const FAILURE_SEPARATOR: &str = "\n\n";

/// The single hard failure raised when a ledger holding failures is flushed.
///
/// Keeps every recorded failure message in the order it was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedFailure {
    messages: Vec<String>,
}

impl AggregatedFailure {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    /// Individual failure messages, in recorded order.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl fmt::Display for AggregatedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}",
            AGGREGATED_FAILURE_HEADER,
            self.messages.join(FAILURE_SEPARATOR)
        )
    }
}

impl std::error::Error for AggregatedFailure {}

/// Errors surfaced by a soft-assertion ledger.
///
/// Individual check failures are never errors; they are recorded. Only
/// misuse and the final aggregated failure cross the scenario boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SoftAssertError {
    #[error("soft assertion ledger used after flush")]
    UsedAfterFlush,

    #[error(transparent)]
    Failed(AggregatedFailure),
}

impl SoftAssertError {
    /// The aggregated failure, if this is one.
    pub fn aggregated(&self) -> Option<&AggregatedFailure> {
        match self {
            SoftAssertError::Failed(failure) => Some(failure),
            SoftAssertError::UsedAfterFlush => None,
        }
    }
}

/// Errors from the WebDriver transport and protocol.
#[derive(Error, Debug)]
pub enum WebDriverError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("WebDriver error `{error}`: {message}")]
    Protocol { error: String, message: String },

    #[error("Timeout after {timeout_ms} ms waiting for: {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("Invalid screenshot payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("No active WebDriver session")]
    NoSession,

    #[error("Unexpected WebDriver response: {0}")]
    UnexpectedResponse(String),

    #[error("Driver unavailable: {0}")]
    Unavailable(String),
}

/// Evidence capture failures. Never propagated out of a check method.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("driver could not produce a screenshot: {0}")]
    Driver(#[from] WebDriverError),

    #[error("could not write evidence file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Login-attempt store errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid table name: {0}")]
    InvalidTable(String),
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Crate-wide error, returned by scenario bodies and harness operations.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    SoftAssert(#[from] SoftAssertError),

    #[error("WebDriver error: {0}")]
    WebDriver(#[from] WebDriverError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// The aggregated soft-assertion failure carried by this error, if any.
    pub fn aggregated(&self) -> Option<&AggregatedFailure> {
        match self {
            HarnessError::SoftAssert(e) => e.aggregated(),
            _ => None,
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
