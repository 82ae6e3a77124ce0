//! Named loggers and process-wide tracing setup
//!
//! Loggers are looked up by name in a process-wide registry. The first
//! lookup of a name configures it (and installs the tracing subscriber if
//! nobody has yet); later lookups return the same handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

/// Name used by the soft-assertion collector unless configured otherwise.
pub const DEFAULT_LOGGER: &str = "test_logger";

static REGISTRY: Lazy<Mutex<HashMap<String, Logger>>> = Lazy::new(|| Mutex::new(HashMap::new()));

static TRACING: OnceCell<()> = OnceCell::new();

/// Install the global tracing subscriber once per process.
///
/// `RUST_LOG` wins when set; otherwise the filter is `info` (or `debug`).
pub fn init_tracing(debug: bool) {
    TRACING.get_or_init(|| {
        let filter = if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };

        // A test harness may have installed its own subscriber already.
        let _ = tracing_subscriber::registry()
            .with(tracing_fmt::layer())
            .with(filter)
            .try_init();
    });
}

/// Get (or create on first use) the logger registered under `name`.
pub fn get_logger(name: &str) -> Logger {
    let mut registry = REGISTRY.lock();
    registry
        .entry(name.to_string())
        .or_insert_with(|| {
            init_tracing(false);
            tracing::debug!(logger = name, "Registered logger");
            Logger::new(name)
        })
        .clone()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// A log line retained by a capturing logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}

/// Cheap, cloneable logging handle.
///
/// Every event goes to `tracing` with a `logger` field. A capturing logger
/// additionally keeps the records in memory.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    name: String,
    records: Option<Mutex<Vec<LogRecord>>>,
}

impl Logger {
    /// Create an unregistered logger. Prefer [`get_logger`] outside tests.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                name: name.into(),
                records: None,
            }),
        }
    }

    /// Create an unregistered logger that also keeps its records.
    pub fn capturing(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                name: name.into(),
                records: Some(Mutex::new(Vec::new())),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether both handles refer to the same registered logger.
    pub fn same_as(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn info(&self, message: &str) {
        tracing::info!(logger = %self.inner.name, "{}", message);
        self.retain(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(logger = %self.inner.name, "{}", message);
        self.retain(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!(logger = %self.inner.name, "{}", message);
        self.retain(LogLevel::Error, message);
    }

    /// Records kept so far; empty for non-capturing loggers.
    pub fn records(&self) -> Vec<LogRecord> {
        self.inner
            .records
            .as_ref()
            .map(|records| records.lock().clone())
            .unwrap_or_default()
    }

    fn retain(&self, level: LogLevel, message: &str) {
        if let Some(records) = &self.inner.records {
            records.lock().push(LogRecord {
                level,
                message: message.to_string(),
            });
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.inner.name)
            .field("capturing", &self.inner.records.is_some())
            .finish()
    }
}
