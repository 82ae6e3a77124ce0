//! Storefront E2E harness
//!
//! Support code for browser-driven storefront scenarios:
//! - Soft assertions that collect every failure of a scenario and raise
//!   them together at the end
//! - Screenshot evidence for failing checks, attached to the report
//! - A blocking W3C WebDriver client and the traits scenarios depend on
//! - Scenario lifecycle with guaranteed driver teardown
//! - Results persistence and the report table with its screenshot column
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ScenarioRunner                                             │
//! │    ├── DriverFactory::launch() -> Browser                   │
//! │    ├── SoftAssert::from_config(driver, ReportNode)          │
//! │    ├── body(driver, &mut soft)                              │
//! │    ├── soft.assert_all() -> AggregatedFailure               │
//! │    ├── failure screenshot -> ReportNode extras              │
//! │    └── Browser::quit()                                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SoftAssert (per scenario ledger)                           │
//! │    ├── assert_true / assert_false / assert_equal            │
//! │    ├── assert_in / assert_not_in / note / note_if           │
//! │    └── EvidenceStore -> reports/screenshots/*.png           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod evidence;
pub mod logging;
pub mod report;
pub mod scenario;
pub mod soft_assert;
pub mod webdriver;

pub use config::HarnessConfig;
pub use error::{AggregatedFailure, HarnessError, HarnessResult, SoftAssertError};
pub use evidence::{Evidence, EvidenceStore};
pub use logging::{get_logger, init_tracing, Logger};
pub use report::{Extra, ReportNode, ResultsTable, ScenarioOutcome, ScenarioResult, SuiteResult};
pub use scenario::ScenarioRunner;
pub use soft_assert::{AssertionOutcome, CapturePolicy, CheckKind, SoftAssert};
pub use webdriver::{Browser, DriverFactory, Locator, ScreenshotSource, WebDriverClient};
