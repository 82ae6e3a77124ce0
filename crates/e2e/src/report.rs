//! Report nodes, scenario results and the results table

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::HarnessResult;

/// Column index at which the screenshot cell is inserted.
pub const SCREENSHOT_COLUMN_INDEX: usize = 2;

/// Header of the results table before the screenshot column is inserted.
pub const BASE_HEADER: [&str; 4] = ["Result", "Test", "Duration", "Links"];

/// Something attached to a report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum Extra {
    Image { content: String, mime_type: String },
}

impl Extra {
    /// PNG image attachment pointing at a report-relative path.
    pub fn image(reference: impl Into<String>) -> Self {
        Extra::Image {
            content: reference.into(),
            mime_type: "image/png".to_string(),
        }
    }
}

/// Per-scenario report handle. Clones share the same extras.
#[derive(Debug, Clone)]
pub struct ReportNode {
    inner: Arc<NodeInner>,
}

#[derive(Debug)]
struct NodeInner {
    node_id: String,
    extras: Mutex<Vec<Extra>>,
}

impl ReportNode {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                node_id: node_id.into(),
                extras: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.inner.node_id
    }

    pub fn attach(&self, extra: Extra) {
        self.inner.extras.lock().push(extra);
    }

    pub fn extras(&self) -> Vec<Extra> {
        self.inner.extras.lock().clone()
    }

    /// Reference of the first attached image, if any.
    pub fn first_image(&self) -> Option<String> {
        first_image(&self.inner.extras.lock())
    }
}

fn first_image(extras: &[Extra]) -> Option<String> {
    extras.iter().find_map(|extra| match extra {
        Extra::Image { content, .. } => Some(content.clone()),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Passed,
    Failed,
}

impl ScenarioOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioOutcome::Passed => "Passed",
            ScenarioOutcome::Failed => "Failed",
        }
    }
}

/// Result of running one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub node_id: String,
    pub outcome: ScenarioOutcome,
    pub duration_ms: u64,

    /// Failure reason shown in the report
    pub error: Option<String>,

    /// Narrated info lines, in order
    #[serde(default)]
    pub infos: Vec<String>,

    /// Individual soft failures, in order
    #[serde(default)]
    pub failures: Vec<String>,

    #[serde(default)]
    pub extras: Vec<Extra>,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.outcome == ScenarioOutcome::Passed
    }

    pub fn screenshot(&self) -> Option<String> {
        first_image(&self.extras)
    }
}

/// Result of running a suite of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn from_results(results: Vec<ScenarioResult>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.passed()).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Write suite results as pretty JSON.
pub fn write_results(results: &SuiteResult, path: impl AsRef<Path>) -> HarnessResult<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path.to_path_buf())
}

pub fn read_results(path: impl AsRef<Path>) -> HarnessResult<SuiteResult> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Rows of the rendered results table, with the screenshot column.
pub struct ResultsTable;

impl ResultsTable {
    pub fn header() -> Vec<String> {
        let mut cells: Vec<String> = BASE_HEADER.iter().map(|s| s.to_string()).collect();
        insert_screenshot_cell(&mut cells, "Screenshot".to_string());
        cells
    }

    /// Cells for one result. The first image goes to the Screenshot column,
    /// so Links lists only the images after it.
    pub fn row(result: &ScenarioResult) -> Vec<String> {
        let links: Vec<&str> = result
            .extras
            .iter()
            .skip(1)
            .map(|extra| match extra {
                Extra::Image { content, .. } => content.as_str(),
            })
            .collect();

        let mut cells = vec![
            result.outcome.as_str().to_string(),
            result.node_id.clone(),
            format!("{} ms", result.duration_ms),
            links.join(" "),
        ];
        insert_screenshot_cell(&mut cells, result.screenshot().unwrap_or_default());
        cells
    }

    pub fn rows(suite: &SuiteResult) -> Vec<Vec<String>> {
        suite.results.iter().map(Self::row).collect()
    }
}

fn insert_screenshot_cell(cells: &mut Vec<String>, content: String) {
    let index = SCREENSHOT_COLUMN_INDEX.min(cells.len());
    cells.insert(index, content);
}
