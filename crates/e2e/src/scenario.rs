//! Scenario lifecycle: one driver session and one soft-assertion ledger per scenario

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::HarnessConfig;
use crate::error::{AggregatedFailure, HarnessError, HarnessResult};
use crate::evidence::EvidenceStore;
use crate::report::{self, Extra, ReportNode, ScenarioOutcome, ScenarioResult, SuiteResult};
use crate::soft_assert::SoftAssert;
use crate::webdriver::{Browser, DriverFactory};

/// Evidence file name for a scenario that failed, derived from its node id.
pub fn failure_screenshot_name(node_id: &str) -> String {
    format!("{}.png", node_id.replace("::", "_").replace('/', "_"))
}

/// Runs scenario bodies against fresh browser sessions.
pub struct ScenarioRunner<F: DriverFactory> {
    config: HarnessConfig,
    factory: F,
    evidence: EvidenceStore,
}

impl<F: DriverFactory> ScenarioRunner<F> {
    pub fn new(config: HarnessConfig, factory: F) -> HarnessResult<Self> {
        std::fs::create_dir_all(&config.reports_dir)?;
        let evidence = EvidenceStore::from_config(&config)?;
        Ok(Self {
            config,
            factory,
            evidence,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one scenario.
    ///
    /// The driver is quit afterwards whatever happened. A ledger the body
    /// left open is flushed here, and recorded failures fail the scenario
    /// even when the body swallowed its own flush. A failed scenario gets a
    /// final screenshot attached to its report node.
    pub fn run<B>(&self, node_id: &str, body: B) -> ScenarioResult
    where
        B: FnOnce(&F::Driver, &mut SoftAssert<'_>) -> HarnessResult<()>,
    {
        let start = Instant::now();
        let node = ReportNode::new(node_id);
        debug!("Running scenario: {}", node_id);

        let mut session = match self.factory.launch() {
            Ok(driver) => SessionGuard::new(driver),
            Err(e) => {
                let err = HarnessError::from(e);
                return finish(&node, start, vec![err.to_string()], Vec::new(), Vec::new());
            }
        };

        let mut errors = Vec::new();
        let mut infos: Vec<String> = Vec::new();
        let mut failures: Vec<String> = Vec::new();

        {
            let driver = session.driver();
            match SoftAssert::from_config(driver, node.clone(), &self.config) {
                Ok(mut soft) => {
                    let outcome =
                        panic::catch_unwind(AssertUnwindSafe(|| body(driver, &mut soft)));
                    let mut reported = false;
                    match outcome {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            reported = e.aggregated().is_some();
                            errors.push(e.to_string());
                        }
                        Err(payload) => errors.push(format!(
                            "scenario panicked: {}",
                            panic_message(&*payload)
                        )),
                    }

                    if !soft.is_flushed() {
                        if let Err(e) = soft.assert_all() {
                            reported |= e.aggregated().is_some();
                            errors.push(e.to_string());
                        }
                    }

                    infos = soft.infos().iter().map(|i| i.message.clone()).collect();
                    failures = soft.failures().iter().map(|f| f.message.clone()).collect();

                    // A body may flush and discard the aggregated failure.
                    if !reported && !failures.is_empty() {
                        errors.push(AggregatedFailure::new(failures.clone()).to_string());
                    }
                }
                Err(e) => errors.push(HarnessError::from(e).to_string()),
            }

            if !errors.is_empty() {
                self.attach_failure_screenshot(driver, &node);
            }
        }

        session.quit();
        finish(&node, start, errors, infos, failures)
    }

    /// Start collecting results for several scenarios.
    pub fn suite(&self) -> Suite<'_, F> {
        Suite {
            runner: self,
            started: Instant::now(),
            results: Vec::new(),
        }
    }

    /// Persist suite results to the configured results file.
    pub fn write_results(&self, results: &SuiteResult) -> HarnessResult<std::path::PathBuf> {
        report::write_results(results, self.config.results_path())
    }

    fn attach_failure_screenshot(&self, driver: &F::Driver, node: &ReportNode) {
        let file_name = failure_screenshot_name(node.node_id());
        match self.evidence.capture_named(driver, &file_name) {
            Ok(evidence) => node.attach(Extra::image(evidence.reference)),
            Err(e) => warn!("Failure screenshot for {} not captured: {}", node.node_id(), e),
        }
    }
}

/// Results of several scenarios run through the same runner.
pub struct Suite<'r, F: DriverFactory> {
    runner: &'r ScenarioRunner<F>,
    started: Instant,
    results: Vec<ScenarioResult>,
}

impl<F: DriverFactory> Suite<'_, F> {
    pub fn run<B>(&mut self, node_id: &str, body: B) -> &ScenarioResult
    where
        B: FnOnce(&F::Driver, &mut SoftAssert<'_>) -> HarnessResult<()>,
    {
        let result = self.runner.run(node_id, body);
        if result.passed() {
            info!("✓ {} ({} ms)", result.node_id, result.duration_ms);
        } else {
            error!(
                "✗ {} - {}",
                result.node_id,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        self.results.push(result);
        &self.results[self.results.len() - 1]
    }

    pub fn finish(self) -> SuiteResult {
        let elapsed = self.started.elapsed().as_millis() as u64;
        let suite = SuiteResult::from_results(self.results, elapsed);
        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
        suite
    }
}

/// Quits the wrapped session exactly once, on drop at the latest.
struct SessionGuard<D: Browser> {
    driver: D,
    closed: bool,
}

impl<D: Browser> SessionGuard<D> {
    fn new(driver: D) -> Self {
        Self {
            driver,
            closed: false,
        }
    }

    fn driver(&self) -> &D {
        &self.driver
    }

    fn quit(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.driver.quit() {
            warn!("Driver teardown failed: {}", e);
        }
    }
}

impl<D: Browser> Drop for SessionGuard<D> {
    fn drop(&mut self) {
        self.quit();
    }
}

fn finish(
    node: &ReportNode,
    start: Instant,
    errors: Vec<String>,
    infos: Vec<String>,
    failures: Vec<String>,
) -> ScenarioResult {
    let outcome = if errors.is_empty() {
        ScenarioOutcome::Passed
    } else {
        ScenarioOutcome::Failed
    };

    ScenarioResult {
        node_id: node.node_id().to_string(),
        outcome,
        duration_ms: start.elapsed().as_millis() as u64,
        error: (!errors.is_empty()).then(|| errors.join("\n\n")),
        infos,
        failures,
        extras: node.extras(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
