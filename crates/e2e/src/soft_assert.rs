//! Soft assertions with screenshot evidence
//!
//! A [`SoftAssert`] is the per-scenario ledger. Checks record failures
//! instead of aborting the scenario; [`SoftAssert::assert_all`] then raises
//! one [`AggregatedFailure`] listing every failure in the order it was
//! recorded.
//!
//! ```text
//!   OPEN ── assert_* / note* ──▶ OPEN
//!     │
//!     └── assert_all ──▶ FLUSHED   (any further call: UsedAfterFlush)
//! ```
//!
//! Failing checks may capture a screenshot through the bound driver. A
//! capture that fails is logged and the failure is recorded without
//! evidence; it never replaces the assertion failure itself.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::config::HarnessConfig;
use crate::error::{AggregatedFailure, SoftAssertError};
use crate::evidence::EvidenceStore;
use crate::logging::{get_logger, Logger};
use crate::report::{Extra, ReportNode};
use crate::webdriver::ScreenshotSource;

/// Which check produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    True,
    False,
    Equal,
    In,
    NotIn,
    Info,
}

impl CheckKind {
    /// Tag used in failure messages, e.g. `[ASSERT_EQUAL FAIL]`.
    pub fn tag(&self) -> &'static str {
        match self {
            CheckKind::True => "ASSERT_TRUE",
            CheckKind::False => "ASSERT_FALSE",
            CheckKind::Equal => "ASSERT_EQUAL",
            CheckKind::In => "ASSERT_IN",
            CheckKind::NotIn => "ASSERT_NOT_IN",
            CheckKind::Info => "ASSERT_INFO",
        }
    }

    /// Label that prefixes evidence file names, e.g. `assert_equal_fail`.
    pub fn evidence_label(&self) -> String {
        format!("{}_fail", self.tag().to_lowercase())
    }

    // assert_not_in has never written to the log, pass or fail.
    fn is_logged(&self) -> bool {
        !matches!(self, CheckKind::NotIn)
    }
}

/// When a failing check takes a screenshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePolicy {
    /// `assert_false`, `assert_equal` and `assert_in` capture;
    /// `assert_true` and `assert_not_in` do not.
    #[default]
    PerKind,

    /// Every failing check captures.
    Always,
}

impl CapturePolicy {
    pub fn captures(&self, kind: CheckKind) -> bool {
        match self {
            CapturePolicy::PerKind => {
                matches!(kind, CheckKind::False | CheckKind::Equal | CheckKind::In)
            }
            CapturePolicy::Always => kind != CheckKind::Info,
        }
    }
}

/// One check invocation, as retained by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionOutcome {
    pub kind: CheckKind,
    pub passed: bool,

    /// Full text, including the `[PASS]` / `[ASSERT_* FAIL]` prefix
    pub message: String,

    /// Report reference of the screenshot taken for this failure
    pub evidence_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    Open,
    Flushed,
}

/// Membership test used by [`SoftAssert::assert_in`] and
/// [`SoftAssert::assert_not_in`].
pub trait Membership<M: ?Sized> {
    fn has_member(&self, member: &M) -> bool;
}

impl Membership<str> for str {
    fn has_member(&self, member: &str) -> bool {
        self.contains(member)
    }
}

impl Membership<str> for String {
    fn has_member(&self, member: &str) -> bool {
        self.contains(member)
    }
}

impl Membership<char> for str {
    fn has_member(&self, member: &char) -> bool {
        self.contains(*member)
    }
}

impl Membership<char> for String {
    fn has_member(&self, member: &char) -> bool {
        self.contains(*member)
    }
}

impl<T: PartialEq> Membership<T> for [T] {
    fn has_member(&self, member: &T) -> bool {
        self.contains(member)
    }
}

impl<T: PartialEq, const N: usize> Membership<T> for [T; N] {
    fn has_member(&self, member: &T) -> bool {
        self.contains(member)
    }
}

impl<T: PartialEq> Membership<T> for Vec<T> {
    fn has_member(&self, member: &T) -> bool {
        self.contains(member)
    }
}

impl Membership<str> for [String] {
    fn has_member(&self, member: &str) -> bool {
        self.iter().any(|s| s == member)
    }
}

impl Membership<str> for Vec<String> {
    fn has_member(&self, member: &str) -> bool {
        self.as_slice().has_member(member)
    }
}

impl<T: Eq + Hash> Membership<T> for HashSet<T> {
    fn has_member(&self, member: &T) -> bool {
        self.contains(member)
    }
}

impl<T: Ord> Membership<T> for BTreeSet<T> {
    fn has_member(&self, member: &T) -> bool {
        self.contains(member)
    }
}

impl<K: Eq + Hash, V> Membership<K> for HashMap<K, V> {
    fn has_member(&self, member: &K) -> bool {
        self.contains_key(member)
    }
}

impl<K: Ord, V> Membership<K> for BTreeMap<K, V> {
    fn has_member(&self, member: &K) -> bool {
        self.contains_key(member)
    }
}

/// Per-scenario soft-assertion ledger.
///
/// Bound to one driver session and one report node for its whole life.
/// Every check returns `Err` only for misuse ([`SoftAssertError::UsedAfterFlush`]);
/// a failing check is recorded and the scenario carries on.
pub struct SoftAssert<'d> {
    driver: &'d dyn ScreenshotSource,
    node: ReportNode,
    store: EvidenceStore,
    logger: Logger,
    policy: CapturePolicy,
    infos: Vec<AssertionOutcome>,
    failures: Vec<AssertionOutcome>,
    state: LedgerState,
}

impl<'d> SoftAssert<'d> {
    pub fn new(
        driver: &'d dyn ScreenshotSource,
        node: ReportNode,
        store: EvidenceStore,
        logger: Logger,
    ) -> Self {
        Self {
            driver,
            node,
            store,
            logger,
            policy: CapturePolicy::default(),
            infos: Vec::new(),
            failures: Vec::new(),
            state: LedgerState::Open,
        }
    }

    /// Ledger wired the way the configuration says: evidence directory,
    /// named logger and capture policy.
    pub fn from_config(
        driver: &'d dyn ScreenshotSource,
        node: ReportNode,
        config: &HarnessConfig,
    ) -> std::io::Result<Self> {
        let store = EvidenceStore::from_config(config)?;
        let logger = get_logger(&config.logger_name);
        Ok(Self::new(driver, node, store, logger).with_policy(config.capture_policy))
    }

    pub fn with_policy(mut self, policy: CapturePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fails when `condition` is false.
    pub fn assert_true(&mut self, condition: bool, message: &str) -> Result<(), SoftAssertError> {
        self.ensure_open()?;
        let message = or_default(message, || "Expected condition to be True".to_string());
        self.check(CheckKind::True, condition, message);
        Ok(())
    }

    /// Fails when `condition` is true.
    pub fn assert_false(&mut self, condition: bool, message: &str) -> Result<(), SoftAssertError> {
        self.ensure_open()?;
        let message = or_default(message, || "Expected condition to be False".to_string());
        self.check(CheckKind::False, !condition, message);
        Ok(())
    }

    /// Fails when `actual != expected`.
    pub fn assert_equal<A, E>(
        &mut self,
        actual: A,
        expected: E,
        message: &str,
    ) -> Result<(), SoftAssertError>
    where
        A: PartialEq<E> + Debug,
        E: Debug,
    {
        self.ensure_open()?;
        let message = or_default(message, || {
            format!("Expected {:?} to equal {:?}", actual, expected)
        });
        self.check(CheckKind::Equal, actual == expected, message);
        Ok(())
    }

    /// Fails when `container` does not hold `member`.
    pub fn assert_in<M, C>(
        &mut self,
        member: &M,
        container: &C,
        message: &str,
    ) -> Result<(), SoftAssertError>
    where
        M: Debug + ?Sized,
        C: Membership<M> + Debug + ?Sized,
    {
        self.ensure_open()?;
        let message = or_default(message, || {
            format!("Expected {:?} to be in {:?}", member, container)
        });
        self.check(CheckKind::In, container.has_member(member), message);
        Ok(())
    }

    /// Fails when `container` holds `member`.
    pub fn assert_not_in<M, C>(
        &mut self,
        member: &M,
        container: &C,
        message: &str,
    ) -> Result<(), SoftAssertError>
    where
        M: Debug + ?Sized,
        C: Membership<M> + Debug + ?Sized,
    {
        self.ensure_open()?;
        let message = or_default(message, || {
            format!("Did not expect {:?} in {:?}", member, container)
        });
        self.check(CheckKind::NotIn, !container.has_member(member), message);
        Ok(())
    }

    /// Narrate `message` in the report.
    pub fn note(&mut self, message: &str) -> Result<(), SoftAssertError> {
        self.note_if(true, message)
    }

    /// Narrate `message` in the report only when `condition` holds.
    pub fn note_if(&mut self, condition: bool, message: &str) -> Result<(), SoftAssertError> {
        self.ensure_open()?;
        if condition {
            let text = format!("[PASS] {}", message);
            self.logger.info(&text);
            self.infos.push(AssertionOutcome {
                kind: CheckKind::Info,
                passed: true,
                message: text,
                evidence_path: None,
            });
        }
        Ok(())
    }

    /// Close the ledger.
    ///
    /// Prints the narration, then returns `Ok` when nothing failed or one
    /// aggregated failure holding every recorded failure message.
    pub fn assert_all(&mut self) -> Result<(), SoftAssertError> {
        self.ensure_open()?;
        self.state = LedgerState::Flushed;

        for line in self.narration() {
            println!("{}", line);
        }

        if self.failures.is_empty() {
            return Ok(());
        }

        let messages = self.failures.iter().map(|f| f.message.clone()).collect();
        Err(SoftAssertError::Failed(AggregatedFailure::new(messages)))
    }

    /// One entry per narrated info: `"{message}\nScreenshot: {reference}"`.
    pub fn narration(&self) -> Vec<String> {
        self.infos
            .iter()
            .map(|info| {
                format!(
                    "{}\nScreenshot: {}",
                    info.message,
                    info.evidence_path.as_deref().unwrap_or("None")
                )
            })
            .collect()
    }

    pub fn infos(&self) -> &[AssertionOutcome] {
        &self.infos
    }

    pub fn failures(&self) -> &[AssertionOutcome] {
        &self.failures
    }

    pub fn state(&self) -> LedgerState {
        self.state
    }

    pub fn is_flushed(&self) -> bool {
        self.state == LedgerState::Flushed
    }

    pub fn policy(&self) -> CapturePolicy {
        self.policy
    }

    pub fn node(&self) -> &ReportNode {
        &self.node
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    fn ensure_open(&self) -> Result<(), SoftAssertError> {
        match self.state {
            LedgerState::Open => Ok(()),
            LedgerState::Flushed => Err(SoftAssertError::UsedAfterFlush),
        }
    }

    fn check(&mut self, kind: CheckKind, passed: bool, message: String) {
        if passed {
            if kind.is_logged() {
                self.logger.info(&format!("[PASS] {}", message));
            }
            return;
        }

        let evidence_path = if self.policy.captures(kind) {
            self.capture(kind)
        } else {
            None
        };

        let text = format!("[{} FAIL] {}", kind.tag(), message);
        if kind.is_logged() {
            self.logger.error(&text);
        }
        self.failures.push(AssertionOutcome {
            kind,
            passed: false,
            message: text,
            evidence_path,
        });
    }

    fn capture(&self, kind: CheckKind) -> Option<String> {
        match self.store.capture(self.driver, &kind.evidence_label()) {
            Ok(evidence) => {
                self.node.attach(Extra::image(evidence.reference.clone()));
                Some(evidence.reference)
            }
            Err(e) => {
                self.logger
                    .warn(&format!("Screenshot for {} not captured: {}", kind.tag(), e));
                None
            }
        }
    }
}

impl Drop for SoftAssert<'_> {
    fn drop(&mut self) {
        if self.state == LedgerState::Open && !self.failures.is_empty() {
            let messages: Vec<&str> = self.failures.iter().map(|f| f.message.as_str()).collect();
            self.logger.error(&format!(
                "Ledger for {} dropped without assert_all; {} failure(s) not raised:\n{}",
                self.node.node_id(),
                messages.len(),
                messages.join("\n\n")
            ));
        }
    }
}

fn or_default(message: &str, default: impl FnOnce() -> String) -> String {
    if message.is_empty() {
        default()
    } else {
        message.to_string()
    }
}
