//! Scripted browser double shared by the integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use storefront_e2e::error::WebDriverError;
use storefront_e2e::webdriver::{Browser, DriverFactory, ElementRef, Locator, ScreenshotSource};
use storefront_e2e::HarnessConfig;

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Counters shared between a factory and the sessions it launched.
#[derive(Debug, Default)]
pub struct Counters {
    pub launches: AtomicUsize,
    pub quits: AtomicUsize,
    pub screenshots: AtomicUsize,
}

impl Counters {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    pub fn screenshots(&self) -> usize {
        self.screenshots.load(Ordering::SeqCst)
    }
}

pub struct FakeBrowser {
    screenshots_fail: bool,
    counters: Arc<Counters>,
    visited: RefCell<Vec<String>>,
    closed: bool,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::with_counters(false, Arc::new(Counters::default()))
    }

    /// A browser whose screenshots always fail, like a dead session.
    pub fn unreachable() -> Self {
        Self::with_counters(true, Arc::new(Counters::default()))
    }

    pub fn with_counters(screenshots_fail: bool, counters: Arc<Counters>) -> Self {
        Self {
            screenshots_fail,
            counters,
            visited: RefCell::new(Vec::new()),
            closed: false,
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }
}

impl ScreenshotSource for FakeBrowser {
    fn screenshot_png(&self) -> Result<Vec<u8>, WebDriverError> {
        if self.screenshots_fail || self.closed {
            return Err(WebDriverError::Unavailable("browser not reachable".to_string()));
        }
        self.counters.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(PNG.to_vec())
    }
}

impl Browser for FakeBrowser {
    fn goto(&self, url: &str) -> Result<(), WebDriverError> {
        self.visited.borrow_mut().push(url.to_string());
        Ok(())
    }

    fn current_url(&self) -> Result<String, WebDriverError> {
        self.visited
            .borrow()
            .last()
            .cloned()
            .ok_or(WebDriverError::NoSession)
    }

    fn find_element(&self, locator: &Locator) -> Result<ElementRef, WebDriverError> {
        match locator {
            Locator::Id(id) if id == "missing" => Err(WebDriverError::Protocol {
                error: "no such element".to_string(),
                message: format!("no element with id {}", id),
            }),
            _ => Ok(ElementRef::new("element-1")),
        }
    }

    fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>, WebDriverError> {
        Ok(self.find_element(locator).into_iter().collect())
    }

    fn click(&self, _element: &ElementRef) -> Result<(), WebDriverError> {
        Ok(())
    }

    fn send_keys(&self, _element: &ElementRef, _text: &str) -> Result<(), WebDriverError> {
        Ok(())
    }

    fn clear(&self, _element: &ElementRef) -> Result<(), WebDriverError> {
        Ok(())
    }

    fn text(&self, _element: &ElementRef) -> Result<String, WebDriverError> {
        Ok("HP LP3065".to_string())
    }

    fn attribute(
        &self,
        _element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, WebDriverError> {
        Ok((name == "value").then(|| "1".to_string()))
    }

    fn is_displayed(&self, _element: &ElementRef) -> Result<bool, WebDriverError> {
        Ok(true)
    }

    fn is_enabled(&self, _element: &ElementRef) -> Result<bool, WebDriverError> {
        Ok(true)
    }

    fn is_selected(&self, _element: &ElementRef) -> Result<bool, WebDriverError> {
        Ok(false)
    }

    fn execute_script(&self, _script: &str, _args: Vec<Value>) -> Result<Value, WebDriverError> {
        Ok(Value::Null)
    }

    fn accept_alert(&self) -> Result<(), WebDriverError> {
        Ok(())
    }

    fn dismiss_alert(&self) -> Result<(), WebDriverError> {
        Ok(())
    }

    fn quit(&mut self) -> Result<(), WebDriverError> {
        if !self.closed {
            self.closed = true;
            self.counters.quits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

pub struct FakeFactory {
    pub counters: Arc<Counters>,
    pub screenshots_fail: bool,
    pub launch_fails: bool,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            screenshots_fail: false,
            launch_fails: false,
        }
    }
}

impl DriverFactory for FakeFactory {
    type Driver = FakeBrowser;

    fn launch(&self) -> Result<FakeBrowser, WebDriverError> {
        if self.launch_fails {
            return Err(WebDriverError::Unavailable("chromedriver not running".to_string()));
        }
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(FakeBrowser::with_counters(self.screenshots_fail, self.counters.clone()))
    }
}

/// Config writing everything under `root`.
pub fn config_in(root: &std::path::Path) -> HarnessConfig {
    HarnessConfig {
        reports_dir: root.join("reports"),
        ..Default::default()
    }
}
