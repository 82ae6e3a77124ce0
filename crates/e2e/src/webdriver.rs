//! Browser automation over the W3C WebDriver protocol
//!
//! The soft-assertion collector only needs [`ScreenshotSource`]. Scenario
//! bodies use the wider [`Browser`] trait, and the scenario runner obtains
//! sessions through a [`DriverFactory`].

use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::WebDriverConfig;
use crate::error::WebDriverError;

/// W3C key under which element references are serialized.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Anything that can produce a full-page PNG of the current browser state.
pub trait ScreenshotSource {
    fn screenshot_png(&self) -> Result<Vec<u8>, WebDriverError>;
}

/// How to find an element on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    Id(String),
    Name(String),
    LinkText(String),
    TagName(String),
}

impl Locator {
    /// `(using, value)` pair for the find-element endpoints.
    pub fn strategy(&self) -> (&'static str, String) {
        match self {
            Locator::Css(s) => ("css selector", s.clone()),
            Locator::XPath(s) => ("xpath", s.clone()),
            Locator::Id(s) => ("css selector", format!("[id=\"{}\"]", s)),
            Locator::Name(s) => ("css selector", format!("[name=\"{}\"]", s)),
            Locator::LinkText(s) => ("link text", s.clone()),
            Locator::TagName(s) => ("tag name", s.clone()),
        }
    }
}

/// Opaque reference to an element in the remote browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    id: String,
}

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// JSON form used when passing the element to `execute_script`.
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(ELEMENT_KEY.to_string(), Value::String(self.id.clone()));
        Value::Object(map)
    }

    fn from_json(value: &Value) -> Result<Self, WebDriverError> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(ElementRef::new)
            .ok_or_else(|| WebDriverError::UnexpectedResponse(format!("not an element: {}", value)))
    }
}

/// A live browser session.
pub trait Browser: ScreenshotSource {
    fn goto(&self, url: &str) -> Result<(), WebDriverError>;
    fn current_url(&self) -> Result<String, WebDriverError>;
    fn find_element(&self, locator: &Locator) -> Result<ElementRef, WebDriverError>;
    fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>, WebDriverError>;
    fn click(&self, element: &ElementRef) -> Result<(), WebDriverError>;
    fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), WebDriverError>;
    fn clear(&self, element: &ElementRef) -> Result<(), WebDriverError>;
    fn text(&self, element: &ElementRef) -> Result<String, WebDriverError>;
    fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>, WebDriverError>;
    fn is_displayed(&self, element: &ElementRef) -> Result<bool, WebDriverError>;
    fn is_enabled(&self, element: &ElementRef) -> Result<bool, WebDriverError>;
    fn is_selected(&self, element: &ElementRef) -> Result<bool, WebDriverError>;
    fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value, WebDriverError>;
    fn accept_alert(&self) -> Result<(), WebDriverError>;
    fn dismiss_alert(&self) -> Result<(), WebDriverError>;

    /// End the session. Must be safe to call more than once.
    fn quit(&mut self) -> Result<(), WebDriverError>;
}

/// Produces one fresh browser session per scenario.
pub trait DriverFactory {
    type Driver: Browser;

    fn launch(&self) -> Result<Self::Driver, WebDriverError>;
}

/// Launches [`WebDriverClient`] sessions from configuration.
#[derive(Debug, Clone)]
pub struct WebDriverFactory {
    config: WebDriverConfig,
}

impl WebDriverFactory {
    pub fn new(config: WebDriverConfig) -> Self {
        Self { config }
    }
}

impl DriverFactory for WebDriverFactory {
    type Driver = WebDriverClient;

    fn launch(&self) -> Result<WebDriverClient, WebDriverError> {
        WebDriverClient::connect(&self.config)
    }
}

/// Blocking W3C WebDriver client.
pub struct WebDriverClient {
    http: reqwest::blocking::Client,

    /// WebDriver endpoint, without trailing slash
    endpoint: String,

    /// Storefront root for relative navigation
    base_url: String,

    /// `None` once the session has been deleted
    session_id: Option<String>,

    explicit_wait: Duration,
    poll_interval: Duration,
}

impl WebDriverClient {
    /// Create a session configured for the storefront suite.
    pub fn connect(config: &WebDriverConfig) -> Result<Self, WebDriverError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let endpoint = config.url.trim_end_matches('/').to_string();
        let mut client = Self {
            http,
            endpoint,
            base_url: config.base_url.clone(),
            session_id: None,
            explicit_wait: config.explicit_wait(),
            poll_interval: config.poll_interval(),
        };

        info!("Starting {} session via {}", config.browser, client.endpoint);
        let url = format!("{}/session", client.endpoint);
        let created = client.send(Method::POST, &url, Some(capabilities(config)))?;
        let session_id = created
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WebDriverError::UnexpectedResponse(format!("no sessionId in {}", created))
            })?
            .to_string();
        client.session_id = Some(session_id);

        client.set_implicit_wait(config.implicit_wait())?;
        Ok(client)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn set_implicit_wait(&self, wait: Duration) -> Result<(), WebDriverError> {
        self.command(
            Method::POST,
            "/timeouts",
            Some(json!({ "implicit": wait.as_millis() as u64 })),
        )?;
        Ok(())
    }

    /// Wait until an element matching `locator` is displayed.
    pub fn wait_for_visible(&self, locator: &Locator) -> Result<ElementRef, WebDriverError> {
        wait_until(
            self.explicit_wait,
            self.poll_interval,
            &format!("{:?} to be visible", locator),
            || {
                for element in self.find_elements(locator)? {
                    if self.is_displayed(&element)? {
                        return Ok(Some(element));
                    }
                }
                Ok(None)
            },
        )
    }

    /// Wait until the current URL contains `fragment`.
    pub fn wait_for_url_contains(&self, fragment: &str) -> Result<String, WebDriverError> {
        wait_until(
            self.explicit_wait,
            self.poll_interval,
            &format!("url to contain '{}'", fragment),
            || {
                let url = self.current_url()?;
                Ok(url.contains(fragment).then_some(url))
            },
        )
    }

    fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, WebDriverError> {
        let session = self.session_id.as_deref().ok_or(WebDriverError::NoSession)?;
        let url = format!("{}/session/{}{}", self.endpoint, session, path);
        self.send(method, &url, body)
    }

    fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> Result<Value, WebDriverError> {
        debug!("WebDriver {} {}", method, url);
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send()?;
        let ok = response.status().is_success();
        let payload: Value = response.json()?;
        parse_response(ok, payload)
    }

    fn element_command(
        &self,
        method: Method,
        element: &ElementRef,
        suffix: &str,
        body: Option<Value>,
    ) -> Result<Value, WebDriverError> {
        self.command(method, &format!("/element/{}{}", element.id, suffix), body)
    }

    fn element_flag(&self, element: &ElementRef, suffix: &str) -> Result<bool, WebDriverError> {
        self.element_command(Method::GET, element, suffix, None)?
            .as_bool()
            .ok_or_else(|| {
                WebDriverError::UnexpectedResponse(format!("{} is not a boolean", suffix))
            })
    }
}

impl ScreenshotSource for WebDriverClient {
    fn screenshot_png(&self) -> Result<Vec<u8>, WebDriverError> {
        let value = self.command(Method::GET, "/screenshot", None)?;
        let encoded = value
            .as_str()
            .ok_or_else(|| {
                WebDriverError::UnexpectedResponse("screenshot is not a string".to_string())
            })?;
        Ok(BASE64.decode(encoded)?)
    }
}

impl Browser for WebDriverClient {
    fn goto(&self, url: &str) -> Result<(), WebDriverError> {
        let target = resolve_url(&self.base_url, url);
        self.command(Method::POST, "/url", Some(json!({ "url": target })))?;
        Ok(())
    }

    fn current_url(&self) -> Result<String, WebDriverError> {
        self.command(Method::GET, "/url", None)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WebDriverError::UnexpectedResponse("url is not a string".to_string()))
    }

    fn find_element(&self, locator: &Locator) -> Result<ElementRef, WebDriverError> {
        let (using, value) = locator.strategy();
        let found = self.command(
            Method::POST,
            "/element",
            Some(json!({ "using": using, "value": value })),
        )?;
        ElementRef::from_json(&found)
    }

    fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>, WebDriverError> {
        let (using, value) = locator.strategy();
        let found = self.command(
            Method::POST,
            "/elements",
            Some(json!({ "using": using, "value": value })),
        )?;
        found
            .as_array()
            .ok_or_else(|| {
                WebDriverError::UnexpectedResponse("elements is not an array".to_string())
            })?
            .iter()
            .map(ElementRef::from_json)
            .collect()
    }

    fn click(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        self.element_command(Method::POST, element, "/click", Some(json!({})))?;
        Ok(())
    }

    fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), WebDriverError> {
        self.element_command(Method::POST, element, "/value", Some(json!({ "text": text })))?;
        Ok(())
    }

    fn clear(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        self.element_command(Method::POST, element, "/clear", Some(json!({})))?;
        Ok(())
    }

    fn text(&self, element: &ElementRef) -> Result<String, WebDriverError> {
        Ok(self
            .element_command(Method::GET, element, "/text", None)?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, WebDriverError> {
        let path = format!("/attribute/{}", name);
        let value = self.element_command(Method::GET, element, &path, None)?;
        Ok(value.as_str().map(str::to_string))
    }

    fn is_displayed(&self, element: &ElementRef) -> Result<bool, WebDriverError> {
        self.element_flag(element, "/displayed")
    }

    fn is_enabled(&self, element: &ElementRef) -> Result<bool, WebDriverError> {
        self.element_flag(element, "/enabled")
    }

    fn is_selected(&self, element: &ElementRef) -> Result<bool, WebDriverError> {
        self.element_flag(element, "/selected")
    }

    fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value, WebDriverError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
    }

    fn accept_alert(&self) -> Result<(), WebDriverError> {
        self.command(Method::POST, "/alert/accept", Some(json!({})))?;
        Ok(())
    }

    fn dismiss_alert(&self) -> Result<(), WebDriverError> {
        self.command(Method::POST, "/alert/dismiss", Some(json!({})))?;
        Ok(())
    }

    fn quit(&mut self) -> Result<(), WebDriverError> {
        let Some(session) = self.session_id.take() else {
            return Ok(());
        };
        info!("Closing WebDriver session {}", session);
        let url = format!("{}/session/{}", self.endpoint, session);
        self.send(Method::DELETE, &url, None)?;
        Ok(())
    }
}

impl Drop for WebDriverClient {
    fn drop(&mut self) {
        if let Err(e) = self.quit() {
            warn!("Failed to close WebDriver session: {}", e);
        }
    }
}

/// Session capabilities: maximized window, no credential or autofill prompts.
pub fn capabilities(config: &WebDriverConfig) -> Value {
    let mut args = Vec::new();
    if config.start_maximized {
        args.push("--start-maximized");
    }
    if config.headless {
        args.push("--headless=new");
    }

    let prefs = if config.disable_credential_prompts {
        json!({
            "credentials_enable_service": false,
            "profile.password_manager_enabled": false,
            "autofill.profile_enabled": false,
            "autofill.credit_card_enabled": false,
        })
    } else {
        json!({})
    };

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": config.browser,
                "goog:chromeOptions": {
                    "args": args,
                    "prefs": prefs,
                }
            }
        }
    })
}

/// Poll `probe` until it yields a value or `timeout` elapses.
///
/// "no such element" and "stale element reference" count as not-yet;
/// any other error ends the wait immediately.
pub fn wait_until<T, F>(
    timeout: Duration,
    poll: Duration,
    what: &str,
    mut probe: F,
) -> Result<T, WebDriverError>
where
    F: FnMut() -> Result<Option<T>, WebDriverError>,
{
    let start = Instant::now();
    loop {
        match probe() {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(WebDriverError::Protocol { error, .. })
                if error == "no such element" || error == "stale element reference" => {}
            Err(e) => return Err(e),
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(WebDriverError::Timeout {
                what: what.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        std::thread::sleep(poll.min(timeout - elapsed));
    }
}

fn resolve_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

fn parse_response(ok: bool, payload: Value) -> Result<Value, WebDriverError> {
    let value = payload.get("value").cloned().unwrap_or(Value::Null);
    let error = value.get("error").and_then(Value::as_str).map(str::to_string);

    match error {
        Some(error) => Err(WebDriverError::Protocol {
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            error,
        }),
        None if !ok => Err(WebDriverError::UnexpectedResponse(payload.to_string())),
        None => Ok(value),
    }
}
