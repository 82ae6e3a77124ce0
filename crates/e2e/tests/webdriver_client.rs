//! W3C client against a canned chromedriver

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::Mutex;
use serde_json::{json, Value};
use storefront_e2e::config::WebDriverConfig;
use storefront_e2e::error::WebDriverError;
use storefront_e2e::webdriver::{Browser, ScreenshotSource, WebDriverClient};

const SESSION: &str = "abc123";
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

#[derive(Debug, Clone, PartialEq)]
struct Request {
    method: String,
    path: String,
    body: Value,
}

/// Answers the handful of commands a session needs, one request per connection.
struct CannedDriver {
    url: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl CannedDriver {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = requests.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => respond(stream, &log),
                    Err(_) => break,
                }
            }
        });

        Self { url, requests }
    }

    fn config(&self) -> WebDriverConfig {
        WebDriverConfig {
            url: format!("{}/", self.url),
            request_timeout_secs: 5,
            ..Default::default()
        }
    }

    fn lines(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }
}

fn respond(mut stream: TcpStream, log: &Mutex<Vec<Request>>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
    }
    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).unwrap();
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let session_path = format!("/session/{}", SESSION);
    let (status, value) = match (method.as_str(), path.as_str()) {
        ("POST", "/session") => (200, json!({ "sessionId": SESSION, "capabilities": {} })),
        ("POST", p) if p == format!("{}/timeouts", session_path) => (200, Value::Null),
        ("GET", p) if p == format!("{}/screenshot", session_path) => {
            (200, json!(BASE64.encode(PNG)))
        }
        ("DELETE", p) if p == session_path => (200, Value::Null),
        _ => (
            404,
            json!({ "error": "unknown command", "message": format!("{} {}", method, path) }),
        ),
    };

    log.lock().push(Request { method, path, body });

    let payload = json!({ "value": value }).to_string();
    let _ = write!(
        stream,
        "HTTP/1.1 {} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
}

#[test]
fn session_is_created_screenshot_decoded_and_quit_once() {
    let server = CannedDriver::start();

    let mut client = WebDriverClient::connect(&server.config()).unwrap();
    assert_eq!(client.session_id(), Some(SESSION));
    assert_eq!(client.screenshot_png().unwrap(), PNG);

    client.quit().unwrap();
    client.quit().unwrap();
    assert_eq!(client.session_id(), None);
    drop(client);

    assert_eq!(
        server.lines(),
        vec![
            "POST /session".to_string(),
            format!("POST /session/{}/timeouts", SESSION),
            format!("GET /session/{}/screenshot", SESSION),
            format!("DELETE /session/{}", SESSION),
        ]
    );
}

#[test]
fn session_request_carries_capabilities_and_implicit_wait() {
    let server = CannedDriver::start();

    let client = WebDriverClient::connect(&server.config()).unwrap();
    drop(client);

    let requests = server.requests.lock().clone();
    let create = &requests[0].body;
    let chrome = &create["capabilities"]["alwaysMatch"]["goog:chromeOptions"];
    assert!(chrome["args"]
        .as_array()
        .unwrap()
        .iter()
        .any(|arg| arg == "--start-maximized"));
    assert_eq!(requests[1].body, json!({ "implicit": 10_000 }));
}

#[test]
fn dropping_the_client_deletes_the_session() {
    let server = CannedDriver::start();

    {
        let _client = WebDriverClient::connect(&server.config()).unwrap();
    }

    assert_eq!(
        server.lines().last().map(String::as_str),
        Some(format!("DELETE /session/{}", SESSION).as_str())
    );
}

#[test]
fn protocol_errors_are_surfaced() {
    let server = CannedDriver::start();
    let client = WebDriverClient::connect(&server.config()).unwrap();

    match client.current_url() {
        Err(WebDriverError::Protocol { error, .. }) => assert_eq!(error, "unknown command"),
        other => panic!("expected protocol error, got {:?}", other),
    }
}
