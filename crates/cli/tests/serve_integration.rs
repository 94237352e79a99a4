//! Integration tests for the `spillway serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port,
//! makes HTTP requests, and verifies the responses. The servers run on
//! builtin demo data; no external service is contacted.

use std::io::Read;
use std::net::TcpStream;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so parallel `cargo test --workspace` runs
/// (which spawn separate test binaries) don't collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// Helper: start the spillway serve process on the given port.
fn start_server(port: u16) -> Child {
    // The workspace root is two levels up from crates/cli
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_spillway"));
    cmd.current_dir(workspace_root);
    cmd.arg("serve").arg("--port").arg(port.to_string());
    // Force the builtin demo collaborators even if the host has service
    // URLs configured
    cmd.env_remove("SPILLWAY_ORACLE_URL");
    cmd.env_remove("SPILLWAY_GEOCODE_URL");
    // Redirect stdout/stderr to avoid blocking
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let child = cmd.spawn().expect("failed to start spillway serve");
    // Wait for server to be ready by polling the port
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            return child;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    child
}

/// Helper: make a simple HTTP GET request and return (status, body).
fn http_get(port: u16, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost:{}\r\nConnection: close\r\n\r\n",
        path, port
    );
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);

    parse_http_response(&response)
}

/// Parse an HTTP response into (status_code, body).
fn parse_http_response(response: &str) -> (u16, String) {
    let parts: Vec<&str> = response.splitn(2, "\r\n\r\n").collect();
    let headers = parts.first().unwrap_or(&"").to_string();
    let body = parts.get(1).unwrap_or(&"").to_string();

    let status_line = headers.lines().next().unwrap_or("");
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    (status, body)
}

#[test]
fn health_returns_200_with_version() {
    let port = next_port();
    let mut child = start_server(port);

    let (status, body) = http_get(port, "/health");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["status"], "ok");
    assert!(
        json.get("version").is_some(),
        "version field must be present"
    );
}

#[test]
fn history_starts_empty() {
    let port = next_port();
    let mut child = start_server(port);

    let (status, body) = http_get(port, "/history");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    let searches = json.as_array().expect("history array");
    assert!(searches.is_empty(), "fresh server has no searches");
}

#[test]
fn difference_requires_all_query_params() {
    let port = next_port();
    let mut child = start_server(port);

    let (status, body) = http_get(port, "/water-level-difference?dam_name=Tehri%20Dam");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 400);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(
        json["error"],
        "Missing 'dam_name', 'start', or 'end' query parameters."
    );
}

#[test]
fn difference_rejects_malformed_dates() {
    let port = next_port();
    let mut child = start_server(port);

    let (status, body) = http_get(
        port,
        "/water-level-difference?dam_name=Tehri%20Dam&start=notadate&end=2025-06-30",
    );
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 400);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    let error = json["error"].as_str().expect("error string");
    assert!(
        error.contains("Invalid 'start' date"),
        "unexpected error: {}",
        error
    );
}

#[test]
fn difference_needs_a_prior_search() {
    let port = next_port();
    let mut child = start_server(port);

    let (status, body) = http_get(
        port,
        "/water-level-difference?dam_name=Tehri%20Dam&start=2025-06-01&end=2025-06-30",
    );
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 500);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(
        json["error"],
        "Could not find a previous analysis for this dam. Please run a search first."
    );
}

#[test]
fn unknown_route_returns_404() {
    let port = next_port();
    let mut child = start_server(port);

    let (status, body) = http_get(port, "/nonexistent");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 404);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["error"], "not found");
}
