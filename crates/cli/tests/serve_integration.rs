//! Integration tests for the `assetdesk serve` HTTP API.
//!
//! Each test writes a config (sessions plus a seed inventory) into a temp
//! directory, starts the server as a child process on a unique port, and
//! talks to it over raw HTTP. No API key is configured, so every
//! instruction goes through the keyword parser.

use std::io::Read;
use std::net::TcpStream;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use tempfile::TempDir;

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so separate test binaries don't
/// collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

const ADMIN_TOKEN: &str = "tok-admin";
const VIEWER_TOKEN: &str = "tok-viewer";

const SEED: &str = r#"[
  {"sl_no": "1", "description": "Dell monitor", "service_tag": "ST-001",
   "identification_number": "ID-001", "procurement_date": "2023-01-15",
   "cost": 12000, "location": "Lab 1", "department": "CSE"},
  {"sl_no": "2", "description": "HP printer", "service_tag": "ST-002",
   "identification_number": "ID-002", "procurement_date": "2023-02-01",
   "cost": 8000, "location": "Lab 2", "department": "CSE"},
  {"sl_no": "3", "description": "Oscilloscope", "service_tag": "ST-003",
   "identification_number": "ID-003", "procurement_date": "2022-11-30",
   "cost": 45000, "location": "Lab 3", "department": "ECE"}
]"#;

/// A running server. Killed on drop so a failing assertion doesn't leak it.
struct Server {
    child: Child,
    port: u16,
    _dir: TempDir,
}

impl Drop for Server {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

fn start_server(rate_limit: u64) -> Server {
    let dir = TempDir::new().expect("temp dir");
    let seed_path = dir.path().join("seed.json");
    std::fs::write(&seed_path, SEED).expect("write seed");

    let config = format!(
        r#"
[server]
rate_limit = {rate_limit}

[store]
seed = "{seed}"

[[sessions]]
token = "{ADMIN_TOKEN}"
uid = "admin-1"
email = "ops@example.com"
role = "admin"

[[sessions]]
token = "{VIEWER_TOKEN}"
uid = "viewer-1"
email = "staff@example.com"
role = "viewer"
"#,
        seed = seed_path.display().to_string().replace('\\', "\\\\"),
    );
    let config_path = dir.path().join("assetdesk.toml");
    std::fs::write(&config_path, config).expect("write config");

    let port = next_port();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_assetdesk"));
    cmd.current_dir(dir.path());
    cmd.arg("--config")
        .arg(&config_path)
        .arg("serve")
        .arg("--port")
        .arg(port.to_string());
    for var in [
        "ASSETDESK_LLM_API_KEY",
        "ASSETDESK_LLM_MODEL",
        "ASSETDESK_LLM_API_URL",
        "ASSETDESK_RATE_LIMIT",
        "ASSETDESK_PORT",
    ] {
        cmd.env_remove(var);
    }
    cmd.stdout(std::process::Stdio::null());
    cmd.stderr(std::process::Stdio::null());

    let child = cmd.spawn().expect("failed to start assetdesk serve");
    // Wait for server to be ready by polling the port
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Server {
        child,
        port,
        _dir: dir,
    }
}

/// Make one HTTP request and return (status, body).
fn http_request(
    port: u16,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> (u16, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    let mut headers = String::new();
    if let Some(token) = token {
        headers.push_str(&format!("Authorization: Bearer {}\r\n", token));
    }
    let body = body.unwrap_or("");
    if !body.is_empty() {
        headers.push_str(&format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n",
            body.len()
        ));
    }

    let request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost:{}\r\n{}Connection: close\r\n\r\n{}",
        method, path, port, headers, body
    );
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);

    parse_http_response(&response)
}

fn natural_crud(port: u16, token: Option<&str>, instruction: &str) -> (u16, serde_json::Value) {
    let body = serde_json::json!({ "instruction": instruction }).to_string();
    let (status, text) = http_request(port, "POST", "/api/ai/natural-crud", token, Some(&body));
    (status, serde_json::from_str(&text).expect("valid JSON"))
}

/// Parse an HTTP response into (status_code, body).
fn parse_http_response(response: &str) -> (u16, String) {
    let (headers, body) = response.split_once("\r\n\r\n").unwrap_or((response, ""));

    let status = headers
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    let chunked = headers
        .lines()
        .any(|l| l.eq_ignore_ascii_case("transfer-encoding: chunked"));
    let body = if chunked {
        decode_chunked(body)
    } else {
        body.to_string()
    };

    (status, body)
}

/// Decode chunked transfer encoding.
fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;

    while let Some(line_end) = remaining.find("\r\n") {
        let size = match usize::from_str_radix(remaining[..line_end].trim(), 16) {
            Ok(0) | Err(_) => break,
            Ok(s) => s,
        };
        let chunk_start = line_end + 2;
        let chunk_end = (chunk_start + size).min(remaining.len());
        result.push_str(&remaining[chunk_start..chunk_end]);
        remaining = remaining.get(chunk_end + 2..).unwrap_or("");
    }

    result
}

// ── Health and routing ──────────────────────────────────────────────────────

#[test]
fn health_returns_200_without_auth() {
    let server = start_server(60);
    let (status, body) = http_request(server.port, "GET", "/health", None, None);

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["status"], "ok");
    assert!(json.get("version").is_some());
}

#[test]
fn unknown_route_is_json_404() {
    let server = start_server(60);
    let (status, body) = http_request(server.port, "GET", "/api/resources", None, None);

    assert_eq!(status, 404);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["error"], "not found");
}

// ── Natural-language CRUD ───────────────────────────────────────────────────

#[test]
fn natural_crud_without_token_is_401() {
    let server = start_server(60);
    let (status, json) = natural_crud(server.port, None, "show lab 1");
    assert_eq!(status, 401);
    assert_eq!(json["error"], "Authentication required");
}

#[test]
fn natural_crud_with_unknown_token_is_401() {
    let server = start_server(60);
    let (status, _) = natural_crud(server.port, Some("forged"), "show lab 1");
    assert_eq!(status, 401);
}

#[test]
fn natural_crud_as_viewer_is_403() {
    let server = start_server(60);
    let (status, json) = natural_crud(server.port, Some(VIEWER_TOKEN), "show lab 1");
    assert_eq!(status, 403);
    assert_eq!(json["error"], "Admin access required");
}

#[test]
fn create_without_fields_asks_for_clarification() {
    let server = start_server(60);
    let (status, json) = natural_crud(server.port, Some(ADMIN_TOKEN), "create new monitor");

    assert_eq!(status, 400);
    let missing = json["data"]["missing_fields"]
        .as_array()
        .expect("missing_fields array");
    assert_eq!(missing.len(), 8);
    assert!(json["data"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Please provide the following fields:"));
}

#[test]
fn keyword_update_changes_matching_department() {
    let server = start_server(60);
    let (status, json) = natural_crud(
        server.port,
        Some(ADMIN_TOKEN),
        "update cost to 1000 for CSE department",
    );

    assert_eq!(status, 200, "{}", json);
    assert_eq!(json["message"], "Updated 2 resources");
    assert_eq!(json["data"]["matched_count"], 2);
    assert_eq!(json["data"]["modified_count"], 2);
    assert_eq!(json["data"]["filters_used"]["department"], "CSE");
    assert_eq!(json["data"]["fields_updated"]["cost"], 1000.0);
}

#[test]
fn keyword_delete_without_filters_is_rejected() {
    let server = start_server(60);
    let (status, json) = natural_crud(server.port, Some(ADMIN_TOKEN), "delete everything");

    assert_eq!(status, 400);
    assert_eq!(json["error"], "no target selection criteria");
}

#[test]
fn blank_instruction_is_400() {
    let server = start_server(60);
    let (status, json) = natural_crud(server.port, Some(ADMIN_TOKEN), "   ");
    assert_eq!(status, 400);
    assert_eq!(json["error"], "Instruction is required");
}

#[test]
fn malformed_body_still_checks_the_caller_first() {
    let server = start_server(60);
    let (status, text) = http_request(
        server.port,
        "POST",
        "/api/ai/natural-crud",
        None,
        Some("{not json"),
    );
    assert_eq!(status, 401);
    let json: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");
    assert_eq!(json["error"], "Authentication required");

    let (status, text) = http_request(
        server.port,
        "POST",
        "/api/ai/natural-crud",
        Some(ADMIN_TOKEN),
        Some("{not json"),
    );
    assert_eq!(status, 400);
    let json: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");
    assert_eq!(json["error"], "Instruction is required");
}

#[test]
fn chat_with_malformed_body_is_json_400() {
    let server = start_server(60);
    let (status, text) = http_request(
        server.port,
        "POST",
        "/api/ai/chat",
        Some(VIEWER_TOKEN),
        Some("[1, 2"),
    );
    assert_eq!(status, 400);
    let json: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");
    assert_eq!(json["error"], "Message is required");
}

// ── Chat ────────────────────────────────────────────────────────────────────

#[test]
fn chat_without_model_is_500() {
    let server = start_server(60);
    let body = serde_json::json!({ "message": "How many monitors are in Lab 1?" }).to_string();
    let (status, text) = http_request(
        server.port,
        "POST",
        "/api/ai/chat",
        Some(VIEWER_TOKEN),
        Some(&body),
    );

    assert_eq!(status, 500);
    let json: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");
    assert_eq!(json["error"], "Failed to get response");
}

#[test]
fn chat_history_is_empty_for_new_user() {
    let server = start_server(60);
    let (status, text) = http_request(
        server.port,
        "GET",
        "/api/ai/chat/history?page=1&limit=10",
        Some(VIEWER_TOKEN),
        None,
    );

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");
    assert_eq!(json["data"]["count"], 0);
    assert_eq!(json["data"]["page"], 1);
}

#[test]
fn viewer_cannot_read_other_history() {
    let server = start_server(60);
    let (status, _) = http_request(
        server.port,
        "GET",
        "/api/ai/chat/history?user_id=admin-1",
        Some(VIEWER_TOKEN),
        None,
    );
    assert_eq!(status, 403);

    let (status, _) = http_request(
        server.port,
        "GET",
        "/api/ai/chat/history?user_id=viewer-1",
        Some(ADMIN_TOKEN),
        None,
    );
    assert_eq!(status, 200);
}

// ── Rate limiting ───────────────────────────────────────────────────────────

#[test]
fn requests_over_budget_get_429() {
    let server = start_server(2);
    let mut statuses = Vec::new();
    for _ in 0..3 {
        statuses.push(http_request(server.port, "GET", "/health", None, None).0);
    }
    assert_eq!(statuses, vec![200, 200, 429]);
}
