//! Server integration tests — real TCP round-trips against a running
//! `HttpServer`, plus file-backed flavours.

use research_mcp::mcp::{HttpServer, JsonRpcRequest, ResearchServer};
use research_mcp::types::ResearchConfig;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Helper: serve `server` on a random port, return (addr, http, task).
async fn start_test_server(
    server: ResearchServer,
) -> (
    std::net::SocketAddr,
    Arc<HttpServer>,
    tokio::task::JoinHandle<std::io::Result<()>>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let http = Arc::new(HttpServer::new(server, addr));

    let task_http = http.clone();
    let handle = tokio::spawn(async move { task_http.serve_listener(listener).await });
    (addr, http, handle)
}

/// Helper: one HTTP/1.1 exchange with `Connection: close`; returns (status, body).
async fn http_exchange(
    addr: std::net::SocketAddr,
    method: &str,
    path: &str,
    body: &str,
) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    (status, body.to_string())
}

fn records_file(records: &Value) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", records).unwrap();
    file
}

#[tokio::test]
async fn test_handshake_over_tcp() {
    let server = ResearchServer::general(ResearchConfig {
        records_data: Some(vec![json!({"id": "1", "title": "Alpha"})]),
        ..ResearchConfig::default()
    });
    let (addr, http, handle) = start_test_server(server).await;

    let (status, body) = http_exchange(addr, "GET", "/handshake", "").await;
    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["name"], "Research MCP");

    http.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_search_call_over_tcp() {
    let server = ResearchServer::general(ResearchConfig {
        records_data: Some(vec![
            json!({"id": "1", "name": "Alice"}),
            json!({"id": "2", "name": "Bob"}),
        ]),
        ..ResearchConfig::default()
    });
    let (addr, http, _handle) = start_test_server(server).await;

    let request = json!({
        "jsonrpc": "2.0", "id": "req-1", "method": "tools/call",
        "params": {"name": "search", "arguments": {"query": "bob"}},
    });
    let (status, body) = http_exchange(addr, "POST", "/mcp", &request.to_string()).await;
    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["id"], "req-1");
    assert_eq!(body["result"]["structuredContent"]["ids"], json!(["2"]));

    http.shutdown();
}

#[tokio::test]
async fn test_missing_records_file_searches_empty() {
    let dir = tempfile::tempdir().unwrap();
    let server = ResearchServer::general(ResearchConfig {
        records_path: Some(dir.path().join("absent.json")),
        ..ResearchConfig::default()
    });
    assert!(server.base().store().is_empty());

    let result = server.call_tool("search", json!({"query": "anything"})).await;
    assert!(!result.is_error());
    assert_eq!(result.structured_content.unwrap()["ids"], json!([]));
}

#[tokio::test]
async fn test_cupcake_reads_orders_file() {
    let file = records_file(&json!([
        {"id": "order-1", "title": "Red velvet", "text": "Two dozen red velvet cupcakes"},
        {"id": "order-2", "title": "Lemon", "text": "Lemon drizzle, no nuts"},
    ]));
    let server = ResearchServer::cupcake(Some(file.path()));
    assert_eq!(server.name(), "Cupcake MCP");

    let schema_props = server.catalog().get("search").unwrap().input_schema()["properties"].clone();
    assert!(schema_props.get("method").is_none());

    let hits = server.call_tool("search", json!({"query": "VELVET"})).await;
    assert_eq!(hits.structured_content.unwrap()["ids"], json!(["order-1"]));

    let fetched = server.call_tool("fetch", json!({"id": "order-2"})).await;
    let records = fetched.structured_content.unwrap()["records"].clone();
    assert_eq!(records["order-2"]["title"], "Lemon");

    let missing = server.call_tool("fetch", json!({"id": "order-9"})).await;
    assert!(missing.is_error());
}

#[tokio::test]
async fn test_object_form_records_file() {
    let file = records_file(&json!({
        "k1": {"title": "Keyed one"},
        "k2": {"id": "ignored", "title": "Keyed two"},
    }));
    let server = ResearchServer::general(ResearchConfig {
        records_path: Some(file.path().to_path_buf()),
        ..ResearchConfig::default()
    });
    let result = server.call_tool("search", json!({"query": "keyed"})).await;
    assert_eq!(result.structured_content.unwrap()["ids"], json!(["k1", "k2"]));
}

#[tokio::test]
async fn test_handle_ping_and_notification() {
    let server = ResearchServer::general(ResearchConfig {
        records_data: Some(vec![]),
        ..ResearchConfig::default()
    });
    let pong = server
        .handle(JsonRpcRequest::new(7, "ping", Value::Null))
        .await
        .unwrap();
    assert_eq!(pong.result, Some(json!({})));

    let mut note = JsonRpcRequest::new(0, "notifications/initialized", Value::Null);
    note.id = None;
    assert!(server.handle(note).await.is_none());
}
