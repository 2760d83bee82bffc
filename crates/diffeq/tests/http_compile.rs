//! Tests for the HTTP compile client against a local server.

use diffeq::prelude::*;
use diffeq::{CompilerConfig, HttpCompileService};
use diffeq_test::{logistic_module, Variant, LOGISTIC_SOURCE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Answers a single request with `status` and `body`, returning the raw request.
async fn serve_once(status: &'static str, body: Vec<u8>) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let head = format!(
            "HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{addr}/diffeq/"), server)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .map(|value| value.trim().parse::<usize>().unwrap())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                break;
            }
        }
    }
    String::from_utf8(buf).unwrap()
}

fn client(base_url: &str) -> HttpCompileService {
    HttpCompileService::new(&CompilerConfig {
        base_url: base_url.to_string(),
        timeout_secs: Some(10),
        ..CompilerConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_posts_source_as_json() {
    let binary = logistic_module(Variant::SelfLimiting);
    let (url, server) = serve_once("200 OK", binary.clone()).await;

    let service = client(&url);
    assert!(service.url().ends_with("/diffeq/compile"));
    let received = service.compile(LOGISTIC_SOURCE).await.unwrap();
    assert_eq!(received, binary);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /diffeq/compile HTTP/1.1\r\n"));
    assert!(request
        .to_lowercase()
        .contains("content-type: application/json"));

    let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["text"], LOGISTIC_SOURCE);
    assert_eq!(json["name"], "unknown");
}

#[tokio::test]
async fn test_error_body_becomes_diagnostic() {
    let diagnostic = "error: unexpected token `{` at line 1";
    let (url, server) = serve_once("400 Bad Request", diagnostic.as_bytes().to_vec()).await;

    match client(&url).compile("a { 1 }").await {
        Err(DiffeqError::Compilation(message)) => assert_eq!(message, diagnostic),
        other => panic!("expected Compilation, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_empty_error_body_uses_status() {
    let (url, server) = serve_once("500 Internal Server Error", Vec::new()).await;

    match client(&url).compile(LOGISTIC_SOURCE).await {
        Err(DiffeqError::Compilation(message)) => {
            assert_eq!(message, "500 Internal Server Error");
        }
        other => panic!("expected Compilation, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert!(matches!(
        client(&format!("http://{addr}")).compile(LOGISTIC_SOURCE).await,
        Err(DiffeqError::Transport(_))
    ));
}

#[tokio::test]
async fn test_diffeq_compiles_over_http() {
    let (url, server) = serve_once("200 OK", logistic_module(Variant::CrossTerm)).await;

    let diffeq = Diffeq::new(HostConfig::default().with_base_url(url)).unwrap();
    let model = diffeq.compile(LOGISTIC_SOURCE, Some("remote")).await.unwrap();
    server.await.unwrap();

    assert!(model.capability_report().is_complete());
    assert!(diffeq.lookup(Some("remote")).is_some());
}
