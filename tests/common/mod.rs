//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use premium_unlock::config::{GatewayConfig, LedgerConfig, WalletConfig};

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl MockRequest {
    pub fn is(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// Log of every request a mock backend received.
pub type RequestLog = Arc<Mutex<Vec<MockRequest>>>;

pub fn count(log: &RequestLog, method: &str, path_prefix: &str) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|r| r.method == method && r.path.starts_with(path_prefix))
        .count()
}

/// Start a programmable mock backend on an ephemeral port.
///
/// The handler sees each parsed request and returns `(status, json body)`.
/// Every request is appended to the returned log.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, RequestLog)
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);
    let server_log = log.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    let log = server_log.clone();
                    tokio::spawn(async move {
                        let _ = serve(socket, f, log).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, log)
}

async fn serve<F, Fut>(mut socket: TcpStream, f: Arc<F>, log: RequestLog) -> std::io::Result<()>
where
    F: Fn(MockRequest) -> Fut,
    Fut: Future<Output = (u16, String)>,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    let request = MockRequest {
        method,
        path,
        headers,
        body,
    };
    log.lock().unwrap().push(request.clone());

    let (status, body) = f(request).await;
    let status_text = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

pub fn ledger_config(addr: SocketAddr) -> LedgerConfig {
    LedgerConfig {
        node_url: format!("http://{}", addr),
        failover_urls: Vec::new(),
        api_token: "test-token".to_string(),
        request_timeout_secs: 5,
        validity_rounds: 1000,
    }
}

pub fn gateway_config(addr: SocketAddr) -> GatewayConfig {
    GatewayConfig {
        analysis_url: format!("http://{}/api/analysis", addr),
        advice_url: format!("http://{}/api/advice", addr),
        request_timeout_secs: 5,
    }
}

pub fn wallet_config(addr: SocketAddr) -> WalletConfig {
    WalletConfig {
        bridge_url: format!("http://{}", addr),
        connect_timeout_secs: 5,
    }
}

pub fn params_body(last_round: u64) -> String {
    serde_json::json!({
        "consensus-version": "https://github.com/algorandfoundation/specs/tree/v40",
        "fee": 0,
        "genesis-hash": "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=",
        "genesis-id": "testnet-v1.0",
        "last-round": last_round,
        "min-fee": 1000
    })
    .to_string()
}

pub fn status_body(last_round: u64) -> String {
    serde_json::json!({ "last-round": last_round }).to_string()
}

pub fn pending_body(confirmed_round: u64) -> String {
    serde_json::json!({ "confirmed-round": confirmed_round, "pool-error": "" }).to_string()
}
