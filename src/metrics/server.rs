//! Minimal HTTP endpoint exposing `/metrics`
//!
//! Only enough HTTP/1.1 to satisfy a Prometheus scraper: the request line
//! is read, headers are ignored, and the connection is closed after one
//! response. Requests are capped at [`MAX_REQUEST_BYTES`] and each exchange
//! must finish within the server's request timeout.

use crate::error::{ProbeError, ProbeResult};
use crate::metrics::ProbeMetrics;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Most bytes read from one request (request line plus headers)
pub const MAX_REQUEST_BYTES: u64 = 8192;

/// Default limit on one request/response exchange
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after a failed accept so a persistent error does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bound metrics listener
pub struct MetricsServer {
    listener: TcpListener,
    metrics: Arc<ProbeMetrics>,
    request_timeout: Duration,
}

impl MetricsServer {
    /// Bind the listener without serving yet
    pub async fn bind(addr: &str, metrics: Arc<ProbeMetrics>) -> ProbeResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ProbeError::Metrics(format!("failed to bind {}: {}", addr, e)))?;
        Ok(Self {
            listener,
            metrics,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Drop connections that take longer than `timeout` to exchange
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> ProbeResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let metrics = self.metrics.clone();
                    let limit = self.request_timeout;
                    tokio::spawn(async move {
                        match tokio::time::timeout(limit, handle_connection(stream, metrics)).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => log::debug!("metrics request from {} failed: {}", peer, e),
                            Err(_) => log::debug!("metrics request from {} timed out", peer),
                        }
                    });
                }
                Err(e) => {
                    log::warn!("metrics listener accept failed: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

/// Bind `addr` and serve metrics on it in a background task
pub async fn serve(addr: &str, metrics: Arc<ProbeMetrics>) -> ProbeResult<SocketAddr> {
    let server = MetricsServer::bind(addr, metrics).await?;
    let local = server.local_addr()?;
    log::info!("Serving metrics on http://{}/metrics", local);
    tokio::spawn(server.run());
    Ok(local)
}

async fn handle_connection(stream: TcpStream, metrics: Arc<ProbeMetrics>) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let request_line = read_request(read_half).await?;

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");

    let response = match (method, path) {
        ("GET", "/metrics") => {
            let body = metrics.render().await;
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                CONTENT_TYPE,
                body.len(),
                body
            )
        }
        ("GET", _) => status_response("404 Not Found"),
        _ => status_response("405 Method Not Allowed"),
    };

    write_half.write_all(response.as_bytes()).await?;
    write_half.shutdown().await
}

/// Read the request line and drain headers, never past `MAX_REQUEST_BYTES`
async fn read_request<R: AsyncRead + Unpin>(reader: R) -> std::io::Result<String> {
    let mut reader = BufReader::new(reader.take(MAX_REQUEST_BYTES));

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    let mut header = String::new();
    loop {
        header.clear();
        let n = reader.read_line(&mut header).await?;
        if n == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }

    Ok(request_line)
}

fn status_response(status: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status
    )
}
