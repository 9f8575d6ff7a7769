//! TCP connect liveness checks

use crate::probe::Probe;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// TCP connect probe - no privileges required
///
/// Resolves and connects to the address under a single deadline. The
/// stream is dropped as soon as the handshake completes; no bytes are
/// exchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnectProbe;

impl TcpConnectProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Probe for TcpConnectProbe {
    async fn is_open(&self, addr: &str, timeout: Duration) -> bool {
        is_open(addr, timeout).await
    }

    fn name(&self) -> &str {
        "tcp-connect"
    }
}

/// Attempt one TCP connection to `addr` within `timeout`.
///
/// Any failure, including a malformed address or a DNS error, is `false`.
pub async fn is_open(addr: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            // Connection successful - close quickly
            drop(stream);
            true
        }
        Ok(Err(e)) => {
            log::trace!("{} closed: {}", addr, e);
            false
        }
        Err(_) => {
            log::trace!("{} closed: timed out after {:?}", addr, timeout);
            false
        }
    }
}
