//! Probe trait: the seam between the scanner and whatever performs a
//! single liveness check

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Liveness outcome for a single address.
///
/// `Closed` covers every failure mode: refused, unreachable, timed out,
/// unresolvable or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Closed,
}

impl PortState {
    pub fn is_open(self) -> bool {
        self == PortState::Open
    }
}

impl From<bool> for PortState {
    fn from(open: bool) -> Self {
        if open {
            PortState::Open
        } else {
            PortState::Closed
        }
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortState::Open => f.pad("open"),
            PortState::Closed => f.pad("closed"),
        }
    }
}

/// A single liveness check against one `host:port` address.
///
/// Implementations must be total: every failure is reported as `false`,
/// never as an error or a panic. They are shared across all units of work
/// of a scan, so any state they hold must be safe to use concurrently.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Returns `true` only if the address accepted a connection within `timeout`
    async fn is_open(&self, addr: &str, timeout: Duration) -> bool;

    /// Short name used in log lines
    fn name(&self) -> &str;
}
