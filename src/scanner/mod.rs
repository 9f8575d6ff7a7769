//! Scanner module containing the concurrent probe engine

pub mod engine;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use engine::Scanner;

/// Address (`host:port`) to open/closed
pub type StatusMap = HashMap<String, bool>;

/// Outcome counts of a completed run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Unique addresses probed
    pub total: usize,

    /// Addresses that accepted a connection
    pub open: usize,

    /// Everything else
    pub closed: usize,

    /// Wall-clock time of the last run
    pub duration: Duration,
}

impl ScanSummary {
    pub fn from_statuses(statuses: &StatusMap, duration: Duration) -> Self {
        let open = statuses.values().filter(|&&open| open).count();
        Self {
            total: statuses.len(),
            open,
            closed: statuses.len() - open,
            duration,
        }
    }

    /// Probes completed per second
    pub fn scan_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.total as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}
