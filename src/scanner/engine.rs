//! Concurrent scanning engine
//!
//! One tokio task per unique address. Each task runs the probe with the
//! scanner's timeout and then writes its outcome into the shared status
//! map under an exclusive lock. Dials run fully in parallel; only the
//! bookkeeping write is serialized. `run` returns once every task has
//! been joined.

use crate::metrics::{InstrumentedProbe, ProbeMetrics};
use crate::network::socket::TcpConnectProbe;
use crate::probe::{PortState, Probe};
use crate::scanner::{ScanSummary, StatusMap};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};

/// Owns the status map for a set of addresses and probes them concurrently
pub struct Scanner {
    statuses: StatusMap,
    timeout: Duration,
    probe: Arc<dyn Probe>,
    /// Max in-flight probes, `None` for one unit per address
    concurrency: Option<usize>,
    last_duration: Duration,
}

impl Scanner {
    /// Create a scanner over `addrs` using TCP connect probes.
    ///
    /// Duplicate addresses collapse to a single entry. Every entry starts
    /// closed.
    pub fn new<I>(addrs: I, timeout: Duration) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let statuses = addrs
            .into_iter()
            .map(|addr| (addr.as_ref().to_string(), false))
            .collect();

        Self {
            statuses,
            timeout,
            probe: Arc::new(TcpConnectProbe::new()),
            concurrency: None,
            last_duration: Duration::ZERO,
        }
    }

    /// Replace the probe used for every address
    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probe = probe;
        self
    }

    /// Record metrics for every probe made by this scanner.
    ///
    /// Wraps the probe configured at the time of the call, so set a custom
    /// probe first.
    pub fn with_metrics(mut self, metrics: Arc<ProbeMetrics>) -> Self {
        self.probe = Arc::new(InstrumentedProbe::new(self.probe, metrics));
        self
    }

    /// Bound the number of in-flight probes. `None` or `Some(0)` keeps the
    /// default of no bound.
    pub fn with_concurrency(mut self, limit: Option<usize>) -> Self {
        self.concurrency = limit.filter(|&n| n > 0);
        self
    }

    /// Probe every address and record the outcomes.
    ///
    /// All entries are reset to closed first, so each run is a fresh scan.
    /// Probe failures are outcomes, not errors; a task that panics leaves
    /// its address closed without affecting the rest of the run.
    pub async fn run(&mut self) {
        let start = Instant::now();

        // Snapshot the keys before any task can touch the map
        let addrs: Vec<String> = self.statuses.keys().cloned().collect();
        if addrs.is_empty() {
            self.last_duration = start.elapsed();
            return;
        }

        log::info!(
            "Probing {} address(es) with {} probe, timeout {:?}{}",
            addrs.len(),
            self.probe.name(),
            self.timeout,
            match self.concurrency {
                Some(n) => format!(", at most {} in flight", n),
                None => String::new(),
            }
        );

        for open in self.statuses.values_mut() {
            *open = false;
        }
        let shared = Arc::new(Mutex::new(std::mem::take(&mut self.statuses)));
        let semaphore = self.concurrency.map(|n| Arc::new(Semaphore::new(n)));

        let mut handles = Vec::with_capacity(addrs.len());
        for addr in addrs {
            let statuses = shared.clone();
            let probe = self.probe.clone();
            let semaphore = semaphore.clone();
            let timeout = self.timeout;

            let handle = tokio::spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };

                let open = probe.is_open(&addr, timeout).await;
                log::debug!("{} {}", addr, PortState::from(open));

                let mut statuses = statuses.lock().await;
                if let Some(slot) = statuses.get_mut(&addr) {
                    *slot = open;
                }
            });
            handles.push(handle);
        }

        // Barrier: every unit finishes before the map is handed back
        for result in join_all(handles).await {
            if let Err(e) = result {
                log::warn!("Probe task failed: {}", e);
            }
        }

        self.statuses = match Arc::try_unwrap(shared) {
            Ok(statuses) => statuses.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };
        self.last_duration = start.elapsed();

        let summary = self.summary();
        log::info!(
            "Probed {} address(es) in {:.2?}: {} open, {} closed",
            summary.total,
            summary.duration,
            summary.open,
            summary.closed
        );
    }

    /// Read-only view of the outcomes
    pub fn statuses(&self) -> &StatusMap {
        &self.statuses
    }

    pub fn into_statuses(self) -> StatusMap {
        self.statuses
    }

    /// Outcome for one address, if it is part of this scan
    pub fn state(&self, addr: &str) -> Option<PortState> {
        self.statuses.get(addr).map(|&open| PortState::from(open))
    }

    /// Open addresses in sorted order
    pub fn open_addresses(&self) -> Vec<&str> {
        let mut open: Vec<&str> = self
            .statuses
            .iter()
            .filter(|(_, open)| **open)
            .map(|(addr, _)| addr.as_str())
            .collect();
        open.sort_unstable();
        open
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary::from_statuses(&self.statuses, self.last_duration)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn concurrency(&self) -> Option<usize> {
        self.concurrency
    }

    /// Number of unique addresses
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
