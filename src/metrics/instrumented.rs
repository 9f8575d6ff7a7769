//! Instrumentation wrapper around a probe

use crate::metrics::ProbeMetrics;
use crate::probe::Probe;
use crate::utils::target_parser::split_address;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Records attempts, outcome and latency for every call into the wrapped
/// probe. The boolean result is passed through untouched.
pub struct InstrumentedProbe {
    inner: Arc<dyn Probe>,
    metrics: Arc<ProbeMetrics>,
}

impl InstrumentedProbe {
    pub fn new(inner: Arc<dyn Probe>, metrics: Arc<ProbeMetrics>) -> Self {
        Self { inner, metrics }
    }

    pub fn metrics(&self) -> &Arc<ProbeMetrics> {
        &self.metrics
    }
}

#[async_trait]
impl Probe for InstrumentedProbe {
    async fn is_open(&self, addr: &str, timeout: Duration) -> bool {
        let (host, port) = split_address(addr);
        let series = self.metrics.series(host, port).await;

        series.record_attempt();
        let start = Instant::now();
        let open = self.inner.is_open(addr, timeout).await;
        series.record_outcome(open, start.elapsed());

        open
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
