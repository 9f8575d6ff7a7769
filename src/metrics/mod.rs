//! Probe metrics
//!
//! Per `(host, port)` counters for attempts, successes and failures plus a
//! latency histogram. A [`ProbeMetrics`] registry is built explicitly and
//! shared through an `Arc`; the scanner writes to it through
//! [`InstrumentedProbe`] and never reads it back. The registry renders
//! itself in the Prometheus text exposition format for [`server`].

pub mod instrumented;
pub mod server;

pub use instrumented::InstrumentedProbe;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Latency bucket upper bounds in seconds (Prometheus client defaults)
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

const ATTEMPTS: &str = "hostprobe_attempts_total";
const SUCCESSES: &str = "hostprobe_success_total";
const FAILURES: &str = "hostprobe_failure_total";
const LATENCY: &str = "hostprobe_latency_seconds";

/// Lock-free latency histogram
#[derive(Debug)]
pub struct LatencyHistogram {
    bounds: &'static [f64],
    /// Non-cumulative counts, one per bound
    buckets: Vec<AtomicU64>,
    count: AtomicU64,
    /// f64 bit pattern of the running sum in seconds
    sum_bits: AtomicU64,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new(&DEFAULT_BUCKETS)
    }
}

impl LatencyHistogram {
    pub fn new(bounds: &'static [f64]) -> Self {
        Self {
            bounds,
            buckets: bounds.iter().map(|_| AtomicU64::new(0)).collect(),
            count: AtomicU64::new(0),
            sum_bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Record one observation
    pub fn observe(&self, latency: Duration) {
        let secs = latency.as_secs_f64();

        // Observations above the last bound only land in +Inf, which is `count`
        if let Some(idx) = self.bounds.iter().position(|&le| secs <= le) {
            self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        }
        self.count.fetch_add(1, Ordering::Relaxed);

        let mut current = self.sum_bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + secs).to_bits();
            match self.sum_bits.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum_bits.load(Ordering::Relaxed))
    }

    /// Cumulative view of the buckets
    pub fn snapshot(&self) -> HistogramSnapshot {
        let mut running = 0;
        let buckets = self
            .bounds
            .iter()
            .zip(&self.buckets)
            .map(|(&le, bucket)| {
                running += bucket.load(Ordering::Relaxed);
                (le, running)
            })
            .collect();

        HistogramSnapshot {
            buckets,
            count: self.count(),
            sum: self.sum(),
        }
    }
}

/// Counters for one `(host, port)` label pair
#[derive(Debug, Default)]
pub struct LabelSeries {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    latency: LatencyHistogram,
}

impl LabelSeries {
    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the latency and outcome of a finished probe
    pub fn record_outcome(&self, open: bool, latency: Duration) {
        self.latency.observe(latency);
        if open {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn latency(&self) -> &LatencyHistogram {
        &self.latency
    }
}

/// Registry of label series, keyed by `(host, port)`
#[derive(Debug, Default)]
pub struct ProbeMetrics {
    series: RwLock<HashMap<(String, String), Arc<LabelSeries>>>,
}

impl ProbeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the series for a label pair
    pub async fn series(&self, host: &str, port: &str) -> Arc<LabelSeries> {
        let key = (host.to_string(), port.to_string());

        if let Some(series) = self.series.read().await.get(&key) {
            return series.clone();
        }

        let mut series = self.series.write().await;
        series.entry(key).or_default().clone()
    }

    /// Number of distinct label pairs seen so far
    pub async fn len(&self) -> usize {
        self.series.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Point-in-time copy of every series, sorted by host then port
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let series = self.series.read().await;
        let mut out: Vec<SeriesSnapshot> = series
            .iter()
            .map(|((host, port), s)| SeriesSnapshot {
                host: host.clone(),
                port: port.clone(),
                attempts: s.attempts(),
                successes: s.successes(),
                failures: s.failures(),
                latency: s.latency().snapshot(),
            })
            .collect();
        out.sort_by(|a, b| (&a.host, &a.port).cmp(&(&b.host, &b.port)));

        MetricsSnapshot { series: out }
    }

    /// Render all series in the Prometheus text exposition format
    pub async fn render(&self) -> String {
        self.snapshot().await.render()
    }
}

/// Serializable copy of a histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    /// `(upper bound, cumulative count)` pairs
    pub buckets: Vec<(f64, u64)>,
    pub count: u64,
    pub sum: f64,
}

/// Serializable copy of one label series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    pub host: String,
    pub port: String,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub latency: HistogramSnapshot,
}

/// Serializable copy of the whole registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub series: Vec<SeriesSnapshot>,
}

impl MetricsSnapshot {
    /// Totals across all series: (attempts, successes, failures)
    pub fn totals(&self) -> (u64, u64, u64) {
        self.series.iter().fold((0, 0, 0), |(a, s, f), series| {
            (a + series.attempts, s + series.successes, f + series.failures)
        })
    }

    pub fn get(&self, host: &str, port: &str) -> Option<&SeriesSnapshot> {
        self.series.iter().find(|s| s.host == host && s.port == port)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        render_counter(&mut out, ATTEMPTS, "Total number of probe attempts", &self.series, |s| s.attempts);
        render_counter(&mut out, SUCCESSES, "Total number of successful probes", &self.series, |s| s.successes);
        render_counter(&mut out, FAILURES, "Total number of failed probes", &self.series, |s| s.failures);

        let _ = writeln!(out, "# HELP {} Probe latency in seconds", LATENCY);
        let _ = writeln!(out, "# TYPE {} histogram", LATENCY);
        for s in &self.series {
            let labels = labels(&s.host, &s.port);
            for (le, count) in &s.latency.buckets {
                let _ = writeln!(out, "{}_bucket{{{},le=\"{}\"}} {}", LATENCY, labels, le, count);
            }
            let _ = writeln!(out, "{}_bucket{{{},le=\"+Inf\"}} {}", LATENCY, labels, s.latency.count);
            let _ = writeln!(out, "{}_sum{{{}}} {}", LATENCY, labels, s.latency.sum);
            let _ = writeln!(out, "{}_count{{{}}} {}", LATENCY, labels, s.latency.count);
        }

        out
    }
}

fn render_counter<F>(out: &mut String, name: &str, help: &str, series: &[SeriesSnapshot], value: F)
where
    F: Fn(&SeriesSnapshot) -> u64,
{
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} counter", name);
    for s in series {
        let _ = writeln!(out, "{}{{{}}} {}", name, labels(&s.host, &s.port), value(s));
    }
}

fn labels(host: &str, port: &str) -> String {
    format!("host=\"{}\",port=\"{}\"", escape_label(host), escape_label(port))
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
