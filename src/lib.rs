//! hostprobe - concurrent TCP liveness checks
//!
//! Expands a host list and a port list into `host:port` addresses, probes
//! every address in its own tokio task with a per-connection timeout, and
//! collects one open/closed outcome per address. Metrics and the
//! table/CSV/JSON sinks sit on top of the same status map.

pub mod config;
pub mod error;
pub mod metrics;
pub mod network;
pub mod output;
pub mod probe;
pub mod scanner;
pub mod utils;

// Re-export commonly used types
pub use config::ProbeConfig;
pub use error::{ProbeError, ProbeResult};
pub use metrics::{InstrumentedProbe, ProbeMetrics};
pub use network::TcpConnectProbe;
pub use probe::{PortState, Probe};
pub use scanner::{ScanSummary, Scanner, StatusMap};
pub use utils::target_parser::{expand, split_address};

pub type Result<T> = std::result::Result<T, ProbeError>;
