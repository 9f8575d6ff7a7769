//! Error handling for hostprobe
//!
//! Probe failures are never errors: a refused, unreachable or timed out
//! connection is simply a closed result. The variants here cover the
//! collaborators around the engine (configuration, hosts file, output sinks
//! and the metrics endpoint).

use thiserror::Error;

/// Main error type for everything outside the probe engine
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid ports: {0}")]
    InvalidPorts(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl ProbeError {
    /// Errors caused by user input rather than the environment
    pub fn is_usage_error(&self) -> bool {
        matches!(self, ProbeError::Config(_) | ProbeError::InvalidPorts(_))
    }
}

/// Result type alias for hostprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "hosts.txt");
        let err: ProbeError = io.into();
        assert!(matches!(err, ProbeError::Io(_)));
        assert!(err.to_string().contains("hosts.txt"));
        assert!(!err.is_usage_error());
    }

    #[test]
    fn test_usage_errors() {
        assert!(ProbeError::InvalidPorts("empty".to_string()).is_usage_error());
        assert!(ProbeError::Config("bad".to_string()).is_usage_error());
        assert!(!ProbeError::Metrics("bind".to_string()).is_usage_error());
    }
}
