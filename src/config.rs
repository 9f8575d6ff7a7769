//! Configuration module for hostprobe

use crate::error::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Ports probed when none are given
pub const DEFAULT_PORTS: [&str; 3] = ["22", "80", "443"];

/// Default per-connection timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default metrics listen address (all interfaces)
pub const DEFAULT_METRICS_ADDR: &str = ":9090";

pub const DEFAULT_CSV_PATH: &str = "hostprobe.csv";
pub const DEFAULT_JSON_PATH: &str = "hostprobe.json";

/// Main configuration structure for a probe run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Ports to probe on every host, kept as given
    pub ports: Vec<String>,

    /// Timeout for each connection attempt. In TOML an integer is taken as
    /// milliseconds and a string as a duration such as `"250us"`.
    #[serde(alias = "timeout_ms", with = "timeout_serde")]
    pub timeout: Duration,

    /// Maximum number of in-flight probes; unbounded if unset
    pub concurrency: Option<usize>,

    /// Metrics endpoint address; disabled if unset
    pub metrics_addr: Option<String>,

    /// Write a CSV report to this path
    pub csv_path: Option<String>,

    /// Write a JSON report to this path
    pub json_path: Option<String>,

    /// Print results to stdout even when writing files
    pub stdout: bool,

    /// Colorize the table output
    pub colored: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ports: DEFAULT_PORTS.iter().map(|p| p.to_string()).collect(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            concurrency: None,
            metrics_addr: Some(DEFAULT_METRICS_ADDR.to_string()),
            csv_path: None,
            json_path: None,
            stdout: false,
            colored: true,
        }
    }
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ports to probe
    pub fn with_ports(mut self, ports: Vec<String>) -> Self {
        self.ports = ports;
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bound the number of in-flight probes
    pub fn with_concurrency(mut self, concurrency: Option<usize>) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set or disable the metrics endpoint
    pub fn with_metrics_addr(mut self, addr: Option<String>) -> Self {
        self.metrics_addr = addr;
        self
    }

    /// Get timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ProbeResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ProbeError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ProbeError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from default locations
    pub fn load_default_config() -> Self {
        let Some(home_dir) = dirs::home_dir() else {
            return Self::default();
        };

        let config_path = home_dir.join(".hostprobe.toml");
        if config_path.exists() {
            match Self::from_toml_file(&config_path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", config_path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ProbeResult<()> {
        if self.ports.iter().all(|p| p.trim().is_empty()) {
            return Err(ProbeError::InvalidPorts("No ports specified".to_string()));
        }

        if self.timeout.is_zero() {
            return Err(ProbeError::Config("Timeout must be greater than 0".to_string()));
        }

        if self.concurrency == Some(0) {
            return Err(ProbeError::Config(
                "Concurrency limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a duration such as `500ms`, `2s`, `1m30s` or `1.5s`.
///
/// Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`. A bare number is rejected
/// because its unit would be ambiguous.
pub fn parse_duration(input: &str) -> ProbeResult<Duration> {
    let s = input.trim();
    let invalid = |why: &str| {
        ProbeError::Config(format!(
            "invalid duration {:?}: {} (examples: 500ms, 2s, 1m30s)",
            input, why
        ))
    };

    if s.is_empty() {
        return Err(invalid("empty"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid("expected a number"));
        }
        let number = &rest[..number_len];
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_nanos: u128 = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit")),
        };
        rest = &rest[unit_len..];

        let nanos = scaled_nanos(number, unit_nanos).ok_or_else(|| invalid("bad number"))?;
        total_nanos = total_nanos
            .checked_add(nanos)
            .ok_or_else(|| invalid("out of range"))?;
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000).map_err(|_| invalid("out of range"))?;
    Ok(Duration::new(secs, (total_nanos % 1_000_000_000) as u32))
}

/// `number` (digits with an optional fraction) times `unit_nanos`, exact to
/// the nanosecond. Fraction digits below one nanosecond are dropped.
fn scaled_nanos(number: &str, unit_nanos: u128) -> Option<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return None;
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(unit_nanos)?;

    let mut place = unit_nanos;
    for digit in fraction.bytes() {
        place /= 10;
        if place == 0 {
            break;
        }
        nanos = nanos.checked_add(u128::from(digit - b'0') * place)?;
    }

    Some(nanos)
}

/// Flatten `--ports` values: each value may itself be comma separated.
///
/// Blank entries are dropped. A list that ends up empty is an error since
/// it can only come from an explicit empty flag such as `--ports=`.
pub fn parse_ports<S: AsRef<str>>(values: &[S]) -> ProbeResult<Vec<String>> {
    let ports: Vec<String> = values
        .iter()
        .flat_map(|v| v.as_ref().split(','))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    if ports.is_empty() {
        return Err(ProbeError::InvalidPorts(format!(
            "--ports= provided without any value\nuse --ports for defaults ({})\nor --ports=<port[,port,...]> for specific ports",
            DEFAULT_PORTS.join(",")
        )));
    }

    Ok(ports)
}

/// TOML form of the timeout: integer milliseconds or a duration string
mod timeout_serde {
    use super::parse_duration;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if timeout.subsec_nanos() % 1_000_000 == 0 {
            let millis = u64::try_from(timeout.as_millis()).map_err(serde::ser::Error::custom)?;
            serializer.serialize_u64(millis)
        } else {
            serializer.serialize_str(&format!("{}ns", timeout.as_nanos()))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Ok(Duration::from_millis(ms)),
            Raw::Text(text) => parse_duration(&text).map_err(de::Error::custom),
        }
    }
}

/// Expand a bare `:port` listen address to all interfaces
pub fn normalize_listen_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}
