//! Network module for connection-level liveness checks

pub mod socket;

pub use socket::{is_open, TcpConnectProbe};
