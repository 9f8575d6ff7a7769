//! Utility modules for target handling

pub mod file_input;
pub mod target_parser;

pub use file_input::{hosts_from_file, lines_from_bytes};
pub use target_parser::{expand, split_address};
