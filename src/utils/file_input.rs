//! Reading hosts files
//!
//! A hosts file is plain text with one host per line. Trailing line breaks
//! at the end of the file are ignored, everything else is kept verbatim
//! (including blank lines and carriage returns inside the file).

use crate::error::ProbeResult;
use std::fs;
use std::path::Path;

/// Split raw file content into host lines.
///
/// All trailing `\r` and `\n` characters are stripped first; an empty
/// result yields no lines. Otherwise the content is split on `\n` only.
pub fn lines_from_bytes(data: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(data);
    let content = text.trim_end_matches(|c: char| c == '\r' || c == '\n');
    if content.is_empty() {
        return Vec::new();
    }
    content.split('\n').map(str::to_string).collect()
}

/// Read a hosts file from disk
pub fn hosts_from_file<P: AsRef<Path>>(path: P) -> ProbeResult<Vec<String>> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    let hosts = lines_from_bytes(&data);
    log::debug!("Read {} host(s) from {}", hosts.len(), path.display());
    Ok(hosts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_line_splitting() {
        let cases: Vec<(&str, Vec<&str>)> = vec![
            ("", vec![]),
            ("\n", vec![]),
            ("\r\n", vec![]),
            ("test", vec!["test"]),
            ("test\n", vec!["test"]),
            ("test\r\n", vec!["test"]),
            ("a\nb\nc\n", vec!["a", "b", "c"]),
            ("a\r\nb\r\nc\r\n", vec!["a\r", "b\r", "c"]),
            ("a\nb\r\nc", vec!["a", "b\r", "c"]),
        ];

        for (input, want) in cases {
            assert_eq!(lines_from_bytes(input.as_bytes()), want, "input: {:?}", input);
        }
    }

    #[test]
    fn test_unicode_lines() {
        let lines = lines_from_bytes("ą\nŁódź\n😊\n".as_bytes());
        assert_eq!(lines, vec!["ą", "Łódź", "😊"]);
    }

    #[test]
    fn test_split_is_idempotent() {
        for input in ["", "\n", "a\r\nb\r\nc\r\n", "x\r\ny\nz", "a\n\nb\n\n"] {
            let first = lines_from_bytes(input.as_bytes());
            let second = lines_from_bytes(first.join("\n").as_bytes());
            assert_eq!(first, second, "input: {:?}", input);
        }
    }

    #[test]
    fn test_hosts_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "host1").unwrap();
        writeln!(temp_file, "host2").unwrap();

        let hosts = hosts_from_file(temp_file.path()).unwrap();
        assert_eq!(hosts, vec!["host1", "host2"]);
    }

    #[test]
    fn test_missing_file() {
        let result = hosts_from_file("/definitely/not/here/hosts.txt");
        assert!(matches!(result, Err(crate::ProbeError::Io(_))));
    }
}
