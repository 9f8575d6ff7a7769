//! Output formatting and management
//!
//! Every sink renders the same status map. Addresses are split into host
//! and port on their first colon and rows are sorted so repeated runs
//! produce identical reports.

use crate::config::{ProbeConfig, DEFAULT_CSV_PATH, DEFAULT_JSON_PATH};
use crate::error::{ProbeError, ProbeResult};
use crate::probe::PortState;
use crate::scanner::StatusMap;
use crate::utils::target_parser::split_address;
use colored::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

impl OutputFormat {
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Table => "Table",
            OutputFormat::Csv => "CSV",
            OutputFormat::Json => "JSON",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" | "txt" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// One report row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStatus {
    pub host: String,
    pub port: String,
    pub status: PortState,
}

/// Report rows sorted by host, then port (numerically where possible)
pub fn rows(statuses: &StatusMap) -> Vec<HostStatus> {
    let mut rows: Vec<HostStatus> = statuses
        .iter()
        .map(|(addr, &open)| {
            let (host, port) = split_address(addr);
            HostStatus {
                host: host.to_string(),
                port: port.to_string(),
                status: PortState::from(open),
            }
        })
        .collect();

    rows.sort_by(|a, b| a.host.cmp(&b.host).then_with(|| compare_ports(&a.port, &b.port)));
    rows
}

fn compare_ports(a: &str, b: &str) -> Ordering {
    match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Print a fixed-width table
pub fn write_table<W: Write>(w: &mut W, statuses: &StatusMap, colored: bool) -> io::Result<()> {
    let header = format!("{:<20} {:<8} {:<8}", "hostname", "port", "status");
    let rule = format!("{} {} {}", "-".repeat(20), "-".repeat(8), "-".repeat(8));
    if colored {
        writeln!(w, "{}", header.cyan())?;
        writeln!(w, "{}", rule.cyan())?;
    } else {
        writeln!(w, "{}", header.trim_end())?;
        writeln!(w, "{}", rule)?;
    }

    for row in rows(statuses) {
        let location = format!("{:<20} {:<8}", row.host, row.port);
        if colored {
            let status = format!("{:<8}", row.status);
            let status = match row.status {
                PortState::Open => status.green(),
                PortState::Closed => status.red(),
            };
            writeln!(w, "{} {}", location.yellow(), status)?;
        } else {
            writeln!(w, "{} {}", location, row.status)?;
        }
    }

    Ok(())
}

/// Write `hostname,port,status` rows
pub fn write_csv<W: Write>(w: W, statuses: &StatusMap) -> ProbeResult<()> {
    let mut writer = csv::Writer::from_writer(w);
    writer.write_record(["hostname", "port", "status"])?;
    for row in rows(statuses) {
        let status = row.status.to_string();
        writer.write_record([row.host.as_str(), row.port.as_str(), status.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a pretty-printed JSON array of `{host, port, status}` objects
pub fn write_json<W: Write>(mut w: W, statuses: &StatusMap) -> ProbeResult<()> {
    serde_json::to_writer_pretty(&mut w, &rows(statuses))?;
    writeln!(w)?;
    w.flush()?;
    Ok(())
}

/// Render one format into a writer
pub fn write_format<W: Write>(
    w: &mut W,
    format: OutputFormat,
    statuses: &StatusMap,
    colored: bool,
) -> ProbeResult<()> {
    match format {
        OutputFormat::Table => write_table(w, statuses, colored)?,
        OutputFormat::Csv => write_csv(w, statuses)?,
        OutputFormat::Json => write_json(w, statuses)?,
    }
    Ok(())
}

/// Write a report file, replacing any existing file
pub fn write_report<P: AsRef<Path>>(
    path: P,
    format: OutputFormat,
    statuses: &StatusMap,
) -> ProbeResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| {
        ProbeError::Output(format!("failed to create {}: {}", path.display(), e))
    })?;
    let mut writer = BufWriter::new(file);
    write_format(&mut writer, format, statuses, false)?;
    writer.flush()?;

    log::info!("{} file created: {}", format.name(), path.display());
    Ok(())
}

/// Which sinks a run writes to
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPlan {
    /// Formats printed to stdout, in order
    pub stdout: Vec<OutputFormat>,

    /// Report files to write
    pub files: Vec<(OutputFormat, PathBuf)>,

    pub colored: bool,
}

impl OutputPlan {
    /// Decide the sinks for a configuration.
    ///
    /// With `stdout` set, selected CSV and JSON reports are printed (table
    /// if neither is selected). With no selection at all the table is
    /// printed. Selected reports are always written to their files too.
    pub fn from_config(config: &ProbeConfig) -> Self {
        let mut files = Vec::new();
        if let Some(path) = &config.csv_path {
            files.push((OutputFormat::Csv, PathBuf::from(path)));
        }
        if let Some(path) = &config.json_path {
            files.push((OutputFormat::Json, PathBuf::from(path)));
        }

        let stdout = if config.stdout {
            let printed: Vec<OutputFormat> = files.iter().map(|(format, _)| *format).collect();
            if printed.is_empty() {
                vec![OutputFormat::Table]
            } else {
                printed
            }
        } else if files.is_empty() {
            vec![OutputFormat::Table]
        } else {
            Vec::new()
        };

        Self {
            stdout,
            files,
            colored: config.colored,
        }
    }

    /// Print and write everything in the plan
    pub fn emit(&self, statuses: &StatusMap) -> ProbeResult<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for &format in &self.stdout {
            write_format(&mut out, format, statuses, self.colored)?;
        }
        drop(out);

        for (format, path) in &self.files {
            write_report(path, *format, statuses)?;
            println!(
                "{} {} file created: {}",
                "[INFO]".magenta(),
                format.name(),
                path.display()
            );
        }

        Ok(())
    }
}

/// Default report path for a flag given without a value
pub fn default_path(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Csv => DEFAULT_CSV_PATH,
        OutputFormat::Json => DEFAULT_JSON_PATH,
        OutputFormat::Table => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StatusMap {
        let mut statuses = StatusMap::new();
        statuses.insert("web.example:443".to_string(), true);
        statuses.insert("web.example:80".to_string(), false);
        statuses.insert("db.example:5432".to_string(), false);
        statuses.insert("web.example:8080".to_string(), true);
        statuses
    }

    #[test]
    fn test_rows_sorted() {
        let rows = rows(&sample());
        let order: Vec<(&str, &str)> = rows.iter().map(|r| (r.host.as_str(), r.port.as_str())).collect();
        assert_eq!(
            order,
            vec![
                ("db.example", "5432"),
                ("web.example", "80"),
                ("web.example", "443"),
                ("web.example", "8080"),
            ]
        );
    }

    #[test]
    fn test_table_plain() {
        let mut buf = Vec::new();
        write_table(&mut buf, &sample(), false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "hostname             port     status");
        assert_eq!(lines[1], format!("{} {} {}", "-".repeat(20), "-".repeat(8), "-".repeat(8)));
        assert_eq!(lines[2], "db.example           5432     closed");
        assert_eq!(lines[4], "web.example          443      open");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_csv() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(
            text,
            "hostname,port,status\n\
             db.example,5432,closed\n\
             web.example,80,closed\n\
             web.example,443,open\n\
             web.example,8080,open\n"
        );
    }

    #[test]
    fn test_json() {
        let mut buf = Vec::new();
        write_json(&mut buf, &sample()).unwrap();
        let parsed: Vec<HostStatus> = serde_json::from_slice(&buf).unwrap();

        assert_eq!(parsed.len(), 4);
        assert_eq!(
            parsed[2],
            HostStatus {
                host: "web.example".to_string(),
                port: "443".to_string(),
                status: PortState::Open,
            }
        );
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"status\": \"closed\""));
    }

    #[test]
    fn test_json_empty() {
        let mut buf = Vec::new();
        write_json(&mut buf, &StatusMap::new()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "[]\n");
    }

    #[test]
    fn test_address_without_port() {
        let mut statuses = StatusMap::new();
        statuses.insert("lonely".to_string(), false);
        let rows = rows(&statuses);
        assert_eq!(rows[0].host, "lonely");
        assert_eq!(rows[0].port, "");
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("CSV".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_plan_default_is_table() {
        let plan = OutputPlan::from_config(&ProbeConfig::default());
        assert_eq!(plan.stdout, vec![OutputFormat::Table]);
        assert!(plan.files.is_empty());
    }

    #[test]
    fn test_plan_files_only() {
        let mut config = ProbeConfig::default();
        config.csv_path = Some("out.csv".to_string());
        let plan = OutputPlan::from_config(&config);
        assert!(plan.stdout.is_empty());
        assert_eq!(plan.files, vec![(OutputFormat::Csv, PathBuf::from("out.csv"))]);
    }

    #[test]
    fn test_plan_stdout_with_reports() {
        let mut config = ProbeConfig::default();
        config.stdout = true;
        assert_eq!(OutputPlan::from_config(&config).stdout, vec![OutputFormat::Table]);

        config.csv_path = Some(DEFAULT_CSV_PATH.to_string());
        config.json_path = Some(DEFAULT_JSON_PATH.to_string());
        let plan = OutputPlan::from_config(&config);
        assert_eq!(plan.stdout, vec![OutputFormat::Csv, OutputFormat::Json]);
        assert_eq!(plan.files.len(), 2);
    }

    #[test]
    fn test_write_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_report(&path, OutputFormat::Csv, &sample()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("hostname,port,status\n"));

        let bad = dir.path().join("missing").join("report.json");
        assert!(matches!(
            write_report(&bad, OutputFormat::Json, &sample()),
            Err(ProbeError::Output(_))
        ));
    }
}
