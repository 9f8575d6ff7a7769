use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::process;
use std::sync::Arc;

use hostprobe::{
    config::{self, ProbeConfig},
    error::ProbeError,
    metrics::{server, ProbeMetrics},
    output::{default_path, OutputFormat, OutputPlan},
    scanner::Scanner,
    utils::{expand, hosts_from_file},
};

const LONG_ABOUT: &str = "\
hostprobe checks whether TCP ports are open on a list of hosts.

quick start:
  1. create a text file (e.g. hosts.txt) with one host per line.
  2. run: hostprobe --hosts hosts.txt
  3. see results printed in a table.

examples:
  # basic usage (table output)
  hostprobe --hosts hosts.txt

  # custom ports
  hostprobe --hosts hosts.txt --ports 8080,8443

  # save results to CSV and JSON
  hostprobe --hosts hosts.txt --csv --json

  # custom output filenames
  hostprobe --hosts hosts.txt --csv out.csv --json out.json

  # print results as CSV to terminal
  hostprobe --hosts hosts.txt --csv --stdout

tips:
  - --ports may be repeated: --ports 22 --ports 443
  - without any output flag, results print as a table.
  - use --timeout to avoid waiting too long for slow hosts.
  - metrics are served on :9090/metrics unless --no-metrics is given.";

fn build_cli() -> Command {
    Command::new("hostprobe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Check TCP port availability for a list of hosts")
        .long_about(LONG_ABOUT)
        .arg(
            Arg::new("hosts")
                .long("hosts")
                .value_name("FILE")
                .help("Hosts file, one host per line")
                .required(true),
        )
        .arg(
            Arg::new("ports")
                .short('p')
                .long("ports")
                .value_name("PORTS")
                .help("Ports to check, comma separated (default: 22,80,443)")
                .action(ArgAction::Append)
                .num_args(0..=1)
                .default_missing_value("22,80,443"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("DURATION")
                .help("Per-connection timeout, e.g. 500ms, 2s (default: 5s)")
                .value_parser(|s: &str| config::parse_duration(s).map_err(|e| e.to_string())),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .value_name("FILE")
                .help("Write results to CSV (default file: hostprobe.csv)")
                .num_args(0..=1)
                .default_missing_value(default_path(OutputFormat::Csv)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .value_name("FILE")
                .help("Write results to JSON (default file: hostprobe.json)")
                .num_args(0..=1)
                .default_missing_value(default_path(OutputFormat::Json)),
        )
        .arg(
            Arg::new("stdout")
                .long("stdout")
                .help("Print results to the terminal (table, or CSV/JSON if selected)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("metrics-addr")
                .long("metrics-addr")
                .value_name("ADDR")
                .help("Address for the Prometheus metrics endpoint (default: :9090)")
                .num_args(0..=1)
                .default_missing_value(config::DEFAULT_METRICS_ADDR),
        )
        .arg(
            Arg::new("no-metrics")
                .long("no-metrics")
                .help("Do not serve metrics")
                .action(ArgAction::SetTrue)
                .conflicts_with("metrics-addr"),
        )
        .arg(
            Arg::new("concurrency")
                .short('c')
                .long("concurrency")
                .value_name("COUNT")
                .help("Maximum number of connections in flight (default: unbounded)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Load defaults from a TOML config file (default: ~/.hostprobe.toml)"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored table output")
                .action(ArgAction::SetTrue),
        )
}

/// Layer command line flags over the file configuration
fn config_from_matches(matches: &ArgMatches) -> Result<ProbeConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ProbeConfig::from_toml_file(path)?,
        None => ProbeConfig::load_default_config(),
    };

    if let Some(values) = matches.get_many::<String>("ports") {
        let values: Vec<&String> = values.collect();
        config.ports = config::parse_ports(&values)?;
    }
    if let Some(&timeout) = matches.get_one::<std::time::Duration>("timeout") {
        config = config.with_timeout(timeout);
    }
    if let Some(path) = matches.get_one::<String>("csv") {
        config.csv_path = Some(path.clone());
    }
    if let Some(path) = matches.get_one::<String>("json") {
        config.json_path = Some(path.clone());
    }
    if matches.get_flag("stdout") {
        config.stdout = true;
    }
    if let Some(addr) = matches.get_one::<String>("metrics-addr") {
        config.metrics_addr = Some(addr.clone());
    }
    if matches.get_flag("no-metrics") {
        config.metrics_addr = None;
    }
    if let Some(&limit) = matches.get_one::<usize>("concurrency") {
        config.concurrency = Some(limit);
    }
    if matches.get_flag("no-color") {
        config.colored = false;
    }

    config.validate()?;
    Ok(config)
}

async fn run(matches: ArgMatches) -> Result<()> {
    let config = config_from_matches(&matches)?;
    if !config.colored {
        colored::control::set_override(false);
    }

    let hosts_path = matches
        .get_one::<String>("hosts")
        .context("--hosts is required")?;
    let hosts = hosts_from_file(hosts_path)
        .with_context(|| format!("failed to read hosts file {}", hosts_path))?;

    let addrs = expand(&hosts, &config.ports);
    log::debug!(
        "{} host(s) x {} port(s) = {} address(es)",
        hosts.len(),
        config.ports.len(),
        addrs.len()
    );

    let metrics = Arc::new(ProbeMetrics::new());
    if let Some(addr) = &config.metrics_addr {
        let listen = config::normalize_listen_addr(addr);
        if let Err(e) = server::serve(&listen, metrics.clone()).await {
            log::warn!("{}; continuing without metrics endpoint", e);
        }
    }

    let mut scanner = Scanner::new(&addrs, config.timeout_duration())
        .with_concurrency(config.concurrency)
        .with_metrics(metrics);
    scanner.run().await;

    OutputPlan::from_config(&config)
        .emit(scanner.statuses())
        .context("failed to write results")?;

    Ok(())
}

/// Whether a failure came from bad flags or config rather than the environment
fn is_usage_failure(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ProbeError>()
        .map_or(false, ProbeError::is_usage_error)
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let matches = build_cli().get_matches();
    if let Err(e) = run(matches).await {
        eprintln!("{} {:#}", "[!] ERROR:".bright_red(), e);
        if is_usage_failure(&e) {
            eprintln!("{}", "Run 'hostprobe --help' for usage.".yellow());
        }
        process::exit(1);
    }
}
