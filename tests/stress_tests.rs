//! Stress tests: large address sets, concurrent scanners, bounded concurrency

use hostprobe::{utils::expand, ProbeMetrics, Scanner};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Helper to create multiple TCP listeners on random ports
fn create_test_listeners(count: usize) -> Vec<TcpListener> {
    let mut listeners = Vec::new();
    for _ in 0..count {
        if let Ok(listener) = TcpListener::bind("127.0.0.1:0") {
            listeners.push(listener);
        }
    }
    listeners
}

fn ports_of(listeners: &[TcpListener]) -> Vec<String> {
    listeners
        .iter()
        .filter_map(|l| l.local_addr().ok().map(|a| a.port().to_string()))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_2000_unreachable_addresses() {
    // TEST-NET-1 is reserved for documentation and never routed
    let hosts: Vec<String> = (1..=20).map(|i| format!("192.0.2.{}", i)).collect();
    let ports: Vec<String> = (10000..10100).map(|p| p.to_string()).collect();
    let addrs = expand(&hosts, &ports);
    assert_eq!(addrs.len(), 2000);

    let mut scanner = Scanner::new(&addrs, Duration::from_millis(1));

    let start = Instant::now();
    scanner.run().await;
    let elapsed = start.elapsed();

    assert_eq!(scanner.len(), 2000);
    assert!(scanner.statuses().values().all(|&open| !open));
    assert!(elapsed < Duration::from_secs(10), "took {:?}", elapsed);

    let summary = scanner.summary();
    assert_eq!(summary.total, 2000);
    assert_eq!(summary.closed, 2000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_open_ports_among_many_closed() {
    let listeners = create_test_listeners(50);
    let open_ports = ports_of(&listeners);

    // Grab then release another batch so those ports are closed
    let closed_ports = ports_of(&create_test_listeners(200));

    let mut ports = open_ports.clone();
    ports.extend(closed_ports.iter().cloned());
    let addrs = expand(&["127.0.0.1"], &ports);

    let metrics = Arc::new(ProbeMetrics::new());
    let mut scanner = Scanner::new(&addrs, Duration::from_millis(500)).with_metrics(metrics.clone());
    scanner.run().await;

    for port in &open_ports {
        let addr = format!("127.0.0.1:{}", port);
        assert_eq!(scanner.statuses().get(&addr), Some(&true), "{} should be open", addr);
    }
    let summary = scanner.summary();
    assert_eq!(summary.open, open_ports.len());
    assert_eq!(summary.total, addrs.len());

    let (attempts, successes, failures) = metrics.snapshot().await.totals();
    assert_eq!(attempts, addrs.len() as u64);
    assert_eq!(successes, open_ports.len() as u64);
    assert_eq!(successes + failures, attempts);

    drop(listeners);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scanners_are_independent() {
    let left_listeners = create_test_listeners(10);
    let right_listeners = create_test_listeners(10);

    let left_addrs = expand(&["127.0.0.1"], &ports_of(&left_listeners));
    let right_addrs = expand(&["127.0.0.1"], &ports_of(&right_listeners));
    let right_closed: Vec<String> = ports_of(&create_test_listeners(10));
    let right_closed_addrs = expand(&["127.0.0.1"], &right_closed);

    let mut left = Scanner::new(&left_addrs, Duration::from_millis(500));
    let mut right = Scanner::new(
        right_addrs.iter().chain(right_closed_addrs.iter()),
        Duration::from_millis(500),
    );

    tokio::join!(left.run(), right.run());

    assert_eq!(left.len(), left_addrs.len());
    assert!(left.statuses().values().all(|&open| open));

    assert_eq!(right.len(), right_addrs.len() + right_closed_addrs.len());
    assert_eq!(right.summary().open, right_addrs.len());
    for addr in &left_addrs {
        assert!(right.statuses().get(addr).is_none());
    }

    drop(left_listeners);
    drop(right_listeners);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bounded_concurrency_completes() {
    let listeners = create_test_listeners(20);
    let addrs = expand(&["127.0.0.1"], &ports_of(&listeners));

    let mut scanner = Scanner::new(&addrs, Duration::from_millis(500)).with_concurrency(Some(3));
    scanner.run().await;

    assert_eq!(scanner.concurrency(), Some(3));
    assert_eq!(scanner.summary().open, addrs.len());

    drop(listeners);
}

#[tokio::test]
async fn test_repeated_runs_reflect_current_state() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let mut scanner = Scanner::new([addr.as_str()], Duration::from_millis(500));
    scanner.run().await;
    assert_eq!(scanner.statuses().get(&addr), Some(&true));

    drop(listener);
    scanner.run().await;
    assert_eq!(scanner.statuses().get(&addr), Some(&false));
}
