//! Target expansion: hosts x ports into `host:port` addresses
//!
//! Hosts and ports are carried as opaque strings. Nothing here validates
//! them; an unparsable address is still a target and will simply probe as
//! closed.

/// Build the cross-product of `hosts` and `ports` as `host:port` strings.
///
/// Output is hosts-major, ports-minor. Empty port strings are skipped and
/// duplicates are kept.
///
/// ```
/// use hostprobe::utils::target_parser::expand;
///
/// let addrs = expand(&["a", "b"], &["1", "2"]);
/// assert_eq!(addrs, vec!["a:1", "a:2", "b:1", "b:2"]);
/// ```
pub fn expand<H, P>(hosts: &[H], ports: &[P]) -> Vec<String>
where
    H: AsRef<str>,
    P: AsRef<str>,
{
    let port_count = ports.iter().filter(|p| !p.as_ref().is_empty()).count();
    let mut addrs = Vec::with_capacity(hosts.len() * port_count);

    for host in hosts {
        for port in ports {
            let port = port.as_ref();
            if port.is_empty() {
                continue;
            }
            addrs.push(format!("{}:{}", host.as_ref(), port));
        }
    }

    addrs
}

/// Split an address into `(host, port)` on its first colon.
///
/// An address without a colon yields the whole string as host and an
/// empty port.
pub fn split_address(addr: &str) -> (&str, &str) {
    addr.split_once(':').unwrap_or((addr, ""))
}
