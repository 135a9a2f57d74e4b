//! Deadline-bounded reachability check
//!
//! Name resolution (`ToSocketAddrs`) cannot be timed out, so it runs on a
//! detached thread and the caller waits on a channel with `recv_timeout`.
//! When the deadline wins, the resolver thread is abandoned: it finishes in
//! the background and its send fails silently. At most one such thread
//! leaks per timed-out probe.
//!
//! The connection stage uses `TcpStream::connect_timeout` (non-blocking
//! connect plus a writability wait) with whatever budget resolution left.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;
use url::{Host, Url};

use super::ProbeFailure;

/// Host and port a repository URI points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

fn default_port(scheme: &str) -> u16 {
    // mirror+https, tor+https, ...
    if scheme == "https" || scheme.ends_with("+https") {
        443
    } else {
        80
    }
}

/// Extracts the endpoint of a repository URI
///
/// Default port is 80, or 443 for encrypted schemes; an explicit
/// `host:port` wins. Schemeless input (`mirror.test/debian`) is accepted.
pub fn endpoint(uri: &str) -> Option<Endpoint> {
    // `mirror.test:3142/x` would otherwise parse as scheme `mirror.test`
    if uri.contains("://") {
        let url = Url::parse(uri).ok()?;
        let host = match url.host()? {
            Host::Domain(d) => d.to_string(),
            Host::Ipv4(a) => a.to_string(),
            Host::Ipv6(a) => a.to_string(),
        };
        if host.is_empty() {
            return None;
        }
        let port = url.port().unwrap_or_else(|| default_port(url.scheme()));
        return Some(Endpoint { host, port });
    }

    let authority = uri.split('/').next().unwrap_or("");
    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) => (h, p.parse::<u16>().ok()?),
        None => (authority, default_port("")),
    };
    if host.is_empty() {
        return None;
    }
    Some(Endpoint {
        host: host.to_string(),
        port,
    })
}

/// Resolves `endpoint`, giving up after `timeout`
pub fn resolve(endpoint: &Endpoint, timeout: Duration) -> Result<Vec<SocketAddr>, ProbeFailure> {
    let (tx, rx) = mpsc::channel();
    let target = (endpoint.host.clone(), endpoint.port);

    thread::Builder::new()
        .name("probe-resolve".into())
        .spawn(move || {
            let result = target.to_socket_addrs().map(|addrs| addrs.collect::<Vec<_>>());
            // The receiver is gone if the deadline already passed
            let _ = tx.send(result);
        })
        .map_err(|e| ProbeFailure::ResolveFailed(e.to_string()))?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(addrs)) if addrs.is_empty() => Err(ProbeFailure::NoAddress),
        Ok(Ok(addrs)) => Ok(addrs),
        Ok(Err(e)) => Err(ProbeFailure::ResolveFailed(e.to_string())),
        Err(RecvTimeoutError::Timeout) => Err(ProbeFailure::ResolveTimeout),
        Err(RecvTimeoutError::Disconnected) => {
            Err(ProbeFailure::ResolveFailed("resolver exited without a result".into()))
        }
    }
}

/// Tries each address in turn until one accepts or `deadline` passes
pub fn connect(addrs: &[SocketAddr], deadline: Instant) -> Result<(), ProbeFailure> {
    let mut last = ProbeFailure::ConnectTimeout;

    for addr in addrs {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ProbeFailure::ConnectTimeout);
        }

        match TcpStream::connect_timeout(addr, remaining) {
            // Dropping the stream closes the socket
            Ok(_stream) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => last = ProbeFailure::ConnectTimeout,
            Err(e) => {
                debug!(%addr, error = %e, "connect failed");
                last = ProbeFailure::ConnectFailed(e.to_string());
            }
        }
    }

    Err(last)
}

/// Checks whether the host behind `uri` accepts TCP connections within
/// `timeout` (resolution and connection share the budget)
pub fn check(uri: &str, timeout: Duration) -> Result<(), ProbeFailure> {
    let deadline = Instant::now() + timeout;
    let endpoint = endpoint(uri).ok_or_else(|| ProbeFailure::InvalidUri(uri.to_string()))?;

    let addrs = resolve(&endpoint, timeout)?;
    debug!(host = %endpoint.host, port = endpoint.port, count = addrs.len(), "resolved");

    connect(&addrs, deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn ep(host: &str, port: u16) -> Option<Endpoint> {
        Some(Endpoint {
            host: host.to_string(),
            port,
        })
    }

    #[test]
    fn endpoint_defaults() {
        assert_eq!(endpoint("http://archive.test/ubuntu"), ep("archive.test", 80));
        assert_eq!(endpoint("https://archive.test/ubuntu/"), ep("archive.test", 443));
        assert_eq!(endpoint("tor+https://onion.test/debian"), ep("onion.test", 443));
        assert_eq!(endpoint("ftp://ftp.test/debian"), ep("ftp.test", 80));
    }

    #[test]
    fn endpoint_explicit_port() {
        assert_eq!(endpoint("http://mirror.test:8080/debian"), ep("mirror.test", 8080));
        assert_eq!(endpoint("https://mirror.test:8443"), ep("mirror.test", 8443));
        assert_eq!(endpoint("http://[::1]:3142/debian"), ep("::1", 3142));
    }

    #[test]
    fn endpoint_without_scheme() {
        assert_eq!(endpoint("mirror.test/debian"), ep("mirror.test", 80));
        assert_eq!(endpoint("mirror.test:3142/debian"), ep("mirror.test", 3142));
        assert_eq!(endpoint(""), None);
        assert_eq!(endpoint("file:/srv/repo"), None);
    }

    #[test]
    fn local_listener_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let uri = format!("http://127.0.0.1:{}/debian", port);
        assert_eq!(check(&uri, Duration::from_secs(3)), Ok(()));
    }

    #[test]
    fn closed_port_is_unreachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let uri = format!("http://127.0.0.1:{}/", port);
        assert!(check(&uri, Duration::from_secs(3)).is_err());
    }

    #[test]
    fn non_routable_respects_deadline() {
        let timeout = Duration::from_millis(3000);
        let start = Instant::now();

        // Some sandboxes accept every connect; only the bound is portable
        let _ = check("http://10.255.255.1/debian", timeout);

        assert!(start.elapsed() < timeout + Duration::from_millis(300));
    }

    #[test]
    fn connect_with_expired_deadline() {
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let result = connect(&[addr], Instant::now());
        assert_eq!(result, Err(ProbeFailure::ConnectTimeout));
    }
}
