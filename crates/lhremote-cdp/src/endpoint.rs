use crate::{Error, Result};
use std::fmt;
use std::net::IpAddr;

/// Default remote-debugging port of the launcher application
pub const DEFAULT_CDP_PORT: u16 = 9222;

/// Default host for debug endpoints
pub const DEFAULT_CDP_HOST: &str = "127.0.0.1";

/// Host/port pair identifying a process's debug interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Loopback endpoint on the given port
    pub fn local(port: u16) -> Self {
        Self {
            host: DEFAULT_CDP_HOST.to_string(),
            port,
        }
    }

    /// Endpoint on an arbitrary host.
    ///
    /// Non-loopback hosts are rejected unless `allow_remote` is set.
    pub fn new(host: impl Into<String>, port: u16, allow_remote: bool) -> Result<Self> {
        let host = host.into();
        if !allow_remote && !is_loopback(&host) {
            return Err(Error::RemoteHostNotAllowed { host });
        }
        Ok(Self { host, port })
    }

    /// Same host, different port. Used to reach instance processes which live
    /// next to the launcher.
    pub fn with_port(&self, port: u16) -> Self {
        Self {
            host: self.host.clone(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base HTTP URL of the debug interface
    pub fn http_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    pub fn is_loopback(&self) -> bool {
        is_loopback(&self.host)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::local(DEFAULT_CDP_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

fn is_loopback(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    bare.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_is_loopback_9222() {
        let endpoint = Endpoint::default();
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.port(), 9222);
        assert!(endpoint.is_loopback());
    }

    #[test]
    fn test_loopback_hosts_accepted_without_opt_in() {
        for host in ["localhost", "LOCALHOST", "127.0.0.1", "127.1.2.3", "::1", "[::1]"] {
            assert!(Endpoint::new(host, 9222, false).is_ok(), "{host} should be loopback");
        }
    }

    #[test]
    fn test_remote_host_fails_closed() {
        let err = Endpoint::new("192.168.1.20", 9222, false).unwrap_err();
        assert!(matches!(err, Error::RemoteHostNotAllowed { ref host } if host == "192.168.1.20"));

        let err = Endpoint::new("example.com", 9222, false).unwrap_err();
        assert!(err.to_string().contains("--allow-remote"));
    }

    #[test]
    fn test_remote_host_allowed_with_opt_in() {
        let endpoint = Endpoint::new("192.168.1.20", 9333, true).unwrap();
        assert_eq!(endpoint.http_url(), "http://192.168.1.20:9333");
        assert!(!endpoint.is_loopback());
    }

    #[test]
    fn test_with_port_keeps_host() {
        let endpoint = Endpoint::new("localhost", 9222, false).unwrap();
        let instance = endpoint.with_port(41234);
        assert_eq!(instance.host(), "localhost");
        assert_eq!(instance.port(), 41234);
        assert_eq!(instance.to_string(), "localhost:41234");
    }

    #[test]
    fn test_ipv6_http_url_is_bracketed() {
        let endpoint = Endpoint::new("::1", 9222, false).unwrap();
        assert_eq!(endpoint.http_url(), "http://[::1]:9222");
    }
}
