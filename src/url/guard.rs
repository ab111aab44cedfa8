//! SSRF guard: URL target validation
//!
//! Every URL the scanner is asked to touch passes through this gate: the seed
//! at admission time and every redirect target before the hop is followed.
//! Validation is pure apart from DNS resolution and safe to repeat.
//!
//! A hostname check alone is insufficient because DNS can resolve a
//! public-looking name to a private address, so `validate` also resolves the
//! hostname and checks every returned address.

use crate::GuardError;
use std::net::{IpAddr, Ipv4Addr};
use url::{Host, Url};

/// Hostnames that are never scan targets, regardless of what they resolve to
const DENIED_HOSTS: &[&str] = &[
    "metadata.google.internal",
    "metadata.goog",
    "kubernetes.default.svc",
    "host.docker.internal",
];

/// Well-known non-web ports the scanner refuses to probe
const DENIED_PORTS: &[u16] = &[22, 23, 25, 110, 143, 445, 3306, 5432, 6379, 27017];

/// Validates scan targets against the SSRF policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SsrfGuard {
    /// Permit loopback targets. Used by integration tests that scan a mock
    /// server on 127.0.0.1; private ranges and metadata endpoints stay
    /// blocked regardless.
    pub allow_loopback: bool,
}

impl SsrfGuard {
    pub fn new(allow_loopback: bool) -> Self {
        Self { allow_loopback }
    }

    /// Checks everything knowable without network activity: scheme, denied
    /// hostnames, denied ports, and IP-literal hosts.
    pub fn check_literal(&self, url: &Url) -> Result<(), GuardError> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(GuardError::UnsupportedScheme);
        }

        if let Some(port) = url.port() {
            if DENIED_PORTS.contains(&port) {
                return Err(GuardError::BlockedTarget);
            }
        }

        match url.host() {
            None => Err(GuardError::InvalidUrl),
            Some(Host::Ipv4(addr)) => self.check_addr(IpAddr::V4(addr)),
            Some(Host::Ipv6(addr)) => self.check_addr(IpAddr::V6(addr)),
            Some(Host::Domain(domain)) => {
                let domain = domain.to_lowercase();
                if domain == "localhost" {
                    return if self.allow_loopback {
                        Ok(())
                    } else {
                        Err(GuardError::BlockedTarget)
                    };
                }
                if DENIED_HOSTS.contains(&domain.as_str()) {
                    return Err(GuardError::BlockedTarget);
                }
                Ok(())
            }
        }
    }

    /// Full validation: literal checks plus DNS resolution of domain hosts.
    ///
    /// A name that cannot be resolved is rejected: the scanner would fail on
    /// it anyway, and refusing here keeps unresolvable input out of the graph.
    pub async fn validate(&self, url: &Url) -> Result<(), GuardError> {
        self.check_literal(url)?;

        if let Some(Host::Domain(domain)) = url.host() {
            if domain.to_lowercase() == "localhost" {
                // Already accepted by check_literal when loopback is allowed
                return Ok(());
            }

            let port = url.port_or_known_default().unwrap_or(443);
            let addrs = tokio::net::lookup_host((domain, port))
                .await
                .map_err(|_| GuardError::BlockedTarget)?;

            for addr in addrs {
                self.check_addr(addr.ip())?;
            }
        }

        Ok(())
    }

    fn check_addr(&self, addr: IpAddr) -> Result<(), GuardError> {
        if is_loopback(addr) {
            return if self.allow_loopback {
                Ok(())
            } else {
                Err(GuardError::BlockedTarget)
            };
        }

        if is_private_addr(addr) {
            return Err(GuardError::BlockedTarget);
        }

        Ok(())
    }
}

fn is_loopback(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                mapped.is_loopback()
            } else {
                v6.is_loopback()
            }
        }
    }
}

/// Non-routable or internal-network addresses (loopback handled separately)
fn is_private_addr(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_v4(mapped);
            }
            let seg = v6.segments();
            v6.is_unspecified()
                || v6.is_multicast()
                // Unique-local fc00::/7
                || (seg[0] & 0xfe00) == 0xfc00
                // Link-local fe80::/10
                || (seg[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Addresses that must never appear in outbound text
pub(crate) fn is_internal_v4(addr: Ipv4Addr) -> bool {
    addr.is_loopback() || is_private_v4(addr)
}

fn is_private_v4(addr: Ipv4Addr) -> bool {
    addr.is_private()
        || addr.is_link_local()
        || addr.is_unspecified()
        || addr.is_broadcast()
        || addr.is_multicast()
        // Carrier-grade NAT 100.64.0.0/10
        || (addr.octets()[0] == 100 && (addr.octets()[1] & 0xc0) == 64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> SsrfGuard {
        SsrfGuard::new(false)
    }

    fn check(url: &str) -> Result<(), GuardError> {
        guard().check_literal(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_rejects_metadata_endpoint() {
        assert_eq!(
            check("http://169.254.169.254/"),
            Err(GuardError::BlockedTarget)
        );
        assert_eq!(
            check("http://metadata.google.internal/computeMetadata"),
            Err(GuardError::BlockedTarget)
        );
    }

    #[test]
    fn test_rejects_loopback() {
        assert_eq!(
            check("http://127.0.0.1:8000/admin"),
            Err(GuardError::BlockedTarget)
        );
        assert_eq!(check("http://localhost/"), Err(GuardError::BlockedTarget));
        assert_eq!(check("http://[::1]/"), Err(GuardError::BlockedTarget));
    }

    #[test]
    fn test_rejects_private_ranges() {
        assert_eq!(check("http://10.0.0.5/"), Err(GuardError::BlockedTarget));
        assert_eq!(
            check("http://192.168.1.1/router"),
            Err(GuardError::BlockedTarget)
        );
        assert_eq!(check("http://172.16.0.1/"), Err(GuardError::BlockedTarget));
        assert_eq!(check("http://0.0.0.0/"), Err(GuardError::BlockedTarget));
    }

    #[test]
    fn test_rejects_denied_ports() {
        assert_eq!(
            check("http://example.com:22/"),
            Err(GuardError::BlockedTarget)
        );
        assert_eq!(
            check("http://example.com:6379/"),
            Err(GuardError::BlockedTarget)
        );
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert_eq!(
            guard().check_literal(&url),
            Err(GuardError::UnsupportedScheme)
        );
    }

    #[test]
    fn test_accepts_public_host_literal_checks() {
        assert!(check("https://example.com/page").is_ok());
        assert!(check("http://93.184.216.34/").is_ok());
    }

    #[test]
    fn test_allow_loopback_permits_only_loopback() {
        let guard = SsrfGuard::new(true);
        let loopback = Url::parse("http://127.0.0.1:9999/").unwrap();
        assert!(guard.check_literal(&loopback).is_ok());

        // Private ranges stay blocked even with the loopback override
        let private = Url::parse("http://10.0.0.5/").unwrap();
        assert_eq!(
            guard.check_literal(&private),
            Err(GuardError::BlockedTarget)
        );
        let metadata = Url::parse("http://169.254.169.254/").unwrap();
        assert_eq!(
            guard.check_literal(&metadata),
            Err(GuardError::BlockedTarget)
        );
    }

    #[test]
    fn test_ipv6_private_ranges() {
        assert_eq!(check("http://[fc00::1]/"), Err(GuardError::BlockedTarget));
        assert_eq!(check("http://[fe80::1]/"), Err(GuardError::BlockedTarget));
        // IPv4-mapped loopback
        assert_eq!(
            check("http://[::ffff:127.0.0.1]/"),
            Err(GuardError::BlockedTarget)
        );
    }

    #[tokio::test]
    async fn test_validate_ip_literal_skips_dns() {
        // IP literals never hit the resolver, so this must settle immediately
        let url = Url::parse("http://93.184.216.34/").unwrap();
        assert!(guard().validate(&url).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_rejects_unresolvable_host() {
        // The literal check alone cannot reject this; resolution must.
        // .invalid is reserved and never resolves (RFC 2606).
        let url = Url::parse("http://scanner-target.invalid/").unwrap();
        assert!(guard().check_literal(&url).is_ok());
        assert_eq!(
            guard().validate(&url).await,
            Err(GuardError::BlockedTarget)
        );
    }
}
