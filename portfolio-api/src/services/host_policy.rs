//! Which hosts may be submitted to the TLS grading service.
//!
//! SSL Labs can only assess publicly reachable hosts, and we do not want the
//! proxy used to probe internal address space.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCheck {
    /// Normalized (trimmed, lowercased) host that may be forwarded.
    Public(String),
    Missing,
    NotPublic,
    Invalid,
}

pub fn check_host(raw: Option<&str>) -> HostCheck {
    let host = match raw.map(str::trim) {
        Some(h) if !h.is_empty() => h.to_ascii_lowercase(),
        _ => return HostCheck::Missing,
    };

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
    {
        return HostCheck::Invalid;
    }

    if host == "localhost" || has_private_prefix(&host) {
        return HostCheck::NotPublic;
    }

    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        if !is_public_ip(ip) {
            return HostCheck::NotPublic;
        }
    }

    HostCheck::Public(host)
}

/// Dotted prefixes for loopback and RFC 1918 ranges.
fn has_private_prefix(host: &str) -> bool {
    if host.starts_with("127.") || host.starts_with("10.") || host.starts_with("192.168.") {
        return true;
    }

    host.strip_prefix("172.")
        .and_then(|rest| rest.split('.').next())
        .and_then(|octet| octet.parse::<u8>().ok())
        .is_some_and(|octet| (16..=31).contains(&octet))
}

fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(v4),
            None => is_public_v6(v6),
        },
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast())
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || unique_local || link_local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_host() {
        assert_eq!(check_host(None), HostCheck::Missing);
        assert_eq!(check_host(Some("   ")), HostCheck::Missing);
    }

    #[test]
    fn rejects_loopback_and_private_ranges() {
        for host in [
            "localhost",
            "LOCALHOST",
            "127.0.0.1",
            "192.168.1.5",
            "10.0.0.1",
            "172.16.0.1",
            "172.20.0.1",
            "172.31.255.255",
            "169.254.1.1",
            "0.0.0.0",
            "::1",
            "[::1]",
            "fd00::1",
            "fe80::1",
            "::ffff:192.168.0.1",
        ] {
            assert_eq!(check_host(Some(host)), HostCheck::NotPublic, "{host}");
        }
    }

    #[test]
    fn accepts_public_hosts() {
        assert_eq!(
            check_host(Some(" Example.COM ")),
            HostCheck::Public("example.com".to_string())
        );
        assert_eq!(
            check_host(Some("172.32.0.1")),
            HostCheck::Public("172.32.0.1".to_string())
        );
        assert_eq!(
            check_host(Some("172.15.0.1")),
            HostCheck::Public("172.15.0.1".to_string())
        );
        assert_eq!(
            check_host(Some("2606:4700::1111")),
            HostCheck::Public("2606:4700::1111".to_string())
        );
    }

    #[test]
    fn rejects_urls_and_odd_characters() {
        assert_eq!(check_host(Some("https://example.com/")), HostCheck::Invalid);
        assert_eq!(check_host(Some("example.com?x=1")), HostCheck::Invalid);
        assert_eq!(check_host(Some("exa mple.com")), HostCheck::Invalid);
    }
}
