//! Address classification and origin IP extraction.

use std::net::IpAddr;

use http::HeaderMap;

/// Returns `true` for loopback and private-range addresses.
///
/// Covers `::1`, `127.*`, `10.*`, `172.*` and `192.168.*`, including their
/// IPv4-mapped IPv6 forms (`::ffff:10.0.0.1`). The whole `172.*` block is
/// treated as local. Strings that do not parse as an IP address are not local.
pub fn is_local_address(ip: &str) -> bool {
    let Ok(addr) = ip.trim().parse::<IpAddr>() else {
        return false;
    };

    let v4 = match addr {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4,
            None => return v6.is_loopback(),
        },
    };

    match v4.octets() {
        [127, ..] | [10, ..] | [172, ..] => true,
        [192, 168, ..] => true,
        _ => false,
    }
}

/// Derives the request origin IP.
///
/// Priority order: leftmost valid `X-Forwarded-For` entry, then `X-Real-IP`,
/// then the socket peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<String> {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(ip) = forwarded
            .split(',')
            .map(str::trim)
            .find(|candidate| candidate.parse::<IpAddr>().is_ok())
        {
            return Some(ip.to_string());
        }
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|candidate| candidate.parse::<IpAddr>().is_ok())
    {
        return Some(ip.to_string());
    }

    peer.map(|addr| addr.to_string())
}
