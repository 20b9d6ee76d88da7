//! Relay URL normalization and reachability checks.
//!
//! Relays are keyed by their normalized URL everywhere in this crate so
//! `wss://Relay.Example.com/` and `wss://relay.example.com` are one relay.

use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use crate::Error;

/// Lowercases scheme and host, drops trailing slashes and default ports.
/// Only `ws://` and `wss://` are accepted.
pub fn normalize(raw: &str) -> Result<String, Error> {
    let raw = raw.trim();
    let parsed = Url::parse(raw).map_err(|err| Error::invalid_url(raw, err.to_string()))?;

    match parsed.scheme() {
        "ws" | "wss" => {}
        other => return Err(Error::invalid_url(raw, format!("unsupported scheme '{other}'"))),
    }
    if parsed.host().is_none() {
        return Err(Error::invalid_url(raw, "missing host"));
    }

    let mut normalized = parsed.to_string();
    while normalized.ends_with('/') {
        normalized.pop();
    }
    Ok(normalized)
}

/// Whether the relay can be reached from the public internet.
pub fn is_dialable(raw: &str) -> bool {
    let Ok(parsed) = Url::parse(raw.trim()) else {
        return false;
    };
    match parsed.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain != "localhost"
                && !domain.ends_with(".localhost")
                && !domain.ends_with(".local")
                && domain.contains('.')
        }
        Some(Host::Ipv4(ip)) => is_public_v4(ip),
        Some(Host::Ipv6(ip)) => is_public_v6(ip),
        None => false,
    }
}

/// Normalized form of a relay that is both well formed and dialable.
pub fn dialable(raw: &str) -> Option<String> {
    let normalized = normalize(raw).ok()?;
    is_dialable(&normalized).then_some(normalized)
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    let shared = a == 100 && (64..=127).contains(&b);
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || shared)
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_public_v4(v4);
    }
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || unique_local || link_local)
}
