//! IPv6 prefix value type and global-routability classification

use crate::error::{Error, Result};
use ipnet::Ipv6Net;
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

/// An IPv6 network: an address masked to a prefix length
///
/// Equality is defined on the masked network, so `2a01:4f8:1:2::1/64` and
/// `2a01:4f8:1:2::ffff/64` build the same prefix. The textual form is always
/// the canonical compressed one (`2a01:4f8:1:2::/64`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv6Prefix(Ipv6Net);

impl Ipv6Prefix {
    /// Build the prefix containing `address` at the given length
    pub fn from_address(address: Ipv6Addr, prefix_length: u8) -> Result<Self> {
        let net = Ipv6Net::new(address, prefix_length).map_err(|_| {
            Error::invalid_input(format!(
                "prefix length {} is out of range (0-128)",
                prefix_length
            ))
        })?;
        Ok(Self(net.trunc()))
    }

    /// Network address (host bits zeroed)
    pub fn network(&self) -> Ipv6Addr {
        self.0.network()
    }

    /// Prefix length in bits
    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }
}

impl fmt::Display for Ipv6Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ipv6Prefix {
    type Err = Error;

    /// Parse `addr/len`; host bits are masked away.
    fn from_str(s: &str) -> Result<Self> {
        let net: Ipv6Net = s
            .trim()
            .parse()
            .map_err(|_| Error::invalid_input(format!("not an IPv6 prefix: {}", s)))?;
        Ok(Self(net.trunc()))
    }
}

/// Result of looking for a global prefix on one side of the sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixLookup {
    /// A globally routable prefix was found
    Found(Ipv6Prefix),
    /// No qualifying prefix is currently present
    NotFound,
}

impl PrefixLookup {
    /// The found prefix, if any
    pub fn prefix(&self) -> Option<Ipv6Prefix> {
        match self {
            PrefixLookup::Found(prefix) => Some(*prefix),
            PrefixLookup::NotFound => None,
        }
    }
}

impl fmt::Display for PrefixLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixLookup::Found(prefix) => write!(f, "{}", prefix),
            PrefixLookup::NotFound => f.write_str("none"),
        }
    }
}

/// Parse a candidate string as an IPv6 address
///
/// Accepts a bare address or `address/len`; the length suffix is discarded.
/// Returns `None` for anything that is not an IPv6 address.
pub fn parse_candidate(candidate: &str) -> Option<Ipv6Addr> {
    let text = candidate.trim();
    let address = text.split_once('/').map_or(text, |(address, _)| address);
    address.parse().ok()
}

/// Whether an IPv6 address is usable on the public Internet
///
/// Excludes the IANA special-purpose ranges that are not globally reachable:
/// unspecified, loopback, IPv4-mapped, local-use NAT64, discard-only,
/// IETF protocol assignments (minus their global exceptions), 6to4,
/// documentation, unique-local, link-local, site-local and multicast.
pub fn is_global(address: &Ipv6Addr) -> bool {
    let segments = address.segments();

    if address.is_unspecified() || address.is_loopback() || address.is_multicast() {
        return false;
    }

    let reserved = match segments {
        // ::ffff:0:0/96
        [0, 0, 0, 0, 0, 0xffff, _, _] => true,
        // 64:ff9b:1::/48
        [0x64, 0xff9b, 1, _, _, _, _, _] => true,
        // 100::/64
        [0x100, 0, 0, 0, _, _, _, _] => true,
        // 2001:db8::/32
        [0x2001, 0xdb8, _, _, _, _, _, _] => true,
        // 2001::/23, except the globally reachable assignments inside it
        [0x2001, b, _, _, _, _, _, _] if b < 0x200 => !is_global_ietf_assignment(address),
        // 2002::/16
        [0x2002, _, _, _, _, _, _, _] => true,
        // 3fff::/20
        [0x3fff, b, _, _, _, _, _, _] if b < 0x1000 => true,
        _ => false,
    };
    if reserved {
        return false;
    }

    // fc00::/7, fe80::/10, fec0::/10
    let first = segments[0];
    !((first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80 || (first & 0xffc0) == 0xfec0)
}

fn is_global_ietf_assignment(address: &Ipv6Addr) -> bool {
    match address.segments() {
        // 2001:1::1/128 and 2001:1::2/128
        [0x2001, 1, 0, 0, 0, 0, 0, 1 | 2] => true,
        // 2001:3::/32
        [0x2001, 3, _, _, _, _, _, _] => true,
        // 2001:4:112::/48
        [0x2001, 4, 0x112, _, _, _, _, _] => true,
        // 2001:20::/28 and 2001:30::/28
        [0x2001, 0x20..=0x3f, _, _, _, _, _, _] => true,
        _ => false,
    }
}
