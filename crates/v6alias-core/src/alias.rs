//! Alias prefix reader
//!
//! Finds the globally routable IPv6 prefix among an alias's entries.
//! Aliases can hold unrelated entries (IPv4 hosts, other networks), so
//! extra or unparseable entries are tolerated.

use crate::prefix::{Ipv6Prefix, PrefixLookup, is_global, parse_candidate};
use tracing::warn;

/// What a pass over the alias entries found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasScan {
    /// First global prefix in entry order
    pub selected: Option<Ipv6Prefix>,
    /// Further distinct global prefixes, in entry order
    pub ignored: Vec<Ipv6Prefix>,
}

/// Collect the global prefixes held by `entries`, masked to `prefix_length`
///
/// Entries may carry a `/len` suffix, which is replaced by `prefix_length`.
/// Entries masking to the same network count once.
pub fn scan_alias_entries(entries: &[String], prefix_length: u8) -> AliasScan {
    let mut scan = AliasScan::default();

    for entry in entries {
        let Some(address) = parse_candidate(entry) else {
            continue;
        };
        if !is_global(&address) {
            continue;
        }
        let Ok(prefix) = Ipv6Prefix::from_address(address, prefix_length) else {
            continue;
        };

        match scan.selected {
            None => scan.selected = Some(prefix),
            Some(selected) if selected == prefix => {}
            Some(_) => {
                if !scan.ignored.contains(&prefix) {
                    scan.ignored.push(prefix);
                }
            }
        }
    }

    scan
}

/// Warning text for an alias holding more than one distinct global prefix
///
/// Names the selected prefix and every discarded one; `None` when the scan
/// is unambiguous.
pub fn ambiguity_warning(scan: &AliasScan) -> Option<String> {
    let selected = scan.selected?;
    if scan.ignored.is_empty() {
        return None;
    }
    let ignored: Vec<String> = scan.ignored.iter().map(|p| p.to_string()).collect();
    Some(format!(
        "Found more than 1 global IPv6 prefix in alias - selecting the first one ({}) and ignoring the others ({})",
        selected,
        ignored.join(", ")
    ))
}

/// Extract the authoritative global prefix of an alias
///
/// Warns when the alias holds several distinct global prefixes (the first
/// one wins) and when it holds none (the caller treats that as an alias
/// that still needs its first prefix).
pub fn extract_global_prefix(entries: &[String], prefix_length: u8) -> PrefixLookup {
    let scan = scan_alias_entries(entries, prefix_length);

    match scan.selected {
        Some(selected) => {
            if let Some(message) = ambiguity_warning(&scan) {
                warn!("{}", message);
            }
            PrefixLookup::Found(selected)
        }
        None => {
            warn!("Did not find a valid global IPv6 prefix in alias");
            PrefixLookup::NotFound
        }
    }
}
