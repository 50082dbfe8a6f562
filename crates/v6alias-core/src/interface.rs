//! Interface prefix reader
//!
//! Finds the globally routable IPv6 prefix of a local interface.

use crate::error::Result;
use crate::prefix::{Ipv6Prefix, PrefixLookup, is_global, parse_candidate};
use crate::traits::AddressSource;
use tracing::debug;

/// Detect the global prefix currently assigned to `interface`
///
/// Lists the interface's addresses through `source` and masks the first
/// globally routable IPv6 address to `prefix_length`. Source order decides
/// which address wins when there are several.
///
/// # Returns
///
/// - `Ok(PrefixLookup::Found(_))`: a global address is bound
/// - `Ok(PrefixLookup::NotFound)`: the interface has no global IPv6 address
/// - `Err(Error::LocalQuery)`: the interface could not be queried at all
pub async fn read_local_prefix(
    source: &dyn AddressSource,
    interface: &str,
    prefix_length: u8,
) -> Result<PrefixLookup> {
    let candidates = source.addresses(interface).await?;
    debug!(
        interface,
        source = source.source_name(),
        count = candidates.len(),
        "Listed interface addresses"
    );
    select_global_prefix(&candidates, prefix_length)
}

/// Pick the prefix of the first global IPv6 address among `candidates`
///
/// Candidates that do not parse as IPv6 addresses are skipped.
pub fn select_global_prefix(candidates: &[String], prefix_length: u8) -> Result<PrefixLookup> {
    let first_global = candidates
        .iter()
        .filter_map(|candidate| parse_candidate(candidate))
        .find(is_global);

    match first_global {
        Some(address) => {
            debug!(%address, "Selected global interface address");
            Ok(PrefixLookup::Found(Ipv6Prefix::from_address(
                address,
                prefix_length,
            )?))
        }
        None => Ok(PrefixLookup::NotFound),
    }
}
