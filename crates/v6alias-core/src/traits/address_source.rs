// # Address Source Trait
//
// Defines the interface for enumerating the addresses bound to a local
// network interface.
//
// ## Implementations
//
// - Interface listing command (`ifconfig` / `ip`): `v6alias-ip-command` crate
//
// ## Usage
//
// ```rust,ignore
// use v6alias_core::AddressSource;
//
// async fn show(source: &dyn AddressSource) -> v6alias_core::Result<()> {
//     for candidate in source.addresses("igb0").await? {
//         println!("{}", candidate);
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for local address enumeration
///
/// An address source is an observer only. It reports what the operating
/// system says is bound to an interface and nothing else.
///
/// # Output Contract
///
/// - One string per bound address, in the order the platform reports them
/// - Mixed families are fine; the readers ignore everything that is not IPv6
/// - Strings may carry a `/len` suffix; zone identifiers (`%em0`) must be stripped
///
/// # Errors
///
/// Any failure to query the interface (it does not exist, the query tool
/// cannot be run, the query times out) must be reported as
/// [`crate::Error::LocalQuery`]. An interface with no addresses is NOT an
/// error: return an empty list.
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// List the address strings currently bound to `interface`
    async fn addresses(&self, interface: &str) -> Result<Vec<String>, crate::Error>;

    /// Short name for log messages
    fn source_name(&self) -> &'static str;
}
