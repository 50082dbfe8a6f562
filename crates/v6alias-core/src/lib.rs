// # v6alias-core
//
// Core library keeping a firewall alias in sync with the globally routable
// IPv6 prefix of a local interface.
//
// ## Architecture Overview
//
// - **AddressSource**: Trait for listing the address strings bound to an interface
// - **AliasClient**: Trait for reading, replacing and committing alias content
// - **Ipv6Prefix**: Masked network value type, compared on the network, not the text
// - **interface / alias**: The two prefix readers (local side, firewall side)
// - **Reconciler**: One detect → compare → update cycle
// - **Scheduler**: Runs the reconciler on a fixed interval, forever
//
// ## Design Principles
//
// 1. **Detection before mutation**: The alias is only written after both sides were read
// 2. **Full-state writes**: The whole alias content is replaced, never patched
// 3. **Cycle isolation**: Any failure ends the current cycle only; the next one starts from scratch
// 4. **Explicit configuration**: Loaded once, passed by reference, never global

pub mod alias;
pub mod config;
pub mod error;
pub mod interface;
pub mod prefix;
pub mod reconciler;
pub mod scheduler;
pub mod traits;

// Re-export core types for convenience
pub use config::{AddressCommand, AppConfig, FirewallConfig, LoggingConfig, SyncConfig};
pub use error::{Error, Result};
pub use prefix::{Ipv6Prefix, PrefixLookup};
pub use reconciler::{ReconcileOutcome, Reconciler, ReconcilerSettings, SyncEvent};
pub use scheduler::Scheduler;
pub use traits::{AddressSource, AliasClient};
