//! Core traits for the alias updater
//!
//! These are the two seams to the outside world:
//!
//! - [`AddressSource`]: List the addresses bound to a local interface
//! - [`AliasClient`]: Read, replace and commit firewall alias content

pub mod address_source;
pub mod alias_client;

pub use address_source::AddressSource;
pub use alias_client::AliasClient;
