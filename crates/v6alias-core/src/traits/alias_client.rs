// # Alias Client Trait
//
// Defines the interface to a firewall's management API for one kind of
// object: a named alias holding a list of network entries.
//
// ## Implementations
//
// - OPNsense: `v6alias-firewall-opnsense` crate
//
// ## Usage
//
// ```rust,ignore
// use v6alias_core::AliasClient;
//
// async fn replace(client: &dyn AliasClient) -> v6alias_core::Result<()> {
//     let id = client.resolve_alias_id("WAN_V6").await?;
//     let mut entries = client.list_alias_entries("WAN_V6").await?;
//     entries.push("2a01:4f8:1234:5678::/64".to_string());
//
//     client.replace_alias_entries(&id, "WAN_V6", &entries).await?;
//     client.commit().await
// }
// ```

use async_trait::async_trait;

/// Trait for firewall alias API clients
///
/// Implementations are pure request/response wrappers: no local state,
/// no retries, no decisions about whether an update is needed. The
/// reconciler owns all of that.
///
/// # Errors
///
/// Every method reports transport failures, non-2xx statuses and
/// malformed responses uniformly as [`crate::Error::Remote`].
///
/// # Mutation
///
/// [`AliasClient::replace_alias_entries`] followed by [`AliasClient::commit`]
/// changes enforced firewall policy. They are only called by the reconciler
/// after it has observed a real prefix mismatch.
#[async_trait]
pub trait AliasClient: Send + Sync {
    /// Look up the stable identifier (UUID) of the alias called `name`
    ///
    /// Fails if the alias does not exist.
    async fn resolve_alias_id(&self, name: &str) -> Result<String, crate::Error>;

    /// Current raw content lines of the alias, in order
    async fn list_alias_entries(&self, name: &str) -> Result<Vec<String>, crate::Error>;

    /// Overwrite the alias content with `entries`
    ///
    /// This is a full replacement, never a delta: `entries` must hold the
    /// complete desired content or unrelated entries are lost. The change is
    /// staged until [`AliasClient::commit`] is called.
    async fn replace_alias_entries(
        &self,
        id: &str,
        name: &str,
        entries: &[String],
    ) -> Result<(), crate::Error>;

    /// Activate the staged configuration
    async fn commit(&self) -> Result<(), crate::Error>;

    /// Cheap call confirming reachability and credentials
    async fn health_check(&self) -> Result<(), crate::Error>;

    /// Short name for log messages
    fn client_name(&self) -> &'static str;
}
