//! Alias reconciler
//!
//! The Reconciler runs one reconciliation cycle at a time:
//! - Detecting the local prefix via AddressSource
//! - Detecting the alias prefix via AliasClient
//! - Comparing the two masked networks
//! - Replacing and committing the alias content on mismatch
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐                      ┌───────────────┐
//! │ AddressSource │                      │  AliasClient  │
//! │ (interface)   │                      │  (list)       │
//! └───────────────┘                      └───────────────┘
//!         │                                      │
//!         ▼                                      ▼
//!  read_local_prefix                    extract_global_prefix
//!         │                                      │
//!         └──────────────┐        ┌──────────────┘
//!                        ▼        ▼
//!                     ┌──────────────┐
//!                     │  Reconciler  │── SyncEvent ──▶ monitoring
//!                     └──────────────┘
//!                            │ mismatch only
//!                            ▼
//!              ┌────────────────────────────┐
//!              │ AliasClient                │
//!              │ resolve → replace → commit │
//!              └────────────────────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. DetectLocal: a query failure aborts the cycle (it is never read as "no prefix")
//! 2. DetectRemote: a list failure aborts the cycle
//! 3. Compare: no local prefix aborts the cycle; equal prefixes end it
//! 4. Update: full desired content is written, then committed
//!
//! Nothing is carried between cycles. A failed or interrupted update leaves
//! the mismatch in place and the next cycle repairs it.

use crate::alias::extract_global_prefix;
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::interface::read_local_prefix;
use crate::prefix::{Ipv6Prefix, PrefixLookup};
use crate::traits::{AddressSource, AliasClient};
use std::fmt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// Default capacity of the event channel
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of one reconciliation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The interface has no global IPv6 address; nothing was changed
    NoGlobalAddress,

    /// The alias held no global prefix; the local prefix was written
    NoGlobalPrefixInAlias {
        /// The prefix that was added
        added: Ipv6Prefix,
    },

    /// Alias and interface agree; nothing was changed
    InSync {
        /// The shared prefix
        prefix: Ipv6Prefix,
    },

    /// The alias prefix was replaced
    Updated {
        /// Prefix that was removed
        previous: Ipv6Prefix,
        /// Prefix now in the alias
        current: Ipv6Prefix,
    },

    /// The alias already holds the local prefix next to an old entry that
    /// could not be removed automatically; nothing was changed
    StaleEntryKept {
        /// Old prefix whose entry is not in canonical form
        stale: Ipv6Prefix,
        /// Local prefix, already present in the alias
        current: Ipv6Prefix,
    },

    /// Writing or committing the alias failed; retried next cycle
    UpdateFailed {
        /// Prefix that should have been written
        target: Ipv6Prefix,
        /// Failure description
        error: String,
    },
}

impl ReconcileOutcome {
    /// Whether this cycle changed the alias
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            ReconcileOutcome::NoGlobalPrefixInAlias { .. } | ReconcileOutcome::Updated { .. }
        )
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::NoGlobalAddress => f.write_str("no global address found"),
            ReconcileOutcome::NoGlobalPrefixInAlias { added } => {
                write!(f, "alias initialized with {}", added)
            }
            ReconcileOutcome::InSync { prefix } => write!(f, "in sync ({})", prefix),
            ReconcileOutcome::Updated { previous, current } => {
                write!(f, "updated {} -> {}", previous, current)
            }
            ReconcileOutcome::StaleEntryKept { stale, current } => {
                write!(f, "{} present, stale entry for {} kept", current, stale)
            }
            ReconcileOutcome::UpdateFailed { target, error } => {
                write!(f, "update to {} failed: {}", target, error)
            }
        }
    }
}

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A cycle began
    CycleStarted,

    /// Local detection finished
    LocalPrefixDetected { prefix: PrefixLookup },

    /// Alias detection finished
    AliasPrefixDetected { prefix: PrefixLookup },

    /// No change needed
    InSync { prefix: Ipv6Prefix },

    /// Alias write started
    UpdateStarted {
        previous: Option<Ipv6Prefix>,
        target: Ipv6Prefix,
    },

    /// Alias written and committed
    UpdateSucceeded {
        previous: Option<Ipv6Prefix>,
        current: Ipv6Prefix,
    },

    /// Alias write or commit failed
    UpdateFailed { target: Ipv6Prefix, error: String },

    /// The cycle ended before the compare step could act
    CycleAborted { reason: String },
}

/// Per-process reconciliation settings
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Alias name
    pub alias: String,
    /// Monitored interface
    pub interface: String,
    /// Mask length for both sides
    pub prefix_length: u8,
    /// Capacity of the event channel
    pub event_channel_capacity: usize,
}

impl ReconcilerSettings {
    /// Take the relevant fields from the sync configuration
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            alias: config.alias.clone(),
            interface: config.monitor_iface.clone(),
            prefix_length: config.prefix_length,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.alias.is_empty() || self.interface.is_empty() {
            return Err(Error::config("alias and interface must be set"));
        }
        if self.prefix_length > 128 {
            return Err(Error::config(format!(
                "prefix length must be between 0 and 128. Got: {}",
                self.prefix_length
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }
}

/// Alias reconciler
///
/// Owns the two outside seams and decides, once per call to
/// [`Reconciler::reconcile`], whether the alias must change.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::reconcile()`] once per cycle (usually via [`crate::Scheduler`])
///
/// ## Safety
///
/// The alias is only ever written from [`Reconciler::reconcile`] after both
/// sides were read successfully and found to differ.
pub struct Reconciler {
    /// Local address enumeration
    source: Box<dyn AddressSource>,

    /// Firewall API
    client: Box<dyn AliasClient>,

    /// Alias, interface and mask length
    settings: ReconcilerSettings,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields sync events
    pub fn new(
        source: Box<dyn AddressSource>,
        client: Box<dyn AliasClient>,
        settings: ReconcilerSettings,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        settings.validate()?;

        let (tx, rx) = mpsc::channel(settings.event_channel_capacity);

        let reconciler = Self {
            source,
            client,
            settings,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Settings this reconciler runs with
    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Run one reconciliation cycle
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileOutcome)`: the cycle ran to a decision (including a failed update)
    /// - `Err(Error::LocalQuery)`: the interface could not be queried; nothing was changed
    /// - `Err(Error::Remote)`: the alias could not be read; nothing was changed
    pub async fn reconcile(&self) -> Result<ReconcileOutcome> {
        let alias = self.settings.alias.as_str();
        let interface = self.settings.interface.as_str();
        let prefix_length = self.settings.prefix_length;

        self.emit_event(SyncEvent::CycleStarted);

        // DetectLocal
        let local = match read_local_prefix(self.source.as_ref(), interface, prefix_length).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(interface, "Could not determine interface IPv6 address: {}", e);
                return Err(self.abort(e));
            }
        };
        info!(interface, "Current interface IPv6 prefix: {}", local);
        self.emit_event(SyncEvent::LocalPrefixDetected { prefix: local });

        // DetectRemote
        let entries = match self.client.list_alias_entries(alias).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(alias, "Error while determining alias IPv6 prefix: {}", e);
                return Err(self.abort(e));
            }
        };
        let remote = extract_global_prefix(&entries, prefix_length);
        info!(alias, "Current alias IPv6 prefix: {}", remote);
        self.emit_event(SyncEvent::AliasPrefixDetected { prefix: remote });

        // Compare
        let PrefixLookup::Found(target) = local else {
            warn!(interface, "No global IPv6 address found, leaving alias untouched");
            self.emit_event(SyncEvent::CycleAborted {
                reason: format!("no global IPv6 address on {}", interface),
            });
            return Ok(ReconcileOutcome::NoGlobalAddress);
        };

        let previous = remote.prefix();
        if previous == Some(target) {
            info!("Alias and interface prefix match. No action required");
            self.emit_event(SyncEvent::InSync { prefix: target });
            return Ok(ReconcileOutcome::InSync { prefix: target });
        }

        // Update
        info!("Prefix mismatch. Updating alias...");
        Ok(self.update(&entries, previous, target).await)
    }

    /// Replace the old prefix entry with `target` and commit
    async fn update(
        &self,
        entries: &[String],
        previous: Option<Ipv6Prefix>,
        target: Ipv6Prefix,
    ) -> ReconcileOutcome {
        let desired = desired_entries(entries, previous, target);

        // Only reachable when the old entry is not in canonical form
        if desired == entries
            && let Some(stale) = previous
        {
            warn!(
                alias = %self.settings.alias,
                "Alias already contains {} but still lists {} in a non-canonical form. Remove that entry manually",
                target, stale
            );
            self.emit_event(SyncEvent::CycleAborted {
                reason: format!("stale alias entry for {} needs manual cleanup", stale),
            });
            return ReconcileOutcome::StaleEntryKept {
                stale,
                current: target,
            };
        }

        self.emit_event(SyncEvent::UpdateStarted { previous, target });

        match self.write_alias(&desired).await {
            Ok(()) => {
                info!(alias = %self.settings.alias, "Updated alias with prefix {}", target);
                self.emit_event(SyncEvent::UpdateSucceeded {
                    previous,
                    current: target,
                });
                match previous {
                    Some(previous) => ReconcileOutcome::Updated {
                        previous,
                        current: target,
                    },
                    None => ReconcileOutcome::NoGlobalPrefixInAlias { added: target },
                }
            }
            Err(e) => {
                error!(alias = %self.settings.alias, "Could not update alias. Reason: {}", e);
                self.emit_event(SyncEvent::UpdateFailed {
                    target,
                    error: e.to_string(),
                });
                ReconcileOutcome::UpdateFailed {
                    target,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Resolve the alias id, write the full content, commit
    async fn write_alias(&self, entries: &[String]) -> Result<()> {
        let alias = self.settings.alias.as_str();

        let id = self.client.resolve_alias_id(alias).await?;
        debug!(alias, uuid = %id, "Resolved alias id");

        self.client.replace_alias_entries(&id, alias, entries).await?;
        self.client.commit().await
    }

    fn abort(&self, error: Error) -> Error {
        self.emit_event(SyncEvent::CycleAborted {
            reason: error.to_string(),
        });
        error
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider draining sync events faster.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Build the full alias content for an update
///
/// Every current entry except the one whose text equals the old prefix,
/// followed by the new prefix. Unrelated entries keep their order. The new
/// prefix is not added twice if it is already present.
pub fn desired_entries(
    current: &[String],
    previous: Option<Ipv6Prefix>,
    target: Ipv6Prefix,
) -> Vec<String> {
    let old = previous.map(|p| p.to_string());
    let new = target.to_string();

    if let Some(old) = &old
        && !current.iter().any(|entry| entry == old)
    {
        warn!(
            "No alias entry is exactly {}; it stays in the alias next to {}",
            old, new
        );
    }

    let mut desired: Vec<String> = current
        .iter()
        .filter(|entry| Some(entry.as_str()) != old.as_deref())
        .cloned()
        .collect();

    if !desired.contains(&new) {
        desired.push(new);
    }

    desired
}
