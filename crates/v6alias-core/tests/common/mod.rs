//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles keep their state behind `Arc`s so a test can hand one copy
//! to the reconciler and keep another to inspect calls and alias content.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use v6alias_core::error::{Error, Result};
use v6alias_core::traits::{AddressSource, AliasClient};
use v6alias_core::{Reconciler, ReconcilerSettings, SyncEvent};

pub const ALIAS: &str = "WAN_V6_PREFIX";
pub const IFACE: &str = "igb0";
pub const ALIAS_UUID: &str = "7f3c2a1e-0b44-4c36-9d1a-2f6e8b5c9a10";

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// An AddressSource whose answer the test controls
pub struct MockAddressSource {
    addresses: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
    call_count: Arc<AtomicUsize>,
}

impl MockAddressSource {
    pub fn new(addresses: &[&str]) -> Self {
        Self {
            addresses: Arc::new(Mutex::new(strings(addresses))),
            fail: Arc::new(AtomicBool::new(false)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a new MockAddressSource that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            addresses: Arc::clone(&other.addresses),
            fail: Arc::clone(&other.fail),
            call_count: Arc::clone(&other.call_count),
        }
    }

    pub fn set_addresses(&self, addresses: &[&str]) {
        *self.addresses.lock().unwrap() = strings(addresses);
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressSource for MockAddressSource {
    async fn addresses(&self, interface: &str) -> Result<Vec<String>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::local_query(interface, "interface does not exist"));
        }
        Ok(self.addresses.lock().unwrap().clone())
    }

    fn source_name(&self) -> &'static str {
        "mock"
    }
}

/// Which AliasClient call should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Nothing,
    List,
    Resolve,
    Replace,
    Commit,
}

/// An in-memory alias that records every API call
///
/// `replace_alias_entries` stages content; `commit` makes it visible to
/// `list_alias_entries`, like the real firewall does.
pub struct MockAliasClient {
    committed: Arc<Mutex<Vec<String>>>,
    staged: Arc<Mutex<Option<Vec<String>>>>,
    fail_on: Arc<Mutex<FailOn>>,
    list_count: Arc<AtomicUsize>,
    resolve_count: Arc<AtomicUsize>,
    replace_count: Arc<AtomicUsize>,
    commit_count: Arc<AtomicUsize>,
    health_count: Arc<AtomicUsize>,
}

impl MockAliasClient {
    pub fn new(entries: &[&str]) -> Self {
        Self {
            committed: Arc::new(Mutex::new(strings(entries))),
            staged: Arc::new(Mutex::new(None)),
            fail_on: Arc::new(Mutex::new(FailOn::Nothing)),
            list_count: Arc::new(AtomicUsize::new(0)),
            resolve_count: Arc::new(AtomicUsize::new(0)),
            replace_count: Arc::new(AtomicUsize::new(0)),
            commit_count: Arc::new(AtomicUsize::new(0)),
            health_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a new MockAliasClient that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            committed: Arc::clone(&other.committed),
            staged: Arc::clone(&other.staged),
            fail_on: Arc::clone(&other.fail_on),
            list_count: Arc::clone(&other.list_count),
            resolve_count: Arc::clone(&other.resolve_count),
            replace_count: Arc::clone(&other.replace_count),
            commit_count: Arc::clone(&other.commit_count),
            health_count: Arc::clone(&other.health_count),
        }
    }

    pub fn fail_on(&self, step: FailOn) {
        *self.fail_on.lock().unwrap() = step;
    }

    /// Content as the firewall currently enforces it
    pub fn entries(&self) -> Vec<String> {
        self.committed.lock().unwrap().clone()
    }

    pub fn list_count(&self) -> usize {
        self.list_count.load(Ordering::SeqCst)
    }

    pub fn resolve_count(&self) -> usize {
        self.resolve_count.load(Ordering::SeqCst)
    }

    pub fn replace_count(&self) -> usize {
        self.replace_count.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commit_count.load(Ordering::SeqCst)
    }

    /// Calls that change firewall policy
    pub fn mutation_count(&self) -> usize {
        self.replace_count() + self.commit_count()
    }

    fn failing(&self, step: FailOn, operation: &str) -> Result<()> {
        if *self.fail_on.lock().unwrap() == step {
            return Err(Error::remote(operation, "HTTP 502 Bad Gateway"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AliasClient for MockAliasClient {
    async fn resolve_alias_id(&self, name: &str) -> Result<String> {
        self.resolve_count.fetch_add(1, Ordering::SeqCst);
        self.failing(FailOn::Resolve, "resolve_alias_id")?;
        if name != ALIAS {
            return Err(Error::remote("resolve_alias_id", format!("alias not found: {}", name)));
        }
        Ok(ALIAS_UUID.to_string())
    }

    async fn list_alias_entries(&self, _name: &str) -> Result<Vec<String>> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        self.failing(FailOn::List, "list_alias_entries")?;
        Ok(self.entries())
    }

    async fn replace_alias_entries(&self, id: &str, _name: &str, entries: &[String]) -> Result<()> {
        self.replace_count.fetch_add(1, Ordering::SeqCst);
        self.failing(FailOn::Replace, "replace_alias_entries")?;
        assert_eq!(id, ALIAS_UUID, "replace must use the resolved alias id");
        *self.staged.lock().unwrap() = Some(entries.to_vec());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.commit_count.fetch_add(1, Ordering::SeqCst);
        self.failing(FailOn::Commit, "commit")?;
        if let Some(staged) = self.staged.lock().unwrap().take() {
            *self.committed.lock().unwrap() = staged;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.health_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn client_name(&self) -> &'static str {
        "mock"
    }
}

/// Settings used by every contract test
pub fn settings() -> ReconcilerSettings {
    ReconcilerSettings {
        alias: ALIAS.to_string(),
        interface: IFACE.to_string(),
        prefix_length: 64,
        event_channel_capacity: 100,
    }
}

/// Build a reconciler wired to copies of `source` and `client`
pub fn reconciler(
    source: &MockAddressSource,
    client: &MockAliasClient,
) -> (Reconciler, tokio::sync::mpsc::Receiver<SyncEvent>) {
    Reconciler::new(
        Box::new(MockAddressSource::sharing_state_with(source)),
        Box::new(MockAliasClient::sharing_state_with(client)),
        settings(),
    )
    .expect("reconciler construction succeeds")
}

/// Drain every event currently queued
pub fn drain(rx: &mut tokio::sync::mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
