// # Command Address Source
//
// This crate provides an AddressSource that lists interface addresses by
// running the system's interface tool and scraping its output.
//
// ## Supported Commands
//
// - `ifconfig <iface> inet6` (FreeBSD, OPNsense)
// - `ip -6 addr show dev <iface>` (Linux iproute2)
//
// Both print one `inet6 <address>...` line per configured address. The
// token following `inet6` is returned with any zone (`%igb0`) and length
// (`/64`) suffix removed; classification happens in v6alias-core.
//
// ## Failure Handling
//
// A missing binary, a non-zero exit status or a hung command all surface
// as `Error::LocalQuery`, which aborts the current cycle without touching
// the alias.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use v6alias_core::config::{AddressCommand, SyncConfig};
use v6alias_core::traits::AddressSource;
use v6alias_core::{Error, Result};

/// Default time a listing command may take
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Address source backed by `ifconfig` or `ip`
#[derive(Debug, Clone)]
pub struct CommandAddressSource {
    command: AddressCommand,
    timeout: Duration,
}

impl CommandAddressSource {
    pub fn new(command: AddressCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    /// Create a source from the `[sync]` configuration section
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.address_command, DEFAULT_COMMAND_TIMEOUT)
    }

    /// Program and arguments listing the IPv6 addresses of `interface`
    fn invocation(&self, interface: &str) -> (&'static str, Vec<String>) {
        match self.command {
            AddressCommand::Ifconfig => (
                "ifconfig",
                vec![interface.to_string(), "inet6".to_string()],
            ),
            AddressCommand::Ip => (
                "ip",
                vec![
                    "-6".to_string(),
                    "addr".to_string(),
                    "show".to_string(),
                    "dev".to_string(),
                    interface.to_string(),
                ],
            ),
        }
    }
}

#[async_trait]
impl AddressSource for CommandAddressSource {
    async fn addresses(&self, interface: &str) -> Result<Vec<String>> {
        let (program, args) = self.invocation(interface);
        debug!(program, ?args, "Listing interface addresses");

        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                Error::local_query(
                    interface,
                    format!("{} did not finish within {:?}", program, self.timeout),
                )
            })?
            .map_err(|e| Error::local_query(interface, format!("cannot run {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::local_query(
                interface,
                format!("{} exited with {}: {}", program, output.status, stderr.trim()),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let candidates = extract_candidates(&stdout);
        debug!(count = candidates.len(), "Found IPv6 address candidates");
        Ok(candidates)
    }

    fn source_name(&self) -> &'static str {
        match self.command {
            AddressCommand::Ifconfig => "ifconfig",
            AddressCommand::Ip => "ip",
        }
    }
}

/// Pull the address out of every `inet6` line, in output order
pub fn extract_candidates(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            if tokens.next()? != "inet6" {
                return None;
            }
            let raw = tokens.next()?;
            let without_len = raw.split('/').next().unwrap_or(raw);
            let without_zone = without_len.split('%').next().unwrap_or(without_len);
            Some(without_zone.to_string())
        })
        .collect()
}
