//! Fixed-interval scheduler
//!
//! Runs one reconciliation cycle, sleeps, repeats. Cycle failures are
//! logged here and never leave the loop; only a shutdown signal does.
//! Cycles never overlap and there is no backoff: a failing cycle is simply
//! retried after the same interval.

use crate::error::Result;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Drives a [`Reconciler`] forever
pub struct Scheduler {
    reconciler: Reconciler,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler running `reconciler` every `interval`
    pub fn new(reconciler: Reconciler, interval: Duration) -> Self {
        Self {
            reconciler,
            interval,
        }
    }

    /// Run until `shutdown_rx` fires (or forever when `None`)
    ///
    /// The signal is only observed while sleeping between cycles; a cycle
    /// that has started always runs to completion.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        let settings = self.reconciler.settings();
        info!(
            alias = %settings.alias,
            interface = %settings.interface,
            interval_secs = self.interval.as_secs(),
            "Scheduler started"
        );

        let mut shutdown = shutdown_rx;
        let mut cycle: u64 = 0;

        loop {
            cycle += 1;
            self.run_cycle(cycle).await;

            match shutdown.as_mut() {
                Some(rx) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.interval) => {}
                        _ = rx => {
                            info!("Shutdown signal received");
                            break;
                        }
                    }
                }
                None => tokio::time::sleep(self.interval).await,
            }
        }

        info!(cycles = cycle, "Scheduler stopped");
        Ok(())
    }

    /// Run one cycle and log its result; never fails
    pub async fn run_cycle(&self, cycle: u64) -> Option<ReconcileOutcome> {
        debug!(cycle, "Starting reconciliation cycle");

        match self.reconciler.reconcile().await {
            Ok(outcome) => {
                match &outcome {
                    ReconcileOutcome::UpdateFailed { .. } => {
                        warn!(cycle, "Cycle finished: {}", outcome);
                    }
                    _ => debug!(cycle, "Cycle finished: {}", outcome),
                }
                Some(outcome)
            }
            Err(e) => {
                error!(cycle, "Cycle aborted: {}", e);
                None
            }
        }
    }
}
