//! Coordinated graceful shutdown
//!
//! Running -> Draining -> Stopped. While running, every admitted request holds
//! an [`InFlightGuard`]. Draining rejects new requests and waits, bounded by
//! the grace period, for the guards to drop.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

use crate::error::ShutdownError;

/// Grace period used when the configuration gives none
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Running,
    Draining,
    Stopped,
}

/// How the drain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every in-flight request finished
    Completed,
    /// The grace period elapsed with requests still running
    Forced { remaining: usize },
}

pub struct ShutdownCoordinator {
    phase: RwLock<Phase>,
    in_flight: Arc<watch::Sender<usize>>,
    grace: Duration,
}

impl ShutdownCoordinator {
    pub fn new(grace: Duration) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            phase: RwLock::new(Phase::Running),
            in_flight: Arc::new(in_flight),
            grace,
        }
    }

    /// Admit a request. The returned guard counts it as in flight until dropped.
    pub async fn admit(&self) -> Result<InFlightGuard, ShutdownError> {
        let phase = self.phase.read().await;
        if *phase != Phase::Running {
            return Err(ShutdownError::ServiceUnavailable);
        }

        self.in_flight.send_modify(|n| *n += 1);
        Ok(InFlightGuard {
            counter: Arc::clone(&self.in_flight),
        })
    }

    /// Stop admitting requests and wait for in-flight ones, at most the grace
    /// period. Always ends in [`Phase::Stopped`].
    pub async fn drain(&self) -> DrainOutcome {
        {
            let mut phase = self.phase.write().await;
            if *phase == Phase::Running {
                *phase = Phase::Draining;
            }
        }

        info!(
            in_flight = self.in_flight(),
            grace_secs = self.grace.as_secs(),
            "Waiting for active operations to complete..."
        );

        let mut counter = self.in_flight.subscribe();
        let drained = tokio::time::timeout(self.grace, counter.wait_for(|n| *n == 0))
            .await
            .is_ok();

        let outcome = if drained {
            info!("All active operations completed");
            DrainOutcome::Completed
        } else {
            let remaining = self.in_flight();
            warn!(remaining, "Timeout waiting for active operations, forcing shutdown");
            DrainOutcome::Forced { remaining }
        };

        *self.phase.write().await = Phase::Stopped;
        outcome
    }

    pub async fn phase(&self) -> Phase {
        *self.phase.read().await
    }

    /// Number of admitted requests that have not finished
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    pub fn grace_period(&self) -> Duration {
        self.grace
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}

/// Marks one admitted request as in flight
#[derive(Debug)]
pub struct InFlightGuard {
    counter: Arc<watch::Sender<usize>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.send_modify(|n| *n = n.saturating_sub(1));
    }
}
