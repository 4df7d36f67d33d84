//! Decay heartbeat for the regulation engine
//!
//! The heartbeat determines how frequently the state is pulled back toward
//! baseline even without external stimuli. Deployments that already own a
//! scheduler can call `RegulationEngine::decay_tick` themselves instead.

use crate::engine::RegulationEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Configuration for the decay heartbeat
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// How often to apply one decay tick (default: 10s)
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

impl HeartbeatConfig {
    /// Fast recovery for short interactive sessions
    pub fn fast() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }

    /// Slow recovery for long-running agents
    pub fn slow() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }

    /// Very fast heartbeat for testing
    pub fn testing() -> Self {
        Self {
            interval: Duration::from_millis(10),
        }
    }
}

/// Background task calling `decay_tick` on a fixed interval.
///
/// The task is aborted on `stop()` or when the handle is dropped.
pub struct DecayHeartbeat {
    handle: JoinHandle<()>,
}

impl DecayHeartbeat {
    /// Spawn the heartbeat on the current tokio runtime
    pub fn spawn(engine: Arc<RegulationEngine>, config: HeartbeatConfig) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately; skip it so decay starts one period in
            interval.tick().await;

            loop {
                interval.tick().await;
                if let Some(entry) = engine.decay_tick().await {
                    tracing::trace!("Decay tick #{} -> {}", entry.sequence, entry.resulting_state);
                }
            }
        });
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for DecayHeartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
