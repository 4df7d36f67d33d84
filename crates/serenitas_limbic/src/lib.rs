//! # Serenitas Limbic
//!
//! The regulation engine for the agent's homeostatic state.
//!
//! ## Architecture
//!
//! Stimulus detectors, penalty checks and a decay scheduler all call into one
//! shared [`RegulationEngine`]:
//! 1. The stimulus is resolved through the catalog and turned into a delta
//! 2. The delta is applied, clamped and committed under the engine mutex
//! 3. The commit is appended to the [`StateHistory`] and broadcast
//! 4. Nominal ↔ Critical edges are signalled to the supervisor
//!
//! Readers take snapshots from a watch channel and never see a partial write.

mod engine;
mod heartbeat;
pub mod history;
mod signal;

pub use engine::RegulationEngine;
pub use heartbeat::{DecayHeartbeat, HeartbeatConfig};
pub use history::{Cause, HistoryEntry, StateHistory};
pub use signal::{CriticalEvent, SupervisorSignal};
