//! Supervisory signals emitted on critical-state edges.

use crate::history::HistoryEntry;
use serde::{Deserialize, Serialize};
use serenitas_core::StateVector;

/// Payload for a Nominal → Critical transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalEvent {
    /// The vector that satisfied the critical predicate.
    pub state: StateVector,
    /// The mutation that produced it.
    pub cause: HistoryEntry,
}

/// Edge-triggered notification for the supervisory collaborator.
///
/// Repeated mutations while already Critical produce nothing; only the
/// crossing in each direction is reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum SupervisorSignal {
    EnteredCritical(CriticalEvent),
    Recovered { state: StateVector, sequence: u64 },
}

impl SupervisorSignal {
    pub fn is_critical_entry(&self) -> bool {
        matches!(self, SupervisorSignal::EnteredCritical(_))
    }

    /// Sequence number of the history entry that triggered the signal.
    pub fn sequence(&self) -> u64 {
        match self {
            SupervisorSignal::EnteredCritical(event) => event.cause.sequence,
            SupervisorSignal::Recovered { sequence, .. } => *sequence,
        }
    }
}
