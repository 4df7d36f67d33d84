//! State History - the append-only audit log
//!
//! Every committed mutation produces exactly one `HistoryEntry`. Sequence
//! numbers start at 1 and increase by one per entry, in the order the engine
//! serialized the mutations. Entries are never edited or removed; once the
//! engine is torn down the history is a read-only archive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serenitas_core::{RegulationError, RegulationParams, StateDelta, StateVector, StimulusCatalog};
use std::fmt;

/// What caused a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cause {
    Stimulus {
        id: String,
        /// False when the catalog did not recognise `id`.
        classified: bool,
    },
    Penalty,
    Decay,
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Stimulus { id, classified: true } => write!(f, "stimulus:{}", id),
            Cause::Stimulus { id, classified: false } => write!(f, "stimulus:{} (unclassified)", id),
            Cause::Penalty => f.write_str("penalty"),
            Cause::Decay => f.write_str("decay"),
        }
    }
}

/// One committed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sequence: u64,
    pub cause: Cause,
    /// Stimulus intensity, penalty amount, or 1.0 for a decay tick.
    pub intensity: f64,
    /// Effective post-clamp change.
    pub delta: StateDelta,
    pub resulting_state: StateVector,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Equal in everything except wall-clock time.
    pub fn same_event(&self, other: &HistoryEntry) -> bool {
        self.sequence == other.sequence
            && self.cause == other.cause
            && self.intensity == other.intensity
            && self.delta == other.delta
            && self.resulting_state == other.resulting_state
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateHistory {
    entries: Vec<HistoryEntry>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next entry. Only the engine calls this.
    pub(crate) fn append(
        &mut self,
        cause: Cause,
        intensity: f64,
        delta: StateDelta,
        resulting_state: StateVector,
    ) -> &HistoryEntry {
        let sequence = self.entries.last().map_or(1, |e| e.sequence + 1);
        self.entries.push(HistoryEntry {
            sequence,
            cause,
            intensity,
            delta,
            resulting_state,
            timestamp: Utc::now(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Entries with a sequence number strictly greater than `sequence`.
    pub fn since(&self, sequence: u64) -> &[HistoryEntry] {
        let start = self.entries.partition_point(|e| e.sequence <= sequence);
        &self.entries[start..]
    }

    /// Entries whose mutation moved the state from Nominal into Critical.
    pub fn critical_transitions(&self) -> impl Iterator<Item = &HistoryEntry> {
        let mut was_critical = StateVector::baseline().is_critical();
        self.entries.iter().filter(move |e| {
            let now = e.resulting_state.is_critical();
            let entered = now && !was_critical;
            was_critical = now;
            entered
        })
    }

    /// Recompute every entry from the baseline and check it against the record.
    ///
    /// Returns the final state on success. The catalog and params must be the
    /// ones the engine ran with.
    pub fn replay(
        &self,
        params: &RegulationParams,
        catalog: &StimulusCatalog,
    ) -> Result<StateVector, RegulationError> {
        let baseline = StateVector::baseline();
        let mut state = baseline;
        let mut expected_sequence = 1;

        for entry in &self.entries {
            if entry.sequence != expected_sequence {
                return Err(RegulationError::ReplayDivergence { sequence: entry.sequence });
            }
            state = match &entry.cause {
                Cause::Stimulus { id, .. } => {
                    let delta = params.stimulus_delta(&catalog.resolve(id), entry.intensity)?;
                    state.apply(&delta)
                }
                Cause::Penalty => state.apply(&params.penalty_delta(entry.intensity)?),
                Cause::Decay => params.decay(&state, &baseline),
            };
            if state != entry.resulting_state {
                return Err(RegulationError::ReplayDivergence { sequence: entry.sequence });
            }
            expected_sequence += 1;
        }
        Ok(state)
    }

    /// Serialize the archive to JSON for an external store.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize an archive. State vectors are range-checked on the way in.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
