//! Regulation Engine
//!
//! The RegulationEngine owns the live StateVector for one agent session. It:
//! - Applies stimuli, penalties and decay ticks under a single mutex, so the
//!   read-modify-clamp-log-transition sequence is one atomic unit
//! - Appends every committed mutation to the StateHistory
//! - Publishes snapshots through a watch channel (readers never block writers
//!   and never see a half-applied vector)
//! - Emits edge-triggered supervisory signals on critical transitions

use crate::history::{Cause, HistoryEntry, StateHistory};
use crate::signal::{CriticalEvent, SupervisorSignal};
use serenitas_core::{
    RegulationConfig, RegulationError, RegulationParams, StateDelta, StateVector, StimulusCatalog,
};
use tokio::sync::{broadcast, watch, Mutex};

/// Buffer for history and supervisor broadcast channels.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// State guarded by the engine's mutex.
struct EngineCore {
    state: StateVector,
    history: StateHistory,
    critical: bool,
}

pub struct RegulationEngine {
    /// Single-writer section: live vector, audit log and critical flag
    core: Mutex<EngineCore>,

    /// Stimulus table, read-only after construction
    catalog: StimulusCatalog,

    /// Sensitivity and decay constants
    params: RegulationParams,

    /// Decay target
    baseline: StateVector,

    /// Latest committed snapshot (prompting layer subscribes to this)
    state_watch_tx: watch::Sender<StateVector>,
    state_watch_rx: watch::Receiver<StateVector>,

    /// Every committed entry, in commit order (storage collaborator)
    history_tx: broadcast::Sender<HistoryEntry>,

    /// Critical-state edges (supervisory collaborator)
    supervisor_tx: broadcast::Sender<SupervisorSignal>,
}

impl RegulationEngine {
    /// Create an engine with the built-in catalog and default policy
    pub fn new() -> Self {
        Self::with_config(RegulationParams::default(), StimulusCatalog::builtin())
    }

    /// Create with custom policy and catalog
    pub fn with_config(params: RegulationParams, catalog: StimulusCatalog) -> Self {
        let baseline = StateVector::baseline();
        let (state_watch_tx, state_watch_rx) = watch::channel(baseline);
        let (history_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (supervisor_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            core: Mutex::new(EngineCore {
                state: baseline,
                history: StateHistory::new(),
                critical: baseline.is_critical(),
            }),
            catalog,
            params,
            baseline,
            state_watch_tx,
            state_watch_rx,
            history_tx,
            supervisor_tx,
        }
    }

    /// Build from a loaded config file
    pub fn from_config(config: &RegulationConfig) -> anyhow::Result<Self> {
        Ok(Self::with_config(config.params()?, config.catalog()?))
    }

    pub fn params(&self) -> &RegulationParams {
        &self.params
    }

    pub fn catalog(&self) -> &StimulusCatalog {
        &self.catalog
    }

    /// Apply a classified (or unclassified) stimulus.
    ///
    /// Fails only for a non-finite intensity, in which case nothing changes.
    pub async fn apply_stimulus(
        &self,
        stimulus_type: &str,
        intensity: f64,
    ) -> Result<HistoryEntry, RegulationError> {
        let definition = self.catalog.resolve(stimulus_type);
        let delta = self.params.stimulus_delta(&definition, intensity)?;
        let cause = Cause::Stimulus {
            classified: definition.is_known(),
            id: definition.into_id(),
        };

        let mut core = self.core.lock().await;
        let next = core.state.apply(&delta);
        Ok(self.commit(&mut core, cause, intensity, next))
    }

    /// Charge a competence penalty for detected incoherence. `amount` must be >= 0.
    pub async fn apply_penalty(&self, amount: f64) -> Result<HistoryEntry, RegulationError> {
        let delta: StateDelta = self.params.penalty_delta(amount)?;

        let mut core = self.core.lock().await;
        let next = core.state.apply(&delta);
        Ok(self.commit(&mut core, Cause::Penalty, amount, next))
    }

    /// Pull every dimension toward baseline by its decay rate.
    ///
    /// Returns `None` when the state is already at rest, so an idle scheduler
    /// does not flood the history.
    pub async fn decay_tick(&self) -> Option<HistoryEntry> {
        let mut core = self.core.lock().await;
        let next = self.params.decay(&core.state, &self.baseline);
        if next == core.state {
            return None;
        }
        Some(self.commit(&mut core, Cause::Decay, 1.0, next))
    }

    /// Point-in-time snapshot; never blocks on the writer mutex.
    pub fn get_current_state(&self) -> StateVector {
        *self.state_watch_rx.borrow()
    }

    pub fn is_critical(&self) -> bool {
        self.get_current_state().is_critical()
    }

    /// Subscribe to snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<StateVector> {
        self.state_watch_rx.clone()
    }

    /// Subscribe to committed history entries (for an external store)
    pub fn subscribe_history(&self) -> broadcast::Receiver<HistoryEntry> {
        self.history_tx.subscribe()
    }

    /// Subscribe to critical-state edges.
    ///
    /// The channel holds the last 256 signals. A receiver that falls further
    /// behind gets `Lagged` and the oldest signals are dropped; it should
    /// recover the missed edges with [`Self::critical_transitions_since`],
    /// passing the last sequence number it saw.
    pub fn subscribe_supervisor(&self) -> broadcast::Receiver<SupervisorSignal> {
        self.supervisor_tx.subscribe()
    }

    /// Nominal → Critical entries recorded after `sequence`.
    pub async fn critical_transitions_since(&self, sequence: u64) -> Vec<HistoryEntry> {
        self.core
            .lock()
            .await
            .history
            .critical_transitions()
            .filter(|e| e.sequence > sequence)
            .cloned()
            .collect()
    }

    /// Copy of the audit log so far
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.core.lock().await.history.entries().to_vec()
    }

    pub async fn history_len(&self) -> usize {
        self.core.lock().await.history.len()
    }

    /// End the session and hand back the history as a read-only archive.
    pub fn finish(self) -> StateHistory {
        let core = self.core.into_inner();
        tracing::info!(
            "Regulation session finished: {} entries, final state {}",
            core.history.len(),
            core.state
        );
        core.history
    }

    /// Commit `next` as the new live state. Caller holds the core lock.
    fn commit(
        &self,
        core: &mut EngineCore,
        cause: Cause,
        intensity: f64,
        next: StateVector,
    ) -> HistoryEntry {
        let delta = next.delta_from(&core.state);
        let entry = core.history.append(cause, intensity, delta, next).clone();
        core.state = next;
        self.state_watch_tx.send_replace(next);
        let _ = self.history_tx.send(entry.clone());

        tracing::debug!(
            "#{} {} (intensity={:.3}) -> {}",
            entry.sequence,
            entry.cause,
            intensity,
            next
        );

        let now_critical = next.is_critical();
        match (core.critical, now_critical) {
            (false, true) => {
                tracing::info!("Entered critical state at #{}: {}", entry.sequence, next);
                let _ = self
                    .supervisor_tx
                    .send(SupervisorSignal::EnteredCritical(CriticalEvent {
                        state: next,
                        cause: entry.clone(),
                    }));
            }
            (true, false) => {
                tracing::info!("Recovered from critical state at #{}: {}", entry.sequence, next);
                let _ = self.supervisor_tx.send(SupervisorSignal::Recovered {
                    state: next,
                    sequence: entry.sequence,
                });
            }
            _ => {}
        }
        core.critical = now_critical;

        entry
    }
}

impl Default for RegulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenitas_core::Dimension;
    use tokio::sync::broadcast::error::TryRecvError;

    fn drain(rx: &mut broadcast::Receiver<SupervisorSignal>) -> Vec<SupervisorSignal> {
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(signal) => out.push(signal),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
        out
    }

    #[tokio::test]
    async fn test_engine_starts_at_baseline() {
        let engine = RegulationEngine::new();
        assert_eq!(engine.get_current_state(), StateVector::baseline());
        assert!(!engine.is_critical());
        assert_eq!(engine.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_db_error_scenario() {
        let engine = RegulationEngine::new();
        let mut supervisor = engine.subscribe_supervisor();

        let entry = engine.apply_stimulus("db_error", 0.8).await.unwrap();
        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.cause.to_string(), "stimulus:db_error");
        let state = engine.get_current_state();
        assert!((state.competence() - 0.6).abs() < 1e-12);
        assert!(!state.is_critical());
        assert!(drain(&mut supervisor).is_empty());

        engine.apply_stimulus("db_error", 0.8).await.unwrap();
        engine.apply_stimulus("db_error", 0.8).await.unwrap();

        let state = engine.get_current_state();
        assert_eq!(state.competence(), 0.0);
        assert!(state.is_critical());

        let signals = drain(&mut supervisor);
        assert_eq!(signals.iter().filter(|s| s.is_critical_entry()).count(), 1);
        assert_eq!(signals.len(), 1);
    }

    #[tokio::test]
    async fn test_no_renotify_while_critical() {
        let engine = RegulationEngine::new();
        let mut supervisor = engine.subscribe_supervisor();
        for _ in 0..5 {
            engine.apply_penalty(0.5).await.unwrap();
        }
        let signals = drain(&mut supervisor);
        assert_eq!(signals.len(), 1);
        match &signals[0] {
            SupervisorSignal::EnteredCritical(event) => {
                assert_eq!(event.cause.sequence, 2);
                assert_eq!(event.state, event.cause.resulting_state);
            }
            other => panic!("unexpected signal: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recovery_signal_then_reentry() {
        let engine = RegulationEngine::new();
        let mut supervisor = engine.subscribe_supervisor();

        engine.apply_penalty(0.9).await.unwrap(); // critical
        engine.apply_stimulus("task_success", 1.0).await.unwrap(); // 0.1 + 0.3 = 0.4, nominal
        engine.apply_penalty(0.5).await.unwrap(); // critical again

        let signals = drain(&mut supervisor);
        assert_eq!(signals.len(), 3);
        assert!(signals[0].is_critical_entry());
        assert!(matches!(signals[1], SupervisorSignal::Recovered { sequence: 2, .. }));
        assert!(signals[2].is_critical_entry());
    }

    #[tokio::test]
    async fn test_lagging_supervisor_recovers_edges_from_history() {
        let engine = RegulationEngine::new();
        let mut supervisor = engine.subscribe_supervisor();
        for _ in 0..300 {
            engine.apply_penalty(0.9).await.unwrap();
            engine.apply_stimulus("task_success", 1.0).await.unwrap();
        }

        let mut missed = 0;
        let mut received = Vec::new();
        loop {
            match supervisor.try_recv() {
                Ok(signal) => received.push(signal),
                Err(TryRecvError::Lagged(n)) => missed += n,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        assert!(missed > 0);

        // Edges older than the first retained signal come from the history.
        let first_kept = received[0].sequence();
        let recorded: Vec<u64> = engine
            .critical_transitions_since(0)
            .await
            .iter()
            .map(|e| e.sequence)
            .collect();
        let mut edges: Vec<u64> = recorded.iter().copied().filter(|&s| s < first_kept).collect();
        edges.extend(
            received
                .iter()
                .filter(|s| s.is_critical_entry())
                .map(|s| s.sequence()),
        );
        assert_eq!(edges.len(), 300);
        assert_eq!(edges, recorded);
        assert_eq!(engine.critical_transitions_since(598).await.len(), 1);
    }

    #[tokio::test]
    async fn test_negative_penalty_leaves_state_unchanged() {
        let engine = RegulationEngine::new();
        engine.apply_stimulus("user_praise", 0.5).await.unwrap();
        let before = engine.get_current_state();

        let err = engine.apply_penalty(-1.0).await.unwrap_err();
        assert!(matches!(err, RegulationError::InvalidArgument(_)));
        assert_eq!(engine.get_current_state(), before);
        assert_eq!(engine.history_len().await, 1);
    }

    #[tokio::test]
    async fn test_non_finite_intensity_rejected() {
        let engine = RegulationEngine::new();
        assert!(engine.apply_stimulus("db_error", f64::NAN).await.is_err());
        assert!(engine.apply_stimulus("db_error", f64::NEG_INFINITY).await.is_err());
        assert_eq!(engine.get_current_state(), StateVector::baseline());
        assert_eq!(engine.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_stimulus_recorded_as_unclassified() {
        let engine = RegulationEngine::new();
        let entry = engine.apply_stimulus("solar_flare", 0.9).await.unwrap();
        assert_eq!(
            entry.cause,
            Cause::Stimulus { id: "solar_flare".into(), classified: false }
        );
        let state = engine.get_current_state();
        assert!(state.vital_energy() < 1.0);
        assert_eq!(state.competence(), 1.0);
    }

    #[tokio::test]
    async fn test_decay_tick_recovers_and_rests() {
        let engine = RegulationEngine::new();
        assert!(engine.decay_tick().await.is_none());

        engine.apply_penalty(0.95).await.unwrap();
        assert!(engine.is_critical());

        let mut ticks = 0;
        while engine.is_critical() {
            let entry = engine.decay_tick().await.unwrap();
            assert_eq!(entry.cause, Cause::Decay);
            ticks += 1;
            assert!(ticks < 100, "decay never recovered");
        }
        let c = engine.get_current_state().competence();
        assert!(c >= 0.2 && c < 1.0);
    }

    #[tokio::test]
    async fn test_history_entry_delta_is_effective_change() {
        let engine = RegulationEngine::new();
        // Competence is already at 1.0: a boost is fully clamped away
        let entry = engine.apply_stimulus("task_success", 1.0).await.unwrap();
        assert_eq!(entry.delta.competence, 0.0);
        assert!((entry.delta.will - 0.2).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_subscribe_sees_commits() {
        let engine = RegulationEngine::new();
        let mut rx = engine.subscribe();
        let mut history_rx = engine.subscribe_history();

        engine.apply_stimulus("loop_detected", 1.0).await.unwrap();

        rx.changed().await.unwrap();
        let snapshot = *rx.borrow();
        assert!((snapshot.vital_energy() - 0.1).abs() < 1e-12);
        let entry = history_rx.recv().await.unwrap();
        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.resulting_state, snapshot);
    }

    #[tokio::test]
    async fn test_finish_returns_archive() {
        let engine = RegulationEngine::new();
        engine.apply_stimulus("goal_progress", 0.5).await.unwrap();
        engine.apply_penalty(0.1).await.unwrap();
        let archive = engine.finish();
        assert_eq!(archive.len(), 2);
        let replayed = archive
            .replay(&RegulationParams::default(), &StimulusCatalog::builtin())
            .unwrap();
        assert_eq!(replayed, archive.last().unwrap().resulting_state);
        assert!(replayed.get(Dimension::Will) > 0.8);
    }
}
