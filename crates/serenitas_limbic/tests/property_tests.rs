//! Property-based tests for the regulation engine.
//!
//! Drives arbitrary mutation sequences through fresh engines and checks the
//! audit invariants: bounded state, gap-free history, faithful replay,
//! determinism, and one supervisor signal per critical edge.

use proptest::prelude::*;
use serenitas_core::{Dimension, RegulationParams, StimulusCatalog};
use serenitas_limbic::{RegulationEngine, StateHistory, SupervisorSignal};

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Stimulus(String, f64),
    Penalty(f64),
    Decay,
}

fn arb_op() -> impl Strategy<Value = Op> {
    let ids = prop::sample::select(vec![
        "db_error",
        "internal_error",
        "task_success",
        "user_praise",
        "user_criticism",
        "loop_detected",
        "rest",
        "never_seen_before",
    ]);
    prop_oneof![
        4 => (ids, -2.0f64..=2.0).prop_map(|(id, i)| Op::Stimulus(id.to_string(), i)),
        2 => (0.0f64..=0.6).prop_map(Op::Penalty),
        2 => Just(Op::Decay),
    ]
}

fn run(ops: &[Op]) -> RegulationEngine {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(async {
        let engine = RegulationEngine::new();
        for op in ops {
            match op {
                Op::Stimulus(id, intensity) => {
                    engine.apply_stimulus(id, *intensity).await.unwrap();
                }
                Op::Penalty(amount) => {
                    engine.apply_penalty(*amount).await.unwrap();
                }
                Op::Decay => {
                    engine.decay_tick().await;
                }
            }
        }
        engine
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// **Core invariant**: every committed vector stays in [0, 1].
    #[test]
    fn engine_state_always_bounded(ops in prop::collection::vec(arb_op(), 0..60)) {
        let history = run(&ops).finish();
        for entry in history.entries() {
            for d in Dimension::ALL {
                let v = entry.resulting_state.get(d);
                prop_assert!((0.0..=1.0).contains(&v), "#{} {}={}", entry.sequence, d, v);
            }
        }
    }

    /// History is gap-free and replays to the same final state.
    #[test]
    fn history_replays_exactly(ops in prop::collection::vec(arb_op(), 0..60)) {
        let engine = run(&ops);
        let final_state = engine.get_current_state();
        let history = engine.finish();

        for (i, entry) in history.entries().iter().enumerate() {
            prop_assert_eq!(entry.sequence, i as u64 + 1);
        }
        let replayed = history
            .replay(&RegulationParams::default(), &StimulusCatalog::builtin())
            .unwrap();
        prop_assert_eq!(replayed, final_state);
    }

    /// A JSON archive restores every entry bit-for-bit and still replays.
    #[test]
    fn archive_roundtrip_replays(ops in prop::collection::vec(arb_op(), 0..60)) {
        let engine = run(&ops);
        let final_state = engine.get_current_state();
        let history = engine.finish();

        let restored = StateHistory::from_json(&history.to_json().unwrap()).unwrap();
        prop_assert_eq!(restored.len(), history.len());
        for (a, b) in restored.entries().iter().zip(history.entries()) {
            prop_assert!(a.same_event(b), "#{} changed in the archive", a.sequence);
        }
        let replayed = restored
            .replay(&RegulationParams::default(), &StimulusCatalog::builtin())
            .unwrap();
        prop_assert_eq!(replayed, final_state);
    }

    /// Same sequence, two fresh engines: identical vectors and history.
    #[test]
    fn engines_are_deterministic(ops in prop::collection::vec(arb_op(), 0..40)) {
        let a = run(&ops).finish();
        let b = run(&ops).finish();
        prop_assert_eq!(a.len(), b.len());
        for (x, y) in a.entries().iter().zip(b.entries()) {
            prop_assert!(x.same_event(y));
        }
    }

    /// Supervisor entries match the Nominal → Critical edges in history.
    #[test]
    fn supervisor_signals_match_edges(ops in prop::collection::vec(arb_op(), 0..60)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (signals, history) = rt.block_on(async {
            let engine = RegulationEngine::new();
            let mut rx = engine.subscribe_supervisor();
            for op in &ops {
                match op {
                    Op::Stimulus(id, i) => { engine.apply_stimulus(id, *i).await.unwrap(); }
                    Op::Penalty(a) => { engine.apply_penalty(*a).await.unwrap(); }
                    Op::Decay => { engine.decay_tick().await; }
                }
            }
            let mut signals = Vec::new();
            while let Ok(s) = rx.try_recv() {
                signals.push(s);
            }
            (signals, engine.finish())
        });

        let entered: Vec<u64> = signals
            .iter()
            .filter(|s| matches!(s, SupervisorSignal::EnteredCritical(_)))
            .map(|s| s.sequence())
            .collect();
        let edges: Vec<u64> = history.critical_transitions().map(|e| e.sequence).collect();
        prop_assert_eq!(entered, edges);
    }
}
