//! Regulation Dynamics: how stimuli, penalties and time move the state
//!
//! - stimulus: `delta_d = weight_d * intensity * sensitivity_d`, where the
//!   sensitivity is the dimension's drain constant for a negative raw change
//!   and its recovery constant for a positive one
//! - penalty: a flat competence cost
//! - decay: `v += (baseline - v) * rate`, never crossing the baseline
//!
//! All functions are pure; the engine supplies serialization and logging.

use crate::catalog::{Scaling, StimulusDefinition};
use crate::error::{RegulationError, Result};
use crate::state::{Dimension, StateDelta, StateVector};
use serde::{Deserialize, Serialize};

/// Sensitivity and decay constants for one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionPolicy {
    /// Multiplier for changes that lower the dimension.
    pub drain_sensitivity: f64,
    /// Multiplier for changes that raise the dimension.
    pub recovery_sensitivity: f64,
    /// Fraction of the distance to baseline recovered per decay tick, in [0, 1].
    pub decay_rate: f64,
}

impl DimensionPolicy {
    pub const fn symmetric(sensitivity: f64, decay_rate: f64) -> Self {
        Self {
            drain_sensitivity: sensitivity,
            recovery_sensitivity: sensitivity,
            decay_rate,
        }
    }

    fn validate(&self, dimension: Dimension) -> Result<()> {
        for (label, v) in [
            ("drain_sensitivity", self.drain_sensitivity),
            ("recovery_sensitivity", self.recovery_sensitivity),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(RegulationError::InvalidArgument(format!(
                    "{}.{} must be finite and non-negative, got {}",
                    dimension, label, v
                )));
            }
        }
        if !self.decay_rate.is_finite() || !(0.0..=1.0).contains(&self.decay_rate) {
            return Err(RegulationError::InvalidArgument(format!(
                "{}.decay_rate must be in [0, 1], got {}",
                dimension, self.decay_rate
            )));
        }
        Ok(())
    }
}

/// Per-dimension policy constants for the regulation loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RegulationParams {
    policies: [DimensionPolicy; 5],
}

impl Default for RegulationParams {
    fn default() -> Self {
        Self {
            policies: [
                // competence
                DimensionPolicy::symmetric(1.0, 0.05),
                // connection
                DimensionPolicy::symmetric(1.0, 0.05),
                // will
                DimensionPolicy::symmetric(1.0, 0.05),
                // authenticity: trust is rebuilt slower than it is lost
                DimensionPolicy {
                    drain_sensitivity: 1.0,
                    recovery_sensitivity: 0.8,
                    decay_rate: 0.05,
                },
                // vital_energy: drains three times faster than it recovers
                DimensionPolicy {
                    drain_sensitivity: 1.5,
                    recovery_sensitivity: 0.5,
                    decay_rate: 0.1,
                },
            ],
        }
    }
}

impl RegulationParams {
    pub fn policy(&self, dimension: Dimension) -> &DimensionPolicy {
        &self.policies[dimension.index()]
    }

    /// Replace one dimension's policy, validating it first.
    pub fn with_policy(mut self, dimension: Dimension, policy: DimensionPolicy) -> Result<Self> {
        policy.validate(dimension)?;
        self.policies[dimension.index()] = policy;
        Ok(self)
    }

    /// Same decay rate on every dimension.
    pub fn with_uniform_decay(mut self, rate: f64) -> Result<Self> {
        for dimension in Dimension::ALL {
            let mut policy = *self.policy(dimension);
            policy.decay_rate = rate;
            policy.validate(dimension)?;
            self.policies[dimension.index()] = policy;
        }
        Ok(self)
    }

    /// Delta for one stimulus. Fails only on a non-finite intensity.
    pub fn stimulus_delta(
        &self,
        definition: &StimulusDefinition,
        intensity: f64,
    ) -> Result<StateDelta> {
        if !intensity.is_finite() {
            return Err(RegulationError::InvalidArgument(format!(
                "stimulus '{}': intensity must be finite, got {}",
                definition.id(), intensity
            )));
        }

        let mut delta = StateDelta::default();
        for (&dimension, &weight) in definition.effects() {
            let raw = match definition.scaling() {
                Scaling::Intensity => weight * intensity,
                Scaling::Fixed => weight,
            };
            let policy = self.policy(dimension);
            let sensitivity = if raw < 0.0 {
                policy.drain_sensitivity
            } else {
                policy.recovery_sensitivity
            };
            delta.set(dimension, raw * sensitivity);
        }
        Ok(delta)
    }

    /// Competence cost for detected incoherence. `amount` must be >= 0.
    pub fn penalty_delta(&self, amount: f64) -> Result<StateDelta> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(RegulationError::InvalidArgument(format!(
                "penalty amount must be finite and non-negative, got {}",
                amount
            )));
        }
        Ok(StateDelta::only(Dimension::Competence, -amount))
    }

    /// One decay tick toward `baseline`. Monotone and never overshoots.
    pub fn decay(&self, state: &StateVector, baseline: &StateVector) -> StateVector {
        let mut next = *state;
        for dimension in Dimension::ALL {
            let v = state.get(dimension);
            let target = baseline.get(dimension);
            let stepped = v + (target - v) * self.policy(dimension).decay_rate;
            let (lo, hi) = if v <= target { (v, target) } else { (target, v) };
            next = next.with(dimension, stepped.clamp(lo, hi));
        }
        next
    }
}
