//! Homeostatic State
//!
//! The five bounded dimensions the regulation engine tracks:
//! - `competence`: capability self-perception
//! - `connection`: relational bonding strength
//! - `will`: drive toward the agent's goal
//! - `authenticity`: narrative / behavioural consistency
//! - `vital_energy`: operational reserve, guards against runaway loops
//!
//! Every value lives in the closed interval [0.0, 1.0]. The only ways to build
//! a `StateVector` are the validating constructor and the saturating one, so
//! no caller can hold an out-of-range vector.

use crate::error::{RegulationError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Competence strictly below this is critical.
pub const COMPETENCE_CRITICAL: f64 = 0.2;

/// Vital energy strictly below this is critical.
pub const VITAL_ENERGY_CRITICAL: f64 = 0.1;

/// One of the five regulated dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Competence,
    Connection,
    Will,
    Authenticity,
    VitalEnergy,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Competence,
        Dimension::Connection,
        Dimension::Will,
        Dimension::Authenticity,
        Dimension::VitalEnergy,
    ];

    /// Snake-case name used in config tables and logs.
    pub fn name(self) -> &'static str {
        match self {
            Dimension::Competence => "competence",
            Dimension::Connection => "connection",
            Dimension::Will => "will",
            Dimension::Authenticity => "authenticity",
            Dimension::VitalEnergy => "vital_energy",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dimension {
    type Err = RegulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "competence" => Ok(Dimension::Competence),
            "connection" => Ok(Dimension::Connection),
            "will" => Ok(Dimension::Will),
            "authenticity" => Ok(Dimension::Authenticity),
            "vital_energy" | "vitalEnergy" => Ok(Dimension::VitalEnergy),
            other => Err(RegulationError::UnknownDimension(other.to_string())),
        }
    }
}

/// Clamp into [0, 1]. NaN falls back to the dimension's baseline.
#[inline]
fn saturate(dimension: Dimension, v: f64) -> f64 {
    if v.is_nan() {
        let fallback = StateVector::baseline().get(dimension);
        tracing::warn!("NaN detected in {}, resetting to baseline {}", dimension, fallback);
        return fallback;
    }
    v.clamp(0.0, 1.0)
}

/// Point-in-time homeostatic state.
///
/// `Copy` so that every reader gets its own snapshot; the engine is the only
/// place that replaces the live value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStateVector")]
pub struct StateVector {
    competence: f64,
    connection: f64,
    will: f64,
    authenticity: f64,
    vital_energy: f64,
}

impl Default for StateVector {
    fn default() -> Self {
        Self::baseline()
    }
}

impl StateVector {
    /// The resting point every session starts from and decay pulls toward.
    pub const fn baseline() -> Self {
        Self {
            competence: 1.0,
            connection: 0.5,
            will: 0.8,
            authenticity: 1.0,
            vital_energy: 1.0,
        }
    }

    /// Validating constructor: rejects non-finite or out-of-range values.
    pub fn new(
        competence: f64,
        connection: f64,
        will: f64,
        authenticity: f64,
        vital_energy: f64,
    ) -> Result<Self> {
        let values = [competence, connection, will, authenticity, vital_energy];
        for (dimension, value) in Dimension::ALL.into_iter().zip(values) {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(RegulationError::OutOfRange { dimension, value });
            }
        }
        Ok(Self::from_array(values))
    }

    /// Saturating constructor: clamps every value into [0, 1].
    pub fn saturating(
        competence: f64,
        connection: f64,
        will: f64,
        authenticity: f64,
        vital_energy: f64,
    ) -> Self {
        let mut values = [competence, connection, will, authenticity, vital_energy];
        for dimension in Dimension::ALL {
            values[dimension.index()] = saturate(dimension, values[dimension.index()]);
        }
        Self::from_array(values)
    }

    fn from_array(v: [f64; 5]) -> Self {
        Self {
            competence: v[0],
            connection: v[1],
            will: v[2],
            authenticity: v[3],
            vital_energy: v[4],
        }
    }

    fn to_array(self) -> [f64; 5] {
        [
            self.competence,
            self.connection,
            self.will,
            self.authenticity,
            self.vital_energy,
        ]
    }

    pub fn competence(&self) -> f64 {
        self.competence
    }

    pub fn connection(&self) -> f64 {
        self.connection
    }

    pub fn will(&self) -> f64 {
        self.will
    }

    pub fn authenticity(&self) -> f64 {
        self.authenticity
    }

    pub fn vital_energy(&self) -> f64 {
        self.vital_energy
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        self.to_array()[dimension.index()]
    }

    /// Copy with one dimension replaced (clamped).
    pub fn with(self, dimension: Dimension, value: f64) -> Self {
        let mut values = self.to_array();
        values[dimension.index()] = saturate(dimension, value);
        Self::from_array(values)
    }

    /// Apply a delta to every dimension from this one snapshot, then clamp.
    pub fn apply(&self, delta: &StateDelta) -> Self {
        let mut values = self.to_array();
        for dimension in Dimension::ALL {
            let i = dimension.index();
            values[i] = saturate(dimension, values[i] + delta.get(dimension));
        }
        Self::from_array(values)
    }

    /// Effective change from `prior` to `self`.
    pub fn delta_from(&self, prior: &StateVector) -> StateDelta {
        let mut delta = StateDelta::default();
        for dimension in Dimension::ALL {
            delta.set(dimension, self.get(dimension) - prior.get(dimension));
        }
        delta
    }

    /// Largest absolute per-dimension difference.
    pub fn distance(&self, other: &StateVector) -> f64 {
        Dimension::ALL
            .into_iter()
            .map(|d| (self.get(d) - other.get(d)).abs())
            .fold(0.0, f64::max)
    }

    /// Critical when competence or vital energy drops below its threshold.
    pub fn is_critical(&self) -> bool {
        self.competence < COMPETENCE_CRITICAL || self.vital_energy < VITAL_ENERGY_CRITICAL
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[C={:.3} K={:.3} W={:.3} A={:.3} V={:.3}]",
            self.competence, self.connection, self.will, self.authenticity, self.vital_energy
        )
    }
}

/// Unvalidated wire form; converted through `StateVector::new`.
#[derive(Deserialize)]
struct RawStateVector {
    competence: f64,
    connection: f64,
    will: f64,
    authenticity: f64,
    vital_energy: f64,
}

impl TryFrom<RawStateVector> for StateVector {
    type Error = RegulationError;

    fn try_from(raw: RawStateVector) -> Result<Self> {
        StateVector::new(
            raw.competence,
            raw.connection,
            raw.will,
            raw.authenticity,
            raw.vital_energy,
        )
    }
}

/// Signed per-dimension change. Unbounded; clamping happens on apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    pub competence: f64,
    pub connection: f64,
    pub will: f64,
    pub authenticity: f64,
    pub vital_energy: f64,
}

impl StateDelta {
    pub fn only(dimension: Dimension, amount: f64) -> Self {
        let mut delta = Self::default();
        delta.set(dimension, amount);
        delta
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Competence => self.competence,
            Dimension::Connection => self.connection,
            Dimension::Will => self.will,
            Dimension::Authenticity => self.authenticity,
            Dimension::VitalEnergy => self.vital_energy,
        }
    }

    pub fn set(&mut self, dimension: Dimension, amount: f64) {
        match dimension {
            Dimension::Competence => self.competence = amount,
            Dimension::Connection => self.connection = amount,
            Dimension::Will => self.will = amount,
            Dimension::Authenticity => self.authenticity = amount,
            Dimension::VitalEnergy => self.vital_energy = amount,
        }
    }
}
