//! Stimulus Catalog
//!
//! Maps a stimulus identifier to the signed weights it applies per dimension.
//! Lookup is total: an identifier the catalog does not know resolves to the
//! unclassified definition, which only drains vital energy by a fixed cost.

use crate::error::{RegulationError, Result};
use crate::state::Dimension;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Default reserve cost charged for a stimulus the catalog cannot classify.
pub const DEFAULT_UNKNOWN_COST: f64 = 0.02;

/// How a definition's weights combine with the caller's intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    /// `weight * intensity`
    Intensity,
    /// `weight`, intensity ignored
    Fixed,
}

/// A validated stimulus entry. Built only through `new` or `unclassified`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StimulusDefinition {
    id: String,
    /// Signed weight in [-1, 1] per affected dimension.
    effects: BTreeMap<Dimension, f64>,
    scaling: Scaling,
    /// False for the unclassified fallback.
    known: bool,
}

impl StimulusDefinition {
    /// Build an intensity-scaled definition, validating every weight.
    pub fn new(
        id: impl Into<String>,
        effects: impl IntoIterator<Item = (Dimension, f64)>,
    ) -> Result<Self> {
        let id = id.into();
        let effects: BTreeMap<Dimension, f64> = effects.into_iter().collect();
        for (dimension, weight) in &effects {
            if !weight.is_finite() || !(-1.0..=1.0).contains(weight) {
                return Err(RegulationError::InvalidArgument(format!(
                    "stimulus '{}': weight for {} must be in [-1, 1], got {}",
                    id, dimension, weight
                )));
            }
        }
        Ok(Self {
            id,
            effects,
            scaling: Scaling::Intensity,
            known: true,
        })
    }

    /// The fallback for identifiers the catalog does not recognise.
    ///
    /// `cost` is clamped to [0, 1]; a non-finite cost charges nothing.
    pub fn unclassified(id: impl Into<String>, cost: f64) -> Self {
        let cost = if cost.is_finite() { cost.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            id: id.into(),
            effects: BTreeMap::from([(Dimension::VitalEnergy, -cost)]),
            scaling: Scaling::Fixed,
            known: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn into_id(self) -> String {
        self.id
    }

    pub fn effects(&self) -> &BTreeMap<Dimension, f64> {
        &self.effects
    }

    pub fn scaling(&self) -> Scaling {
        self.scaling
    }

    pub fn is_known(&self) -> bool {
        self.known
    }

    /// Weight for one dimension (0.0 when unaffected).
    pub fn weight(&self, dimension: Dimension) -> f64 {
        self.effects.get(&dimension).copied().unwrap_or(0.0)
    }
}

/// Read-only table of stimulus definitions, populated once at startup.
#[derive(Debug, Clone)]
pub struct StimulusCatalog {
    definitions: HashMap<String, StimulusDefinition>,
    unknown_cost: f64,
}

impl Default for StimulusCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StimulusCatalog {
    /// An empty catalog: everything resolves to the unclassified fallback.
    pub fn empty() -> Self {
        Self {
            definitions: HashMap::new(),
            unknown_cost: DEFAULT_UNKNOWN_COST,
        }
    }

    /// Built-in table covering the runtime events the agent reports.
    pub fn builtin() -> Self {
        use Dimension::*;
        let table: [(&str, &[(Dimension, f64)]); 11] = [
            ("db_error", &[(Competence, -0.5)]),
            ("internal_error", &[(Competence, -0.3), (VitalEnergy, -0.1)]),
            ("task_success", &[(Competence, 0.3), (Will, 0.2)]),
            ("task_failure", &[(Competence, -0.3), (Will, -0.1)]),
            ("user_praise", &[(Connection, 0.4), (Competence, 0.1)]),
            ("user_criticism", &[(Connection, -0.3), (Competence, -0.2)]),
            ("goal_progress", &[(Will, 0.3)]),
            ("goal_blocked", &[(Will, -0.3), (VitalEnergy, -0.05)]),
            ("narrative_contradiction", &[(Authenticity, -0.5)]),
            ("loop_detected", &[(VitalEnergy, -0.6), (Will, -0.1)]),
            ("rest", &[(VitalEnergy, 0.5)]),
        ];

        let definitions = table
            .iter()
            .map(|(id, effects)| {
                let def = StimulusDefinition {
                    id: (*id).to_string(),
                    effects: effects.iter().copied().collect(),
                    scaling: Scaling::Intensity,
                    known: true,
                };
                ((*id).to_string(), def)
            })
            .collect();

        Self {
            definitions,
            unknown_cost: DEFAULT_UNKNOWN_COST,
        }
    }

    /// Add or replace a definition (builder style, used by loaders).
    pub fn with_definition(mut self, definition: StimulusDefinition) -> Self {
        self.definitions.insert(definition.id().to_string(), definition);
        self
    }

    /// Set the reserve cost of unclassified stimuli.
    pub fn with_unknown_cost(mut self, cost: f64) -> Result<Self> {
        if !cost.is_finite() || !(0.0..=1.0).contains(&cost) {
            return Err(RegulationError::InvalidArgument(format!(
                "unknown stimulus cost must be in [0, 1], got {}",
                cost
            )));
        }
        self.unknown_cost = cost;
        Ok(self)
    }

    pub fn unknown_cost(&self) -> f64 {
        self.unknown_cost
    }

    /// Total lookup; never fails.
    pub fn resolve(&self, stimulus_id: &str) -> StimulusDefinition {
        match self.definitions.get(stimulus_id) {
            Some(def) => def.clone(),
            None => {
                tracing::warn!("Unclassified stimulus '{}', charging reserve cost", stimulus_id);
                StimulusDefinition::unclassified(stimulus_id, self.unknown_cost)
            }
        }
    }

    pub fn contains(&self, stimulus_id: &str) -> bool {
        self.definitions.contains_key(stimulus_id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Known identifiers, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
