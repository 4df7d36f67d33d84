use crate::catalog::{StimulusCatalog, StimulusDefinition, DEFAULT_UNKNOWN_COST};
use crate::dynamics::{DimensionPolicy, RegulationParams};
use crate::state::Dimension;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

/// Policy data for the regulation loop, loaded once at startup.
///
/// ```toml
/// [dynamics]
/// unknown_stimulus_cost = 0.02
///
/// [dynamics.vital_energy]
/// drain_sensitivity = 1.5
/// recovery_sensitivity = 0.5
/// decay_rate = 0.1
///
/// [stimuli.db_error]
/// competence = -0.5
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegulationConfig {
    pub dynamics: DynamicsConfig,
    /// Stimulus id → dimension name → weight. Merged over the built-in table.
    pub stimuli: BTreeMap<String, BTreeMap<String, f64>>,
    /// Start from an empty catalog instead of the built-in one.
    pub replace_builtin_stimuli: bool,
}

impl RegulationConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied and the result validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: RegulationConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Try to load from path; if the file is missing or invalid, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                if let Err(e) = cfg.validate() {
                    tracing::warn!("Ignoring invalid env overrides: {:#}", e);
                    return Self::default();
                }
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SERENITAS_DECAY_RATE") {
            if let Ok(rate) = v.parse::<f64>() {
                for policy in self.dynamics.policies_mut() {
                    policy.decay_rate = Some(rate);
                }
            }
        }
        if let Ok(v) = std::env::var("SERENITAS_UNKNOWN_COST") {
            if let Ok(cost) = v.parse() {
                self.dynamics.unknown_stimulus_cost = cost;
            }
        }
    }

    /// Check every value by building the runtime tables once.
    pub fn validate(&self) -> Result<()> {
        self.params()?;
        self.catalog()?;
        Ok(())
    }

    /// Sensitivity and decay constants, defaults filled in per field.
    pub fn params(&self) -> Result<RegulationParams> {
        let mut params = RegulationParams::default();
        for dimension in Dimension::ALL {
            let overrides = self.dynamics.policy(dimension);
            let base = *params.policy(dimension);
            let policy = DimensionPolicy {
                drain_sensitivity: overrides.drain_sensitivity.unwrap_or(base.drain_sensitivity),
                recovery_sensitivity: overrides
                    .recovery_sensitivity
                    .unwrap_or(base.recovery_sensitivity),
                decay_rate: overrides.decay_rate.unwrap_or(base.decay_rate),
            };
            params = params.with_policy(dimension, policy)?;
        }
        Ok(params)
    }

    /// Stimulus table with configured entries layered over the built-ins.
    pub fn catalog(&self) -> Result<StimulusCatalog> {
        let base = if self.replace_builtin_stimuli {
            StimulusCatalog::empty()
        } else {
            StimulusCatalog::builtin()
        };
        let mut catalog = base.with_unknown_cost(self.dynamics.unknown_stimulus_cost)?;

        for (id, weights) in &self.stimuli {
            let effects = weights
                .iter()
                .map(|(name, w)| name.parse::<Dimension>().map(|d| (d, *w)))
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("Invalid dimension in [stimuli.{}]", id))?;
            let definition = StimulusDefinition::new(id.clone(), effects)
                .with_context(|| format!("Invalid weights in [stimuli.{}]", id))?;
            catalog = catalog.with_definition(definition);
        }
        Ok(catalog)
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    pub unknown_stimulus_cost: f64,
    pub competence: PolicyOverrides,
    pub connection: PolicyOverrides,
    pub will: PolicyOverrides,
    pub authenticity: PolicyOverrides,
    pub vital_energy: PolicyOverrides,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            unknown_stimulus_cost: DEFAULT_UNKNOWN_COST,
            competence: PolicyOverrides::default(),
            connection: PolicyOverrides::default(),
            will: PolicyOverrides::default(),
            authenticity: PolicyOverrides::default(),
            vital_energy: PolicyOverrides::default(),
        }
    }
}

impl DynamicsConfig {
    fn policy(&self, dimension: Dimension) -> &PolicyOverrides {
        match dimension {
            Dimension::Competence => &self.competence,
            Dimension::Connection => &self.connection,
            Dimension::Will => &self.will,
            Dimension::Authenticity => &self.authenticity,
            Dimension::VitalEnergy => &self.vital_energy,
        }
    }

    fn policies_mut(&mut self) -> [&mut PolicyOverrides; 5] {
        [
            &mut self.competence,
            &mut self.connection,
            &mut self.will,
            &mut self.authenticity,
            &mut self.vital_energy,
        ]
    }
}

/// Per-dimension overrides; unset fields keep the built-in policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    pub drain_sensitivity: Option<f64>,
    pub recovery_sensitivity: Option<f64>,
    pub decay_rate: Option<f64>,
}

// ============================================================================
// Tests
// ============================================================================
