//! # Serenitas Core
//!
//! Value types and policy for the agent's homeostatic regulation loop:
//!
//! - [`StateVector`]: five bounded dimensions plus the derived critical predicate
//! - [`StimulusCatalog`]: stimulus id → per-dimension weights, total lookup
//! - [`RegulationParams`]: drain/recovery sensitivity and decay constants
//! - [`RegulationConfig`]: TOML loader for the two tables above
//!
//! Nothing here holds mutable shared state; see `serenitas_limbic` for the
//! engine that serializes mutations and keeps the audit history.

pub mod catalog;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod state;

pub use catalog::{Scaling, StimulusCatalog, StimulusDefinition, DEFAULT_UNKNOWN_COST};
pub use config::RegulationConfig;
pub use dynamics::{DimensionPolicy, RegulationParams};
pub use error::RegulationError;
pub use state::{
    Dimension, StateDelta, StateVector, COMPETENCE_CRITICAL, VITAL_ENERGY_CRITICAL,
};
