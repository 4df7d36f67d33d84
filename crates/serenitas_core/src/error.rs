use crate::state::Dimension;
use thiserror::Error;

/// Errors surfaced synchronously by the regulation core.
///
/// Every variant is raised before any state is touched, so a caller that
/// receives one can rely on the live vector being unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegulationError {
    /// Non-finite intensity, negative penalty, malformed policy value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A dimension value outside the closed unit interval.
    #[error("{dimension} out of range [0, 1]: {value}")]
    OutOfRange { dimension: Dimension, value: f64 },

    /// A dimension name that does not match any of the five dimensions.
    #[error("unknown dimension: {0}")]
    UnknownDimension(String),

    /// History replay produced a different vector than the one recorded.
    #[error("replay diverged from recorded history at sequence {sequence}")]
    ReplayDivergence { sequence: u64 },
}

pub type Result<T> = std::result::Result<T, RegulationError>;
