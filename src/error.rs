use thiserror::Error;

/// Errors produced by the gesture engine. Steady-state operation over valid
/// poses never errors; these cover boundary contract violations and bad
/// configuration, which must fail fast rather than corrupt slot state.
#[derive(Error, Debug)]
pub enum GestureError {
    #[error("invalid keypoint count: expected {expected}, got {actual}")]
    InvalidKeypointCount { expected: usize, actual: usize },

    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error in config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, GestureError>;
