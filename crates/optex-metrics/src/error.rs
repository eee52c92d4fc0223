//! Error types for metric registration, series access, and updates.

use optex_state::StateError;
use thiserror::Error;

/// Result type alias for metrics operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    #[error("attempt to access unregistered metric `{0}`")]
    UnregisteredMetric(String),

    #[error("invalid label name `{0}`")]
    InvalidLabel(String),

    #[error("invalid value `{value}` for metric `{metric}`")]
    InvalidValue { metric: String, value: String },

    #[error("cannot update metric `{0}`: its data comes from a callback")]
    DataCallbackConflict(String),

    #[error("no series `{metric}{{{labels}}}` has been stored")]
    NoSuchSeries { metric: String, labels: String },

    #[error("storage error: {0}")]
    Storage(#[from] StateError),
}
