//! Controller error types
//!
//! Individual probe failures never show up here; they are folded into the
//! health report as `false`.

use thiserror::Error;

/// Errors returned by member health reporters
#[derive(Debug, Error)]
pub enum ControlError {
    /// Cluster descriptor failed validation; no probes were issued
    #[error("Invalid cluster: {0}")]
    InvalidCluster(String),

    /// The shared HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl From<tidbctl_common::Error> for ControlError {
    fn from(err: tidbctl_common::Error) -> Self {
        match err {
            tidbctl_common::Error::Validation(msg) => ControlError::InvalidCluster(msg),
        }
    }
}

/// Result type alias for health reporting
pub type ControlResult<T> = std::result::Result<T, ControlError>;
