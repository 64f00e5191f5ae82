//! PD client errors

use thiserror::Error;

/// Errors produced by PD client providers and clients
#[derive(Debug, Error)]
pub enum PdError {
    /// Provider has no client for the cluster
    #[error("PD client not found for cluster {namespace}/{name}")]
    ClientNotFound { namespace: String, name: String },

    /// The underlying HTTP client could not be built
    #[error("Failed to build PD HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Request did not complete
    #[error("PD request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// PD answered with an error status
    #[error("PD request to {url} returned {status}: {body}")]
    Status { url: String, status: u16, body: String },

    /// Response body was not the expected JSON
    #[error("Failed to decode PD response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Result type alias for PD operations
pub type PdResult<T> = std::result::Result<T, PdError>;
