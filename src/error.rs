//! Error types for the pipeline.

use thiserror::Error;

use crate::config::TOKEN_URL;

/// Why a single city could not be fetched. Recovered per city by the
/// collector; never aborts a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Timeout, connection failure, or a non-success HTTP status.
    #[error("Network error: {0}")]
    Network(String),

    /// The API answered but reported a failure in its payload.
    #[error("{0}")]
    Api(String),

    /// Anything else, e.g. a body that is not JSON.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not set. Get a token from {url} and export it.", url = TOKEN_URL)]
    MissingToken { var: &'static str },

    #[error("invalid city list: {0}")]
    InvalidCities(String),

    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: &'static str, message: String },
}
