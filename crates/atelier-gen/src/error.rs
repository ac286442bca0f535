//! Error types for atelier-gen

use thiserror::Error;

/// Generation source error type
#[derive(Debug, Error)]
pub enum Error {
    /// Source not configured
    #[error("source not configured: {0}")]
    NotConfigured(String),

    /// API error returned by the provider
    #[error("api error: {0}")]
    Api(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Stream error mid-generation
    #[error("stream error: {0}")]
    Stream(String),

    /// Invalid response payload
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
