//! Error types for atelier-artifact
//!
//! This module provides error types for the artifact pipeline,
//! including admission, generation, storage, and transport errors.

use crate::document::ArtifactKind;
use thiserror::Error;
use uuid::Uuid;

/// Artifact error type
#[derive(Debug, Error)]
pub enum Error {
    /// Artifact not found
    #[error("artifact not found: {0}")]
    ArtifactNotFound(Uuid),

    /// Version index not found for an artifact
    #[error("version {index} not found for artifact {artifact_id}")]
    VersionNotFound {
        /// Artifact ID
        artifact_id: Uuid,
        /// Requested version index
        index: usize,
    },

    /// A run is already streaming against this artifact
    #[error("run conflict: artifact {0} already has a streaming run")]
    RunConflict(Uuid),

    /// No handler registered for a kind (startup configuration error)
    #[error("no handler registered for kind: {0}")]
    HandlerMissing(ArtifactKind),

    /// Run cancelled by transport closure
    #[error("run cancelled")]
    Cancelled,

    /// Generation source failed mid-stream; carries the partial draft
    #[error("generation failed: {reason}")]
    Generation {
        /// Failure reason
        reason: String,
        /// Draft accumulated before the failure (possibly empty)
        partial: String,
    },

    /// Transport sink closed
    #[error("sink closed")]
    SinkClosed,

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a generation error with a partial draft
    #[must_use]
    pub fn generation(reason: impl Into<String>, partial: impl Into<String>) -> Self {
        Self::Generation {
            reason: reason.into(),
            partial: partial.into(),
        }
    }

    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ArtifactNotFound(_) => "artifact_not_found",
            Self::VersionNotFound { .. } => "version_not_found",
            Self::RunConflict(_) => "run_conflict",
            Self::HandlerMissing(_) => "handler_missing",
            Self::Cancelled => "cancelled",
            Self::Generation { .. } => "generation_failed",
            Self::SinkClosed => "sink_closed",
            Self::Database(_) => "database_error",
            Self::Serialization(_) => "serialization_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for artifact operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = Error::ArtifactNotFound(Uuid::nil());
        assert_eq!(err.code(), "artifact_not_found");

        let err = Error::RunConflict(Uuid::nil());
        assert_eq!(err.code(), "run_conflict");

        let err = Error::Cancelled;
        assert_eq!(err.code(), "cancelled");
    }

    #[test]
    fn test_generation_error_keeps_partial() {
        let err = Error::generation("timeout", "Gravity ");
        match err {
            Error::Generation { partial, .. } => assert_eq!(partial, "Gravity "),
            other => unreachable!("Expected Generation error, got {:?}", other),
        }
    }

    #[test]
    fn test_version_not_found_display() {
        let err = Error::VersionNotFound {
            artifact_id: Uuid::nil(),
            index: 5,
        };
        assert!(err.to_string().contains("version 5"));
    }

    #[test]
    fn test_from_serde_error() {
        let result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        let err: Error = result.unwrap_err().into();
        assert_eq!(err.code(), "serialization_error");
    }
}
