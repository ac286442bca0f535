//! Generation source trait
//!
//! A generation source produces a lazy, finite, single-pass stream of
//! increments: free-form text tokens for unstructured output, or partial
//! object snapshots for structured output. Natural stream exhaustion is
//! the only success-termination signal. Cancellation is cooperative:
//! consumers simply stop pulling.

use crate::error::Result;
use crate::request::GenerationRequest;
use futures::stream::BoxStream;
use std::sync::Arc;

/// A pull-based stream of text tokens
pub type TextStream = BoxStream<'static, Result<String>>;

/// A pull-based stream of partial object snapshots
///
/// Each item is the whole object accumulated so far, never a JSON
/// fragment. Early items may be incomplete objects (missing fields).
pub type ObjectStream = BoxStream<'static, Result<serde_json::Value>>;

/// Trait for generation sources
#[async_trait::async_trait]
pub trait GenerationSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Stream free-form text tokens for a request
    async fn stream_text(&self, request: GenerationRequest) -> Result<TextStream>;

    /// Stream partial object snapshots for a request
    async fn stream_object(&self, request: GenerationRequest) -> Result<ObjectStream>;
}

/// Shared handle to a generation source
///
/// Constructed once at process start and passed by reference; there is
/// no ambient global source.
pub type SharedSource = Arc<dyn GenerationSource>;
