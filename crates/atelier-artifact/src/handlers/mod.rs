//! Kind Handlers
//!
//! A handler is the per-document-kind strategy turning a generation
//! request into a sequence of deltas plus a final materialized content
//! string. The handler owns the run's draft accumulator; the caller
//! (the streaming session) owns commit-or-discard.
//!
//! All handlers share the same termination contract: natural source
//! exhaustion is the only success signal, there is no explicit "done"
//! delta. A closed sink means the client went away; handlers stop
//! pulling and surface [`Error::Cancelled`].

use crate::document::{Artifact, ArtifactKind};
use crate::error::{Error, Result};
use crate::sink::DeltaSink;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use atelier_gen::SharedSource;

mod chart;
mod code;
pub(crate) mod prompts;
mod slide;
mod text;

pub use chart::ChartHandler;
pub use code::CodeHandler;
pub use slide::SlideHandler;
pub use text::TextHandler;

/// Per-run generation options threaded through create/update
///
/// The model is an explicit request parameter with a configured
/// default; there is no ambient process-wide model selection.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Model override for this run
    pub model: Option<String>,
}

/// Uniform per-kind generation strategy
#[async_trait::async_trait]
pub trait ArtifactHandler: Send + Sync {
    /// The kind this handler serves
    fn kind(&self) -> ArtifactKind;

    /// Generate a new artifact's content from a title/prompt
    ///
    /// Emits one delta per generation increment to `sink` and returns
    /// the final materialized content. The return value is
    /// authoritative for persistence, even when it differs from the
    /// last forwarded delta.
    async fn on_create(
        &self,
        title: &str,
        options: &RunOptions,
        sink: &dyn DeltaSink,
    ) -> Result<String>;

    /// Regenerate an existing artifact's content from a description
    ///
    /// The generation source is primed with the artifact's latest
    /// content as system-level context; `description` is the new
    /// instruction. Same emission and return contract as `on_create`.
    async fn on_update(
        &self,
        artifact: &Artifact,
        current_content: &str,
        description: &str,
        options: &RunOptions,
        sink: &dyn DeltaSink,
    ) -> Result<String>;
}

/// Maps each document kind to its handler
///
/// Dispatch is a pure lookup. The kind set is closed and known at
/// compile time, so a missing handler is a configuration error caught
/// by [`HandlerRegistry::validate`] at startup, never at request time.
pub struct HandlerRegistry {
    handlers: HashMap<ArtifactKind, Arc<dyn ArtifactHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Build a registry with the default handler for every kind
    #[must_use]
    pub fn for_source(source: SharedSource, default_model: impl Into<String>) -> Self {
        let model = default_model.into();
        let mut registry = Self::new();
        registry.register(Arc::new(TextHandler::new(source.clone(), model.clone())));
        registry.register(Arc::new(CodeHandler::new(source.clone(), model.clone())));
        registry.register(Arc::new(SlideHandler::new(source.clone(), model.clone())));
        registry.register(Arc::new(ChartHandler::new(source, model)));
        registry
    }

    /// Register a handler under its own kind
    pub fn register(&mut self, handler: Arc<dyn ArtifactHandler>) {
        let kind = handler.kind();
        debug!(kind = %kind, "Registering artifact handler");
        self.handlers.insert(kind, handler);
    }

    /// Look up the handler for a kind
    pub fn get(&self, kind: ArtifactKind) -> Result<Arc<dyn ArtifactHandler>> {
        self.handlers
            .get(&kind)
            .cloned()
            .ok_or(Error::HandlerMissing(kind))
    }

    /// Verify every kind has a handler (called once at startup)
    pub fn validate(&self) -> Result<()> {
        for kind in ArtifactKind::ALL {
            if !self.handlers.contains_key(&kind) {
                return Err(Error::HandlerMissing(kind));
            }
        }
        Ok(())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a sink failure to the run-level meaning: a closed sink is
/// cooperative cancellation, anything else propagates.
pub(crate) fn map_send_error(err: Error) -> Error {
    match err {
        Error::SinkClosed => Error::Cancelled,
        other => other,
    }
}
