//! Text artifact handler
//!
//! Streams free-form tokens from the source, appends each to the
//! running draft, and forwards it verbatim as an append-semantics
//! delta.

use crate::delta::Delta;
use crate::document::{Artifact, ArtifactKind};
use crate::error::{Error, Result};
use crate::handlers::{map_send_error, prompts, ArtifactHandler, RunOptions};
use crate::sink::DeltaSink;
use futures::StreamExt;
use tracing::debug;

use atelier_gen::{GenerationRequest, SharedSource};

/// Handler for `text` artifacts
pub struct TextHandler {
    source: SharedSource,
    default_model: String,
}

impl TextHandler {
    /// Create a handler over a generation source
    #[must_use]
    pub fn new(source: SharedSource, default_model: String) -> Self {
        Self {
            source,
            default_model,
        }
    }

    async fn run(&self, request: GenerationRequest, sink: &dyn DeltaSink) -> Result<String> {
        let mut stream = self
            .source
            .stream_text(request)
            .await
            .map_err(|err| Error::generation(err.to_string(), ""))?;

        let mut draft = String::new();
        loop {
            if sink.is_closed() {
                return Err(Error::Cancelled);
            }
            match stream.next().await {
                Some(Ok(token)) => {
                    draft.push_str(&token);
                    sink.send(Delta::TextDelta(token))
                        .await
                        .map_err(map_send_error)?;
                }
                Some(Err(err)) => {
                    return Err(Error::generation(err.to_string(), draft));
                }
                None => break,
            }
        }

        debug!(chars = draft.len(), "Text generation complete");
        Ok(draft)
    }
}

#[async_trait::async_trait]
impl ArtifactHandler for TextHandler {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Text
    }

    async fn on_create(
        &self,
        title: &str,
        options: &RunOptions,
        sink: &dyn DeltaSink,
    ) -> Result<String> {
        let model = options.model.clone().unwrap_or_else(|| self.default_model.clone());
        let request = GenerationRequest::new(model)
            .with_system(prompts::create_system(self.kind()))
            .with_prompt(title);
        self.run(request, sink).await
    }

    async fn on_update(
        &self,
        _artifact: &Artifact,
        current_content: &str,
        description: &str,
        options: &RunOptions,
        sink: &dyn DeltaSink,
    ) -> Result<String> {
        let model = options.model.clone().unwrap_or_else(|| self.default_model.clone());
        let request = GenerationRequest::new(model)
            .with_system(prompts::update_system(self.kind(), current_content))
            .with_prompt(description);
        self.run(request, sink).await
    }
}
