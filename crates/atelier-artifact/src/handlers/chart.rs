//! Chart artifact handler
//!
//! Charts follow the slide handler's structured-object pattern, but in
//! deployment they are usually fed by an external tool call that writes
//! `chart-delta` events straight to the transport. This handler covers
//! the direct create/update path; consumers must still parse chart
//! payloads defensively since no schema-level guarantee exists.

use crate::delta::{ChartSpec, Delta};
use crate::document::{Artifact, ArtifactKind};
use crate::error::{Error, Result};
use crate::handlers::{map_send_error, prompts, ArtifactHandler, RunOptions};
use crate::sink::DeltaSink;
use futures::StreamExt;
use tracing::debug;

use atelier_gen::{GenerationRequest, SharedSource};

/// Handler for `chart` artifacts
pub struct ChartHandler {
    source: SharedSource,
    default_model: String,
}

impl ChartHandler {
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
            .stream_object(request)
            .await
            .map_err(|err| Error::generation(err.to_string(), ""))?;

        let mut draft = String::new();
        loop {
            if sink.is_closed() {
                return Err(Error::Cancelled);
            }
            match stream.next().await {
                Some(Ok(object)) => {
                    let Ok(spec) = serde_json::from_value::<ChartSpec>(object) else {
                        continue;
                    };
                    if !spec.has_content() {
                        continue;
                    }
                    draft = serde_json::to_string(&spec)?;
                    sink.send(Delta::ChartDelta(draft.clone()))
                        .await
                        .map_err(map_send_error)?;
                }
                Some(Err(err)) => {
                    return Err(Error::generation(err.to_string(), draft));
                }
                None => break,
            }
        }

        debug!(chars = draft.len(), "Chart generation complete");
        Ok(draft)
    }
}

#[async_trait::async_trait]
impl ArtifactHandler for ChartHandler {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Chart
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
