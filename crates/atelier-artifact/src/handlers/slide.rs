//! Slide artifact handler
//!
//! Drives object generation against the slide-deck schema. Each partial
//! object that has acquired a title or slides is serialized whole and
//! emitted as a full-replacement delta. On stream end the handler emits
//! one final delta even if the content is unchanged, so the sink always
//! receives a terminal snapshot (idempotent flush).

use crate::delta::{Delta, SlideDeck};
use crate::document::{Artifact, ArtifactKind};
use crate::error::{Error, Result};
use crate::handlers::{map_send_error, prompts, ArtifactHandler, RunOptions};
use crate::sink::DeltaSink;
use futures::StreamExt;
use tracing::debug;

use atelier_gen::{GenerationRequest, SharedSource};

/// Handler for `slide` artifacts
pub struct SlideHandler {
    source: SharedSource,
    default_model: String,
}

impl SlideHandler {
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

        let mut deck = SlideDeck::default();
        let mut draft = String::new();
        loop {
            if sink.is_closed() {
                return Err(Error::Cancelled);
            }
            match stream.next().await {
                Some(Ok(object)) => {
                    let Ok(snapshot) = serde_json::from_value::<SlideDeck>(object) else {
                        continue;
                    };
                    if !snapshot.has_content() {
                        continue;
                    }
                    deck = snapshot;
                    draft = serde_json::to_string(&deck)?;
                    sink.send(Delta::SlideDelta(draft.clone()))
                        .await
                        .map_err(map_send_error)?;
                }
                Some(Err(err)) => {
                    return Err(Error::generation(err.to_string(), draft));
                }
                None => break,
            }
        }

        // Terminal flush: the sink always sees the final deck state.
        draft = serde_json::to_string(&deck)?;
        sink.send(Delta::SlideDelta(draft.clone()))
            .await
            .map_err(map_send_error)?;

        debug!(slides = deck.slides.len(), "Slide generation complete");
        Ok(draft)
    }
}

#[async_trait::async_trait]
impl ArtifactHandler for SlideHandler {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Slide
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::validate_payload;
    use crate::sink::CollectingSink;
    use atelier_gen::{ScriptedSource, SourceScript};
    use serde_json::json;
    use std::sync::Arc;

    fn handler(objects: Vec<serde_json::Value>) -> SlideHandler {
        SlideHandler::new(
            Arc::new(ScriptedSource::new(SourceScript::objects(objects))),
            "test-model".to_string(),
        )
    }

    #[tokio::test]
    async fn test_emits_whole_json_snapshots_plus_flush() {
        let handler = handler(vec![
            json!({"title": "T"}),
            json!({"title": "T", "slides": [{"title": "S1", "content": ["a"]}]}),
        ]);
        let sink = CollectingSink::new();

        let content = handler
            .on_create("Intro to gravity", &RunOptions::default(), &sink)
            .await
            .unwrap();

        let deltas = sink.collected();
        // Two snapshots plus the terminal flush.
        assert_eq!(deltas.len(), 3);
        for delta in &deltas {
            let parsed: serde_json::Value = serde_json::from_str(delta.content()).unwrap();
            assert!(parsed.is_object());
        }
        // The committed content equals the last snapshot exactly.
        assert_eq!(content, deltas[1].content());
        assert_eq!(content, deltas[2].content());

        let deck: SlideDeck = serde_json::from_str(&content).unwrap();
        assert_eq!(deck.slides.len(), 1);
        assert_eq!(deck.slides[0].content, vec!["a"]);
    }

    #[tokio::test]
    async fn test_empty_initial_object_not_forwarded() {
        let handler = handler(vec![json!({}), json!({"title": "T"})]);
        let sink = CollectingSink::new();

        handler
            .on_create("deck", &RunOptions::default(), &sink)
            .await
            .unwrap();

        let deltas = sink.collected();
        // Empty object skipped; one real snapshot plus the flush.
        assert_eq!(deltas.len(), 2);
        assert!(validate_payload(ArtifactKind::Slide, deltas[0].content()));
    }

    #[tokio::test]
    async fn test_flush_emitted_even_without_snapshots() {
        let handler = handler(vec![]);
        let sink = CollectingSink::new();

        handler
            .on_create("deck", &RunOptions::default(), &sink)
            .await
            .unwrap();

        // The terminal flush still arrives; consumers drop it as
        // contentless via payload validation.
        assert_eq!(sink.collected().len(), 1);
    }
}
