//! Code artifact handler
//!
//! Drives object generation against a `{"code": "..."}` schema. Each
//! partial object yields the current value of the `code` field as a
//! full-replacement delta; the draft is always the latest snapshot.

use crate::delta::Delta;
use crate::document::{Artifact, ArtifactKind};
use crate::error::{Error, Result};
use crate::handlers::{map_send_error, prompts, ArtifactHandler, RunOptions};
use crate::sink::DeltaSink;
use futures::StreamExt;
use tracing::debug;

use atelier_gen::{GenerationRequest, SharedSource};

/// Handler for `code` artifacts
pub struct CodeHandler {
    source: SharedSource,
    default_model: String,
}

impl CodeHandler {
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
                    let Some(code) = object.get("code").and_then(|v| v.as_str()) else {
                        continue;
                    };
                    if code == draft {
                        continue;
                    }
                    draft = code.to_string();
                    sink.send(Delta::CodeDelta(draft.clone()))
                        .await
                        .map_err(map_send_error)?;
                }
                Some(Err(err)) => {
                    return Err(Error::generation(err.to_string(), draft));
                }
                None => break,
            }
        }

        debug!(chars = draft.len(), "Code generation complete");
        Ok(draft)
    }
}

#[async_trait::async_trait]
impl ArtifactHandler for CodeHandler {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Code
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
    use crate::sink::CollectingSink;
    use atelier_gen::{ScriptedSource, SourceScript};
    use serde_json::json;
    use std::sync::Arc;

    fn handler(objects: Vec<serde_json::Value>) -> CodeHandler {
        CodeHandler::new(
            Arc::new(ScriptedSource::new(SourceScript::objects(objects))),
            "test-model".to_string(),
        )
    }

    #[tokio::test]
    async fn test_emits_full_replacement_snapshots() {
        let handler = handler(vec![
            json!({"code": "fn main()"}),
            json!({"code": "fn main() {}"}),
        ]);
        let sink = CollectingSink::new();

        let content = handler
            .on_create("fizzbuzz", &RunOptions::default(), &sink)
            .await
            .unwrap();

        assert_eq!(content, "fn main() {}");
        let deltas = sink.collected();
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].content(), "fn main()");
        assert_eq!(deltas[1].content(), "fn main() {}");
    }

    #[tokio::test]
    async fn test_skips_snapshots_without_code_field() {
        let handler = handler(vec![
            json!({}),
            json!({"language": "rust"}),
            json!({"code": "print(1)"}),
        ]);
        let sink = CollectingSink::new();

        let content = handler
            .on_create("script", &RunOptions::default(), &sink)
            .await
            .unwrap();

        assert_eq!(content, "print(1)");
        assert_eq!(sink.collected().len(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_snapshot_not_reemitted() {
        let handler = handler(vec![
            json!({"code": "x = 1"}),
            json!({"code": "x = 1"}),
        ]);
        let sink = CollectingSink::new();

        handler
            .on_create("assignment", &RunOptions::default(), &sink)
            .await
            .unwrap();

        assert_eq!(sink.collected().len(), 1);
    }
}
