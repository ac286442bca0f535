//! Scripted generation source
//!
//! Replays a canned sequence of increments. Used by tests that need
//! deterministic streams and by the `scripted` provider mode, which lets
//! the server run without network access.

use crate::error::{Error, Result};
use crate::request::GenerationRequest;
use crate::source::{GenerationSource, ObjectStream, TextStream};
use futures::StreamExt;

/// The canned increments a [`ScriptedSource`] replays
#[derive(Debug, Clone, Default)]
pub struct SourceScript {
    /// Text tokens yielded by `stream_text`
    pub tokens: Vec<String>,
    /// Object snapshots yielded by `stream_object`
    pub objects: Vec<serde_json::Value>,
}

impl SourceScript {
    /// Script a text-token stream
    #[must_use]
    pub fn tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            objects: Vec::new(),
        }
    }

    /// Script an object-snapshot stream
    #[must_use]
    pub fn objects(objects: Vec<serde_json::Value>) -> Self {
        Self {
            tokens: Vec::new(),
            objects,
        }
    }
}

/// Deterministic source replaying a [`SourceScript`]
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    script: SourceScript,
    fail_after: Option<usize>,
}

impl ScriptedSource {
    /// Create a source replaying the given script
    #[must_use]
    pub fn new(script: SourceScript) -> Self {
        Self {
            script,
            fail_after: None,
        }
    }

    /// Inject a stream error after `n` increments have been yielded
    #[must_use]
    pub fn with_failure_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    fn replay<T: Send + 'static>(&self, items: Vec<T>) -> futures::stream::BoxStream<'static, Result<T>> {
        let mut out: Vec<Result<T>> = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            if Some(index) == self.fail_after {
                out.push(Err(Error::Stream("scripted failure".to_string())));
                break;
            }
            out.push(Ok(item));
        }
        if out.len() == self.fail_after.unwrap_or(usize::MAX) {
            // Failure point at the very end of the script.
            out.push(Err(Error::Stream("scripted failure".to_string())));
        }
        futures::stream::iter(out).boxed()
    }
}

#[async_trait::async_trait]
impl GenerationSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    async fn stream_text(&self, _request: GenerationRequest) -> Result<TextStream> {
        Ok(self.replay(self.script.tokens.clone()))
    }

    async fn stream_object(&self, _request: GenerationRequest) -> Result<ObjectStream> {
        Ok(self.replay(self.script.objects.clone()))
    }
}
