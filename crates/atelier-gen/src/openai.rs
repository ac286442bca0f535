//! OpenAI-compatible streaming source
//!
//! Speaks the chat-completions SSE protocol shared by OpenAI-style
//! endpoints. Text generation streams content tokens; object generation
//! layers partial-JSON completion on top of the token stream so each
//! emitted snapshot is a whole object.

use crate::error::{Error, Result};
use crate::partial::complete_partial_json;
use crate::request::GenerationRequest;
use crate::source::{GenerationSource, ObjectStream, TextStream};
use futures::StreamExt;
use serde::Deserialize;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Configuration for an OpenAI-compatible source
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    /// Base URL (e.g. `https://api.openai.com/v1`)
    pub base_url: String,
    /// API key
    pub api_key: String,
    /// Default model
    pub default_model: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for OpenAiCompatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            default_model: "gpt-4o-mini".to_string(),
            timeout_ms: 120_000,
        }
    }
}

/// OpenAI-compatible generation source
pub struct OpenAiCompatSource {
    client: reqwest::Client,
    config: OpenAiCompatConfig,
}

impl OpenAiCompatSource {
    /// Create a new source from configuration
    pub fn new(config: OpenAiCompatConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::NotConfigured("openai api key missing".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }

    fn build_body(&self, request: &GenerationRequest, json_mode: bool) -> serde_json::Value {
        let model = if request.model.is_empty() {
            self.config.default_model.clone()
        } else {
            request.model.clone()
        };

        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": request.prompt}));

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": true,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if json_mode {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }
        body
    }

    async fn open_stream(&self, request: &GenerationRequest, json_mode: bool) -> Result<TextStream> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = self.build_body(request, json_mode);

        debug!(model = %body["model"], json_mode, "Opening generation stream");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("status {status}: {text}")));
        }

        let bytes = response
            .bytes_stream()
            .map(|res| {
                res.map(|chunk| chunk.to_vec())
                    .map_err(|err| Error::Stream(err.to_string()))
            })
            .boxed();

        let state = SseState {
            inner: bytes,
            buffer: String::new(),
            pending: VecDeque::new(),
            done: false,
        };

        let stream = futures::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, state));
                }
                if state.done {
                    return None;
                }
                match state.inner.next().await {
                    Some(Ok(bytes)) => {
                        state.buffer.push_str(&String::from_utf8_lossy(&bytes));
                        drain_sse_lines(&mut state);
                    }
                    Some(Err(err)) => {
                        state.done = true;
                        state.pending.push_back(Err(err));
                    }
                    None => {
                        state.done = true;
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}

struct SseState {
    inner: futures::stream::BoxStream<'static, Result<Vec<u8>>>,
    buffer: String,
    pending: VecDeque<Result<String>>,
    done: bool,
}

/// Extract complete SSE lines from the buffer into pending tokens
fn drain_sse_lines(state: &mut SseState) {
    while let Some(pos) = state.buffer.find('\n') {
        let line = state.buffer[..pos].trim().to_string();
        state.buffer.drain(..=pos);

        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data == "[DONE]" {
            state.done = true;
            return;
        }
        match serde_json::from_str::<StreamChunk>(data) {
            Ok(chunk) => {
                if let Some(content) = chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta.content)
                {
                    if !content.is_empty() {
                        state.pending.push_back(Ok(content));
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "Skipping malformed SSE chunk");
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[async_trait::async_trait]
impl GenerationSource for OpenAiCompatSource {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn stream_text(&self, request: GenerationRequest) -> Result<TextStream> {
        self.open_stream(&request, false).await
    }

    async fn stream_object(&self, request: GenerationRequest) -> Result<ObjectStream> {
        let tokens = self.open_stream(&request, true).await?;

        // Accumulate the raw token prefix and surface a snapshot whenever
        // the prefix completes into a new whole object.
        let state = (tokens, String::new(), None::<serde_json::Value>);
        let stream = futures::stream::unfold(state, |(mut tokens, mut buf, mut last)| async move {
            loop {
                match tokens.next().await {
                    Some(Ok(token)) => {
                        buf.push_str(&token);
                        if let Some(value) = complete_partial_json(&buf) {
                            if last.as_ref() != Some(&value) {
                                last = Some(value.clone());
                                return Some((Ok(value), (tokens, buf, last)));
                            }
                        }
                    }
                    Some(Err(err)) => return Some((Err(err), (tokens, buf, last))),
                    None => return None,
                }
            }
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_body_includes_system_and_json_mode() {
        let source = OpenAiCompatSource::new(OpenAiCompatConfig {
            api_key: "test-key".to_string(),
            ..Default::default()
        })
        .unwrap();

        let request = GenerationRequest::new("gpt-4o-mini")
            .with_system("You are a writer")
            .with_prompt("Write a haiku")
            .with_max_tokens(64);

        let body = source.build_body(&request, true);
        assert_eq!(body["stream"], serde_json::json!(true));
        assert_eq!(body["max_tokens"], serde_json::json!(64));
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Write a haiku");
    }

    #[test]
    fn test_build_body_falls_back_to_default_model() {
        let source = OpenAiCompatSource::new(OpenAiCompatConfig {
            api_key: "test-key".to_string(),
            default_model: "local-model".to_string(),
            ..Default::default()
        })
        .unwrap();

        let request = GenerationRequest::default().with_prompt("hello");
        let body = source.build_body(&request, false);
        assert_eq!(body["model"], "local-model");
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = OpenAiCompatSource::new(OpenAiCompatConfig::default());
        assert!(matches!(result, Err(Error::NotConfigured(_))));
    }

    #[test]
    fn test_drain_sse_lines_parses_tokens() {
        let mut state = SseState {
            inner: futures::stream::empty().boxed(),
            buffer: String::new(),
            pending: VecDeque::new(),
            done: false,
        };
        state.buffer.push_str(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
             data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\
             data: not json\n\
             data: [DONE]\n",
        );
        drain_sse_lines(&mut state);

        let tokens: Vec<_> = state.pending.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(tokens, vec!["Hel", "lo"]);
        assert!(state.done);
    }
}
