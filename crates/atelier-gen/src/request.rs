//! Generation request types
//!
//! This module defines the request shape handed to a generation source.

use serde::{Deserialize, Serialize};

/// A request for one generation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model to use (provider-specific)
    pub model: String,
    /// System-level instruction (priming context)
    pub system: Option<String>,
    /// User prompt
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    /// Create a new request for a model
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the system instruction
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the user prompt
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = GenerationRequest::new("gpt-4o-mini")
            .with_system("You are a writer")
            .with_prompt("Explain gravity")
            .with_max_tokens(512)
            .with_temperature(0.7);

        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.system.as_deref(), Some("You are a writer"));
        assert_eq!(request.prompt, "Explain gravity");
        assert_eq!(request.max_tokens, Some(512));
    }

    #[test]
    fn test_request_defaults() {
        let request = GenerationRequest::new("test-model");
        assert!(request.system.is_none());
        assert!(request.max_tokens.is_none());
        assert!(request.temperature.is_none());
    }
}
