//! Atelier Gen - Generation Source Abstraction
//!
//! This crate provides the generation-source layer for Atelier:
//! - Source: Provider trait exposing pull-based token and object streams
//! - Request: Generation request builder (model, system prompt, user prompt)
//! - OpenAi: OpenAI-compatible streaming provider over SSE
//! - Script: Deterministic scripted source for tests and offline mode
//! - Partial: Best-effort completion of truncated JSON for object streams
//!
//! A generation source is a lazy, finite, single-pass sequence of
//! increments. Consumers stop pulling to cancel; the source has no
//! other cancellation primitive.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod openai;
pub mod partial;
pub mod request;
pub mod script;
pub mod source;

pub use error::{Error, Result};
pub use openai::{OpenAiCompatConfig, OpenAiCompatSource};
pub use partial::complete_partial_json;
pub use request::GenerationRequest;
pub use script::{ScriptedSource, SourceScript};
pub use source::{GenerationSource, ObjectStream, SharedSource, TextStream};
