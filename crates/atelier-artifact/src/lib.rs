//! Atelier Artifact - Streaming Document Generation
//!
//! This crate provides the artifact pipeline for Atelier:
//! - Document: Artifact and version types with a closed kind set
//! - Delta: Typed incremental update protocol, one tag per kind
//! - Sink: Transport seam deltas are forwarded through
//! - Handlers: Per-kind generation strategies and their registry
//! - Session: Streaming run orchestration (admit, stream, commit)
//! - Store: Append-only version history over SQLite
//! - View: Client-side artifact state machine
//! - Error: Error types for artifact operations
//!
//! ## Data flow
//!
//! A create or update request enters the [`session::StreamingSession`],
//! which resolves the kind's handler. The handler drives a generation
//! source and emits one [`delta::Delta`] per increment to the run's
//! sink while accumulating a draft. When the source is exhausted the
//! session commits the handler's returned content as a new immutable
//! version. Cancellation (sink closed) stops the run without a commit.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod delta;
pub mod document;
pub mod error;
pub mod handlers;
pub mod session;
pub mod sink;
pub mod store;
pub mod view;

pub use delta::{ChartSpec, Delta, Slide, SlideDeck, UpdateSemantics};
pub use document::{Artifact, ArtifactKind, ArtifactVersion};
pub use error::{Error, Result};
pub use handlers::{
    ArtifactHandler, ChartHandler, CodeHandler, HandlerRegistry, RunOptions, SlideHandler,
    TextHandler,
};
pub use session::{CommitPolicy, RunReport, RunState, StreamingSession};
pub use sink::{ChannelSink, CollectingSink, DeltaSink};
pub use store::VersionStore;
pub use view::{ArtifactView, ViewStatus};
