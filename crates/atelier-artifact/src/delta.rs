//! Delta Protocol
//!
//! Every generation event is a discriminated union tagged by a type
//! string unique per document kind. Delta content is always a
//! stringified fragment of the evolving artifact: pure-append for text,
//! full-replacement snapshots for code, slide, and chart. Structured
//! kinds (slide, chart) always carry a complete JSON object, never a
//! partial fragment.
//!
//! Consumers treat malformed structured payloads as a no-op: generation
//! streams are adversarial and a model may emit invalid JSON mid-run.
//! An invalid delta is logged and dropped, leaving prior state intact.
//! The empty initial object (`{}`) is not considered valid content; a
//! structured snapshot counts only once it carries at least one of the
//! kind's recognized top-level fields.

use crate::document::ArtifactKind;
use serde::{Deserialize, Serialize};

/// One incremental update unit in the generation stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "kebab-case")]
pub enum Delta {
    /// Incremental substring of a text artifact (append)
    TextDelta(String),
    /// Full snapshot of a code artifact (replace)
    CodeDelta(String),
    /// Full JSON snapshot of a slide deck (replace)
    SlideDelta(String),
    /// Full JSON snapshot of a chart spec (replace)
    ChartDelta(String),
}

impl Delta {
    /// Build the delta variant matching a kind
    #[must_use]
    pub fn for_kind(kind: ArtifactKind, content: impl Into<String>) -> Self {
        let content = content.into();
        match kind {
            ArtifactKind::Text => Self::TextDelta(content),
            ArtifactKind::Code => Self::CodeDelta(content),
            ArtifactKind::Slide => Self::SlideDelta(content),
            ArtifactKind::Chart => Self::ChartDelta(content),
        }
    }

    /// The document kind this delta targets
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::TextDelta(_) => ArtifactKind::Text,
            Self::CodeDelta(_) => ArtifactKind::Code,
            Self::SlideDelta(_) => ArtifactKind::Slide,
            Self::ChartDelta(_) => ArtifactKind::Chart,
        }
    }

    /// The delta's content payload
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::TextDelta(content)
            | Self::CodeDelta(content)
            | Self::SlideDelta(content)
            | Self::ChartDelta(content) => content,
        }
    }

    /// How this delta is applied to accumulated content
    #[must_use]
    pub fn semantics(&self) -> UpdateSemantics {
        UpdateSemantics::for_kind(self.kind())
    }
}

/// How deltas of a kind combine with prior content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSemantics {
    /// Concatenate each delta onto the accumulated content
    Append,
    /// Each delta supersedes the accumulated content entirely
    Replace,
}

impl UpdateSemantics {
    /// The update policy for a kind
    ///
    /// Structured kinds cannot be concatenated as partial JSON, so they
    /// re-serialize the whole object on every delta. Code handlers emit
    /// full snapshots too; only free text appends token-by-token.
    #[must_use]
    pub fn for_kind(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Text => Self::Append,
            ArtifactKind::Code | ArtifactKind::Slide | ArtifactKind::Chart => Self::Replace,
        }
    }
}

/// Structured payload of a slide artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideDeck {
    /// Deck title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Ordered slides
    #[serde(default)]
    pub slides: Vec<Slide>,
}

/// One slide in a deck
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// Slide title
    #[serde(default)]
    pub title: String,
    /// Bullet lines
    #[serde(default)]
    pub content: Vec<String>,
}

impl SlideDeck {
    /// Whether the deck has acquired any recognized field
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.title.is_some() || !self.slides.is_empty()
    }
}

/// Structured payload of a chart artifact
///
/// Charts are produced by an external tool call, so no schema-level
/// guarantee exists; parsing is strictly best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Chart type (line, bar, pie, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    /// Chart title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Chart data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ChartSpec {
    /// Whether the spec has acquired any recognized field
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.chart_type.is_some() || self.title.is_some() || self.data.is_some()
    }
}

/// Validate a delta payload before applying it to view state
///
/// Unstructured kinds are always valid. Structured kinds must parse as
/// JSON and carry at least one recognized top-level field.
#[must_use]
pub fn validate_payload(kind: ArtifactKind, content: &str) -> bool {
    match kind {
        ArtifactKind::Text | ArtifactKind::Code => true,
        ArtifactKind::Slide => serde_json::from_str::<SlideDeck>(content)
            .map(|deck| deck.has_content())
            .unwrap_or(false),
        ArtifactKind::Chart => serde_json::from_str::<ChartSpec>(content)
            .map(|spec| spec.has_content())
            .unwrap_or(false),
    }
}
