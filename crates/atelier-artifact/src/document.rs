//! Artifact Document Types
//!
//! This module defines artifacts and their immutable versions. An
//! artifact has a closed kind set; versions are append-only snapshots
//! ordered by a 0-based index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Document kinds, a closed enumeration
///
/// Extending the set means registering a new kind handler; kinds are
/// never discovered at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Free-form prose
    Text,
    /// Source code
    Code,
    /// Slide deck (structured JSON content)
    Slide,
    /// Chart specification (structured JSON content)
    Chart,
}

impl ArtifactKind {
    /// All kinds, in registration order
    pub const ALL: [ArtifactKind; 4] = [Self::Text, Self::Code, Self::Slide, Self::Chart];

    /// Get the kind as a string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Slide => "slide",
            Self::Chart => "chart",
        }
    }

    /// The delta tag carried by this kind's protocol events
    #[must_use]
    pub fn delta_tag(&self) -> &'static str {
        match self {
            Self::Text => "text-delta",
            Self::Code => "code-delta",
            Self::Slide => "slide-delta",
            Self::Chart => "chart-delta",
        }
    }

    /// Whether this kind carries structured (JSON) content
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Slide | Self::Chart)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "code" => Ok(Self::Code),
            "slide" => Ok(Self::Slide),
            "chart" => Ok(Self::Chart),
            other => Err(format!("unknown artifact kind: {other}")),
        }
    }
}

/// A generated, versioned unit of content owned by a user context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique identifier
    pub id: Uuid,

    /// Owning user
    pub user_id: String,

    /// Artifact title (mutable)
    pub title: String,

    /// Document kind (immutable after creation)
    pub kind: ArtifactKind,

    /// When the artifact was created
    pub created_at: DateTime<Utc>,

    /// When the artifact was last modified
    pub updated_at: DateTime<Utc>,
}

impl Artifact {
    /// Create a new artifact
    #[must_use]
    pub fn new(user_id: impl Into<String>, title: impl Into<String>, kind: ArtifactKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: title.into(),
            kind,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create with a specific ID
    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// An immutable snapshot of an artifact's content
///
/// The version index is the snapshot's rank in the artifact's version
/// sequence (0-based, creation order). The highest index is the
/// current version. Versions are never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactVersion {
    /// Owning artifact
    pub artifact_id: Uuid,

    /// 0-based rank in the version sequence
    pub index: usize,

    /// Snapshot content (plain text for text/code, JSON for slide/chart)
    pub content: String,

    /// When the version was committed
    pub created_at: DateTime<Utc>,
}
