//! Client Artifact State Machine
//!
//! Client-owned, transient view state for one artifact. Created on the
//! first delta for a new artifact id, updated on every forwarded delta,
//! and torn down when the user navigates away. The view replays deltas
//! independently of final persistence, so it may run ahead of the
//! committed history until a run settles.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::delta::{validate_payload, Delta, UpdateSemantics};
use crate::document::ArtifactKind;

/// View lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    /// Not yet shown; no delta received
    Hidden,
    /// Deltas are arriving
    Streaming,
    /// Stream ended; viewable and editable
    Idle,
}

/// Transient client-side state for one artifact
#[derive(Debug)]
pub struct ArtifactView {
    /// Artifact this view tracks
    pub artifact_id: Uuid,
    /// Kind, fixed at view creation
    pub kind: ArtifactKind,
    /// Content as replayed from deltas (or fetched per version)
    pub content: String,
    /// Whether the artifact panel is shown
    pub is_visible: bool,
    /// Lifecycle status
    pub status: ViewStatus,
    /// Version index currently displayed
    pub current_version_index: usize,
    /// Highest committed version index known to the client
    pub latest_index: usize,
    pending_edit: Option<PendingEdit>,
}

#[derive(Debug)]
struct PendingEdit {
    content: String,
    edited_at: DateTime<Utc>,
}

impl ArtifactView {
    /// Create a hidden view for an artifact
    #[must_use]
    pub fn new(artifact_id: Uuid, kind: ArtifactKind) -> Self {
        Self {
            artifact_id,
            kind,
            content: String::new(),
            is_visible: false,
            status: ViewStatus::Hidden,
            current_version_index: 0,
            latest_index: 0,
            pending_edit: None,
        }
    }

    /// Whether the displayed version is the current (highest) one
    #[must_use]
    pub fn is_current_version(&self) -> bool {
        self.current_version_index == self.latest_index
    }

    /// Apply one forwarded delta
    ///
    /// A matching delta moves the view to `Streaming` and makes it
    /// visible. Malformed structured payloads and kind mismatches are
    /// logged and dropped; prior content stays intact and this never
    /// panics. Returns whether the delta was applied.
    pub fn apply_delta(&mut self, delta: &Delta) -> bool {
        if delta.kind() != self.kind {
            warn!(
                artifact_id = %self.artifact_id,
                expected = %self.kind,
                got = %delta.kind(),
                "Dropping delta for wrong kind"
            );
            return false;
        }
        if !validate_payload(self.kind, delta.content()) {
            warn!(artifact_id = %self.artifact_id, "Dropping malformed delta payload");
            return false;
        }

        self.is_visible = true;
        self.status = ViewStatus::Streaming;
        match delta.semantics() {
            UpdateSemantics::Append => self.content.push_str(delta.content()),
            UpdateSemantics::Replace => self.content = delta.content().to_string(),
        }
        true
    }

    /// Observe the transport closing: stream end moves to `Idle`
    pub fn finish_stream(&mut self) {
        if self.status == ViewStatus::Streaming {
            self.status = ViewStatus::Idle;
        }
    }

    /// Learn the committed latest index after a run settles; the view
    /// snaps to the current version
    pub fn sync_latest(&mut self, latest_index: usize) {
        self.latest_index = latest_index;
        self.current_version_index = latest_index;
    }

    /// Whether `prev` navigation is allowed (Idle, not at index 0)
    #[must_use]
    pub fn can_navigate_prev(&self) -> bool {
        self.status == ViewStatus::Idle && self.current_version_index > 0
    }

    /// Whether `next` navigation is allowed (Idle, behind latest)
    #[must_use]
    pub fn can_navigate_next(&self) -> bool {
        self.status == ViewStatus::Idle && self.current_version_index < self.latest_index
    }

    /// Step to the previous version; returns the index to fetch
    pub fn navigate_prev(&mut self) -> Option<usize> {
        if !self.can_navigate_prev() {
            return None;
        }
        self.current_version_index -= 1;
        Some(self.current_version_index)
    }

    /// Step to the next version; returns the index to fetch
    pub fn navigate_next(&mut self) -> Option<usize> {
        if !self.can_navigate_next() {
            return None;
        }
        self.current_version_index += 1;
        Some(self.current_version_index)
    }

    /// Show content fetched from the store for the displayed version
    pub fn set_version_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Record a user edit; the save is debounced, not immediate
    ///
    /// Edits are only accepted in `Idle` on the current version;
    /// history is never edited in place.
    pub fn record_edit(&mut self, content: impl Into<String>, now: DateTime<Utc>) -> bool {
        if self.status != ViewStatus::Idle || !self.is_current_version() {
            return false;
        }
        let content = content.into();
        self.content = content.clone();
        self.pending_edit = Some(PendingEdit {
            content,
            edited_at: now,
        });
        true
    }

    /// Take the pending edit once the debounce window has elapsed
    ///
    /// The returned content is appended to the store as a new version;
    /// a later edit inside the window resets the timer.
    pub fn due_save(&mut self, now: DateTime<Utc>, debounce: Duration) -> Option<String> {
        let due = self
            .pending_edit
            .as_ref()
            .map(|edit| now - edit.edited_at >= debounce)?;
        if !due {
            return None;
        }
        self.pending_edit.take().map(|edit| edit.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(kind: ArtifactKind) -> ArtifactView {
        ArtifactView::new(Uuid::new_v4(), kind)
    }

    #[test]
    fn test_first_delta_reveals_and_streams() {
        let mut view = view(ArtifactKind::Text);
        assert_eq!(view.status, ViewStatus::Hidden);

        assert!(view.apply_delta(&Delta::TextDelta("Gravity ".to_string())));
        assert!(view.is_visible);
        assert_eq!(view.status, ViewStatus::Streaming);
    }

    #[test]
    fn test_text_deltas_append_cumulatively() {
        let mut view = view(ArtifactKind::Text);
        view.apply_delta(&Delta::TextDelta("Gravity ".to_string()));
        assert_eq!(view.content, "Gravity ");
        view.apply_delta(&Delta::TextDelta("pulls ".to_string()));
        assert_eq!(view.content, "Gravity pulls ");
        view.apply_delta(&Delta::TextDelta("objects.".to_string()));
        assert_eq!(view.content, "Gravity pulls objects.");
    }

    #[test]
    fn test_structured_deltas_replace() {
        let mut view = view(ArtifactKind::Slide);
        view.apply_delta(&Delta::SlideDelta(r#"{"title":"T"}"#.to_string()));
        view.apply_delta(&Delta::SlideDelta(
            r#"{"title":"T","slides":[{"title":"S1","content":["a"]}]}"#.to_string(),
        ));
        assert_eq!(
            view.content,
            r#"{"title":"T","slides":[{"title":"S1","content":["a"]}]}"#
        );
    }

    #[test]
    fn test_malformed_chart_delta_is_noop() {
        let mut view = view(ArtifactKind::Chart);
        view.apply_delta(&Delta::ChartDelta(r#"{"chart_type":"bar"}"#.to_string()));
        let before = view.content.clone();

        assert!(!view.apply_delta(&Delta::ChartDelta("not json".to_string())));
        assert_eq!(view.content, before);
    }

    #[test]
    fn test_wrong_kind_delta_is_dropped() {
        let mut view = view(ArtifactKind::Text);
        view.apply_delta(&Delta::TextDelta("hello".to_string()));
        assert!(!view.apply_delta(&Delta::CodeDelta("fn main() {}".to_string())));
        assert_eq!(view.content, "hello");
    }

    #[test]
    fn test_stream_end_moves_to_idle() {
        let mut view = view(ArtifactKind::Text);
        view.apply_delta(&Delta::TextDelta("x".to_string()));
        view.finish_stream();
        assert_eq!(view.status, ViewStatus::Idle);
    }

    #[test]
    fn test_navigation_guards() {
        let mut view = view(ArtifactKind::Text);
        view.apply_delta(&Delta::TextDelta("x".to_string()));

        // Navigation is not permitted while streaming.
        assert!(view.navigate_prev().is_none());

        view.finish_stream();
        view.sync_latest(2);
        assert!(view.is_current_version());

        // At latest: next disabled, prev allowed.
        assert!(view.navigate_next().is_none());
        assert_eq!(view.navigate_prev(), Some(1));
        assert_eq!(view.navigate_prev(), Some(0));

        // At index 0: prev disabled.
        assert!(view.navigate_prev().is_none());
        assert_eq!(view.navigate_next(), Some(1));
    }

    #[test]
    fn test_edit_debounce() {
        let mut view = view(ArtifactKind::Text);
        view.apply_delta(&Delta::TextDelta("draft".to_string()));
        view.finish_stream();
        view.sync_latest(0);

        let t0 = Utc::now();
        assert!(view.record_edit("edited", t0));

        // Inside the window: nothing to save yet.
        assert!(view
            .due_save(t0 + Duration::seconds(1), Duration::seconds(2))
            .is_none());

        // Window elapsed: the edit is taken exactly once.
        let saved = view.due_save(t0 + Duration::seconds(3), Duration::seconds(2));
        assert_eq!(saved.as_deref(), Some("edited"));
        assert!(view
            .due_save(t0 + Duration::seconds(4), Duration::seconds(2))
            .is_none());
    }

    #[test]
    fn test_edit_rejected_off_current_version() {
        let mut view = view(ArtifactKind::Text);
        view.apply_delta(&Delta::TextDelta("draft".to_string()));
        view.finish_stream();
        view.sync_latest(1);
        view.navigate_prev();

        assert!(!view.record_edit("edited", Utc::now()));
    }

    #[test]
    fn test_edit_rejected_while_streaming() {
        let mut view = view(ArtifactKind::Text);
        view.apply_delta(&Delta::TextDelta("draft".to_string()));
        assert!(!view.record_edit("edited", Utc::now()));
    }
}
