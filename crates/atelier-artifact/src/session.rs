//! Streaming Session
//!
//! Orchestrates one generation run: resolves the kind handler, forwards
//! its deltas through the run's sink, and commits the handler's final
//! returned content as one new immutable version. A run moves through
//! `Idle -> Streaming -> Committing -> Done`, with terminal `Failed`
//! and `Cancelled` states.
//!
//! An artifact has at most one in-flight run at a time: admission takes
//! a per-artifact slot that a second concurrent run is rejected on, and
//! the slot is released on every exit path via an RAII guard.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::{Artifact, ArtifactVersion};
use crate::error::{Error, Result};
use crate::handlers::{HandlerRegistry, RunOptions};
use crate::sink::DeltaSink;
use crate::store::VersionStore;

/// Lifecycle state of one generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Admitted, not yet streaming
    Idle,
    /// Handler is pulling the source and forwarding deltas
    Streaming,
    /// Handler returned; final content being persisted
    Committing,
    /// Version committed
    Done,
    /// Run failed; history untouched unless partial commit is enabled
    Failed,
    /// Transport closed mid-run; nothing committed, no error surfaced
    Cancelled,
}

/// Commit policy for failed runs
///
/// Whether a failed run with a nonempty partial draft should still be
/// committed is a deployment choice; the safe default is to discard.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitPolicy {
    /// Commit the partial draft when a run fails mid-stream
    pub commit_partial_on_failure: bool,
}

/// Terminal report of one generation run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Artifact the run targeted
    pub artifact_id: Uuid,
    /// Terminal state
    pub state: RunState,
    /// Version committed by this run, if any
    pub version: Option<ArtifactVersion>,
    /// Failure reason, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Orchestrator for streaming generation runs
pub struct StreamingSession {
    registry: Arc<HandlerRegistry>,
    store: Arc<VersionStore>,
    policy: CommitPolicy,
    active: Arc<Mutex<HashSet<Uuid>>>,
}

impl StreamingSession {
    /// Create a session over a handler registry and version store
    #[must_use]
    pub fn new(registry: Arc<HandlerRegistry>, store: Arc<VersionStore>) -> Self {
        Self {
            registry,
            store,
            policy: CommitPolicy::default(),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Configure the failed-run commit policy
    #[must_use]
    pub fn with_commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run a create: persist the artifact, stream its first version
    ///
    /// The artifact row is written before streaming starts so version
    /// appends have a parent to attach to. A failed first run leaves an
    /// artifact with zero versions; the client sees it as incomplete.
    pub async fn create(
        &self,
        artifact: &Artifact,
        options: &RunOptions,
        sink: &dyn DeltaSink,
    ) -> Result<RunReport> {
        let handler = self.registry.get(artifact.kind)?;
        self.store.create_artifact(artifact).await?;
        let _guard = self.admit(artifact.id)?;

        info!(artifact_id = %artifact.id, kind = %artifact.kind, "Run streaming (create)");
        let result = handler.on_create(&artifact.title, options, sink).await;
        Ok(self.settle(artifact.id, result).await)
    }

    /// Run an update: stream a new version for an existing artifact
    pub async fn update(
        &self,
        artifact_id: Uuid,
        description: &str,
        options: &RunOptions,
        sink: &dyn DeltaSink,
    ) -> Result<RunReport> {
        let artifact = self
            .store
            .get_artifact(artifact_id)
            .await?
            .ok_or(Error::ArtifactNotFound(artifact_id))?;
        let handler = self.registry.get(artifact.kind)?;

        let current = self
            .store
            .latest_version(artifact_id)
            .await?
            .map(|v| v.content)
            .unwrap_or_default();

        let _guard = self.admit(artifact_id)?;

        info!(artifact_id = %artifact_id, kind = %artifact.kind, "Run streaming (update)");
        let result = handler
            .on_update(&artifact, &current, description, options, sink)
            .await;
        Ok(self.settle(artifact_id, result).await)
    }

    /// Whether an artifact currently has a streaming run
    #[must_use]
    pub fn is_streaming(&self, artifact_id: Uuid) -> bool {
        self.active
            .lock()
            .map(|active| active.contains(&artifact_id))
            .unwrap_or(false)
    }

    /// Take the artifact's single run slot
    fn admit(&self, artifact_id: Uuid) -> Result<RunGuard> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| Error::Internal("admission set poisoned".to_string()))?;
        if !active.insert(artifact_id) {
            return Err(Error::RunConflict(artifact_id));
        }
        Ok(RunGuard {
            active: self.active.clone(),
            artifact_id,
        })
    }

    /// Map the handler's outcome to a terminal report, committing when
    /// appropriate. The handler's return value is authoritative; the
    /// persisted version may differ from the last forwarded delta.
    async fn settle(&self, artifact_id: Uuid, result: Result<String>) -> RunReport {
        match result {
            Ok(content) => {
                debug!(artifact_id = %artifact_id, "Run committing");
                match self.store.append_version(artifact_id, &content).await {
                    Ok(version) => {
                        info!(artifact_id = %artifact_id, index = version.index, "Run done");
                        RunReport {
                            artifact_id,
                            state: RunState::Done,
                            version: Some(version),
                            error: None,
                        }
                    }
                    Err(err) => {
                        warn!(artifact_id = %artifact_id, error = %err, "Commit failed");
                        RunReport {
                            artifact_id,
                            state: RunState::Failed,
                            version: None,
                            error: Some(err.to_string()),
                        }
                    }
                }
            }
            Err(Error::Cancelled) => {
                info!(artifact_id = %artifact_id, "Run cancelled; nothing committed");
                RunReport {
                    artifact_id,
                    state: RunState::Cancelled,
                    version: None,
                    error: None,
                }
            }
            Err(Error::Generation { reason, partial }) => {
                warn!(artifact_id = %artifact_id, error = %reason, "Generation failed");
                let version = if self.policy.commit_partial_on_failure && !partial.is_empty() {
                    match self.store.append_version(artifact_id, &partial).await {
                        Ok(version) => {
                            info!(
                                artifact_id = %artifact_id,
                                index = version.index,
                                "Partial draft committed under policy"
                            );
                            Some(version)
                        }
                        Err(err) => {
                            warn!(artifact_id = %artifact_id, error = %err, "Partial commit failed");
                            None
                        }
                    }
                } else {
                    None
                };
                RunReport {
                    artifact_id,
                    state: RunState::Failed,
                    version,
                    error: Some(reason),
                }
            }
            Err(err) => {
                warn!(artifact_id = %artifact_id, error = %err, "Run failed");
                RunReport {
                    artifact_id,
                    state: RunState::Failed,
                    version: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

/// Releases the artifact's run slot on every exit path
struct RunGuard {
    active: Arc<Mutex<HashSet<Uuid>>>,
    artifact_id: Uuid,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.artifact_id);
        }
    }
}
