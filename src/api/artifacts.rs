//! Artifact endpoints
//!
//! CRUD over artifacts and their version history, plus the two SSE
//! streaming endpoints that drive generation runs. A streaming response
//! carries one `artifact` event, then one event per delta named by the
//! delta's tag, then a terminal `run` event with the run report. The
//! client dropping the SSE connection closes the sink and cancels the
//! run without a commit.

use axum::extract::{Path, Query};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Json;
use axum::routing::{get, post};
use axum::{Extension, Router};
use futures::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use atelier_artifact::{
    Artifact, ArtifactKind, ArtifactVersion, ChannelSink, Delta, Error as ArtifactError,
    RunOptions, RunReport, RunState,
};

use super::{ApiError, ApiResponse};
use crate::server::AppState;

/// Request body for creating an artifact
#[derive(Debug, Deserialize)]
pub struct CreateArtifactRequest {
    pub user_id: String,
    pub title: String,
    pub kind: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Request body for updating an artifact
#[derive(Debug, Deserialize)]
pub struct UpdateArtifactRequest {
    pub description: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Request body for renaming an artifact
#[derive(Debug, Deserialize)]
pub struct RenameArtifactRequest {
    pub title: String,
}

/// Query parameters for listing artifacts
#[derive(Debug, Deserialize)]
pub struct ListArtifactsQuery {
    pub user_id: String,
}

/// Create an artifact and stream its first version over SSE
async fn create_artifact(
    Extension(state): Extension<AppState>,
    Json(request): Json<CreateArtifactRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let kind: ArtifactKind = request.kind.parse().map_err(ApiError::bad_request)?;
    let artifact = Artifact::new(&request.user_id, &request.title, kind);
    let options = RunOptions {
        model: request.model,
    };

    info!(artifact_id = %artifact.id, kind = %kind, "Create run requested");

    let (tx, rx) = mpsc::channel(state.channel_capacity);
    let artifact_id = artifact.id;
    let session = state.session.clone();
    let opening = artifact_event(&artifact);
    let task = tokio::spawn(async move {
        let sink = ChannelSink::new(tx);
        session.create(&artifact, &options, &sink).await
    });

    Ok(Sse::new(run_events(artifact_id, opening, rx, task)).keep_alive(KeepAlive::default()))
}

/// Stream a new version for an existing artifact over SSE
async fn update_artifact(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateArtifactRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let artifact = state
        .store
        .get_artifact(id)
        .await?
        .ok_or_else(|| ApiError::from(ArtifactError::ArtifactNotFound(id)))?;
    if state.session.is_streaming(id) {
        return Err(ArtifactError::RunConflict(id).into());
    }

    info!(artifact_id = %id, kind = %artifact.kind, "Update run requested");

    let options = RunOptions {
        model: request.model,
    };
    let (tx, rx) = mpsc::channel(state.channel_capacity);
    let session = state.session.clone();
    let opening = artifact_event(&artifact);
    let task = tokio::spawn(async move {
        let sink = ChannelSink::new(tx);
        session.update(id, &request.description, &options, &sink).await
    });

    Ok(Sse::new(run_events(id, opening, rx, task)).keep_alive(KeepAlive::default()))
}

/// List a user's artifacts
async fn list_artifacts(
    Extension(state): Extension<AppState>,
    Query(query): Query<ListArtifactsQuery>,
) -> Result<Json<ApiResponse<Vec<Artifact>>>, ApiError> {
    let artifacts = state.store.list_artifacts(&query.user_id).await?;
    Ok(Json(ApiResponse::success(artifacts)))
}

/// Get artifact metadata
async fn get_artifact(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Artifact>>, ApiError> {
    let artifact = state
        .store
        .get_artifact(id)
        .await?
        .ok_or_else(|| ApiError::from(ArtifactError::ArtifactNotFound(id)))?;
    Ok(Json(ApiResponse::success(artifact)))
}

/// Rename an artifact (the kind never changes)
async fn rename_artifact(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RenameArtifactRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    if !state.store.rename_artifact(id, &request.title).await? {
        return Err(ArtifactError::ArtifactNotFound(id).into());
    }
    Ok(Json(ApiResponse::success(())))
}

/// Delete an artifact and its version history
async fn delete_artifact(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    if !state.store.delete_artifact(id).await? {
        return Err(ArtifactError::ArtifactNotFound(id).into());
    }
    info!(artifact_id = %id, "Artifact deleted");
    Ok(Json(ApiResponse::success(())))
}

/// List an artifact's versions in order
async fn list_versions(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ArtifactVersion>>>, ApiError> {
    if state.store.get_artifact(id).await?.is_none() {
        return Err(ArtifactError::ArtifactNotFound(id).into());
    }
    let versions = state.store.list_versions(id).await?;
    Ok(Json(ApiResponse::success(versions)))
}

/// Get one version by index
async fn get_version(
    Extension(state): Extension<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<ApiResponse<ArtifactVersion>>, ApiError> {
    let version = state
        .store
        .get_version(id, index)
        .await?
        .ok_or_else(|| {
            ApiError::from(ArtifactError::VersionNotFound {
                artifact_id: id,
                index,
            })
        })?;
    Ok(Json(ApiResponse::success(version)))
}

/// Opening SSE event carrying the artifact's metadata
fn artifact_event(artifact: &Artifact) -> Event {
    Event::default()
        .event("artifact")
        .json_data(artifact)
        .unwrap_or_else(|_| Event::default().event("artifact").data("{}"))
}

/// SSE stream for one run: opening metadata, deltas, terminal report
fn run_events(
    artifact_id: Uuid,
    opening: Event,
    rx: mpsc::Receiver<Delta>,
    task: JoinHandle<Result<RunReport, ArtifactError>>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    enum Phase {
        Opening(Event),
        Deltas,
        Done,
    }

    let state = (Phase::Opening(opening), rx, Some(task));
    futures::stream::unfold(state, move |(phase, mut rx, mut task)| async move {
        match phase {
            Phase::Opening(event) => Some((Ok(event), (Phase::Deltas, rx, task))),
            Phase::Deltas => {
                if let Some(delta) = rx.recv().await {
                    let event = Event::default()
                        .event(delta.kind().delta_tag())
                        .data(delta.content().to_string());
                    return Some((Ok(event), (Phase::Deltas, rx, task)));
                }
                // Channel drained: the run is settling; report it.
                let handle = task.take()?;
                let event = terminal_event(artifact_id, handle.await);
                Some((Ok(event), (Phase::Done, rx, task)))
            }
            Phase::Done => None,
        }
    })
}

/// Terminal `run` event from the settled run's report
fn terminal_event(
    artifact_id: Uuid,
    joined: Result<Result<RunReport, ArtifactError>, tokio::task::JoinError>,
) -> Event {
    let report = match joined {
        Ok(Ok(report)) => report,
        Ok(Err(err)) => RunReport {
            artifact_id,
            state: RunState::Failed,
            version: None,
            error: Some(err.to_string()),
        },
        Err(err) => RunReport {
            artifact_id,
            state: RunState::Failed,
            version: None,
            error: Some(format!("run task panicked: {err}")),
        },
    };
    Event::default()
        .event("run")
        .json_data(&report)
        .unwrap_or_else(|_| Event::default().event("run").data("{}"))
}

/// Artifact routes
pub fn artifacts_routes() -> Router {
    Router::new()
        .route(
            "/api/v1/artifacts",
            post(create_artifact).get(list_artifacts),
        )
        .route(
            "/api/v1/artifacts/:id",
            get(get_artifact)
                .patch(rename_artifact)
                .delete(delete_artifact),
        )
        .route("/api/v1/artifacts/:id/updates", post(update_artifact))
        .route("/api/v1/artifacts/:id/versions", get(list_versions))
        .route("/api/v1/artifacts/:id/versions/:index", get(get_version))
}
