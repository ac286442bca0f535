//! Server module for Atelier
//!
//! Wires configuration, the generation source, the handler registry,
//! and the version store into the HTTP application and runs it.

mod config;

pub use config::{load_config, AppConfig, GenerationConfig};

use anyhow::{Context, Result};
use axum::{Extension, Router};
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use atelier_artifact::{CommitPolicy, HandlerRegistry, StreamingSession, VersionStore};
use atelier_gen::{OpenAiCompatConfig, OpenAiCompatSource, ScriptedSource, SharedSource, SourceScript};

/// Shared application state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<VersionStore>,
    pub session: Arc<StreamingSession>,
    /// Outbound delta channel capacity per run
    pub channel_capacity: usize,
}

/// Build the generation source named by configuration
pub fn resolve_source(config: &GenerationConfig) -> Result<SharedSource> {
    match config.provider.as_str() {
        "scripted" => {
            info!("Using scripted generation source (offline mode)");
            Ok(Arc::new(ScriptedSource::new(SourceScript::tokens([
                "This server is running in scripted mode. ",
                "Configure an OpenAI-compatible endpoint ",
                "to generate real artifacts.",
            ]))))
        }
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
            let source = OpenAiCompatSource::new(OpenAiCompatConfig {
                base_url: config.base_url.clone(),
                api_key,
                default_model: config.default_model.clone(),
                timeout_ms: config.timeout_ms,
            })
            .context("Failed to initialize generation source (is OPENAI_API_KEY set?)")?;
            info!(base_url = %config.base_url, model = %config.default_model, "Using OpenAI-compatible generation source");
            Ok(Arc::new(source))
        }
        other => Err(anyhow::anyhow!("Unknown generation provider: {other}")),
    }
}

/// Build application state from configuration
pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(VersionStore::new(pool));
    store.init().await.context("Failed to initialize schema")?;
    info!(url = %config.database.url, "Version store initialized");

    let source = resolve_source(&config.generation)?;
    let registry = Arc::new(HandlerRegistry::for_source(
        source,
        &config.generation.default_model,
    ));
    // Startup-fatal: every artifact kind must resolve a handler.
    registry
        .validate()
        .context("Handler registry incomplete")?;
    info!("Handler registry validated");

    let session = Arc::new(
        StreamingSession::new(registry, store.clone()).with_commit_policy(CommitPolicy {
            commit_partial_on_failure: config.artifacts.commit_partial_on_failure,
        }),
    );

    Ok(AppState {
        store,
        session,
        channel_capacity: config.artifacts.channel_capacity,
    })
}

/// Run the server
pub async fn run() -> Result<()> {
    let config = load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");

    let state = build_state(&config).await?;

    let app = Router::new()
        .merge(crate::api::api_router())
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Atelier shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
