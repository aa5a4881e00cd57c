/*!
 * HTTP front end.
 *
 * - `POST /upload`: translate one or more uploaded subtitle files
 * - `GET /progress/:job_id`: server-sent progress events of one job
 * - `GET /downloads/:name`: one-shot download of a generated archive
 * - `GET /health`: liveness probe
 */

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use log::info;
use std::sync::Arc;

use crate::app_controller::Controller;
use crate::file_utils::FileManager;
use crate::progress::ProgressHub;

pub mod handlers;

/// State shared by every request
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
    pub progress: Arc<ProgressHub>,
}

impl AppState {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller: Arc::new(controller),
            progress: Arc::new(ProgressHub::new()),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.controller.config().server.max_upload_bytes;

    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/progress/:job_id", get(handlers::progress))
        .route("/downloads/:name", get(handlers::download))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(state: AppState) -> Result<()> {
    let server = state.controller.config().server.clone();
    FileManager::ensure_dir(&server.upload_dir)?;
    FileManager::ensure_dir(&server.download_dir)?;

    let address = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
