//! HTTP service exposing the editor's AI endpoints.

pub mod error;
pub mod payload;
pub mod routes;
pub mod state;

use anyhow::Context;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use strudel_ai_adapters::{Config, HttpBackend};
use strudel_ai_core::workspace::build_api_url;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

pub use error::ApiError;
pub use state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tag every request with a fresh id, both in the tracing span and the response.
async fn request_id(request: Request, next: Next) -> Response {
    let id = Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Build the router, mounting every route under `state.config.base_path`.
pub fn router(state: AppState) -> Router {
    let base = state.config.base_path.clone();
    let at = |path: &str| build_api_url(&base, path);

    Router::new()
        .route(&at("/api/compose"), post(routes::compose))
        .route(&at("/api/claude-api"), post(routes::edit))
        .route(&at("/api/claude-suggestions"), post(routes::claude_suggestions))
        .route(&at("/api/openai-suggestions"), post(routes::openai_suggestions))
        .route(&at("/api/health"), get(routes::health))
        .layer(middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Bind `config.bind` and serve until Ctrl-C.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let backend = HttpBackend::new(&config).context("failed to build provider client")?;
    let bind = config.bind.clone();
    let base_path = config.base_path.clone();
    let state = AppState::new(config, Arc::new(backend));

    let listener = tokio::net::TcpListener::bind(bind.as_str())
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let addr = listener.local_addr()?;
    tracing::info!(
        %addr,
        base_path = %base_path,
        claude = state.config.has_api_key(strudel_ai_core::Provider::Claude),
        openai = state.config.has_api_key(strudel_ai_core::Provider::OpenAi),
        "strudel-ai listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}
