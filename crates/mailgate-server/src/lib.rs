//! # mailgate-server
//!
//! Axum HTTP admin API for the Mailgate control plane.
//!
//! Every `/api` route is bearer-authenticated and the token's name is
//! the audit actor for the request. `/health` is the only open route.

#![deny(unsafe_code)]

pub mod auth;
pub mod error;
pub mod pipeline;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use mailgate_settings::MailgateSettings;
use mailgate_store::ControlStore;

pub use pipeline::PipelineClient;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer.
    pub store: Arc<ControlStore>,
    /// Process settings snapshot taken at startup.
    pub settings: Arc<MailgateSettings>,
    /// Pipeline command client.
    pub pipeline: PipelineClient,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::rules::router())
        .merge(routes::system::router())
        .merge(routes::settings::router())
        .merge(routes::audit::router())
        .merge(routes::usage::router())
        .merge(routes::events::router())
        .merge(routes::preferences::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}

/// Create and start the server. Returns a handle holding the bound
/// port and the serve task.
pub async fn start(
    settings: Arc<MailgateSettings>,
    store: Arc<ControlStore>,
) -> Result<ServerHandle, std::io::Error> {
    let pipeline = PipelineClient::new(&settings.pipeline).map_err(std::io::Error::other)?;
    let state = AppState {
        store,
        settings: Arc::clone(&settings),
        pipeline,
    };

    let router = build_router(state);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "mailgate server started");

    let server = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            tracing::error!(error = %err, "server terminated");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server,
    })
}

/// Handle returned by [`start`] — keeps the serve task alive.
pub struct ServerHandle {
    /// Bound port (useful with port 0 in tests).
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}
