mod auth;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use common::Notifier;
use engine::Evaluator;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<Evaluator>,
    pub notifier: Arc<dyn Notifier>,
    /// Shared secret every webhook payload must carry.
    pub tv_secret: Arc<str>,
}

/// All routes with state and tracing attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::hook_router())
        .merge(routes::self_test_router())
        .merge(routes::health_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind and run the HTTP server until it fails.
pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Webhook API listening");
    axum::serve(listener, router(state)).await
}
