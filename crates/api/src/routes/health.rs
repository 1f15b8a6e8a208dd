use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// Liveness plus which store and notifier backends are wired in.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let notifier = if state.notifier.is_configured() {
        "telegram"
    } else {
        "disabled"
    };
    Json(json!({
        "status": "ok",
        "store": state.evaluator.directions().backend(),
        "notifier": notifier,
    }))
}
