use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use common::{Decision, Delivery, Evaluation, EventKind, Outcome, SignalEvent};
use telegram_notify::render_decision;

use crate::{auth::secret_matches, AppState};

pub fn hook_router() -> Router<AppState> {
    Router::new().route("/api/tv-hook", post(tv_hook))
}

type Reply = (StatusCode, Json<Value>);

fn failure(message: impl std::fmt::Display) -> Reply {
    (StatusCode::OK, Json(json!({ "ok": false, "error": message.to_string() })))
}

/// TradingView alert webhook.
///
/// The body is read as raw bytes so malformed JSON, or a body that is not
/// UTF-8 at all, still gets a JSON reply. Only a bad secret produces a
/// non-200 status.
async fn tv_hook(State(state): State<AppState>, body: Bytes) -> Reply {
    let evaluation_id = Uuid::new_v4();
    let span = tracing::info_span!("tv_hook", %evaluation_id);
    handle(state, body).instrument(span).await
}

async fn handle(state: AppState, body: Bytes) -> Reply {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Unparsable webhook body");
            return failure(e);
        }
    };

    if !secret_matches(&payload, &state.tv_secret) {
        warn!("Webhook rejected: bad secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "ok": false, "msg": "bad secret" })),
        );
    }

    let event: SignalEvent = match serde_json::from_value(payload) {
        Ok(ev) => ev,
        Err(e) => {
            warn!(error = %e, "Malformed webhook payload");
            return failure(e);
        }
    };
    info!(kind = ?event.kind, symbol = %event.symbol, label = %event.event, "Webhook received");

    let evaluation = match state.evaluator.evaluate(&event, Utc::now()).await {
        Ok(evaluation) => evaluation,
        Err(e) => {
            error!(error = %e, "Evaluation failed");
            return failure(e);
        }
    };

    let body = match evaluation {
        Evaluation::DirectionRecorded { side, .. } => json!({ "ok": true, "saved": side }),
        // An unrecognized direction label stores nothing.
        Evaluation::Decided(_) if event.kind == EventKind::Direction4h => {
            json!({ "ok": true, "saved": null })
        }
        Evaluation::Decided(decision) => respond(&state, decision).await,
    };
    (StatusCode::OK, Json(body))
}

async fn respond(state: &AppState, decision: Decision) -> Value {
    if decision.outcome == Outcome::Ignored {
        return json!({ "ok": true, "ignored": decision.reason });
    }

    let notified = notify(state, &decision).await;
    match decision.outcome {
        Outcome::Recommend => json!({
            "ok": true,
            "pushed": true,
            "plan": decision.plan,
            "notified": notified,
        }),
        _ => {
            let mut body = json!({
                "ok": true,
                "blocked": decision.reason,
                "notified": notified,
            });
            if let Some(plan) = &decision.plan {
                body["plan"] = json!(plan);
            }
            body
        }
    }
}

/// Delivery failures are logged, never surfaced as request errors.
async fn notify(state: &AppState, decision: &Decision) -> bool {
    if !decision.is_notifiable() {
        return false;
    }
    let Some(text) = render_decision(decision) else {
        return false;
    };
    match state.notifier.send(&text).await {
        Ok(Delivery::Sent) => true,
        Ok(Delivery::Skipped) => false,
        Err(e) => {
            warn!(error = %e, "Decision notification failed");
            false
        }
    }
}
