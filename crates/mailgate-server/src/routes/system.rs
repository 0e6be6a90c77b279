//! System control: pause switch, advisory limits, batch trigger.

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;

use mailgate_core::types::{AuditAction, SystemControlState, SystemStatus};

use crate::AppState;
use crate::auth::Actor;
use crate::error::ApiResult;

/// System-control routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/system/status", get(status))
        .route("/system/pause", post(pause))
        .route("/system/resume", post(resume))
        .route("/system/limits", put(set_limits))
        .route("/system/run-batch", post(run_batch))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PauseBody {
    reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct LimitsBody {
    daily_limit_calls: Option<i64>,
    daily_limit_cost_usd: Option<f64>,
}

async fn status(State(state): State<AppState>) -> ApiResult<Json<SystemStatus>> {
    Ok(Json(state.store.system_status()?))
}

async fn pause(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: Option<Json<PauseBody>>,
) -> ApiResult<Json<SystemControlState>> {
    let reason = body
        .and_then(|Json(b)| b.reason)
        .unwrap_or_else(|| "manual pause".to_string());
    Ok(Json(state.store.pause(&actor.0, &reason)?))
}

async fn resume(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<SystemControlState>> {
    Ok(Json(state.store.resume(&actor.0)?))
}

async fn set_limits(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<LimitsBody>,
) -> ApiResult<Json<SystemControlState>> {
    Ok(Json(state.store.set_limits(
        &actor.0,
        body.daily_limit_calls,
        body.daily_limit_cost_usd,
    )?))
}

/// Forward a batch run to the pipeline and record the outcome.
///
/// The batch still runs when the system is paused — the pause switch
/// gates the pipeline's own scheduled runs, not an explicit admin
/// command.
async fn run_batch(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<serde_json::Value>> {
    match state.pipeline.run_batch().await {
        Ok(outcome) => {
            state.store.record_batch_result(outcome.processed)?;
            state.store.audit_best_effort(
                &actor.0,
                AuditAction::BatchTrigger,
                None,
                None,
                Some(json!({"success": true, "processed": outcome.processed})),
            );
            Ok(Json(json!({"processed": outcome.processed})))
        }
        Err(err) => {
            state.store.audit_best_effort(
                &actor.0,
                AuditAction::BatchTrigger,
                None,
                None,
                Some(json!({"success": false, "error": err.to_string()})),
            );
            Err(err.into())
        }
    }
}
