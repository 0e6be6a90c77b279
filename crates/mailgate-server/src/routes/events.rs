//! Email-event reads and manual notification overrides.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;

use mailgate_core::CoreError;
use mailgate_core::types::{EmailEvent, EventCategory};
use mailgate_store::repositories::EventFilter;

use crate::AppState;
use crate::auth::Actor;
use crate::error::ApiResult;

/// Default page size for the event listing.
const DEFAULT_LIMIT: usize = 50;

/// Email-event routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list))
        .route("/events/{email_id}", get(get_one))
        .route("/events/{email_id}/trigger", post(trigger))
        .route("/events/{email_id}/block", post(block))
}

#[derive(Deserialize)]
struct EventsQuery {
    category: Option<String>,
    date: Option<String>,
    limit: Option<usize>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TriggerBody {
    /// Slack identities to deliver to; defaults to the event's own
    /// target set.
    target_ids: Option<Vec<String>>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Json<Vec<EmailEvent>>> {
    let category = query
        .category
        .as_deref()
        .map(|raw| {
            EventCategory::parse(raw)
                .ok_or_else(|| CoreError::Validation(format!("unknown category {raw:?}")))
        })
        .transpose()?;
    let filter = EventFilter {
        category,
        date: query.date,
        limit: query.limit.unwrap_or(DEFAULT_LIMIT),
    };
    Ok(Json(state.store.query_events(&filter)?))
}

async fn get_one(
    State(state): State<AppState>,
    Path(email_id): Path<String>,
) -> ApiResult<Json<EmailEvent>> {
    Ok(Json(state.store.get_event(&email_id)?))
}

/// Force-send the notification for an event, overriding its decision.
///
/// The override is recorded even when the pipeline call fails; the
/// response reports the delivery outcome so the admin can retry.
async fn trigger(
    State(state): State<AppState>,
    Path(email_id): Path<String>,
    Extension(actor): Extension<Actor>,
    body: Option<Json<TriggerBody>>,
) -> ApiResult<Json<serde_json::Value>> {
    let event = state.store.get_event(&email_id)?;
    let targets = body
        .and_then(|Json(b)| b.target_ids)
        .unwrap_or(event.slack_targets);
    if targets.is_empty() {
        return Err(CoreError::Validation("no notification targets".into()).into());
    }

    let outcome = state
        .pipeline
        .trigger_notification(&email_id, &targets)
        .await
        .map_err(|err| err.to_string());
    let delivered = outcome.is_ok();
    state.store.record_override(
        &actor.0,
        &email_id,
        EventCategory::Notify,
        "manually triggered",
        outcome,
    )?;
    Ok(Json(json!({
        "emailId": email_id,
        "finalCategory": EventCategory::Notify,
        "delivered": delivered,
    })))
}

/// Silence an event and cancel any pending notification for it.
async fn block(
    State(state): State<AppState>,
    Path(email_id): Path<String>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<serde_json::Value>> {
    let _ = state.store.get_event(&email_id)?;

    let outcome = state
        .pipeline
        .block_notification(&email_id)
        .await
        .map_err(|err| err.to_string());
    let cancelled = outcome.is_ok();
    state.store.record_override(
        &actor.0,
        &email_id,
        EventCategory::Silent,
        "manually blocked",
        outcome,
    )?;
    Ok(Json(json!({
        "emailId": email_id,
        "finalCategory": EventCategory::Silent,
        "cancelled": cancelled,
    })))
}
