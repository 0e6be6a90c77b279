//! Audit-trail listing.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use mailgate_core::types::AuditLogEntry;

use crate::AppState;
use crate::error::ApiResult;

/// Default page size when the client does not ask for one.
const DEFAULT_LIMIT: usize = 200;

/// Audit-trail routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/audit", get(list))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditQuery {
    limit: Option<usize>,
    target: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Vec<AuditLogEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let entries = match query.target {
        Some(target) => state.store.audit_for_target(&target, limit)?,
        None => state.store.recent_audit(limit)?,
    };
    Ok(Json(entries))
}
