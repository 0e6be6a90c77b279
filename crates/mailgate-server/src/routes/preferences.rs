//! User opt-out preference listing and removal.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Extension, Json, Router};
use serde::Deserialize;

use mailgate_core::types::UserPreference;

use crate::AppState;
use crate::auth::Actor;
use crate::error::ApiResult;

/// Preference routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/preferences", get(list))
        .route("/preferences/{user_id}/{sender}", delete(remove))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesQuery {
    user_id: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<PreferencesQuery>,
) -> ApiResult<Json<Vec<UserPreference>>> {
    Ok(Json(state.store.list_preferences(query.user_id.as_deref())?))
}

async fn remove(
    State(state): State<AppState>,
    Path((user_id, sender)): Path<(String, String)>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<StatusCode> {
    state.store.delete_preference(&actor.0, &user_id, &sender)?;
    Ok(StatusCode::NO_CONTENT)
}
