//! Pipeline policy settings (`system_settings/general`).

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};

use mailgate_core::types::{SettingsUpdate, SystemSettings};

use crate::AppState;
use crate::auth::Actor;
use crate::error::ApiResult;

/// Policy-settings routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).patch(update_settings))
}

async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<SystemSettings>> {
    Ok(Json(state.store.settings()?))
}

async fn update_settings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<SettingsUpdate>,
) -> ApiResult<Json<SystemSettings>> {
    Ok(Json(state.store.update_settings(&actor.0, body)?))
}
