//! Routing-rule CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;

use mailgate_core::types::{RoutingRule, RuleUpdate};

use crate::AppState;
use crate::auth::Actor;
use crate::error::ApiResult;

/// Routing-rule routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rules", get(list).post(create))
        .route(
            "/rules/{slack_user_id}",
            get(get_one).patch(update).delete(remove),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateRuleBody {
    slack_user_id: String,
    display_name: Option<String>,
    #[serde(default)]
    gmail_accounts: Vec<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<RoutingRule>>> {
    Ok(Json(state.store.list_rules()?))
}

async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateRuleBody>,
) -> ApiResult<(StatusCode, Json<RoutingRule>)> {
    let rule = state.store.create_rule(
        &actor.0,
        &body.slack_user_id,
        body.display_name,
        &body.gmail_accounts,
        body.enabled,
    )?;
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn get_one(
    State(state): State<AppState>,
    Path(slack_user_id): Path<String>,
) -> ApiResult<Json<RoutingRule>> {
    Ok(Json(state.store.get_rule(&slack_user_id)?))
}

async fn update(
    State(state): State<AppState>,
    Path(slack_user_id): Path<String>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<RuleUpdate>,
) -> ApiResult<Json<RoutingRule>> {
    Ok(Json(state.store.update_rule(&actor.0, &slack_user_id, body)?))
}

async fn remove(
    State(state): State<AppState>,
    Path(slack_user_id): Path<String>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<StatusCode> {
    state.store.delete_rule(&actor.0, &slack_user_id)?;
    Ok(StatusCode::NO_CONTENT)
}
