//! Bearer-token auth middleware.
//!
//! Every `/api` route requires `Authorization: Bearer <token>`; the
//! token resolves to a named actor from settings, and that name is what
//! the audit trail records. Auth runs before any body parsing, so an
//! unauthenticated request never reaches a handler.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use mailgate_core::CoreError;

use crate::AppState;
use crate::error::ApiError;

/// The authenticated actor, injected as a request extension.
#[derive(Clone, Debug)]
pub struct Actor(pub String);

/// Reject requests without a recognized bearer token.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError(CoreError::Unauthorized))?;

    let actor = state
        .settings
        .actor_for_token(token)
        .ok_or(ApiError(CoreError::Unauthorized))?
        .to_string();

    let _ = request.extensions_mut().insert(Actor(actor));
    Ok(next.run(request).await)
}
