//! Usage ledger reads: daily record and monthly cost report.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use mailgate_core::CoreError;
use mailgate_core::time::today_key;
use mailgate_core::types::DailyUsageRecord;
use mailgate_core::usage::MonthlyReport;

use crate::AppState;
use crate::error::ApiResult;

/// Usage-ledger routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/usage/daily", get(daily))
        .route("/usage/monthly", get(monthly))
}

#[derive(Deserialize)]
struct DailyQuery {
    date: Option<String>,
}

#[derive(Deserialize)]
struct MonthlyQuery {
    month: String,
}

async fn daily(
    State(state): State<AppState>,
    Query(query): Query<DailyQuery>,
) -> ApiResult<Json<DailyUsageRecord>> {
    let date = query.date.unwrap_or_else(today_key);
    Ok(Json(state.store.daily_usage(&date)?))
}

async fn monthly(
    State(state): State<AppState>,
    Query(query): Query<MonthlyQuery>,
) -> ApiResult<Json<MonthlyReport>> {
    if query.month.len() != 7 || query.month.as_bytes()[4] != b'-' {
        return Err(CoreError::Validation(format!(
            "month must be YYYY-MM, got {:?}",
            query.month
        ))
        .into());
    }
    let report = state
        .store
        .monthly_report(&query.month, &state.settings.pricing)?;
    Ok(Json(report))
}
