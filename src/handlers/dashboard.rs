use axum::{extract::State, response::Json};

use crate::{
    error::AppResult,
    middleware::Caller,
    services::dashboard::{dashboard_stats, DashboardStats},
    AppState,
};

pub async fn dashboard(
    State(state): State<AppState>,
    _caller: Caller,
) -> AppResult<Json<DashboardStats>> {
    let stats = dashboard_stats(&state.db, state.config.low_stock_display_limit).await?;
    Ok(Json(stats))
}
