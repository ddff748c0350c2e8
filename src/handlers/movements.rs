use axum::{
    extract::{Path, State},
    response::Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::Caller,
    models::{Movement, MovementRequest},
    AppState,
};

const ALL_MOVEMENTS_LIMIT: usize = 100;
const PRODUCT_MOVEMENTS_LIMIT: usize = 50;

pub async fn list_movements(
    State(state): State<AppState>,
    _caller: Caller,
) -> AppResult<Json<Vec<Movement>>> {
    let movements = state.stock.movements(None, Some(ALL_MOVEMENTS_LIMIT)).await?;
    Ok(Json(movements))
}

pub async fn list_product_movements(
    State(state): State<AppState>,
    _caller: Caller,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<Movement>>> {
    let movements = state
        .stock
        .movements(Some(product_id), Some(PRODUCT_MOVEMENTS_LIMIT))
        .await?;
    Ok(Json(movements))
}

/// Timestamp and actor on the stored movement come from the server; the
/// payload cannot set them.
pub async fn create_movement(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(request): Json<MovementRequest>,
) -> AppResult<Json<Movement>> {
    let movement = state.stock.record_movement(request, &actor).await?;
    Ok(Json(movement))
}
