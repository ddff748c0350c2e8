use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    database::{from_document, to_document, Collection, Filter, Sort},
    error::{AppError, AppResult},
    middleware::Caller,
    models::{now, Product, ProductInput},
    services::stock::{LedgerSummary, OpeningBalance, Reconciliation},
    AppState,
};

pub async fn list_products(
    State(state): State<AppState>,
    _caller: Caller,
) -> AppResult<Json<Vec<Product>>> {
    let products = state
        .db
        .find_many(Collection::Products, &Filter::all(), Some(&Sort::ascending("name")), None)
        .await?
        .into_iter()
        .map(from_document)
        .collect::<Result<Vec<Product>, _>>()?;

    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    _caller: Caller,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    Ok(Json(state.stock.find_product(product_id).await?))
}

pub async fn get_product_by_barcode(
    State(state): State<AppState>,
    _caller: Caller,
    Path(barcode): Path<String>,
) -> AppResult<Json<Product>> {
    let not_found = || AppError::NotFound("No product with that barcode".to_string());

    let barcode = barcode.trim();
    if barcode.is_empty() {
        return Err(not_found());
    }

    let doc = state
        .db
        .find_one(Collection::Products, &Filter::all().eq("barcode", barcode))
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(from_document(doc)?))
}

pub async fn create_product(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(input): Json<ProductInput>,
) -> AppResult<Json<Product>> {
    input.validate()?;

    let at = now();
    let product = input.into_product(Uuid::new_v4(), at, at, actor.user_id);
    state
        .db
        .insert_one(Collection::Products, to_document(&product)?)
        .await?;

    log::info!("Product {} ({}) created by {}", product.id, product.name, actor.username);
    Ok(Json(product))
}

/// Full replacement. Identity, creation time and owner are kept from the
/// stored record.
pub async fn update_product(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(product_id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> AppResult<Json<Product>> {
    input.validate()?;

    let _guard = state.stock.locks().acquire(product_id).await;
    let existing = state.stock.find_product(product_id).await?;

    let product = input.into_product(product_id, existing.created_at, now(), existing.created_by);
    let matched = state
        .db
        .replace_one(Collection::Products, &Filter::by_id(product_id), to_document(&product)?)
        .await?;
    if matched == 0 {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    log::info!("Product {} replaced by {}", product_id, actor.username);
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let deleted = {
        let _guard = state.stock.locks().acquire(product_id).await;
        state
            .db
            .delete_one(Collection::Products, &Filter::by_id(product_id))
            .await?
    };
    if deleted == 0 {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    log::info!("Product {} deleted by {}", product_id, actor.username);
    Ok(Json(json!({ "message": "Product deleted" })))
}

pub async fn product_ledger(
    State(state): State<AppState>,
    _caller: Caller,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<LedgerSummary>> {
    Ok(Json(state.stock.ledger_summary(product_id).await?))
}

pub async fn reconcile_product(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(product_id): Path<Uuid>,
    opening: Option<Json<OpeningBalance>>,
) -> AppResult<Json<Reconciliation>> {
    let opening = opening.map(|Json(opening)| opening).unwrap_or_default();
    log::info!("Reconciliation of product {} requested by {}", product_id, actor.username);
    Ok(Json(state.stock.reconcile(product_id, opening).await?))
}
