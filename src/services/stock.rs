//! Stock bookkeeping.
//!
//! A product's `stock_pieces` / `stock_pallets` are a cached summary of its
//! movement ledger, updated eagerly on every movement. Exits clamp at zero
//! while the ledger keeps the requested quantity, so after an over-draft the
//! ledger sum and the cached stock disagree. That divergence is kept on
//! purpose; [`StockService::ledger_summary`] exposes it and
//! [`StockService::reconcile`] rebuilds the cache on request.
//!
//! The movement is written before the product. If the product write fails the
//! movement stays recorded and the cached stock is stale until reconciled.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::{
    config::MovementTypePolicy,
    database::{from_document, to_document, Collection, Database, Filter, Sort},
    error::{AppError, AppResult},
    models::{now, Actor, Movement, MovementRequest, MovementType, Product},
};

type LockMap = DashMap<Uuid, Arc<tokio::sync::Mutex<()>>>;

/// One async mutex per product id. Serializes read-compute-write cycles on a
/// product inside this process. An entry lives only while some task holds or
/// waits for it.
#[derive(Clone, Default)]
pub struct ProductLocks {
    inner: Arc<LockMap>,
}

impl ProductLocks {
    pub async fn acquire(&self, product_id: Uuid) -> ProductGuard {
        let lock = self.inner.entry(product_id).or_default().clone();
        let guard = lock.lock_owned().await;
        ProductGuard {
            product_id,
            locks: self.inner.clone(),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

pub struct ProductGuard {
    product_id: Uuid,
    locks: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ProductGuard {
    fn drop(&mut self) {
        // Release first so the guard's own handle no longer counts.
        self.guard.take();
        // Only the map's handle left: nobody holds or waits on this product.
        // `remove_if` runs under the shard lock `acquire` also takes.
        self.locks
            .remove_if(&self.product_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// New `(pieces, pallets)` after applying one movement's quantities.
/// Entries have no upper bound; exits stop at zero.
pub fn apply_quantities(
    stock: (u64, u64),
    kind: MovementType,
    quantity_pieces: u64,
    quantity_pallets: u64,
) -> (u64, u64) {
    let (pieces, pallets) = stock;
    match kind {
        MovementType::Entry => (
            pieces.saturating_add(quantity_pieces),
            pallets.saturating_add(quantity_pallets),
        ),
        MovementType::Exit => (
            pieces.saturating_sub(quantity_pieces),
            pallets.saturating_sub(quantity_pallets),
        ),
    }
}

/// Builds the ledger entry and the updated product for an accepted movement.
/// Time and actor come from the caller, never from the request payload.
pub fn apply_movement(
    product: &Product,
    kind: MovementType,
    request: &MovementRequest,
    actor: &Actor,
    at: DateTime<Utc>,
) -> (Movement, Product) {
    let movement = Movement {
        id: Uuid::new_v4(),
        product_id: product.id,
        movement_type: kind,
        quantity_pieces: request.quantity_pieces,
        quantity_pallets: request.quantity_pallets,
        movement_reason: request.movement_reason.clone(),
        barcode_scanned: request.barcode_scanned.clone(),
        created_at: at,
        user_id: actor.user_id,
        user: actor.username.clone(),
    };

    let (stock_pieces, stock_pallets) = apply_quantities(
        (product.stock_pieces, product.stock_pallets),
        kind,
        request.quantity_pieces,
        request.quantity_pallets,
    );
    let updated = Product {
        stock_pieces,
        stock_pallets,
        updated_at: at,
        ..product.clone()
    };

    (movement, updated)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub pieces: u64,
    pub pallets: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub product_id: Uuid,
    pub movement_count: usize,
    pub entry_pieces: u64,
    pub entry_pallets: u64,
    pub exit_pieces: u64,
    pub exit_pallets: u64,
    /// Requested entries minus requested exits, without clamping.
    pub net_pieces: i64,
    pub net_pallets: i64,
    pub cached: StockLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct OpeningBalance {
    #[serde(default)]
    pub pieces: u64,
    #[serde(default)]
    pub pallets: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub product_id: Uuid,
    pub movements_applied: usize,
    pub before: StockLevel,
    pub after: StockLevel,
}

fn signed_difference(a: u64, b: u64) -> i64 {
    (a as i128 - b as i128).clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[derive(Clone)]
pub struct StockService {
    db: Database,
    locks: ProductLocks,
    policy: MovementTypePolicy,
}

impl StockService {
    pub fn new(db: Database, policy: MovementTypePolicy) -> Self {
        Self {
            db,
            locks: ProductLocks::default(),
            policy,
        }
    }

    pub fn locks(&self) -> &ProductLocks {
        &self.locks
    }

    pub async fn find_product(&self, product_id: Uuid) -> AppResult<Product> {
        let doc = self
            .db
            .find_one(Collection::Products, &Filter::by_id(product_id))
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
        Ok(from_document(doc)?)
    }

    /// Validates, applies and persists one movement. Nothing is written when
    /// the type is rejected or the product does not exist.
    pub async fn record_movement(
        &self,
        request: MovementRequest,
        actor: &Actor,
    ) -> AppResult<Movement> {
        let kind = MovementType::parse(&request.movement_type, self.policy)?;

        let _guard = self.locks.acquire(request.product_id).await;
        let product = self.find_product(request.product_id).await?;

        let (movement, updated) = apply_movement(&product, kind, &request, actor, now());
        let movement_doc = to_document(&movement)?;
        let product_doc = to_document(&updated)?;

        self.db.insert_one(Collection::Movements, movement_doc).await?;

        match self
            .db
            .replace_one(Collection::Products, &Filter::by_id(product.id), product_doc)
            .await
        {
            Ok(0) => log::warn!(
                "Product {} vanished before movement {} could update its stock",
                product.id,
                movement.id
            ),
            Ok(_) => {}
            Err(err) => {
                log::error!(
                    "Movement {} recorded but stock of product {} was not updated: {}",
                    movement.id,
                    product.id,
                    err
                );
                return Err(err.into());
            }
        }

        log::info!(
            "{:?} of {} pieces / {} pallets on product {} by {}: stock now {} / {}",
            kind,
            movement.quantity_pieces,
            movement.quantity_pallets,
            product.id,
            actor.username,
            updated.stock_pieces,
            updated.stock_pallets
        );
        Ok(movement)
    }

    /// Most recent first. `product_id` narrows the ledger to one product.
    pub async fn movements(
        &self,
        product_id: Option<Uuid>,
        limit: Option<usize>,
    ) -> AppResult<Vec<Movement>> {
        let filter = match product_id {
            Some(id) => Filter::all().eq("product_id", id.to_string()),
            None => Filter::all(),
        };
        self.db
            .find_many(
                Collection::Movements,
                &filter,
                Some(&Sort::descending("created_at")),
                limit,
            )
            .await?
            .into_iter()
            .map(|doc| from_document(doc).map_err(AppError::from))
            .collect()
    }

    async fn full_ledger(&self, product_id: Uuid) -> AppResult<Vec<Movement>> {
        self.db
            .find_many(
                Collection::Movements,
                &Filter::all().eq("product_id", product_id.to_string()),
                Some(&Sort::ascending("created_at")),
                None,
            )
            .await?
            .into_iter()
            .map(|doc| from_document(doc).map_err(AppError::from))
            .collect()
    }

    pub async fn ledger_summary(&self, product_id: Uuid) -> AppResult<LedgerSummary> {
        let product = self.find_product(product_id).await?;
        let ledger = self.full_ledger(product_id).await?;

        let mut summary = LedgerSummary {
            product_id,
            movement_count: ledger.len(),
            entry_pieces: 0,
            entry_pallets: 0,
            exit_pieces: 0,
            exit_pallets: 0,
            net_pieces: 0,
            net_pallets: 0,
            cached: StockLevel {
                pieces: product.stock_pieces,
                pallets: product.stock_pallets,
            },
        };
        for movement in &ledger {
            let (pieces, pallets) = match movement.movement_type {
                MovementType::Entry => (&mut summary.entry_pieces, &mut summary.entry_pallets),
                MovementType::Exit => (&mut summary.exit_pieces, &mut summary.exit_pallets),
            };
            *pieces = pieces.saturating_add(movement.quantity_pieces);
            *pallets = pallets.saturating_add(movement.quantity_pallets);
        }
        summary.net_pieces = signed_difference(summary.entry_pieces, summary.exit_pieces);
        summary.net_pallets = signed_difference(summary.entry_pallets, summary.exit_pallets);
        Ok(summary)
    }

    /// Recomputes the cached stock by folding the whole ledger, oldest first,
    /// from `opening` with the same clamping as live movements. Movements with
    /// identical timestamps fold in store order.
    pub async fn reconcile(
        &self,
        product_id: Uuid,
        opening: OpeningBalance,
    ) -> AppResult<Reconciliation> {
        let _guard = self.locks.acquire(product_id).await;
        let product = self.find_product(product_id).await?;
        let ledger = self.full_ledger(product_id).await?;

        let (pieces, pallets) = ledger.iter().fold((opening.pieces, opening.pallets), |stock, m| {
            apply_quantities(stock, m.movement_type, m.quantity_pieces, m.quantity_pallets)
        });

        let before = StockLevel {
            pieces: product.stock_pieces,
            pallets: product.stock_pallets,
        };
        let updated = Product {
            stock_pieces: pieces,
            stock_pallets: pallets,
            updated_at: now(),
            ..product
        };
        let matched = self
            .db
            .replace_one(Collection::Products, &Filter::by_id(product_id), to_document(&updated)?)
            .await?;
        if matched == 0 {
            return Err(AppError::NotFound("Product not found".to_string()));
        }

        log::info!(
            "Reconciled product {} over {} movements: {} / {} -> {} / {}",
            product_id,
            ledger.len(),
            before.pieces,
            before.pallets,
            pieces,
            pallets
        );
        Ok(Reconciliation {
            product_id,
            movements_applied: ledger.len(),
            before,
            after: StockLevel { pieces, pallets },
        })
    }
}
