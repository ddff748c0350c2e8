use serde::Serialize;

use crate::{
    database::{from_document, Collection, Database, Filter, Sort},
    error::{AppError, AppResult},
    models::{Movement, Product},
};

pub const RECENT_MOVEMENTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowStock {
    /// Every low-stock product, regardless of `names`.
    pub count: usize,
    /// At most `cap` names, in iteration order.
    pub names: Vec<String>,
}

pub fn low_stock<'a, I>(products: I, cap: usize) -> LowStock
where
    I: IntoIterator<Item = &'a Product>,
{
    let mut count = 0;
    let mut names = Vec::new();
    for product in products.into_iter().filter(|p| p.is_low_stock()) {
        count += 1;
        if names.len() < cap {
            names.push(product.name.clone());
        }
    }
    LowStock { count, names }
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_products: u64,
    pub total_movements: u64,
    pub low_stock_count: usize,
    pub low_stock_products: Vec<String>,
    pub recent_movements: Vec<Movement>,
}

pub async fn recent_movements(db: &Database, n: usize) -> AppResult<Vec<Movement>> {
    db.find_many(
        Collection::Movements,
        &Filter::all(),
        Some(&Sort::descending("created_at")),
        Some(n),
    )
    .await?
    .into_iter()
    .map(|doc| from_document(doc).map_err(AppError::from))
    .collect()
}

pub async fn dashboard_stats(db: &Database, low_stock_cap: usize) -> AppResult<DashboardStats> {
    let total_products = db.count(Collection::Products, &Filter::all()).await?;
    let total_movements = db.count(Collection::Movements, &Filter::all()).await?;

    let products: Vec<Product> = db
        .find_many(Collection::Products, &Filter::all(), None, None)
        .await?
        .into_iter()
        .map(from_document::<Product>)
        .collect::<Result<_, _>>()?;
    let low = low_stock(&products, low_stock_cap);

    Ok(DashboardStats {
        total_products,
        total_movements,
        low_stock_count: low.count,
        low_stock_products: low.names,
        recent_movements: recent_movements(db, RECENT_MOVEMENTS).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::now;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn product(name: &str, stock_pieces: u64, min_stock_alert: u64) -> Product {
        let at = now();
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            barcode: None,
            category: None,
            price_per_piece: Decimal::ZERO,
            pieces_per_pallet: None,
            stock_pieces,
            stock_pallets: 0,
            min_stock_alert,
            created_at: at,
            updated_at: at,
            created_by: None,
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let products = [
            product("below", 5, 10),
            product("at", 10, 10),
            product("above", 11, 10),
        ];
        let low = low_stock(&products, 5);
        assert_eq!(low.count, 2);
        assert_eq!(low.names, vec!["below", "at"]);
    }

    #[test]
    fn names_are_capped_but_count_is_not() {
        let products: Vec<Product> = (0..8).map(|i| product(&format!("p{}", i), 0, 1)).collect();
        let low = low_stock(&products, 3);
        assert_eq!(low.count, 8);
        assert_eq!(low.names, vec!["p0", "p1", "p2"]);
    }
}
