use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::iso8601;
use crate::{config::MovementTypePolicy, error::AppError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub price_per_piece: Decimal,
    /// `None` means the pallet size varies.
    #[serde(default)]
    pub pieces_per_pallet: Option<u32>,
    #[serde(default, alias = "current_stock_pieces")]
    pub stock_pieces: u64,
    #[serde(default, alias = "current_stock_pallets")]
    pub stock_pallets: u64,
    #[serde(default)]
    pub min_stock_alert: u64,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock_pieces <= self.min_stock_alert
    }
}

/// Client payload for creating or replacing a product. Identity, timestamps
/// and ownership are always set by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub price_per_piece: Decimal,
    #[serde(default)]
    pub pieces_per_pallet: Option<u32>,
    #[serde(default, alias = "current_stock_pieces")]
    pub stock_pieces: u64,
    #[serde(default, alias = "current_stock_pallets")]
    pub stock_pallets: u64,
    #[serde(default)]
    pub min_stock_alert: u64,
}

impl ProductInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Product name is required".to_string()));
        }
        if self.pieces_per_pallet == Some(0) {
            return Err(AppError::Validation(
                "pieces_per_pallet must be positive when given".to_string(),
            ));
        }
        if self.price_per_piece.is_sign_negative() {
            return Err(AppError::Validation(
                "price_per_piece cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_product(
        self,
        id: Uuid,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        created_by: Option<Uuid>,
    ) -> Product {
        Product {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            barcode: self.barcode.filter(|b| !b.trim().is_empty()),
            category: self.category,
            price_per_piece: self.price_per_piece,
            pieces_per_pallet: self.pieces_per_pallet,
            stock_pieces: self.stock_pieces,
            stock_pallets: self.stock_pallets,
            min_stock_alert: self.min_stock_alert,
            created_at,
            updated_at,
            created_by,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Entry,
    Exit,
}

impl MovementType {
    /// Resolves a client-supplied tag. Under the legacy policy anything that
    /// is not an entry counts as an exit.
    pub fn parse(tag: &str, policy: MovementTypePolicy) -> Result<Self, AppError> {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case("entry") {
            Ok(MovementType::Entry)
        } else if tag.eq_ignore_ascii_case("exit") {
            Ok(MovementType::Exit)
        } else {
            match policy {
                MovementTypePolicy::Legacy => {
                    log::warn!("Unrecognized movement type {:?} applied as exit", tag);
                    Ok(MovementType::Exit)
                }
                MovementTypePolicy::Strict => Err(AppError::Validation(format!(
                    "movement_type must be \"entry\" or \"exit\", got {:?}",
                    tag
                ))),
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovementRequest {
    pub product_id: Uuid,
    pub movement_type: String,
    pub quantity_pieces: u64,
    #[serde(default)]
    pub quantity_pallets: u64,
    #[serde(default)]
    pub movement_reason: Option<String>,
    #[serde(default)]
    pub barcode_scanned: Option<String>,
}

/// One ledger entry. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub quantity_pieces: u64,
    pub quantity_pallets: u64,
    #[serde(default)]
    pub movement_reason: Option<String>,
    #[serde(default)]
    pub barcode_scanned: Option<String>,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub user: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn movement_type_tags() {
        let strict = MovementTypePolicy::Strict;
        assert_eq!(MovementType::parse("entry", strict).unwrap(), MovementType::Entry);
        assert_eq!(MovementType::parse(" EXIT ", strict).unwrap(), MovementType::Exit);
        assert!(matches!(
            MovementType::parse("transfer", strict),
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            MovementType::parse("transfer", MovementTypePolicy::Legacy).unwrap(),
            MovementType::Exit
        );
    }

    #[test]
    fn legacy_stock_field_names_are_read() {
        let product: Product = serde_json::from_value(json!({
            "id": "6f1d7f5e-1c55-4f3a-9d0e-0d3c1b2a4e5f",
            "name": "Ladrillo",
            "current_stock_pieces": 40,
            "current_stock_pallets": 2,
            "min_stock_alert": 10,
            "price_per_piece": 2.5,
            "created_at": "2024-01-01T00:00:00+00:00",
            "updated_at": "2024-01-01T00:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(product.stock_pieces, 40);
        assert_eq!(product.stock_pallets, 2);
        assert_eq!(product.price_per_piece, Decimal::new(25, 1));
        assert!(product.created_by.is_none());
    }

    #[test]
    fn negative_quantities_do_not_deserialize() {
        let result: Result<MovementRequest, _> = serde_json::from_value(json!({
            "product_id": "6f1d7f5e-1c55-4f3a-9d0e-0d3c1b2a4e5f",
            "movement_type": "exit",
            "quantity_pieces": -3
        }));
        assert!(result.is_err());
    }

    #[test]
    fn product_input_validation() {
        let mut input: ProductInput = serde_json::from_value(json!({"name": "  "})).unwrap();
        assert!(input.validate().is_err());
        input.name = "Cemento".to_string();
        assert!(input.validate().is_ok());
        input.pieces_per_pallet = Some(0);
        assert!(input.validate().is_err());
    }
}
