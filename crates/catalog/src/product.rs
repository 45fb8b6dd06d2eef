use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainError, ProductId, SupplierId};

/// A catalog product.
///
/// `stock_quantity` is the cached balance derived from the movement log.
/// The catalog creates it (zero or an initial seed) and the ledger is the
/// only writer afterwards.
///
/// Prices are in the smallest currency unit (cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub stock_quantity: i64,
    pub min_stock: i64,
    pub price_cost: i64,
    pub price_sale: i64,
    pub category_id: Option<CategoryId>,
    pub supplier_ids: Vec<SupplierId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Low-stock flag used by the stock report. Advisory only, never
    /// enforced on movements.
    pub fn below_min(&self) -> bool {
        self.stock_quantity < self.min_stock
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub sku: String,
    pub name: String,
    pub initial_stock: i64,
    pub min_stock: i64,
    pub price_cost: i64,
    pub price_sale: i64,
    pub category_id: Option<CategoryId>,
    pub supplier_ids: Vec<SupplierId>,
}

impl ProductDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.initial_stock < 0 {
            return Err(DomainError::validation("initial stock cannot be negative"));
        }
        if self.min_stock < 0 {
            return Err(DomainError::validation("min stock cannot be negative"));
        }
        if self.price_cost < 0 || self.price_sale < 0 {
            return Err(DomainError::validation("prices cannot be negative"));
        }
        Ok(())
    }

    /// Materialize the draft into a product record.
    ///
    /// Callers must have run `validate()` first; the store does so before
    /// persisting.
    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> Product {
        Product {
            id,
            sku: self.sku,
            name: self.name,
            stock_quantity: self.initial_stock,
            min_stock: self.min_stock,
            price_cost: self.price_cost,
            price_sale: self.price_sale,
            category_id: self.category_id,
            supplier_ids: self.supplier_ids,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Catalog-side update. Deliberately has no `stock_quantity` field: the
/// balance is mutated only through accepted movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub sku: String,
    pub name: String,
    pub min_stock: i64,
    pub price_cost: i64,
    pub price_sale: i64,
    pub category_id: Option<CategoryId>,
    pub supplier_ids: Vec<SupplierId>,
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.min_stock < 0 {
            return Err(DomainError::validation("min stock cannot be negative"));
        }
        if self.price_cost < 0 || self.price_sale < 0 {
            return Err(DomainError::validation("prices cannot be negative"));
        }
        Ok(())
    }

    /// Apply the update to an existing record, preserving identity, balance
    /// and creation time.
    pub fn apply_to(self, product: &Product, now: DateTime<Utc>) -> Product {
        Product {
            id: product.id,
            sku: self.sku,
            name: self.name,
            stock_quantity: product.stock_quantity,
            min_stock: self.min_stock,
            price_cost: self.price_cost,
            price_sale: self.price_sale,
            category_id: self.category_id,
            supplier_ids: self.supplier_ids,
            created_at: product.created_at,
            updated_at: now,
        }
    }
}
