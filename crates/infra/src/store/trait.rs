use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use stockroom_catalog::{Product, ProductDraft, ProductUpdate};
use stockroom_core::{DomainError, ProductId, UserId};
use stockroom_ledger::{MovementDraft, MovementType, StockMovement};

/// Storage operation error.
///
/// `Rejected` carries deterministic business rejections surfaced from the
/// balance-transition rule evaluated inside the store's atomic scope
/// (validation, insufficient stock); everything else is infrastructure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced product does not exist.
    #[error("not found")]
    NotFound,

    /// The movement was rejected by the balance-transition rule.
    #[error(transparent)]
    Rejected(#[from] DomainError),

    /// A product with this SKU already exists.
    #[error("sku '{0}' already exists")]
    DuplicateSku(String),

    /// The product is referenced by at least one movement and cannot be
    /// deleted.
    #[error("product is referenced by stock movements")]
    MovementsReferenced,

    /// Backend failure (connection, timeout, constraint violation).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Filter criteria for movement queries. All fields optional; ranges are
/// inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub user_id: Option<UserId>,
    pub movement_type: Option<MovementType>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &StockMovement) -> bool {
        if let Some(product_id) = self.product_id {
            if movement.product_id != product_id {
                return false;
            }
        }
        if let Some(user_id) = self.user_id {
            if movement.user_id != user_id {
                return false;
            }
        }
        if let Some(movement_type) = self.movement_type {
            if movement.movement_type != movement_type {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if movement.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if movement.created_at > to {
                return false;
            }
        }
        true
    }
}

/// Storage backend for the product catalog and the movement log.
///
/// Implementations must:
/// - treat `apply_movement` as one atomic unit: product lookup, the
///   balance-transition check, the log append and the balance write either
///   all happen or none do, serialized per product (concurrent calls for
///   different products may proceed in parallel)
/// - keep the movement log append-only (no update or delete surface exists
///   on this trait by design)
/// - enforce SKU uniqueness and the deletion guard (a product referenced by
///   any movement cannot be deleted)
#[async_trait]
pub trait StockStore: Send + Sync {
    async fn insert_product(&self, draft: ProductDraft) -> Result<Product, StoreError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// All products, ordered by name.
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Update catalog fields. Never touches the stock balance.
    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, StoreError>;

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError>;

    /// Validate the draft against the current balance and, on acceptance,
    /// append the movement and write the new balance atomically.
    async fn apply_movement(&self, draft: MovementDraft) -> Result<StockMovement, StoreError>;

    /// Movements matching the filter, most recent first (`created_at`
    /// descending, ties broken by id descending).
    async fn query_movements(
        &self,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, StoreError>;
}

#[async_trait]
impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    async fn insert_product(&self, draft: ProductDraft) -> Result<Product, StoreError> {
        (**self).insert_product(draft).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).get_product(id).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list_products().await
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, StoreError> {
        (**self).update_product(id, update).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        (**self).delete_product(id).await
    }

    async fn apply_movement(&self, draft: MovementDraft) -> Result<StockMovement, StoreError> {
        (**self).apply_movement(draft).await
    }

    async fn query_movements(
        &self,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, StoreError> {
        (**self).query_movements(filter).await
    }
}
