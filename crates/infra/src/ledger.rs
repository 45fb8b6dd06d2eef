//! The stock ledger application service.
//!
//! `StockLedger` owns the movement/report operations and the catalog
//! passthroughs, written once against the [`StockStore`] interface so the
//! in-memory and Postgres backends share the exact same semantics.
//!
//! Failure semantics: every operation is all-or-nothing. Validation happens
//! before any write, and the store's `apply_movement` is a single atomic
//! unit, so a rejected or failed movement leaves neither a log record nor a
//! balance change behind. Storage failures are surfaced, never retried:
//! a movement append is not idempotent, so retrying is a caller decision.

use chrono::{DateTime, Utc};
use thiserror::Error;

use stockroom_catalog::{Product, ProductDraft, ProductUpdate};
use stockroom_core::{DomainError, ProductId};
use stockroom_ledger::{
    DetailedSalesReport, MovementDraft, MovementType, SalesSummary, StockMovement, StockReportRow,
    report,
};

use crate::store::{MovementFilter, StockStore, StoreError};

/// Ledger operation error, the caller-facing taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed or missing input; recoverable by correcting the request.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced product/entity does not exist.
    #[error("not found")]
    NotFound,

    /// Business-rule rejection: the exit would drive stock negative.
    /// Never clamped or partially applied.
    #[error("insufficient stock: {available} units available")]
    InsufficientStock { available: i64 },

    /// The request conflicts with existing state (duplicate SKU, deletion
    /// of a referenced product).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Underlying persistence failure. Not retried automatically.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => LedgerError::Validation(msg),
            DomainError::InvalidId(msg) => LedgerError::Validation(msg),
            DomainError::NotFound => LedgerError::NotFound,
            DomainError::InsufficientStock { available } => {
                LedgerError::InsufficientStock { available }
            }
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => LedgerError::NotFound,
            StoreError::Rejected(domain) => domain.into(),
            StoreError::DuplicateSku(sku) => {
                LedgerError::Conflict(format!("sku '{sku}' already exists"))
            }
            StoreError::MovementsReferenced => {
                LedgerError::Conflict("product is referenced by stock movements".to_string())
            }
            StoreError::Backend(msg) => LedgerError::Storage(msg),
        }
    }
}

/// Application service over a [`StockStore`] backend.
#[derive(Debug)]
pub struct StockLedger<S> {
    store: S,
}

impl<S> StockLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> StockLedger<S>
where
    S: StockStore,
{
    /// Accept a movement: validate the draft, then let the store run the
    /// balance check, log append and balance write as one atomic unit.
    ///
    /// Returns the created movement (with assigned id and timestamp).
    pub async fn record_movement(
        &self,
        draft: MovementDraft,
    ) -> Result<StockMovement, LedgerError> {
        draft.validate()?;
        let movement = self.store.apply_movement(draft).await?;

        tracing::info!(
            movement_id = %movement.id,
            product_id = %movement.product_id,
            movement_type = movement.movement_type.as_str(),
            quantity = movement.quantity,
            "movement recorded"
        );
        Ok(movement)
    }

    /// The product's cached balance. Equivalent to replaying its movement
    /// log from the initial balance.
    pub async fn current_balance(&self, product_id: ProductId) -> Result<i64, LedgerError> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(LedgerError::NotFound)?;
        Ok(product.stock_quantity)
    }

    /// Movements matching the filter, most recent first.
    pub async fn list_movements(
        &self,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, LedgerError> {
        Ok(self.store.query_movements(filter).await?)
    }

    /// Stock levels and low-stock flags for every product.
    pub async fn stock_report(&self) -> Result<Vec<StockReportRow>, LedgerError> {
        let products = self.store.list_products().await?;
        Ok(report::stock_report(&products))
    }

    /// Quantity and revenue totals over all sale exits.
    pub async fn sales_report(&self) -> Result<SalesSummary, LedgerError> {
        let (movements, products) = self.sale_inputs().await?;
        Ok(report::sales_summary(&movements, &products))
    }

    /// Per-product, per-day and top-product views over the sale exits.
    pub async fn detailed_sales_report(
        &self,
        now: DateTime<Utc>,
    ) -> Result<DetailedSalesReport, LedgerError> {
        let (movements, products) = self.sale_inputs().await?;
        Ok(report::detailed_sales_report(&movements, &products, now))
    }

    async fn sale_inputs(&self) -> Result<(Vec<StockMovement>, Vec<Product>), LedgerError> {
        let filter = MovementFilter {
            movement_type: Some(MovementType::Exit),
            ..Default::default()
        };
        let movements = self.store.query_movements(&filter).await?;
        let products = self.store.list_products().await?;
        Ok((movements, products))
    }

    // Catalog passthroughs. The ledger owns product state, so catalog
    // writes go through it as well.

    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product, LedgerError> {
        draft.validate()?;
        Ok(self.store.insert_product(draft).await?)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product, LedgerError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(LedgerError::NotFound)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, LedgerError> {
        Ok(self.store.list_products().await?)
    }

    pub async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, LedgerError> {
        update.validate()?;
        Ok(self.store.update_product(id, update).await?)
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<(), LedgerError> {
        Ok(self.store.delete_product(id).await?)
    }
}
