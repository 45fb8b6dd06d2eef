//! Storage backends and the application service.
//!
//! The ledger logic is written once against the [`store::StockStore`]
//! interface; two implementations sit behind it (in-memory with per-product
//! mutual exclusion for demos/tests, Postgres with row-locking transactions
//! for real deployments).

pub mod ledger;
pub mod store;


pub use ledger::{LedgerError, StockLedger};
pub use store::{
    InMemoryStockStore, MovementFilter, PostgresStockStore, StockStore, StoreError,
};
