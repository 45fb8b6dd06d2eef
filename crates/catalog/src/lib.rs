//! Product catalog domain module.
//!
//! This crate contains the product record and catalog-side validation,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Stock balances live on the product but are mutated only by the
//! ledger.

pub mod product;

pub use product::{Product, ProductDraft, ProductUpdate};
