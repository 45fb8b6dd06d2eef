//! Shared kernel: strongly-typed identifiers and the domain error model.
//!
//! Everything in this crate is pure data. IO, storage and HTTP concerns live
//! in `stockroom-infra` and `stockroom-api`.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, MovementId, ProductId, SupplierId, UserId};
