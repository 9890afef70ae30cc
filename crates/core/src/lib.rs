//! `stockledger-core`: identifiers and error primitives shared by the ledger crates.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{MovementId, ProductId, UserId, WarehouseId};
