//! Stock ledger domain module.
//!
//! Business rules for the append-only stock movement ledger, implemented as
//! deterministic domain logic (no IO, no locking, no storage). Stores in
//! `stockledger-infra` call into this crate while holding a stream lock.

pub mod amount;
pub mod chain;
pub mod movement;
pub mod policy;
pub mod query;
pub mod reversal;
pub mod summary;
pub mod transfer;

pub use chain::{ChainBreak, StreamAudit, verify_chain};
pub use movement::{
    Direction, DocumentRef, MovementType, NewMovementRequest, Posting, QuantityInput,
    StockMovement, StreamKey,
};
pub use policy::NegativeStockPolicy;
pub use query::{MovementFilter, MovementPage, Pagination, SortOrder};
pub use reversal::{ReversalRequest, reverses};
pub use summary::StockSummary;
pub use transfer::{TransferLegs, TransferReceipt, TransferRequest};
