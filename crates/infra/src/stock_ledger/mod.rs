//! Append-only stock ledger boundary.
//!
//! [`StockLedger`] is the storage-facing contract for recording and querying
//! stock movements per `(product_id, warehouse_id)` stream. Two backends:
//! - [`InMemoryStockLedger`]: process-local, for tests and development
//! - [`PostgresStockLedger`]: durable, safe across service instances

pub mod in_memory;
pub mod lock;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStockLedger;
pub use lock::{StreamGuard, StreamLocks};
pub use postgres::PostgresStockLedger;
pub use r#trait::StockLedger;
