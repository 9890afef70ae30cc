//! Infrastructure layer: ledger storage backends, locking and configuration.

pub mod config;
pub mod error;
pub mod stock_ledger;

#[cfg(test)]
mod integration_tests;

pub use config::{BalanceStrategy, LedgerConfig};
pub use error::LedgerError;
pub use stock_ledger::{InMemoryStockLedger, PostgresStockLedger, StockLedger};
