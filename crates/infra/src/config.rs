//! Ledger configuration, loaded from the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use stockledger_inventory::{NegativeStockPolicy, Pagination};

/// How `stock_before` is computed during an append.
///
/// Both strategies run inside the serialized unit of work and produce the same
/// chain; they differ only in cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStrategy {
    /// Read the newest entry's `stock_after` (O(1) per append).
    #[default]
    LatestSnapshot,
    /// Sum every prior quantity in the stream (O(n) per append).
    Resum,
}

impl core::str::FromStr for BalanceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest_snapshot" | "snapshot" => Ok(BalanceStrategy::LatestSnapshot),
            "resum" | "sum" => Ok(BalanceStrategy::Resum),
            other => Err(format!("unknown balance strategy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Upper bound on waiting for a stream lock before failing with `LockTimeout`.
    pub lock_timeout: Duration,
    pub balance_strategy: BalanceStrategy,
    pub negative_stock: NegativeStockPolicy,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(5_000),
            balance_strategy: BalanceStrategy::default(),
            negative_stock: NegativeStockPolicy::default(),
            default_page_size: Pagination::DEFAULT_LIMIT,
            max_page_size: Pagination::MAX_LIMIT,
        }
    }
}

impl LedgerConfig {
    pub const LOCK_TIMEOUT_MS: &'static str = "STOCK_LEDGER_LOCK_TIMEOUT_MS";
    pub const BALANCE_STRATEGY: &'static str = "STOCK_LEDGER_BALANCE_STRATEGY";
    pub const NEGATIVE_STOCK: &'static str = "STOCK_LEDGER_NEGATIVE_STOCK";
    pub const PAGE_SIZE: &'static str = "STOCK_LEDGER_PAGE_SIZE";
    pub const MAX_PAGE_SIZE: &'static str = "STOCK_LEDGER_MAX_PAGE_SIZE";

    /// Load from process environment variables. Unset variables keep their
    /// defaults; malformed ones are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64>(&lookup, Self::LOCK_TIMEOUT_MS) {
            if ms == 0 {
                tracing::warn!(var = Self::LOCK_TIMEOUT_MS, "lock timeout must be positive; keeping default");
            } else {
                config.lock_timeout = Duration::from_millis(ms);
            }
        }
        if let Some(strategy) = parse_var(&lookup, Self::BALANCE_STRATEGY) {
            config.balance_strategy = strategy;
        }
        if let Some(policy) = parse_var(&lookup, Self::NEGATIVE_STOCK) {
            config.negative_stock = policy;
        }
        if let Some(max) = parse_var::<u32>(&lookup, Self::MAX_PAGE_SIZE) {
            config.max_page_size = max.max(1);
        }
        if let Some(size) = parse_var::<u32>(&lookup, Self::PAGE_SIZE) {
            config.default_page_size = size.max(1);
        }
        config.default_page_size = config.default_page_size.min(config.max_page_size);

        config
    }

    /// Resolve caller paging against the configured default and cap.
    pub fn page(&self, page: Pagination) -> Pagination {
        page.resolve(self.default_page_size, self.max_page_size)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(var = name, value = %raw, error = %e, "ignoring malformed ledger setting");
            None
        }
    }
}
