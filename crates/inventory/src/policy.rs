use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a stream may be driven below zero.
///
/// POS terminals commonly sell ahead of a late purchase receipt, so the ledger
/// allows negative balances unless a deployment opts into `Reject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeStockPolicy {
    #[default]
    Allow,
    Reject,
}

impl NegativeStockPolicy {
    /// Check a prospective posting. Inbound postings are always permitted so a
    /// stream that is already negative can be replenished.
    pub fn permits(self, stock_before: Decimal, quantity: Decimal) -> bool {
        match self {
            NegativeStockPolicy::Allow => true,
            NegativeStockPolicy::Reject => {
                quantity > Decimal::ZERO
                    || stock_before
                        .checked_add(quantity)
                        .is_some_and(|after| after >= Decimal::ZERO)
            }
        }
    }
}

impl core::str::FromStr for NegativeStockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(NegativeStockPolicy::Allow),
            "reject" => Ok(NegativeStockPolicy::Reject),
            other => Err(format!("unknown negative stock policy '{other}'")),
        }
    }
}
