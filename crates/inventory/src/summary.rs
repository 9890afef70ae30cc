use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult};

use crate::movement::StockMovement;

/// In/out decomposition of a set of ledger entries.
///
/// `inbound` sums positive quantities, `outbound` is the absolute sum of
/// negative quantities, and `net == inbound - outbound` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockSummary {
    #[serde(rename = "in")]
    pub inbound: Decimal,
    #[serde(rename = "out")]
    pub outbound: Decimal,
    pub net: Decimal,
    /// Number of entries summed.
    pub entries: u64,
    /// Σ quantity × unit_cost over entries that carry a unit cost.
    pub valuation: Decimal,
}

impl StockSummary {
    /// Build a summary from pre-aggregated totals (e.g. a SQL `SUM`).
    pub fn from_totals(inbound: Decimal, outbound: Decimal, entries: u64, valuation: Decimal) -> Self {
        let outbound = outbound.abs();
        Self {
            inbound,
            outbound,
            net: inbound - outbound,
            entries,
            valuation,
        }
    }

    /// Summarize `movements`; fails rather than overflow the decimal range.
    pub fn from_movements<'a>(
        movements: impl IntoIterator<Item = &'a StockMovement>,
    ) -> DomainResult<Self> {
        let mut summary = Self::default();
        for m in movements {
            summary.record(m)?;
        }
        summary.net = summary
            .inbound
            .checked_sub(summary.outbound)
            .ok_or_else(overflow)?;
        Ok(summary)
    }

    fn record(&mut self, movement: &StockMovement) -> DomainResult<()> {
        if movement.is_inbound() {
            self.inbound = self.inbound.checked_add(movement.quantity).ok_or_else(overflow)?;
        } else {
            self.outbound = self
                .outbound
                .checked_add(movement.quantity.abs())
                .ok_or_else(overflow)?;
        }
        self.entries += 1;
        if let Some(cost) = movement.unit_cost {
            let value = movement.quantity.checked_mul(cost).ok_or_else(overflow)?;
            self.valuation = self.valuation.checked_add(value).ok_or_else(overflow)?;
        }
        Ok(())
    }
}

fn overflow() -> DomainError {
    DomainError::invariant("summary total overflows decimal range")
}
