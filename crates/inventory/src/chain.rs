//! Running-balance verification for a ledger stream.
//!
//! Correctness is defined by summation. The `stock_before`/`stock_after`
//! snapshots stored on each entry are a cache; this module checks that cache
//! against the summed quantities.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::MovementId;

use crate::movement::{StockMovement, StreamKey};

/// A single inconsistency found while walking a stream oldest-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainBreak {
    /// `stock_before` differs from the summed balance of all earlier entries.
    StaleBefore {
        id: MovementId,
        expected: Decimal,
        recorded: Decimal,
    },
    /// `stock_after != stock_before + quantity` on the entry itself.
    InconsistentAfter {
        id: MovementId,
        expected: Decimal,
        recorded: Decimal,
    },
    /// Entries are not strictly increasing by id.
    OutOfOrder { previous: MovementId, id: MovementId },
    /// Entry belongs to a different stream.
    ForeignEntry { id: MovementId },
    /// A zero quantity made it into the ledger.
    ZeroQuantity { id: MovementId },
    /// Summing stopped here because the balance left the decimal range.
    Overflow { id: MovementId },
}

/// Result of auditing one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamAudit {
    pub key: StreamKey,
    pub entries: u64,
    /// Balance obtained by summing every quantity.
    pub balance: Decimal,
    /// `stock_after` of the newest entry, if any.
    pub snapshot_balance: Option<Decimal>,
    pub breaks: Vec<ChainBreak>,
}

impl StreamAudit {
    pub fn is_consistent(&self) -> bool {
        self.breaks.is_empty()
    }
}

/// Walk `movements` (oldest first) and report every chain break.
pub fn verify_chain(key: StreamKey, movements: &[StockMovement]) -> StreamAudit {
    let mut balance = Decimal::ZERO;
    let mut breaks = Vec::new();
    let mut previous: Option<MovementId> = None;

    for m in movements {
        if m.stream_key() != key {
            breaks.push(ChainBreak::ForeignEntry { id: m.id });
            continue;
        }
        if let Some(prev) = previous {
            if m.id <= prev {
                breaks.push(ChainBreak::OutOfOrder { previous: prev, id: m.id });
            }
        }
        if m.quantity.is_zero() {
            breaks.push(ChainBreak::ZeroQuantity { id: m.id });
        }
        if m.stock_before != balance {
            breaks.push(ChainBreak::StaleBefore {
                id: m.id,
                expected: balance,
                recorded: m.stock_before,
            });
        }
        match m.stock_before.checked_add(m.quantity) {
            Some(expected) if expected != m.stock_after => {
                breaks.push(ChainBreak::InconsistentAfter {
                    id: m.id,
                    expected,
                    recorded: m.stock_after,
                });
            }
            Some(_) => {}
            None => breaks.push(ChainBreak::Overflow { id: m.id }),
        }

        let Some(next) = balance.checked_add(m.quantity) else {
            breaks.push(ChainBreak::Overflow { id: m.id });
            break;
        };
        balance = next;
        previous = Some(m.id);
    }

    StreamAudit {
        key,
        entries: movements.len() as u64,
        balance,
        snapshot_balance: movements.last().map(|m| m.stock_after),
        breaks,
    }
}
