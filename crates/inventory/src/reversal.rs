//! Compensating entries.
//!
//! The ledger never mutates history. A mistaken entry is corrected by posting
//! its negation on the same stream, pointing back at the original through a
//! `stock_movement` reference.

use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, MovementId, UserId};

use crate::movement::{DocumentRef, MovementType, Posting, StockMovement};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalRequest {
    pub movement_id: MovementId,
    pub created_by: UserId,
    pub notes: Option<String>,
}

impl ReversalRequest {
    /// Build the compensating posting for `original`.
    ///
    /// The caller must hold the original's stream lock and must already have
    /// checked that no earlier reversal exists (see [`reverses`]).
    pub fn posting_for(&self, original: &StockMovement) -> DomainResult<Posting> {
        if original.id != self.movement_id {
            return Err(DomainError::invariant("reversal target id mismatch"));
        }
        if original.movement_type == MovementType::Reversal {
            return Err(DomainError::validation(
                "reversal entries cannot be reversed; post a new movement instead",
            ));
        }
        if self.created_by.is_nil() {
            return Err(DomainError::validation("created_by is required"));
        }

        Ok(Posting {
            key: original.stream_key(),
            movement_type: MovementType::Reversal,
            quantity: -original.quantity,
            reference: Some(DocumentRef::movement(original.id)),
            unit_cost: original.unit_cost,
            notes: self
                .notes
                .clone()
                .filter(|n| !n.trim().is_empty())
                .or_else(|| Some(format!("reversal of movement {}", original.id))),
            created_by: self.created_by,
        })
    }
}

/// `true` if `candidate` is the reversal entry of `original_id`.
pub fn reverses(candidate: &StockMovement, original_id: MovementId) -> bool {
    candidate.movement_type == MovementType::Reversal
        && candidate.reference.as_ref() == Some(&DocumentRef::movement(original_id))
}
