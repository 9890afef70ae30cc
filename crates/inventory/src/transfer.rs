//! Inter-warehouse transfers: one outbound leg and one inbound leg posted in
//! the same unit of work.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, ProductId, UserId, WarehouseId};

use crate::movement::{
    DocumentRef, MovementType, NewMovementRequest, Posting, QuantityInput, StockMovement,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub product_id: ProductId,
    pub from_warehouse: WarehouseId,
    pub to_warehouse: WarehouseId,
    /// Strictly positive quantity moved.
    pub quantity: Decimal,
    pub reference: Option<DocumentRef>,
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
    pub created_by: UserId,
}

/// The two validated legs of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLegs {
    pub outbound: Posting,
    pub inbound: Posting,
}

/// Both committed legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub outbound: StockMovement,
    pub inbound: StockMovement,
}

impl TransferRequest {
    pub fn legs(&self) -> DomainResult<TransferLegs> {
        if self.from_warehouse == self.to_warehouse {
            return Err(DomainError::validation(
                "transfer source and destination must differ",
            ));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(DomainError::validation("transfer quantity must be positive"));
        }

        let leg = |warehouse_id, movement_type, quantity| NewMovementRequest {
            product_id: self.product_id,
            warehouse_id,
            movement_type,
            quantity,
            reference: self.reference.clone(),
            unit_cost: self.unit_cost,
            notes: self.notes.clone(),
            created_by: self.created_by,
        };

        Ok(TransferLegs {
            outbound: leg(
                self.from_warehouse,
                MovementType::TransferOut,
                QuantityInput::outbound(self.quantity),
            )
            .normalize()?,
            inbound: leg(
                self.to_warehouse,
                MovementType::TransferIn,
                QuantityInput::inbound(self.quantity),
            )
            .normalize()?,
        })
    }
}
