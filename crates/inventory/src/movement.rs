use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, MovementId, ProductId, UserId, WarehouseId};

use crate::amount;

/// Ledger stream key: one running balance per product per warehouse.
///
/// `Ord` gives the deterministic order used when more than one stream must be
/// locked in the same unit of work.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamKey {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
}

impl StreamKey {
    pub fn new(product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        Self {
            product_id,
            warehouse_id,
        }
    }
}

impl core::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.product_id, self.warehouse_id)
    }
}

/// Business classification of a movement. Informational only; balance math
/// looks at the signed quantity alone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    PurchaseReceipt,
    PurchaseReturn,
    Sale,
    SaleReturn,
    Adjustment,
    TransferIn,
    TransferOut,
    Reversal,
    OpeningBalance,
}

impl MovementType {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::PurchaseReceipt => "purchase_receipt",
            MovementType::PurchaseReturn => "purchase_return",
            MovementType::Sale => "sale",
            MovementType::SaleReturn => "sale_return",
            MovementType::Adjustment => "adjustment",
            MovementType::TransferIn => "transfer_in",
            MovementType::TransferOut => "transfer_out",
            MovementType::Reversal => "reversal",
            MovementType::OpeningBalance => "opening_balance",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "purchase_receipt" => MovementType::PurchaseReceipt,
            "purchase_return" => MovementType::PurchaseReturn,
            "sale" => MovementType::Sale,
            "sale_return" => MovementType::SaleReturn,
            "adjustment" => MovementType::Adjustment,
            "transfer_in" => MovementType::TransferIn,
            "transfer_out" => MovementType::TransferOut,
            "reversal" => MovementType::Reversal,
            "opening_balance" => MovementType::OpeningBalance,
            other => {
                return Err(DomainError::validation(format!("unknown movement type '{other}'")));
            }
        })
    }
}

/// Direction of a quantity expressed as a magnitude.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
}

/// The two ways callers may express a quantity change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityInput {
    /// A magnitude plus direction. The sign of `magnitude` is ignored.
    Directed { magnitude: Decimal, direction: Direction },
    /// An already-signed quantity, used as-is.
    Signed(Decimal),
}

impl QuantityInput {
    pub fn inbound(magnitude: Decimal) -> Self {
        Self::Directed {
            magnitude,
            direction: Direction::In,
        }
    }

    pub fn outbound(magnitude: Decimal) -> Self {
        Self::Directed {
            magnitude,
            direction: Direction::Out,
        }
    }

    /// Resolve to the signed quantity stored on the ledger entry.
    pub fn signed(self) -> Decimal {
        match self {
            QuantityInput::Directed { magnitude, direction } => {
                let magnitude = magnitude.abs();
                match direction {
                    Direction::In => magnitude,
                    Direction::Out => -magnitude,
                }
            }
            QuantityInput::Signed(q) => q,
        }
    }
}

/// Weak pointer to the business document that caused a movement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub reference_type: String,
    pub reference_id: String,
}

impl DocumentRef {
    /// Reference type used by reversal entries to point at the entry they compensate.
    pub const STOCK_MOVEMENT: &'static str = "stock_movement";

    pub fn new(reference_type: impl Into<String>, reference_id: impl Into<String>) -> Self {
        Self {
            reference_type: reference_type.into(),
            reference_id: reference_id.into(),
        }
    }

    pub fn movement(id: MovementId) -> Self {
        Self::new(Self::STOCK_MOVEMENT, id.to_string())
    }

    fn validate(&self) -> DomainResult<()> {
        if self.reference_type.trim().is_empty() || self.reference_id.trim().is_empty() {
            return Err(DomainError::validation(
                "reference_type and reference_id must both be non-empty",
            ));
        }
        Ok(())
    }
}

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub movement_type: MovementType,
    /// Signed change; never zero.
    pub quantity: Decimal,
    pub reference: Option<DocumentRef>,
    pub stock_before: Decimal,
    pub stock_after: Decimal,
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn stream_key(&self) -> StreamKey {
        StreamKey::new(self.product_id, self.warehouse_id)
    }

    pub fn is_inbound(&self) -> bool {
        self.quantity.is_sign_positive()
    }
}

/// Caller request to record a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovementRequest {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub movement_type: MovementType,
    pub quantity: QuantityInput,
    pub reference: Option<DocumentRef>,
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
    pub created_by: UserId,
}

impl NewMovementRequest {
    /// Validate the request and resolve it into a posting.
    ///
    /// The signed quantity is computed exactly once, here.
    pub fn normalize(&self) -> DomainResult<Posting> {
        if self.product_id.is_nil() {
            return Err(DomainError::validation("product_id is required"));
        }
        if self.warehouse_id.is_nil() {
            return Err(DomainError::validation("warehouse_id is required"));
        }
        if self.created_by.is_nil() {
            return Err(DomainError::validation("created_by is required"));
        }

        let quantity = self.quantity.signed();
        if quantity.is_zero() {
            return Err(DomainError::validation("quantity cannot be zero"));
        }
        amount::check("quantity", quantity)?;

        if let Some(cost) = self.unit_cost {
            if cost < Decimal::ZERO {
                return Err(DomainError::validation("unit_cost cannot be negative"));
            }
            amount::check("unit_cost", cost)?;
        }
        if let Some(reference) = &self.reference {
            reference.validate()?;
        }

        Ok(Posting {
            key: StreamKey::new(self.product_id, self.warehouse_id),
            movement_type: self.movement_type,
            quantity,
            reference: self.reference.clone(),
            unit_cost: self.unit_cost,
            notes: self.notes.clone().filter(|n| !n.trim().is_empty()),
            created_by: self.created_by,
        })
    }
}

/// A validated movement waiting for its balance snapshot and id.
///
/// Produced by request normalization; turned into a [`StockMovement`] by the
/// store while it holds the stream lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub key: StreamKey,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub reference: Option<DocumentRef>,
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
    pub created_by: UserId,
}

impl Posting {
    /// Balance after this posting is applied on top of `stock_before`.
    ///
    /// Fails when the result leaves the stored precision.
    pub fn stock_after(&self, stock_before: Decimal) -> DomainResult<Decimal> {
        amount::balance_after(stock_before, self.quantity)
    }

    /// Materialize the ledger entry.
    pub fn into_movement(
        self,
        id: MovementId,
        stock_before: Decimal,
        created_at: DateTime<Utc>,
    ) -> DomainResult<StockMovement> {
        let stock_after = self.stock_after(stock_before)?;
        Ok(StockMovement {
            id,
            product_id: self.key.product_id,
            warehouse_id: self.key.warehouse_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            reference: self.reference,
            stock_before,
            stock_after,
            unit_cost: self.unit_cost,
            notes: self.notes,
            created_by: self.created_by,
            created_at,
        })
    }
}
