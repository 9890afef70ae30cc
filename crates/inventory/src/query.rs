//! Read-side query types: filters, ordering and pagination for ledger history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::movement::{MovementType, StockMovement};

/// Pagination parameters for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of movements to return. `0` selects the store's
    /// configured default page size.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 1000;

    /// A missing limit is left at `0` for the store to resolve.
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(0).min(Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }

    /// Fill in `default_limit` when unset and cap at `max_limit`.
    pub fn resolve(self, default_limit: u32, max_limit: u32) -> Self {
        let limit = if self.limit == 0 { default_limit } else { self.limit };
        Self {
            limit: limit.clamp(1, max_limit.max(1)),
            offset: self.offset,
        }
    }
}

/// History ordering by movement id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Filter criteria shared by history and summary queries.
///
/// Every field is optional; an empty filter matches the whole stream.
/// Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub movement_type: Option<MovementType>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
}

impl MovementFilter {
    pub fn by_type(movement_type: MovementType) -> Self {
        Self {
            movement_type: Some(movement_type),
            ..Default::default()
        }
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            created_from: Some(from),
            created_to: Some(to),
            ..Default::default()
        }
    }

    pub fn matches(&self, m: &StockMovement) -> bool {
        if self.created_from.is_some_and(|from| m.created_at < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| m.created_at > to) {
            return false;
        }
        if self.movement_type.is_some_and(|t| m.movement_type != t) {
            return false;
        }
        if let Some(kind) = &self.reference_type {
            if m.reference.as_ref().map(|r| &r.reference_type) != Some(kind) {
                return false;
            }
        }
        if let Some(id) = &self.reference_id {
            if m.reference.as_ref().map(|r| &r.reference_id) != Some(id) {
                return false;
            }
        }
        true
    }
}

/// One page of ledger history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementPage {
    pub movements: Vec<StockMovement>,
    /// Number of movements matching the filter across all pages.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl MovementPage {
    pub fn new(movements: Vec<StockMovement>, total: u64, pagination: Pagination) -> Self {
        let has_more = total > u64::from(pagination.offset) + u64::from(pagination.limit);
        Self {
            movements,
            total,
            pagination,
            has_more,
        }
    }
}
