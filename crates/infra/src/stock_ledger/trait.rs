use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use stockledger_core::{MovementId, ProductId, WarehouseId};
use stockledger_inventory::{
    MovementFilter, MovementPage, NewMovementRequest, Pagination, ReversalRequest, StockMovement,
    StockSummary, StreamAudit, TransferReceipt, TransferRequest,
};

use crate::error::LedgerError;

/// Append-only, product/warehouse-scoped stock ledger.
///
/// ## Write Semantics
///
/// `append`, `reverse` and `transfer`:
/// - validate and normalize the request (signed quantity computed once)
/// - lock the affected stream(s) for the whole read-balance → insert → commit sequence
/// - capture `stock_before`/`stock_after` from committed state only
/// - persist atomically (all entries of the call or none)
///
/// Writes on different streams never wait for each other. A write that cannot
/// lock its stream within the configured timeout fails with
/// [`LedgerError::LockTimeout`] and leaves nothing behind.
///
/// ## Read Semantics
///
/// Reads never take stream locks. They observe every entry committed before
/// they started, and never an uncommitted one. Balances are defined by summing
/// quantities; the snapshot columns are a cache.
///
/// ## Implementation Requirements
///
/// Implementations must:
/// - serialize writes per stream, including across processes where storage is shared
/// - assign ids that increase in commit order within a stream
/// - never update or delete a committed entry
#[async_trait::async_trait]
pub trait StockLedger: Send + Sync {
    /// Record one movement.
    async fn append(&self, request: NewMovementRequest) -> Result<StockMovement, LedgerError>;

    /// Post the compensating entry for an earlier movement.
    async fn reverse(&self, request: ReversalRequest) -> Result<StockMovement, LedgerError>;

    /// Move stock between two warehouses in one unit of work.
    async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError>;

    /// Sum of every quantity in the stream; zero for a stream with no entries.
    async fn current_stock(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Decimal, LedgerError>;

    /// Current stock of a product in every warehouse that has entries for it.
    async fn stock_across_warehouses(
        &self,
        product_id: ProductId,
    ) -> Result<BTreeMap<WarehouseId, Decimal>, LedgerError>;

    /// In/out/net totals. `warehouse_id = None` spans every warehouse.
    async fn summary(
        &self,
        product_id: ProductId,
        warehouse_id: Option<WarehouseId>,
        filter: &MovementFilter,
    ) -> Result<StockSummary, LedgerError>;

    /// Paginated stream history, newest first unless the filter says otherwise.
    async fn history(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        filter: &MovementFilter,
        page: Pagination,
    ) -> Result<MovementPage, LedgerError>;

    async fn get_movement(&self, id: MovementId) -> Result<StockMovement, LedgerError>;

    /// Newest entry of a stream; `NotFound` if the stream was never stocked.
    async fn latest_movement(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<StockMovement, LedgerError>;

    /// Recompute the stream balance and check every snapshot against it.
    async fn audit_stream(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<StreamAudit, LedgerError>;
}

#[async_trait::async_trait]
impl<S> StockLedger for Arc<S>
where
    S: StockLedger + ?Sized,
{
    async fn append(&self, request: NewMovementRequest) -> Result<StockMovement, LedgerError> {
        (**self).append(request).await
    }

    async fn reverse(&self, request: ReversalRequest) -> Result<StockMovement, LedgerError> {
        (**self).reverse(request).await
    }

    async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        (**self).transfer(request).await
    }

    async fn current_stock(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Decimal, LedgerError> {
        (**self).current_stock(product_id, warehouse_id).await
    }

    async fn stock_across_warehouses(
        &self,
        product_id: ProductId,
    ) -> Result<BTreeMap<WarehouseId, Decimal>, LedgerError> {
        (**self).stock_across_warehouses(product_id).await
    }

    async fn summary(
        &self,
        product_id: ProductId,
        warehouse_id: Option<WarehouseId>,
        filter: &MovementFilter,
    ) -> Result<StockSummary, LedgerError> {
        (**self).summary(product_id, warehouse_id, filter).await
    }

    async fn history(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        filter: &MovementFilter,
        page: Pagination,
    ) -> Result<MovementPage, LedgerError> {
        (**self).history(product_id, warehouse_id, filter, page).await
    }

    async fn get_movement(&self, id: MovementId) -> Result<StockMovement, LedgerError> {
        (**self).get_movement(id).await
    }

    async fn latest_movement(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<StockMovement, LedgerError> {
        (**self).latest_movement(product_id, warehouse_id).await
    }

    async fn audit_stream(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<StreamAudit, LedgerError> {
        (**self).audit_stream(product_id, warehouse_id).await
    }
}
