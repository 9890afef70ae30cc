use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;

use stockledger_core::{MovementId, ProductId, WarehouseId};
use stockledger_inventory::{
    MovementFilter, MovementPage, NewMovementRequest, Pagination, Posting, ReversalRequest,
    SortOrder, StockMovement, StockSummary, StreamAudit, StreamKey, TransferReceipt,
    TransferRequest, amount, reverses, verify_chain,
};

use super::lock::StreamLocks;
use super::r#trait::StockLedger;
use crate::config::{BalanceStrategy, LedgerConfig};
use crate::error::LedgerError;

#[derive(Debug, Default)]
struct LedgerState {
    /// Global append log; `movements[i].id == i + 1`.
    movements: Vec<StockMovement>,
    /// Per-stream positions into `movements`, oldest first.
    streams: HashMap<StreamKey, Vec<usize>>,
}

impl LedgerState {
    fn stream(&self, key: StreamKey) -> impl DoubleEndedIterator<Item = &StockMovement> {
        self.streams
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|idx| &self.movements[*idx])
    }

    fn balance(&self, key: StreamKey, strategy: BalanceStrategy) -> Result<Decimal, LedgerError> {
        match strategy {
            BalanceStrategy::LatestSnapshot => {
                Ok(self.stream(key).next_back().map(|m| m.stock_after).unwrap_or_default())
            }
            BalanceStrategy::Resum => self.total(key),
        }
    }

    fn total(&self, key: StreamKey) -> Result<Decimal, LedgerError> {
        Ok(amount::total(self.stream(key).map(|m| m.quantity))?)
    }

    fn get(&self, id: MovementId) -> Option<&StockMovement> {
        let idx = usize::try_from(id.get()).ok()?.checked_sub(1)?;
        self.movements.get(idx)
    }
}

/// In-memory stock ledger.
///
/// Intended for tests/dev. Writers serialize per stream through
/// [`StreamLocks`]; the entry log itself sits behind a `RwLock` that is only
/// held for short, non-awaiting critical sections, so reads never wait on a
/// stream lock.
#[derive(Debug, Default)]
pub struct InMemoryStockLedger {
    config: LedgerConfig,
    locks: StreamLocks,
    state: RwLock<LedgerState>,
}

impl InMemoryStockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Stream lock registry, exposed so callers can compose multi-step work
    /// under the same serialization the ledger uses.
    pub fn locks(&self) -> &StreamLocks {
        &self.locks
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.state
            .read()
            .map_err(|_| LedgerError::Persistence("ledger state lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.state
            .write()
            .map_err(|_| LedgerError::Persistence("ledger state lock poisoned".to_string()))
    }

    /// Snapshot balances, apply the negative-stock policy and append
    /// `postings` as one unit.
    ///
    /// The caller must hold the stream lock of every posting's key. Nothing is
    /// written unless every posting passes.
    fn commit(&self, postings: Vec<Posting>) -> Result<Vec<StockMovement>, LedgerError> {
        let mut planned = Vec::with_capacity(postings.len());
        {
            let state = self.read()?;
            let mut pending: HashMap<StreamKey, Decimal> = HashMap::new();
            for posting in postings {
                let stock_before = match pending.get(&posting.key) {
                    Some(balance) => *balance,
                    None => state.balance(posting.key, self.config.balance_strategy)?,
                };

                if !self.config.negative_stock.permits(stock_before, posting.quantity) {
                    tracing::warn!(
                        stream = %posting.key,
                        available = %stock_before,
                        requested = %posting.quantity.abs(),
                        "rejected movement that would overdraw stock"
                    );
                    return Err(LedgerError::InsufficientStock {
                        key: posting.key,
                        available: stock_before,
                        requested: posting.quantity.abs(),
                    });
                }

                pending.insert(posting.key, posting.stock_after(stock_before)?);
                planned.push((posting, stock_before));
            }
        }

        let mut state = self.write()?;
        let created_at = Utc::now();
        let first = state.movements.len();
        let committed = planned
            .into_iter()
            .enumerate()
            .map(|(i, (posting, stock_before))| {
                let id = MovementId::new((first + i) as u64 + 1);
                posting.into_movement(id, stock_before, created_at)
            })
            .collect::<Result<Vec<_>, _>>()?;
        for m in &committed {
            let idx = state.movements.len();
            state.streams.entry(m.stream_key()).or_default().push(idx);
            state.movements.push(m.clone());
        }

        for m in &committed {
            tracing::info!(
                movement_id = %m.id,
                stream = %m.stream_key(),
                movement_type = %m.movement_type,
                quantity = %m.quantity,
                stock_after = %m.stock_after,
                "stock movement committed"
            );
        }
        Ok(committed)
    }

    fn single(mut committed: Vec<StockMovement>) -> Result<StockMovement, LedgerError> {
        committed
            .pop()
            .ok_or_else(|| LedgerError::InvariantViolation("commit produced no movement".to_string()))
    }
}

#[async_trait::async_trait]
impl StockLedger for InMemoryStockLedger {
    #[instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            warehouse_id = %request.warehouse_id,
            movement_type = %request.movement_type
        ),
        err
    )]
    async fn append(&self, request: NewMovementRequest) -> Result<StockMovement, LedgerError> {
        let posting = request.normalize()?;
        let _guard = self.locks.acquire(posting.key, self.config.lock_timeout).await?;
        Self::single(self.commit(vec![posting])?)
    }

    #[instrument(skip(self, request), fields(movement_id = %request.movement_id), err)]
    async fn reverse(&self, request: ReversalRequest) -> Result<StockMovement, LedgerError> {
        let key = self
            .read()?
            .get(request.movement_id)
            .map(StockMovement::stream_key)
            .ok_or_else(|| LedgerError::NotFound(format!("movement {}", request.movement_id)))?;

        let _guard = self.locks.acquire(key, self.config.lock_timeout).await?;

        let posting = {
            let state = self.read()?;
            let original = state
                .get(request.movement_id)
                .ok_or_else(|| LedgerError::NotFound(format!("movement {}", request.movement_id)))?;
            if state.stream(key).any(|m| reverses(m, original.id)) {
                return Err(LedgerError::Conflict(format!(
                    "movement {} has already been reversed",
                    original.id
                )));
            }
            request.posting_for(original)?
        };

        Self::single(self.commit(vec![posting])?)
    }

    #[instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            from = %request.from_warehouse,
            to = %request.to_warehouse
        ),
        err
    )]
    async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        let legs = request.legs()?;
        let _guards = self
            .locks
            .acquire_many(&[legs.outbound.key, legs.inbound.key], self.config.lock_timeout)
            .await?;

        let mut committed = self.commit(vec![legs.outbound, legs.inbound])?.into_iter();
        match (committed.next(), committed.next()) {
            (Some(outbound), Some(inbound)) => Ok(TransferReceipt { outbound, inbound }),
            _ => Err(LedgerError::InvariantViolation(
                "transfer commit did not produce two legs".to_string(),
            )),
        }
    }

    async fn current_stock(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Decimal, LedgerError> {
        self.read()?.total(StreamKey::new(product_id, warehouse_id))
    }

    async fn stock_across_warehouses(
        &self,
        product_id: ProductId,
    ) -> Result<BTreeMap<WarehouseId, Decimal>, LedgerError> {
        let state = self.read()?;
        let mut totals = BTreeMap::new();
        for key in state.streams.keys().filter(|k| k.product_id == product_id) {
            totals.insert(key.warehouse_id, state.total(*key)?);
        }
        Ok(totals)
    }

    async fn summary(
        &self,
        product_id: ProductId,
        warehouse_id: Option<WarehouseId>,
        filter: &MovementFilter,
    ) -> Result<StockSummary, LedgerError> {
        let state = self.read()?;
        let matching = state
            .streams
            .keys()
            .filter(|k| k.product_id == product_id)
            .filter(|k| warehouse_id.is_none_or(|w| k.warehouse_id == w))
            .flat_map(|k| state.stream(*k))
            .filter(|m| filter.matches(m));
        Ok(StockSummary::from_movements(matching)?)
    }

    async fn history(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        filter: &MovementFilter,
        page: Pagination,
    ) -> Result<MovementPage, LedgerError> {
        let page = self.config.page(page);
        let key = StreamKey::new(product_id, warehouse_id);
        let state = self.read()?;

        let mut matching: Vec<&StockMovement> = state.stream(key).filter(|m| filter.matches(m)).collect();
        if filter.order == SortOrder::NewestFirst {
            matching.reverse();
        }

        let total = matching.len() as u64;
        let movements = matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok(MovementPage::new(movements, total, page))
    }

    async fn get_movement(&self, id: MovementId) -> Result<StockMovement, LedgerError> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("movement {id}")))
    }

    async fn latest_movement(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<StockMovement, LedgerError> {
        let key = StreamKey::new(product_id, warehouse_id);
        self.read()?
            .stream(key)
            .next_back()
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("no movements for stream {key}")))
    }

    #[instrument(skip(self), fields(product_id = %product_id, warehouse_id = %warehouse_id), err)]
    async fn audit_stream(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<StreamAudit, LedgerError> {
        let key = StreamKey::new(product_id, warehouse_id);
        let movements: Vec<StockMovement> = self.read()?.stream(key).cloned().collect();
        let audit = verify_chain(key, &movements);
        if !audit.is_consistent() {
            tracing::warn!(stream = %key, breaks = audit.breaks.len(), "stream snapshots disagree with summed balance");
        }
        Ok(audit)
    }
}
