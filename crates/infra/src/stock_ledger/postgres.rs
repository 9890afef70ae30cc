//! Postgres-backed stock ledger.
//!
//! Persists movements in the append-only `stock_movements` table (see
//! `migrations/0001_stock_movements.sql`) and serializes writers per stream
//! with transaction-scoped advisory locks.
//!
//! ## Write Path
//!
//! Every write runs as one transaction:
//! 1. `SET LOCAL lock_timeout` bounds every lock wait in the transaction
//! 2. `pg_advisory_xact_lock(hashtextextended('<product>:<warehouse>', 0))` per stream, ascending key order
//! 3. read the stream balance (a fresh READ COMMITTED snapshot, taken after the lock)
//! 4. insert the entry with its `stock_before`/`stock_after` snapshot
//! 5. commit, which releases the advisory locks
//!
//! The lock belongs to the transaction, so it is released on commit, rollback
//! or a dropped connection; a crashed instance cannot leave a stream locked.
//! Readers never take the advisory lock.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | LedgerError | Scenario |
//! |------------|----------------------|-------------|----------|
//! | Database (lock not available) | `55P03` | `LockTimeout` | Stream lock wait exceeded `lock_timeout` |
//! | Database (unique violation) | `23505` | `Conflict` | Second reversal of the same entry |
//! | Database (check violation) | `23514` | `Validation` | Zero quantity / broken snapshot / negative cost |
//! | Database (numeric out of range) | `22003` | `Validation` | Amount beyond `NUMERIC(28, 8)` |
//! | Column decode of an aggregate | N/A | `InvariantViolation` | Read total outside the decimal range |
//! | Database (insufficient privilege) | `42501` | `InvariantViolation` | Attempted UPDATE/DELETE of history |
//! | Database (other) | Any other | `Persistence` | Serialization failures, deadlocks, ... |
//! | Pool / IO errors | N/A | `Persistence` | Connection failures, pool exhaustion |

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use stockledger_core::{MovementId, ProductId, UserId, WarehouseId};
use stockledger_inventory::{
    DocumentRef, MovementFilter, MovementPage, MovementType, NewMovementRequest, Pagination,
    Posting, ReversalRequest, SortOrder, StockMovement, StockSummary, StreamAudit, StreamKey,
    TransferReceipt, TransferRequest, verify_chain,
};

use super::r#trait::StockLedger;
use crate::config::{BalanceStrategy, LedgerConfig};
use crate::error::LedgerError;

const SCHEMA: &str = include_str!("../../migrations/0001_stock_movements.sql");

const MOVEMENT_COLUMNS: &str = r#"
    id,
    product_id,
    warehouse_id,
    movement_type,
    quantity,
    reference_type,
    reference_id,
    stock_before,
    stock_after,
    unit_cost,
    notes,
    created_by,
    created_at
"#;

/// `$1` product, `$2` optional warehouse, `$3..$7` filter criteria.
const FILTERED_WHERE: &str = r#"
    WHERE product_id = $1
        AND ($2::uuid IS NULL OR warehouse_id = $2)
        AND ($3::timestamptz IS NULL OR created_at >= $3)
        AND ($4::timestamptz IS NULL OR created_at <= $4)
        AND ($5::text IS NULL OR movement_type = $5)
        AND ($6::text IS NULL OR reference_type = $6)
        AND ($7::text IS NULL OR reference_id = $7)
"#;

/// Postgres-backed append-only stock ledger.
///
/// `Clone` is cheap: the pool is reference-counted.
#[derive(Debug, Clone)]
pub struct PostgresStockLedger {
    pool: PgPool,
    config: LedgerConfig,
}

impl PostgresStockLedger {
    pub fn new(pool: PgPool, config: LedgerConfig) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the ledger table, indexes and append-only trigger if missing.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Concurrent migrators would race on the DDL.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended('stock_movements:schema', 0))")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        sqlx::raw_sql(SCHEMA)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        tracing::info!("stock ledger schema is up to date");
        Ok(())
    }

    /// Begin a transaction holding the advisory lock of every stream in `keys`.
    async fn begin_locked(
        &self,
        keys: &[StreamKey],
    ) -> Result<Transaction<'static, Postgres>, LedgerError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // lock_timeout = 0 means "wait forever" in Postgres.
        let timeout_ms = self.config.lock_timeout.as_millis().max(1);
        sqlx::query(&format!("SET LOCAL lock_timeout = '{timeout_ms}ms'"))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_lock_timeout", e))?;

        let mut ordered = keys.to_vec();
        ordered.sort();
        ordered.dedup();
        for key in ordered {
            lock_stream(&mut tx, key, self.config.lock_timeout).await?;
        }

        Ok(tx)
    }

    /// Snapshot, check and insert `postings`, then commit.
    ///
    /// Any early return drops `tx`, which rolls the transaction back.
    async fn post_and_commit(
        &self,
        mut tx: Transaction<'static, Postgres>,
        postings: Vec<Posting>,
    ) -> Result<Vec<StockMovement>, LedgerError> {
        let mut balances: HashMap<StreamKey, Decimal> = HashMap::new();
        let mut committed = Vec::with_capacity(postings.len());

        for posting in postings {
            let stock_before = match balances.get(&posting.key) {
                Some(balance) => *balance,
                None => stream_balance(&mut tx, posting.key, self.config.balance_strategy).await?,
            };

            if !self.config.negative_stock.permits(stock_before, posting.quantity) {
                tracing::warn!(
                    stream = %posting.key,
                    available = %stock_before,
                    requested = %posting.quantity.abs(),
                    "rejected movement that would overdraw stock"
                );
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(LedgerError::InsufficientStock {
                    key: posting.key,
                    available: stock_before,
                    requested: posting.quantity.abs(),
                });
            }

            balances.insert(posting.key, posting.stock_after(stock_before)?);
            committed.push(insert_movement(&mut tx, posting, stock_before).await?);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

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

    async fn fetch_movement(&self, id: MovementId) -> Result<Option<StockMovement>, LedgerError> {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(movement_id_param(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_movement", e))?;
        row.as_ref().map(movement_from_row).transpose()
    }
}

#[async_trait::async_trait]
impl StockLedger for PostgresStockLedger {
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
        let tx = self.begin_locked(&[posting.key]).await?;
        single(self.post_and_commit(tx, vec![posting]).await?)
    }

    #[instrument(skip(self, request), fields(movement_id = %request.movement_id), err)]
    async fn reverse(&self, request: ReversalRequest) -> Result<StockMovement, LedgerError> {
        // Committed entries are immutable, so the original can be read before locking.
        let original = self
            .fetch_movement(request.movement_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("movement {}", request.movement_id)))?;
        let posting = request.posting_for(&original)?;

        let mut tx = self.begin_locked(&[posting.key]).await?;

        let already_reversed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM stock_movements
                WHERE product_id = $1
                    AND warehouse_id = $2
                    AND movement_type = 'reversal'
                    AND reference_type = $3
                    AND reference_id = $4
            )
            "#,
        )
        .bind(original.product_id.as_uuid())
        .bind(original.warehouse_id.as_uuid())
        .bind(DocumentRef::STOCK_MOVEMENT)
        .bind(original.id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("check_reversal", e))?;

        if already_reversed {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(LedgerError::Conflict(format!(
                "movement {} has already been reversed",
                original.id
            )));
        }

        single(self.post_and_commit(tx, vec![posting]).await?)
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
        let tx = self
            .begin_locked(&[legs.outbound.key, legs.inbound.key])
            .await?;

        let mut committed = self
            .post_and_commit(tx, vec![legs.outbound, legs.inbound])
            .await?
            .into_iter();
        match (committed.next(), committed.next()) {
            (Some(outbound), Some(inbound)) => Ok(TransferReceipt { outbound, inbound }),
            _ => Err(LedgerError::InvariantViolation(
                "transfer commit did not produce two legs".to_string(),
            )),
        }
    }

    #[instrument(skip(self), fields(product_id = %product_id, warehouse_id = %warehouse_id), err)]
    async fn current_stock(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Decimal, LedgerError> {
        sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM stock_movements
            WHERE product_id = $1 AND warehouse_id = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(warehouse_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| aggregate_error("current_stock", e))
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn stock_across_warehouses(
        &self,
        product_id: ProductId,
    ) -> Result<BTreeMap<WarehouseId, Decimal>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT warehouse_id, SUM(quantity) AS balance
            FROM stock_movements
            WHERE product_id = $1
            GROUP BY warehouse_id
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock_across_warehouses", e))?;

        let mut totals = BTreeMap::new();
        for row in rows {
            let warehouse_id: Uuid = row.try_get("warehouse_id").map_err(decode_error)?;
            let balance: Decimal = row
                .try_get("balance")
                .map_err(|e| aggregate_error("stock_across_warehouses", e))?;
            totals.insert(WarehouseId::from_uuid(warehouse_id), balance);
        }
        Ok(totals)
    }

    #[instrument(skip(self, filter), fields(product_id = %product_id, warehouse_id = ?warehouse_id), err)]
    async fn summary(
        &self,
        product_id: ProductId,
        warehouse_id: Option<WarehouseId>,
        filter: &MovementFilter,
    ) -> Result<StockSummary, LedgerError> {
        let sql = format!(
            r#"
            SELECT
                COALESCE(SUM(quantity) FILTER (WHERE quantity > 0), 0) AS inbound,
                COALESCE(SUM(-quantity) FILTER (WHERE quantity < 0), 0) AS outbound,
                COUNT(*) AS entries,
                COALESCE(SUM(quantity * unit_cost) FILTER (WHERE unit_cost IS NOT NULL), 0) AS valuation
            FROM stock_movements
            {FILTERED_WHERE}
            "#
        );
        let row = bind_filter(
            sqlx::query(&sql)
                .bind(product_id.as_uuid())
                .bind(warehouse_id.map(Uuid::from)),
            filter,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("summary", e))?;

        let total = |column: &str| -> Result<Decimal, LedgerError> {
            row.try_get(column).map_err(|e| aggregate_error("summary", e))
        };
        let inbound = total("inbound")?;
        let outbound = total("outbound")?;
        let valuation = total("valuation")?;
        let entries: i64 = row.try_get("entries").map_err(decode_error)?;

        Ok(StockSummary::from_totals(
            inbound,
            outbound,
            entries.max(0) as u64,
            valuation,
        ))
    }

    #[instrument(
        skip(self, filter),
        fields(product_id = %product_id, warehouse_id = %warehouse_id, limit = page.limit, offset = page.offset),
        err
    )]
    async fn history(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        filter: &MovementFilter,
        page: Pagination,
    ) -> Result<MovementPage, LedgerError> {
        let page = self.config.page(page);

        let count_sql = format!("SELECT COUNT(*) FROM stock_movements {FILTERED_WHERE}");
        let total: i64 = bind_filter(
            sqlx::query(&count_sql)
                .bind(product_id.as_uuid())
                .bind(Some(*warehouse_id.as_uuid())),
            filter,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_history", e))?
        .try_get(0)
        .map_err(decode_error)?;

        let order = match filter.order {
            SortOrder::NewestFirst => "DESC",
            SortOrder::OldestFirst => "ASC",
        };
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements {FILTERED_WHERE} ORDER BY id {order} LIMIT $8 OFFSET $9"
        );
        let rows = bind_filter(
            sqlx::query(&sql)
                .bind(product_id.as_uuid())
                .bind(Some(*warehouse_id.as_uuid())),
            filter,
        )
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("history", e))?;

        let movements = rows
            .iter()
            .map(movement_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MovementPage::new(movements, total.max(0) as u64, page))
    }

    #[instrument(skip(self), err)]
    async fn get_movement(&self, id: MovementId) -> Result<StockMovement, LedgerError> {
        self.fetch_movement(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("movement {id}")))
    }

    #[instrument(skip(self), fields(product_id = %product_id, warehouse_id = %warehouse_id), err)]
    async fn latest_movement(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<StockMovement, LedgerError> {
        let sql = format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            WHERE product_id = $1 AND warehouse_id = $2
            ORDER BY id DESC
            LIMIT 1
            "#
        );
        let row = sqlx::query(&sql)
            .bind(product_id.as_uuid())
            .bind(warehouse_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("latest_movement", e))?;

        match row {
            Some(row) => movement_from_row(&row),
            None => Err(LedgerError::NotFound(format!(
                "no movements for stream {}",
                StreamKey::new(product_id, warehouse_id)
            ))),
        }
    }

    #[instrument(skip(self), fields(product_id = %product_id, warehouse_id = %warehouse_id), err)]
    async fn audit_stream(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<StreamAudit, LedgerError> {
        let sql = format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            WHERE product_id = $1 AND warehouse_id = $2
            ORDER BY id ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(product_id.as_uuid())
            .bind(warehouse_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("audit_stream", e))?;

        let movements = rows
            .iter()
            .map(movement_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let key = StreamKey::new(product_id, warehouse_id);
        let audit = verify_chain(key, &movements);
        if !audit.is_consistent() {
            tracing::warn!(stream = %key, breaks = audit.breaks.len(), "stream snapshots disagree with summed balance");
        }
        Ok(audit)
    }
}

fn single(mut committed: Vec<StockMovement>) -> Result<StockMovement, LedgerError> {
    committed
        .pop()
        .ok_or_else(|| LedgerError::InvariantViolation("commit produced no movement".to_string()))
}

/// Take the transaction-scoped advisory lock of one stream.
async fn lock_stream(
    tx: &mut Transaction<'_, Postgres>,
    key: StreamKey,
    timeout: Duration,
) -> Result<(), LedgerError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(key.to_string())
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_lock_timeout(&e) {
                tracing::warn!(stream = %key, waited_ms = timeout.as_millis() as u64, "stream lock wait timed out");
                LedgerError::LockTimeout { key, waited: timeout }
            } else {
                map_sqlx_error("lock_stream", e)
            }
        })?;
    Ok(())
}

/// Current balance of a stream, read inside the locked transaction.
async fn stream_balance(
    tx: &mut Transaction<'_, Postgres>,
    key: StreamKey,
    strategy: BalanceStrategy,
) -> Result<Decimal, LedgerError> {
    match strategy {
        BalanceStrategy::LatestSnapshot => {
            let latest: Option<Decimal> = sqlx::query_scalar(
                r#"
                SELECT stock_after
                FROM stock_movements
                WHERE product_id = $1 AND warehouse_id = $2
                ORDER BY id DESC
                LIMIT 1
                "#,
            )
            .bind(key.product_id.as_uuid())
            .bind(key.warehouse_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("stream_balance", e))?;
            Ok(latest.unwrap_or_default())
        }
        BalanceStrategy::Resum => sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM stock_movements
            WHERE product_id = $1 AND warehouse_id = $2
            "#,
        )
        .bind(key.product_id.as_uuid())
        .bind(key.warehouse_id.as_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| aggregate_error("stream_balance", e)),
    }
}

async fn insert_movement(
    tx: &mut Transaction<'_, Postgres>,
    posting: Posting,
    stock_before: Decimal,
) -> Result<StockMovement, LedgerError> {
    let stock_after = posting.stock_after(stock_before)?;
    let row = sqlx::query(
        r#"
        INSERT INTO stock_movements (
            product_id,
            warehouse_id,
            movement_type,
            quantity,
            reference_type,
            reference_id,
            stock_before,
            stock_after,
            unit_cost,
            notes,
            created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id, created_at
        "#,
    )
    .bind(posting.key.product_id.as_uuid())
    .bind(posting.key.warehouse_id.as_uuid())
    .bind(posting.movement_type.as_str())
    .bind(posting.quantity)
    .bind(posting.reference.as_ref().map(|r| r.reference_type.as_str()))
    .bind(posting.reference.as_ref().map(|r| r.reference_id.as_str()))
    .bind(stock_before)
    .bind(stock_after)
    .bind(posting.unit_cost)
    .bind(posting.notes.as_deref())
    .bind(posting.created_by.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_movement", e))?;

    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode_error)?;
    Ok(posting.into_movement(MovementId::new(id as u64), stock_before, created_at)?)
}

fn bind_filter<'q>(
    query: Query<'q, Postgres, PgArguments>,
    filter: &'q MovementFilter,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(filter.created_from)
        .bind(filter.created_to)
        .bind(filter.movement_type.map(MovementType::as_str))
        .bind(filter.reference_type.as_deref())
        .bind(filter.reference_id.as_deref())
}

fn movement_id_param(id: MovementId) -> Result<i64, LedgerError> {
    i64::try_from(id.get()).map_err(|_| LedgerError::NotFound(format!("movement {id}")))
}

fn movement_from_row(row: &PgRow) -> Result<StockMovement, LedgerError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let movement_type: String = row.try_get("movement_type").map_err(decode_error)?;
    let reference_type: Option<String> = row.try_get("reference_type").map_err(decode_error)?;
    let reference_id: Option<String> = row.try_get("reference_id").map_err(decode_error)?;

    Ok(StockMovement {
        id: MovementId::new(id as u64),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(decode_error)?),
        warehouse_id: WarehouseId::from_uuid(row.try_get("warehouse_id").map_err(decode_error)?),
        movement_type: movement_type.parse().map_err(|e| {
            LedgerError::Persistence(format!("corrupt movement_type on row {id}: {e}"))
        })?,
        quantity: row.try_get("quantity").map_err(decode_error)?,
        reference: reference_type
            .zip(reference_id)
            .map(|(kind, rid)| DocumentRef::new(kind, rid)),
        stock_before: row.try_get("stock_before").map_err(decode_error)?,
        stock_after: row.try_get("stock_after").map_err(decode_error)?,
        unit_cost: row.try_get("unit_cost").map_err(decode_error)?,
        notes: row.try_get("notes").map_err(decode_error)?,
        created_by: UserId::from_uuid(row.try_get("created_by").map_err(decode_error)?),
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn decode_error(err: sqlx::Error) -> LedgerError {
    LedgerError::Persistence(format!("failed to decode stock_movements row: {err}"))
}

/// Postgres sums `NUMERIC` without bound; a total `Decimal` cannot hold fails to decode.
fn aggregate_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::ColumnDecode { .. } => LedgerError::InvariantViolation(format!(
            "{operation} total overflows decimal range: {err}"
        )),
        other => map_sqlx_error(operation, other),
    }
}

fn is_lock_timeout(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("55P03"))
}

/// Map SQLx errors to LedgerError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => LedgerError::Conflict(msg),
                Some("23514") | Some("22003") => LedgerError::Validation(msg),
                Some("42501") => LedgerError::InvariantViolation(msg),
                _ => LedgerError::Persistence(msg),
            }
        }
        sqlx::Error::PoolTimedOut => {
            LedgerError::Persistence(format!("connection pool timed out in {operation}"))
        }
        sqlx::Error::PoolClosed => {
            LedgerError::Persistence(format!("connection pool closed in {operation}"))
        }
        _ => LedgerError::Persistence(format!("sqlx error in {operation}: {err}")),
    }
}
