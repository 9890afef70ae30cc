//! In-process per-stream lock registry.
//!
//! One async mutex per `(product_id, warehouse_id)` stream. Appends on the
//! same stream queue behind each other; appends on different streams never
//! touch the same mutex. Only the in-memory ledger uses this; the Postgres
//! ledger relies on transaction-scoped advisory locks instead so the lock
//! survives across service instances and is released if the process dies.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;

use stockledger_inventory::StreamKey;

use crate::error::LedgerError;

/// Held while a stream is locked. Dropping it unlocks the stream.
#[derive(Debug)]
pub struct StreamGuard {
    key: StreamKey,
    _guard: OwnedMutexGuard<()>,
}

impl StreamGuard {
    pub fn key(&self) -> StreamKey {
        self.key
    }
}

/// Registry of stream mutexes. Entries are created on first use and kept.
#[derive(Debug, Default)]
pub struct StreamLocks {
    streams: Mutex<HashMap<StreamKey, Arc<AsyncMutex<()>>>>,
}

impl StreamLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex_for(&self, key: StreamKey) -> Result<Arc<AsyncMutex<()>>, LedgerError> {
        let mut streams = self
            .streams
            .lock()
            .map_err(|_| LedgerError::Persistence("stream lock registry poisoned".to_string()))?;
        Ok(streams.entry(key).or_default().clone())
    }

    /// Lock one stream, waiting at most `timeout`.
    pub async fn acquire(&self, key: StreamKey, timeout: Duration) -> Result<StreamGuard, LedgerError> {
        self.acquire_until(key, Instant::now() + timeout, timeout).await
    }

    /// Lock several streams in ascending key order, sharing one deadline.
    ///
    /// The fixed order rules out deadlock between two callers locking the same
    /// pair of streams in opposite roles (e.g. opposite transfers).
    pub async fn acquire_many(
        &self,
        keys: &[StreamKey],
        timeout: Duration,
    ) -> Result<Vec<StreamGuard>, LedgerError> {
        let mut ordered = keys.to_vec();
        ordered.sort();
        ordered.dedup();

        let deadline = Instant::now() + timeout;
        let mut guards = Vec::with_capacity(ordered.len());
        for key in ordered {
            guards.push(self.acquire_until(key, deadline, timeout).await?);
        }
        Ok(guards)
    }

    async fn acquire_until(
        &self,
        key: StreamKey,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<StreamGuard, LedgerError> {
        let mutex = self.mutex_for(key)?;
        match tokio::time::timeout_at(deadline, mutex.lock_owned()).await {
            Ok(guard) => Ok(StreamGuard { key, _guard: guard }),
            Err(_) => {
                tracing::warn!(stream = %key, waited_ms = timeout.as_millis() as u64, "stream lock wait timed out");
                Err(LedgerError::LockTimeout { key, waited: timeout })
            }
        }
    }
}
