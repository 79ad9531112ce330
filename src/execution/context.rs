use std::sync::Arc;

use crate::{catalog::Catalog, storage::buffer_pool::BufferPoolManager};

/// Source of statement timestamps. Single-version execution for now; the
/// temp timestamp is what mutating operators stamp rows with.
pub struct Transaction {
    temp_ts: u64,
}

impl Transaction {
    pub fn new(temp_ts: u64) -> Self {
        Self { temp_ts }
    }

    pub fn temp_ts(&self) -> u64 {
        self.temp_ts
    }
}

/// Opaque handle. Row locking lives outside this core; operators just
/// thread the handle through.
pub struct LockManager;

/// Everything an executor needs to run: the pool, the catalog, and the
/// transaction state of the statement being executed.
pub struct ExecutorContext {
    pub bpm: Arc<BufferPoolManager>,
    pub catalog: Arc<Catalog>,
    pub transaction: Arc<Transaction>,
    pub lock_manager: Arc<LockManager>,
}

impl ExecutorContext {
    pub fn new(
        bpm: Arc<BufferPoolManager>,
        catalog: Arc<Catalog>,
        transaction: Arc<Transaction>,
        lock_manager: Arc<LockManager>,
    ) -> Arc<Self> {
        Arc::new(Self {
            bpm,
            catalog,
            transaction,
            lock_manager,
        })
    }
}
