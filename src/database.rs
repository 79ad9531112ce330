use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    catalog::Catalog,
    error::{DatabaseError, DatabaseResult},
    execution::{
        ExecutorContext, LockManager, Transaction, create_executor,
        plan::PlanRef,
    },
    sql::tuple::Tuple,
    storage::{
        DEFAULT_PAGE_SIZE,
        buffer_pool::BufferPoolManager,
        disk::{DiskManager, DiskOptions, FileDiskManager, MemDiskManager},
    },
};

#[derive(Debug, Clone, Copy)]
pub struct DbConfig {
    pub page_size: usize,
    pub pool_size: usize,
    pub replacer_k: usize,
    pub header_max_depth: u32,
    pub directory_max_depth: u32,
    pub bucket_max_size: u32,
    /// Page-file open flags, see [`DiskOptions`].
    pub sync_on_write: bool,
    pub direct_io: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            pool_size: 64,
            replacer_k: 2,
            header_max_depth: 2,
            directory_max_depth: 9,
            bucket_max_size: 64,
            sync_on_write: false,
            direct_io: false,
        }
    }
}

/// Assembles the storage and execution core: disk manager, buffer pool,
/// catalog, and a trivially monotonic transaction timestamp source.
pub struct Database {
    pub bpm: Arc<BufferPoolManager>,
    pub catalog: Arc<Catalog>,
    next_ts: AtomicU64,
}

impl Database {
    pub fn open(path: impl AsRef<Path>, config: DbConfig) -> DatabaseResult<Self> {
        let path = path.as_ref();
        if path.exists() && !path.is_file() {
            return Err(DatabaseError::InvalidFilePath(path.display().to_string()));
        }

        let disk = Arc::new(FileDiskManager::open_with(
            path,
            config.page_size,
            DiskOptions {
                sync_on_write: config.sync_on_write,
                direct_io: config.direct_io,
            },
        )?);
        Ok(Self::with_disk(disk, config))
    }

    pub fn in_memory(config: DbConfig) -> Self {
        Self::with_disk(Arc::new(MemDiskManager::new(config.page_size)), config)
    }

    fn with_disk(disk: Arc<dyn DiskManager>, config: DbConfig) -> Self {
        let bpm = Arc::new(BufferPoolManager::new(
            config.pool_size,
            config.replacer_k,
            disk,
        ));
        let catalog = Arc::new(Catalog::new(
            bpm.clone(),
            config.header_max_depth,
            config.directory_max_depth,
            config.bucket_max_size,
        ));

        Self {
            bpm,
            catalog,
            next_ts: AtomicU64::new(1),
        }
    }

    pub fn begin_transaction(&self) -> Arc<Transaction> {
        Arc::new(Transaction::new(self.next_ts.fetch_add(1, Ordering::SeqCst)))
    }

    pub fn make_context(&self) -> Arc<ExecutorContext> {
        ExecutorContext::new(
            self.bpm.clone(),
            self.catalog.clone(),
            self.begin_transaction(),
            Arc::new(LockManager),
        )
    }

    /// Runs a plan to exhaustion and collects its output rows.
    pub fn execute_plan(&self, plan: &PlanRef) -> DatabaseResult<Vec<Tuple>> {
        let plan = crate::optimizer::optimize(plan, &self.catalog);
        let ctx = self.make_context();

        let mut executor = create_executor(&ctx, &plan)?;
        executor.init()?;

        let mut rows = Vec::new();
        while let Some((tuple, _)) = executor.next()? {
            rows.push(tuple);
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_non_file_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;

        let result = Database::open(dir.path(), DbConfig::default());
        assert!(matches!(result, Err(DatabaseError::InvalidFilePath(_))));

        Ok(())
    }

    #[test]
    fn test_open_creates_usable_database() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = Database::open(
            dir.path().join("minnow.db"),
            DbConfig {
                pool_size: 8,
                ..DbConfig::default()
            },
        )?;

        let page = db.bpm.new_page()?;
        let page_id = page.id();
        page.lock_exclusive().fill(0x3C);
        assert!(db.bpm.unpin_page(page_id, true));
        db.bpm.flush_page(page_id)?;
        drop(page);

        let page = db.bpm.fetch_page(page_id)?;
        assert!(page.lock_shared().iter().all(|b| *b == 0x3C));
        db.bpm.unpin_page(page_id, false);

        Ok(())
    }
}
