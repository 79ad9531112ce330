use std::sync::Arc;

use crate::storage::{
    PageId,
    buffer_pool::BufferPoolManager,
    page::{PageExclusiveLatch, PageRef, PageSharedLatch},
};

struct GuardState {
    bpm: Arc<BufferPoolManager>,
    page: PageRef,
    is_dirty: bool,
}

impl GuardState {
    fn unpin(self) {
        self.bpm.unpin_page(self.page.id(), self.is_dirty);
    }
}

/// Scope-bound unpin obligation for one fetched page. Dropping the guard
/// unpins the page with the dirty bit accumulated on the guard; guards are
/// move-only, so the unpin happens exactly once on every exit path.
pub struct PageGuard {
    state: Option<GuardState>,
}

impl PageGuard {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, page: PageRef) -> Self {
        Self {
            state: Some(GuardState {
                bpm,
                page,
                is_dirty: false,
            }),
        }
    }

    pub fn page_id(&self) -> PageId {
        match &self.state {
            Some(state) => state.page.id(),
            None => crate::storage::INVALID_PAGE_ID,
        }
    }

    /// Acquires the shared latch and converts this guard into a read guard.
    pub fn upgrade_read(mut self) -> ReadPageGuard {
        let state = self.state.take().expect("page guard already released");
        let latch = state.page.lock_shared();
        ReadPageGuard {
            latch,
            state: Some(state),
        }
    }

    /// Acquires the exclusive latch and converts this guard into a write
    /// guard.
    pub fn upgrade_write(mut self) -> WritePageGuard {
        let state = self.state.take().expect("page guard already released");
        let latch = state.page.lock_exclusive();
        WritePageGuard {
            latch,
            state: Some(state),
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            state.unpin();
        }
    }
}

/// Read guard: unpin obligation plus the page's shared latch. On drop the
/// page is unpinned first and the latch released right after; the data lock
/// keeps the eviction path from touching the bytes in between.
pub struct ReadPageGuard {
    latch: PageSharedLatch,
    state: Option<GuardState>,
}

impl ReadPageGuard {
    pub fn page_id(&self) -> PageId {
        match &self.state {
            Some(state) => state.page.id(),
            None => crate::storage::INVALID_PAGE_ID,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.latch
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            state.unpin();
        }
    }
}

/// Write guard: unpin obligation plus the exclusive latch. Any mutable data
/// access marks the guard dirty, so the unpin propagates the dirty bit.
pub struct WritePageGuard {
    latch: PageExclusiveLatch,
    state: Option<GuardState>,
}

impl WritePageGuard {
    pub fn page_id(&self) -> PageId {
        match &self.state {
            Some(state) => state.page.id(),
            None => crate::storage::INVALID_PAGE_ID,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.latch
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        if let Some(state) = self.state.as_mut() {
            state.is_dirty = true;
        }
        &mut self.latch
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            state.unpin();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::disk::MemDiskManager;

    fn test_pool() -> Arc<BufferPoolManager> {
        Arc::new(BufferPoolManager::new(4, 2, Arc::new(MemDiskManager::new(128))))
    }

    #[test]
    fn test_guard_unpins_on_drop() -> anyhow::Result<()> {
        let bpm = test_pool();

        let guard = bpm.new_page_guarded()?;
        let page_id = guard.page_id();

        let page = bpm.fetch_page(page_id)?;
        assert_eq!(page.pin_count(), 2);

        drop(guard);
        assert_eq!(page.pin_count(), 1);
        bpm.unpin_page(page_id, false);

        Ok(())
    }

    #[test]
    fn test_write_guard_marks_dirty() -> anyhow::Result<()> {
        let bpm = test_pool();

        let page_id = {
            let mut guard = bpm.new_page_guarded()?.upgrade_write();
            guard.data_mut()[0] = 0x77;
            guard.page_id()
        };

        let page = bpm.fetch_page(page_id)?;
        assert!(page.is_dirty());
        assert_eq!(page.lock_shared()[0], 0x77);
        bpm.unpin_page(page_id, false);

        Ok(())
    }

    #[test]
    fn test_read_guard_does_not_mark_dirty() -> anyhow::Result<()> {
        let bpm = test_pool();

        let page_id = bpm.new_page()?.id();
        bpm.unpin_page(page_id, false);

        {
            let guard = bpm.fetch_page_read(page_id)?;
            assert_eq!(guard.data()[0], 0);
        }

        let page = bpm.fetch_page(page_id)?;
        assert!(!page.is_dirty());
        bpm.unpin_page(page_id, false);

        Ok(())
    }

    #[test]
    fn test_shared_latch_allows_concurrent_readers() -> anyhow::Result<()> {
        let bpm = test_pool();

        let page_id = bpm.new_page()?.id();
        bpm.unpin_page(page_id, false);

        let first = bpm.fetch_page_read(page_id)?;
        let second = bpm.fetch_page_read(page_id)?;
        assert_eq!(first.data()[0], second.data()[0]);

        Ok(())
    }
}
