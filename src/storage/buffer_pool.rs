use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::storage::{
    Error, FrameId, INVALID_PAGE_ID, PageId, Result,
    disk::{DiskManager, DiskRequest, DiskScheduler},
    guard::{PageGuard, ReadPageGuard, WritePageGuard},
    page::{Page, PageRef},
    replacer::LruKReplacer,
};

/// Mediates all page access. Owns the frame array, the replacer and the
/// I/O scheduler; one mutex guards the page table, free list and page id
/// counter. I/O completions are awaited while that mutex is held, which
/// serializes the pool but keeps the pinning protocol trivially correct.
pub struct BufferPoolManager {
    pool_size: usize,
    page_size: usize,
    frames: Vec<PageRef>,
    replacer: LruKReplacer,
    scheduler: DiskScheduler,
    inner: Mutex<PoolInner>,
}

struct PoolInner {
    /// `page_id -> frame_id` for every resident page.
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    next_page_id: PageId,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, replacer_k: usize, disk: Arc<dyn DiskManager>) -> Self {
        let page_size = disk.page_size();
        let frames = (0..pool_size).map(|_| Arc::new(Page::new(page_size))).collect();

        Self {
            pool_size,
            page_size,
            frames,
            replacer: LruKReplacer::new(pool_size, replacer_k),
            scheduler: DiskScheduler::new(disk),
            inner: Mutex::new(PoolInner {
                page_table: HashMap::new(),
                free_list: (0..pool_size).collect(),
                next_page_id: 0,
            }),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Allocates a fresh page id, installs it into a frame and returns the
    /// frame pinned once.
    pub fn new_page(&self) -> Result<PageRef> {
        let mut inner = self.inner.lock();
        let frame_id = self.acquire_frame(&mut inner)?;

        let page_id = inner.next_page_id;
        inner.next_page_id += 1;

        let frame = &self.frames[frame_id];
        frame.reset();
        frame.set_id(page_id);
        frame.set_pin_count(1);

        inner.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);

        Ok(frame.clone())
    }

    /// Pins and returns the frame holding `page_id`, reading the page from
    /// disk if it is not resident. Every successful fetch must be paired
    /// with exactly one `unpin_page`; the page guards do this automatically.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PageRef> {
        if page_id < 0 {
            return Err(Error::InvalidPageId);
        }

        let mut inner = self.inner.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let frame = &self.frames[frame_id];
            frame.inc_pin();
            self.replacer.record_access(frame_id);
            self.replacer.set_evictable(frame_id, false);
            return Ok(frame.clone());
        }

        let frame_id = self.acquire_frame(&mut inner)?;
        let frame = &self.frames[frame_id];
        frame.reset();
        frame.set_id(page_id);
        frame.set_pin_count(1);

        inner.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);

        let (done, wait) = DiskScheduler::create_completion();
        self.scheduler.schedule(DiskRequest::Read {
            page_id,
            buf: frame.data_handle(),
            done,
        });
        wait.recv()
            .map_err(|_| Error::Internal("disk scheduler worker is gone".into()))?;

        Ok(frame.clone())
    }

    /// Drops one pin. When the count reaches zero the frame becomes
    /// evictable. `is_dirty` is OR-ed into the frame's dirty flag, never
    /// cleared by this call. Returns `false` on a protocol violation
    /// (page not resident, or pin count already zero).
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return false;
        };

        let frame = &self.frames[frame_id];
        if frame.pin_count() == 0 {
            return false;
        }

        frame.dec_pin();
        if frame.pin_count() == 0 {
            self.replacer.set_evictable(frame_id, true);
        }

        if is_dirty {
            frame.set_dirty(true);
        }

        true
    }

    /// Writes the page out through the scheduler and clears its dirty bit.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        assert!(page_id != INVALID_PAGE_ID, "cannot flush the invalid page");

        let inner = self.inner.lock();
        let frame_id = *inner
            .page_table
            .get(&page_id)
            .ok_or(Error::PageNotResident(page_id))?;

        self.write_frame(&self.frames[frame_id])?;

        Ok(())
    }

    pub fn flush_all_pages(&self) -> Result<()> {
        let inner = self.inner.lock();

        for &frame_id in inner.page_table.values() {
            self.write_frame(&self.frames[frame_id])?;
        }

        Ok(())
    }

    /// Drops a resident page from the pool and hands its id back to the
    /// allocator. Returns `Ok(false)` when the page is pinned; deleting a
    /// non-resident page succeeds trivially.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        assert!(page_id != INVALID_PAGE_ID, "cannot delete the invalid page");

        let mut inner = self.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(true);
        };

        let frame = &self.frames[frame_id];
        if frame.pin_count() > 0 {
            return Ok(false);
        }

        inner.page_table.remove(&page_id);
        self.replacer.remove(frame_id);
        frame.reset();
        inner.free_list.push_back(frame_id);

        self.deallocate_page(page_id);

        Ok(true)
    }

    pub fn new_page_guarded(self: &Arc<Self>) -> Result<PageGuard> {
        let page = self.new_page()?;
        Ok(PageGuard::new(self.clone(), page))
    }

    pub fn fetch_page_basic(self: &Arc<Self>, page_id: PageId) -> Result<PageGuard> {
        let page = self.fetch_page(page_id)?;
        Ok(PageGuard::new(self.clone(), page))
    }

    pub fn fetch_page_read(self: &Arc<Self>, page_id: PageId) -> Result<ReadPageGuard> {
        Ok(self.fetch_page_basic(page_id)?.upgrade_read())
    }

    pub fn fetch_page_write(self: &Arc<Self>, page_id: PageId) -> Result<WritePageGuard> {
        Ok(self.fetch_page_basic(page_id)?.upgrade_write())
    }

    /// Pops a free frame, or evicts a victim (flushing it first when dirty)
    /// and unmaps it from the page table.
    fn acquire_frame(&self, inner: &mut PoolInner) -> Result<FrameId> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.evict().ok_or(Error::NoFreeFrames)?;
        let victim = &self.frames[frame_id];

        if victim.is_dirty() {
            self.write_frame(victim)?;
        }
        inner.page_table.remove(&victim.id());

        Ok(frame_id)
    }

    /// Submits a write for the frame's current contents and waits for the
    /// completion signal, then clears the dirty bit.
    fn write_frame(&self, frame: &PageRef) -> Result<()> {
        let data = frame.lock_shared().to_vec().into_boxed_slice();

        let (done, wait) = DiskScheduler::create_completion();
        self.scheduler.schedule(DiskRequest::Write {
            page_id: frame.id(),
            data,
            done,
        });
        wait.recv()
            .map_err(|_| Error::Internal("disk scheduler worker is gone".into()))?;

        frame.set_dirty(false);

        Ok(())
    }

    /// The on-disk allocator is managed outside this layer; freed ids are
    /// simply surfaced to it.
    fn deallocate_page(&self, page_id: PageId) {
        log::debug!("page {page_id} returned to the allocator");
    }
}
