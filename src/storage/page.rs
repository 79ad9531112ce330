use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering},
};

use parking_lot::{RawRwLock, RwLock, lock_api};

use crate::storage::{INVALID_PAGE_ID, PageId};

pub type PageRef = Arc<Page>;

/// Owned latch guards. They keep the data lock alive independently of any
/// borrow of the [`Page`], which lets page guards carry them across scopes.
pub type PageSharedLatch = lock_api::ArcRwLockReadGuard<RawRwLock, Box<[u8]>>;
pub type PageExclusiveLatch = lock_api::ArcRwLockWriteGuard<RawRwLock, Box<[u8]>>;

/// One buffer pool frame: a page-sized byte buffer behind a reader/writer
/// latch, plus the frame metadata the pool tracks for it. The metadata
/// fields are only written while the pool mutex is held; the latch protects
/// the page bytes themselves.
pub struct Page {
    id: AtomicI32,
    pin_count: AtomicU32,
    dirty: AtomicBool,
    data: Arc<RwLock<Box<[u8]>>>,
}

impl Page {
    pub fn new(page_size: usize) -> Self {
        Self {
            id: AtomicI32::new(INVALID_PAGE_ID),
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            data: Arc::new(RwLock::new(vec![0u8; page_size].into_boxed_slice())),
        }
    }

    pub fn id(&self) -> PageId {
        self.id.load(Ordering::SeqCst)
    }

    pub(crate) fn set_id(&self, id: PageId) {
        self.id.store(id, Ordering::SeqCst);
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::SeqCst)
    }

    pub(crate) fn set_pin_count(&self, count: u32) {
        self.pin_count.store(count, Ordering::SeqCst);
    }

    pub(crate) fn inc_pin(&self) {
        self.pin_count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn dec_pin(&self) {
        self.pin_count.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::SeqCst);
    }

    /// Shared handle to the latched page bytes, used to hand the buffer to
    /// the disk scheduler.
    pub(crate) fn data_handle(&self) -> Arc<RwLock<Box<[u8]>>> {
        self.data.clone()
    }

    pub fn lock_shared(&self) -> PageSharedLatch {
        self.data.read_arc()
    }

    pub fn lock_exclusive(&self) -> PageExclusiveLatch {
        self.data.write_arc()
    }

    /// Returns the frame to its pristine state. Only called on unpinned
    /// frames, so taking the data latch here cannot block on a guard.
    pub(crate) fn reset(&self) {
        self.data.write_arc().fill(0);
        self.set_id(INVALID_PAGE_ID);
        self.set_pin_count(0);
        self.set_dirty(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_metadata() {
        let page = Page::new(128);

        assert_eq!(page.id(), INVALID_PAGE_ID);
        assert_eq!(page.pin_count(), 0);
        assert!(!page.is_dirty());

        page.set_id(9);
        page.inc_pin();
        page.set_dirty(true);
        page.lock_exclusive().fill(0xEE);

        assert_eq!(page.id(), 9);
        assert_eq!(page.pin_count(), 1);

        page.reset();
        assert_eq!(page.id(), INVALID_PAGE_ID);
        assert!(!page.is_dirty());
        assert!(page.lock_shared().iter().all(|b| *b == 0));
    }
}
