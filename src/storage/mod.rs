use thiserror::Error;

pub mod buffer_pool;
pub mod disk;
pub mod guard;
pub mod hash;
pub mod heap;
pub mod page;
pub mod replacer;

/// Identifies a page on disk. Negative ids are invalid.
pub type PageId = i32;
/// Identifies a slot in the buffer pool frame array.
pub type FrameId = usize;

pub const INVALID_PAGE_ID: PageId = -1;
pub const DEFAULT_PAGE_SIZE: usize = 4096;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // buffer pool
    #[error("no free frame and no evictable page in the buffer pool")]
    NoFreeFrames,
    #[error("page {0} is not resident in the buffer pool")]
    PageNotResident(PageId),
    #[error("page id must be non-negative")]
    InvalidPageId,

    // table heap
    #[error("tuple of {0} bytes does not fit in a page")]
    TupleTooLarge(usize),
    #[error("slot {slot} is out of range for page {page_id}")]
    SlotOutOfRange { page_id: PageId, slot: u32 },

    // sql layer (tuple codecs live above the heap)
    #[error(transparent)]
    Sql(#[from] crate::sql::Error),

    // io
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}
