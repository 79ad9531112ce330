use std::{
    alloc::{Layout, alloc_zeroed, dealloc},
    collections::HashMap,
    fs::File,
    io,
    os::{fd::AsRawFd, unix::fs::OpenOptionsExt},
    path::Path,
    ptr::NonNull,
};

use libc::c_void;
use parking_lot::Mutex;

use crate::storage::{Error, PageId, Result};

/// Smallest transfer unit `O_DIRECT` accepts.
const DIRECT_IO_BLOCK: usize = 512;

/// Synchronous page-granular block device. All reads and writes move exactly
/// one page; callers must pass a buffer of `page_size` bytes.
pub trait DiskManager: Send + Sync {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()>;
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()>;
    fn sync(&self) -> Result<()>;
    fn page_size(&self) -> usize;
}

/// How the backing page file is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskOptions {
    /// Every write reaches the disk before its request completes
    /// (`O_DSYNC`).
    pub sync_on_write: bool,
    /// Bypass the OS page cache (`O_DIRECT`). The buffer pool is the only
    /// cache then; transfers bounce through a block-aligned buffer because
    /// pool frames live on the ordinary heap.
    pub direct_io: bool,
}

/// Stores pages in a single file at `page_id * page_size` offsets. The file
/// is exclusively locked for the life of the manager.
pub struct FileDiskManager {
    file: File,
    page_size: usize,
    bounce: Option<Mutex<AlignedPageBuf>>,
}

impl FileDiskManager {
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> Result<Self> {
        Self::open_with(path, page_size, DiskOptions::default())
    }

    pub fn open_with(
        path: impl AsRef<Path>,
        page_size: usize,
        options: DiskOptions,
    ) -> Result<Self> {
        if options.direct_io && (!page_size.is_power_of_two() || page_size < DIRECT_IO_BLOCK) {
            return Err(Error::Internal(format!(
                "direct I/O needs a power-of-two page size of at least {DIRECT_IO_BLOCK} bytes, \
                 got {page_size}"
            )));
        }

        let mut open_options = File::options();
        open_options.create(true).read(true).write(true);

        let mut flags = 0;
        if options.direct_io {
            flags |= libc::O_DIRECT;
        }
        if options.sync_on_write {
            flags |= libc::O_DSYNC;
        }
        if flags != 0 {
            open_options.custom_flags(flags);
        }

        let file = open_options.open(&path)?;
        lock_exclusive(&file, path.as_ref())?;

        let bounce = options
            .direct_io
            .then(|| Mutex::new(AlignedPageBuf::alloc(page_size)));

        Ok(Self {
            file,
            page_size,
            bounce,
        })
    }

    fn page_offset(&self, page_id: PageId) -> Result<usize> {
        if page_id < 0 {
            return Err(Error::InvalidPageId);
        }
        Ok(page_id as usize * self.page_size)
    }

    fn pread(&self, offset: usize, buf: &mut [u8]) -> io::Result<usize> {
        let read = unsafe {
            libc::pread(
                self.file.as_raw_fd(),
                buf.as_mut_ptr() as *mut c_void,
                buf.len(),
                offset as i64,
            )
        };
        if read == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(read as usize)
        }
    }

    fn pwrite(&self, offset: usize, buf: &[u8]) -> io::Result<usize> {
        let written = unsafe {
            libc::pwrite(
                self.file.as_raw_fd(),
                buf.as_ptr() as *const c_void,
                buf.len(),
                offset as i64,
            )
        };
        if written == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(written as usize)
        }
    }
}

impl DiskManager for FileDiskManager {
    /// Reads past the current end of file zero-fill the buffer, so freshly
    /// allocated pages read back as all zeroes.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        let offset = self.page_offset(page_id)?;

        let read = match &self.bounce {
            Some(bounce) => {
                let mut bounce = bounce.lock();
                let read = self.pread(offset, bounce.as_mut_slice())?;
                buf[..read].copy_from_slice(&bounce.as_slice()[..read]);
                read
            }
            None => self.pread(offset, buf)?,
        };

        buf[read..].fill(0);

        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()> {
        let offset = self.page_offset(page_id)?;

        let written = match &self.bounce {
            Some(bounce) => {
                let mut bounce = bounce.lock();
                bounce.as_mut_slice().copy_from_slice(buf);
                self.pwrite(offset, bounce.as_slice())?
            }
            None => self.pwrite(offset, buf)?,
        };

        if written != buf.len() {
            return Err(Error::Internal(format!(
                "partial page write: expected {}, wrote {written}",
                buf.len()
            )));
        }

        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(self.file.sync_all()?)
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

/// Exclusive advisory lock so two processes cannot share one page file.
fn lock_exclusive(file: &File, path: &Path) -> io::Result<()> {
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };

    if rc != 0 {
        return Err(io::Error::other(format!(
            "could not lock file {}",
            path.display()
        )));
    }
    Ok(())
}

/// One page of memory aligned to its own size. `O_DIRECT` requires the
/// buffer address and length to be block-aligned.
struct AlignedPageBuf {
    ptr: NonNull<u8>,
    layout: Layout,
}

unsafe impl Send for AlignedPageBuf {}

impl AlignedPageBuf {
    /// `page_size` has been validated as a nonzero power of two.
    fn alloc(page_size: usize) -> Self {
        let layout = Layout::from_size_align(page_size, page_size)
            .expect("page size must be a nonzero power of two");
        let ptr = NonNull::new(unsafe { alloc_zeroed(layout) })
            .expect("aligned page allocation failed");

        Self { ptr, layout }
    }

    fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for AlignedPageBuf {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// In-memory page store used by unit tests and benches.
pub struct MemDiskManager {
    pages: Mutex<HashMap<PageId, Box<[u8]>>>,
    page_size: usize,
}

impl MemDiskManager {
    pub fn new(page_size: usize) -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            page_size,
        }
    }
}

impl DiskManager for MemDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        if page_id < 0 {
            return Err(Error::InvalidPageId);
        }

        match self.pages.lock().get(&page_id) {
            Some(page) => buf.copy_from_slice(page),
            None => buf.fill(0),
        }

        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()> {
        if page_id < 0 {
            return Err(Error::InvalidPageId);
        }

        self.pages.lock().insert(page_id, buf.into());

        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DEFAULT_PAGE_SIZE;

    #[test]
    fn test_file_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dm = FileDiskManager::open(dir.path().join("pages.db"), DEFAULT_PAGE_SIZE)?;

        let mut page = vec![0u8; DEFAULT_PAGE_SIZE];
        page[0] = 0xAB;
        page[DEFAULT_PAGE_SIZE - 1] = 0xCD;
        dm.write_page(3, &page)?;

        let mut out = vec![0xFFu8; DEFAULT_PAGE_SIZE];
        dm.read_page(3, &mut out)?;
        assert_eq!(out, page);

        // unwritten page reads back zeroed
        dm.read_page(7, &mut out)?;
        assert!(out.iter().all(|b| *b == 0));

        Ok(())
    }

    #[test]
    fn test_sync_on_write_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dm = FileDiskManager::open_with(
            dir.path().join("pages.db"),
            DEFAULT_PAGE_SIZE,
            DiskOptions {
                sync_on_write: true,
                direct_io: false,
            },
        )?;

        let page = vec![0x42u8; DEFAULT_PAGE_SIZE];
        dm.write_page(0, &page)?;

        let mut out = vec![0u8; DEFAULT_PAGE_SIZE];
        dm.read_page(0, &mut out)?;
        assert_eq!(out, page);

        Ok(())
    }

    #[test]
    fn test_direct_io_requires_block_sized_pages() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let options = DiskOptions {
            sync_on_write: false,
            direct_io: true,
        };

        // not a power of two
        assert!(FileDiskManager::open_with(dir.path().join("a.db"), 1000, options).is_err());
        // below the block size
        assert!(FileDiskManager::open_with(dir.path().join("b.db"), 256, options).is_err());

        Ok(())
    }

    #[test]
    fn test_file_lock_is_exclusive() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pages.db");

        let _held = FileDiskManager::open(&path, DEFAULT_PAGE_SIZE)?;
        assert!(FileDiskManager::open(&path, DEFAULT_PAGE_SIZE).is_err());

        Ok(())
    }

    #[test]
    fn test_mem_round_trip() -> anyhow::Result<()> {
        let dm = MemDiskManager::new(64);

        let page = vec![7u8; 64];
        dm.write_page(0, &page)?;

        let mut out = vec![0u8; 64];
        dm.read_page(0, &mut out)?;
        assert_eq!(out, page);

        assert!(dm.read_page(-1, &mut out).is_err());

        Ok(())
    }
}
