pub mod manager;
pub mod scheduler;

pub use manager::{DiskManager, DiskOptions, FileDiskManager, MemDiskManager};
pub use scheduler::{DiskRequest, DiskScheduler};
