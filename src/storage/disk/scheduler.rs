use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{Receiver, Sender, bounded, unbounded};
use parking_lot::RwLock;

use crate::storage::{PageId, disk::DiskManager};

/// One unit of work for the background I/O worker. The `done` sender is a
/// one-shot completion signal: it is fired exactly once, with `true`, after
/// the disk manager call returns.
pub enum DiskRequest {
    Read {
        page_id: PageId,
        /// Frame buffer the page is read into. The worker takes the
        /// exclusive data latch for the duration of the read.
        buf: Arc<RwLock<Box<[u8]>>>,
        done: Sender<bool>,
    },
    Write {
        page_id: PageId,
        data: Box<[u8]>,
        done: Sender<bool>,
    },
}

/// Single background worker consuming a FIFO request queue. Requests to the
/// same page complete in submission order; a disk manager failure is fatal.
pub struct DiskScheduler {
    queue: Sender<Option<DiskRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    pub fn new(disk: Arc<dyn DiskManager>) -> Self {
        let (queue, requests) = unbounded();
        let worker = thread::spawn(move || worker_loop(disk, requests));

        Self {
            queue,
            worker: Some(worker),
        }
    }

    /// Transfers ownership of the request to the worker queue.
    pub fn schedule(&self, request: DiskRequest) {
        let _ = self.queue.send(Some(request));
    }

    /// One-shot completion channel for a [`DiskRequest`].
    pub fn create_completion() -> (Sender<bool>, Receiver<bool>) {
        bounded(1)
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        // The sentinel lands behind any outstanding requests, so the worker
        // drains the queue before exiting.
        let _ = self.queue.send(None);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(disk: Arc<dyn DiskManager>, requests: Receiver<Option<DiskRequest>>) {
    while let Ok(Some(request)) = requests.recv() {
        match request {
            DiskRequest::Read { page_id, buf, done } => {
                let mut frame = buf.write();
                if let Err(err) = disk.read_page(page_id, &mut frame) {
                    log::error!("disk read of page {page_id} failed: {err}");
                    panic!("unrecoverable disk read failure");
                }
                drop(frame);
                let _ = done.send(true);
            }
            DiskRequest::Write {
                page_id,
                data,
                done,
            } => {
                if let Err(err) = disk.write_page(page_id, &data) {
                    log::error!("disk write of page {page_id} failed: {err}");
                    panic!("unrecoverable disk write failure");
                }
                let _ = done.send(true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::disk::MemDiskManager;

    #[test]
    fn test_schedule_write_then_read() -> anyhow::Result<()> {
        let disk = Arc::new(MemDiskManager::new(64));
        let scheduler = DiskScheduler::new(disk.clone());

        let data = vec![42u8; 64].into_boxed_slice();
        let (done, wait) = DiskScheduler::create_completion();
        scheduler.schedule(DiskRequest::Write {
            page_id: 5,
            data,
            done,
        });
        assert!(wait.recv()?);

        let frame = Arc::new(RwLock::new(vec![0u8; 64].into_boxed_slice()));
        let (done, wait) = DiskScheduler::create_completion();
        scheduler.schedule(DiskRequest::Read {
            page_id: 5,
            buf: frame.clone(),
            done,
        });
        assert!(wait.recv()?);

        assert!(frame.read().iter().all(|b| *b == 42));

        Ok(())
    }

    #[test]
    fn test_same_page_requests_complete_in_order() -> anyhow::Result<()> {
        let disk = Arc::new(MemDiskManager::new(8));
        let scheduler = DiskScheduler::new(disk.clone());

        let mut waits = Vec::new();
        for i in 0..16u8 {
            let (done, wait) = DiskScheduler::create_completion();
            scheduler.schedule(DiskRequest::Write {
                page_id: 0,
                data: vec![i; 8].into_boxed_slice(),
                done,
            });
            waits.push(wait);
        }

        for wait in waits {
            assert!(wait.recv()?);
        }

        let mut out = vec![0u8; 8];
        disk.read_page(0, &mut out)?;
        assert_eq!(out, vec![15u8; 8]);

        Ok(())
    }
}
