use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::storage::FrameId;

/// LRU-K frame eviction policy.
///
/// Frames with fewer than `k` recorded accesses sit in the history queue and
/// are always preferred as victims over frames in the cache queue, which
/// gives sequential scans no way to flush the warm working set. Within each
/// queue the least recently inserted frame goes first.
pub struct LruKReplacer {
    k: usize,
    replacer_size: usize,
    inner: Mutex<ReplacerInner>,
}

struct ReplacerInner {
    access_count: Vec<usize>,
    evictable: Vec<bool>,
    /// Frames with `0 < access_count < k`. Front is the most recent insert.
    history: VecDeque<FrameId>,
    /// Frames with `access_count >= k`. Front is the most recent insert.
    cache: VecDeque<FrameId>,
    curr_size: usize,
}

impl LruKReplacer {
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k > 0, "k must be greater than 0");

        Self {
            k,
            replacer_size: num_frames,
            inner: Mutex::new(ReplacerInner {
                access_count: vec![0; num_frames],
                evictable: vec![false; num_frames],
                history: VecDeque::new(),
                cache: VecDeque::new(),
                curr_size: 0,
            }),
        }
    }

    /// Picks a victim among the evictable frames, clears its state and
    /// returns its id. Returns `None` when nothing is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();

        if inner.curr_size == 0 {
            return None;
        }

        if let Some(pos) = inner.history.iter().rposition(|&f| inner.evictable[f]) {
            let frame = inner.history.remove(pos)?;
            inner.clear_frame(frame);
            return Some(frame);
        }

        if let Some(pos) = inner.cache.iter().rposition(|&f| inner.evictable[f]) {
            let frame = inner.cache.remove(pos)?;
            inner.clear_frame(frame);
            return Some(frame);
        }

        None
    }

    pub fn record_access(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        assert!(frame_id < self.replacer_size, "frame id out of range");

        inner.access_count[frame_id] += 1;
        let count = inner.access_count[frame_id];

        if count < self.k {
            // Below k the queue position stays put: history is ordered by
            // first access.
            if count == 1 {
                inner.history.push_front(frame_id);
            }
            return;
        }

        if count == self.k {
            if let Some(pos) = inner.history.iter().position(|&f| f == frame_id) {
                inner.history.remove(pos);
            }
            inner.cache.push_front(frame_id);
            return;
        }

        if let Some(pos) = inner.cache.iter().position(|&f| f == frame_id) {
            inner.cache.remove(pos);
        }
        inner.cache.push_front(frame_id);
    }

    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut inner = self.inner.lock();
        assert!(frame_id < self.replacer_size, "frame id out of range");

        if inner.access_count[frame_id] == 0 {
            return;
        }

        if inner.evictable[frame_id] && !evictable {
            inner.curr_size -= 1;
        }
        if !inner.evictable[frame_id] && evictable {
            inner.curr_size += 1;
        }

        inner.evictable[frame_id] = evictable;
    }

    /// Drops a tracked frame entirely. The frame must be evictable.
    pub fn remove(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        assert!(frame_id < self.replacer_size, "frame id out of range");

        if inner.access_count[frame_id] == 0 {
            return;
        }
        assert!(
            inner.evictable[frame_id],
            "cannot remove a non-evictable frame"
        );

        if inner.access_count[frame_id] >= self.k {
            if let Some(pos) = inner.cache.iter().position(|&f| f == frame_id) {
                inner.cache.remove(pos);
            }
        } else if let Some(pos) = inner.history.iter().position(|&f| f == frame_id) {
            inner.history.remove(pos);
        }

        inner.clear_frame(frame_id);
    }

    /// Number of currently evictable frames.
    pub fn size(&self) -> usize {
        self.inner.lock().curr_size
    }
}

impl ReplacerInner {
    fn clear_frame(&mut self, frame_id: FrameId) {
        self.access_count[frame_id] = 0;
        if self.evictable[frame_id] {
            self.curr_size -= 1;
        }
        self.evictable[frame_id] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let replacer = LruKReplacer::new(8, 2);

        // one access: history, two accesses: cache
        replacer.record_access(0);
        replacer.record_access(1);
        replacer.record_access(1);
        replacer.set_evictable(0, true);
        replacer.set_evictable(1, true);

        assert_eq!(replacer.size(), 2);
        // history frame 0 goes before cache frame 1
        assert_eq!(replacer.evict(), Some(0));
        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_scan_resistance() {
        let replacer = LruKReplacer::new(8, 2);

        // frame 0 is accessed twice, then a scan touches 1, 2, 3 once each
        replacer.record_access(0);
        replacer.record_access(0);
        replacer.record_access(1);
        replacer.record_access(2);
        replacer.record_access(3);
        for frame in 0..4 {
            replacer.set_evictable(frame, true);
        }

        // cold scan frames leave first, oldest first, before the warm frame
        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.evict(), Some(2));
        assert_eq!(replacer.evict(), Some(3));
        assert_eq!(replacer.evict(), Some(0));
    }

    #[test]
    fn test_reinsertion_updates_recency() {
        let replacer = LruKReplacer::new(4, 2);

        for frame in 0..2 {
            replacer.record_access(frame);
            replacer.record_access(frame);
            replacer.set_evictable(frame, true);
        }
        // both in cache, 0 older; touching 0 again moves it to the front
        replacer.record_access(0);

        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.evict(), Some(0));
    }

    #[test]
    fn test_set_evictable_gates_eviction() {
        let replacer = LruKReplacer::new(4, 2);

        replacer.record_access(0);
        replacer.record_access(1);
        replacer.set_evictable(0, false);
        replacer.set_evictable(1, true);
        assert_eq!(replacer.size(), 1);

        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.evict(), None);

        replacer.set_evictable(0, true);
        assert_eq!(replacer.evict(), Some(0));
    }

    #[test]
    fn test_remove() {
        let replacer = LruKReplacer::new(4, 2);

        replacer.record_access(0);
        replacer.record_access(1);
        replacer.set_evictable(0, true);
        replacer.set_evictable(1, true);

        replacer.remove(0);
        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.evict(), None);

        // removing an untracked frame is a no-op
        replacer.remove(0);
    }

    #[test]
    #[should_panic(expected = "frame id out of range")]
    fn test_out_of_range_frame_panics() {
        let replacer = LruKReplacer::new(2, 2);
        replacer.record_access(5);
    }
}
