use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    sql::tuple::{Rid, Tuple, TupleMeta},
    storage::{
        Error, INVALID_PAGE_ID, PageId, Result,
        buffer_pool::BufferPoolManager,
        heap::page::TablePage,
    },
};

pub mod page;

/// Singly-linked chain of slotted pages holding one table's tuples. Inserts
/// append to the tail page; tuples never move, so a RID stays valid for the
/// life of its row.
pub struct TableHeap {
    bpm: Arc<BufferPoolManager>,
    first_page_id: PageId,
    /// Tail of the page chain. The mutex serializes appends.
    last_page_id: Mutex<PageId>,
}

impl TableHeap {
    pub fn create(bpm: Arc<BufferPoolManager>) -> Result<Self> {
        let mut guard = bpm.new_page_guarded()?.upgrade_write();
        let first_page_id = guard.page_id();
        TablePage::new(guard.data_mut()).init();
        drop(guard);

        Ok(Self {
            bpm,
            first_page_id,
            last_page_id: Mutex::new(first_page_id),
        })
    }

    pub fn first_page_id(&self) -> PageId {
        self.first_page_id
    }

    /// Appends the tuple, linking in a fresh page when the tail is full,
    /// and returns the new row's RID.
    pub fn insert_tuple(&self, meta: TupleMeta, tuple: &Tuple) -> Result<Rid> {
        let payload = tuple.encode();
        if payload.len() > TablePage::<&[u8]>::max_payload_size(self.bpm.page_size()) {
            return Err(Error::TupleTooLarge(payload.len()));
        }

        let mut last_page_id = self.last_page_id.lock();

        let mut tail_guard = self.bpm.fetch_page_write(*last_page_id)?;
        if let Some(slot) = TablePage::new(tail_guard.data_mut()).insert(meta, &payload) {
            return Ok(Rid::new(*last_page_id, slot as u32));
        }

        let mut new_guard = self.bpm.new_page_guarded()?.upgrade_write();
        let new_page_id = new_guard.page_id();
        TablePage::new(new_guard.data_mut()).init();
        TablePage::new(tail_guard.data_mut()).set_next_page_id(new_page_id);
        drop(tail_guard);
        *last_page_id = new_page_id;

        match TablePage::new(new_guard.data_mut()).insert(meta, &payload) {
            Some(slot) => Ok(Rid::new(new_page_id, slot as u32)),
            None => Err(Error::TupleTooLarge(payload.len())),
        }
    }

    pub fn get_tuple(&self, rid: Rid) -> Result<(TupleMeta, Tuple)> {
        let guard = self.bpm.fetch_page_read(rid.page_id)?;
        let page = TablePage::new(guard.data());

        let (meta, payload) = page.get(rid.slot as u16).ok_or(Error::SlotOutOfRange {
            page_id: rid.page_id,
            slot: rid.slot,
        })?;

        let mut tuple = Tuple::decode(payload)?;
        tuple.set_rid(rid);
        Ok((meta, tuple))
    }

    /// Overwrites the row at `rid` without moving it. Returns `Ok(false)`
    /// when the new payload is too large for the existing slot.
    pub fn update_tuple_in_place(
        &self,
        meta: TupleMeta,
        tuple: &Tuple,
        rid: Rid,
    ) -> Result<bool> {
        let payload = tuple.encode();
        let mut guard = self.bpm.fetch_page_write(rid.page_id)?;
        Ok(TablePage::new(guard.data_mut()).update_in_place(rid.slot as u16, meta, &payload))
    }

    /// Rewrites only the tuple's meta, which is how rows get marked
    /// deleted.
    pub fn update_tuple_meta(&self, meta: TupleMeta, rid: Rid) -> Result<()> {
        let mut guard = self.bpm.fetch_page_write(rid.page_id)?;

        if !TablePage::new(guard.data_mut()).set_meta(rid.slot as u16, meta) {
            return Err(Error::SlotOutOfRange {
                page_id: rid.page_id,
                slot: rid.slot,
            });
        }
        Ok(())
    }

    pub fn iter(self: &Arc<Self>) -> TableIterator {
        TableIterator {
            heap: self.clone(),
            page_id: self.first_page_id,
            slot: 0,
        }
    }
}

/// Pull-based scan over the page chain. Yields every slot, deleted rows
/// included; executors filter on the meta. No latch is held between calls.
pub struct TableIterator {
    heap: Arc<TableHeap>,
    page_id: PageId,
    slot: u32,
}

impl TableIterator {
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<(TupleMeta, Tuple, Rid)>> {
        loop {
            if self.page_id == INVALID_PAGE_ID {
                return Ok(None);
            }

            let guard = self.heap.bpm.fetch_page_read(self.page_id)?;
            let page = TablePage::new(guard.data());

            if self.slot < page.num_slots() as u32 {
                let rid = Rid::new(self.page_id, self.slot);
                let (meta, payload) = page.get(self.slot as u16).ok_or(Error::SlotOutOfRange {
                    page_id: rid.page_id,
                    slot: rid.slot,
                })?;

                let mut tuple = Tuple::decode(payload)?;
                tuple.set_rid(rid);
                self.slot += 1;
                return Ok(Some((meta, tuple, rid)));
            }

            self.page_id = page.next_page_id();
            self.slot = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sql::types::Value,
        storage::disk::MemDiskManager,
    };

    fn test_heap() -> Result<Arc<TableHeap>> {
        let disk = Arc::new(MemDiskManager::new(256));
        let bpm = Arc::new(BufferPoolManager::new(8, 2, disk));
        Ok(Arc::new(TableHeap::create(bpm)?))
    }

    fn row(id: i64) -> Tuple {
        Tuple::from_values(vec![Value::Int(id), Value::Text(format!("row-{id}"))])
    }

    fn live(ts: u64) -> TupleMeta {
        TupleMeta {
            ts,
            is_deleted: false,
        }
    }

    #[test]
    fn test_insert_get_round_trip() -> anyhow::Result<()> {
        let heap = test_heap()?;

        let rid = heap.insert_tuple(live(1), &row(7))?;
        let (meta, tuple) = heap.get_tuple(rid)?;

        assert_eq!(meta.ts, 1);
        assert!(!meta.is_deleted);
        assert_eq!(tuple.value(0)?, &Value::Int(7));
        assert_eq!(tuple.rid(), rid);

        Ok(())
    }

    #[test]
    fn test_spills_across_pages() -> anyhow::Result<()> {
        let heap = test_heap()?;

        // 256-byte pages force the chain to grow
        let mut rids = Vec::new();
        for id in 0..40 {
            rids.push(heap.insert_tuple(live(0), &row(id))?);
        }

        let distinct_pages: std::collections::HashSet<_> =
            rids.iter().map(|rid| rid.page_id).collect();
        assert!(distinct_pages.len() > 1);

        let mut iter = heap.iter();
        let mut seen = 0;
        while let Some((_, tuple, rid)) = iter.next()? {
            assert_eq!(tuple.value(0)?, &Value::Int(seen));
            assert_eq!(rids[seen as usize], rid);
            seen += 1;
        }
        assert_eq!(seen, 40);

        Ok(())
    }

    #[test]
    fn test_update_in_place() -> anyhow::Result<()> {
        let heap = test_heap()?;

        let rid = heap.insert_tuple(live(1), &row(1))?;

        let shorter = Tuple::from_values(vec![Value::Int(2), Value::Text("x".into())]);
        assert!(heap.update_tuple_in_place(live(2), &shorter, rid)?);

        let (meta, tuple) = heap.get_tuple(rid)?;
        assert_eq!(meta.ts, 2);
        assert_eq!(tuple.value(0)?, &Value::Int(2));

        let bigger = Tuple::from_values(vec![
            Value::Int(3),
            Value::Text("much longer text than before".into()),
        ]);
        assert!(!heap.update_tuple_in_place(live(3), &bigger, rid)?);

        Ok(())
    }

    #[test]
    fn test_delete_marks_meta() -> anyhow::Result<()> {
        let heap = test_heap()?;

        let rid = heap.insert_tuple(live(1), &row(1))?;
        heap.update_tuple_meta(
            TupleMeta {
                ts: 5,
                is_deleted: true,
            },
            rid,
        )?;

        let (meta, _) = heap.get_tuple(rid)?;
        assert!(meta.is_deleted);

        // the iterator still surfaces the slot; callers filter
        let mut iter = heap.iter();
        let (meta, _, _) = iter.next()?.expect("slot should be yielded");
        assert!(meta.is_deleted);

        Ok(())
    }

    #[test]
    fn test_oversized_tuple_rejected() -> anyhow::Result<()> {
        let heap = test_heap()?;

        let huge = Tuple::from_values(vec![Value::Text("y".repeat(1000))]);
        assert!(matches!(
            heap.insert_tuple(live(0), &huge),
            Err(Error::TupleTooLarge(_))
        ));

        Ok(())
    }
}
