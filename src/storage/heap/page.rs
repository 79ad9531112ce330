use crate::{
    sql::tuple::TupleMeta,
    storage::{INVALID_PAGE_ID, PageId},
    utils::bytes::{read_i32_at, read_u16_at, write_i32_at, write_u16_at},
};

pub const PAGE_HEADER_SIZE: usize = 8;
pub const SLOT_SIZE: usize = 4 + TupleMeta::SIZE;

const NEXT_PAGE_OFFSET: usize = 0;
const NUM_SLOTS_OFFSET: usize = 4;
const LAST_USED_OFFSET: usize = 6;

/// Slotted page holding table tuples.
///
/// ```text
/// +--------+------------+--------------+---------+---------+---------+
/// | Header | Slot array | Free space   | Tuple 3 | Tuple 2 | Tuple 1 |
/// +--------+------------+--------------+---------+---------+---------+
///                                      ^ last_used_offset
/// ```
///
/// The slot array grows forward, payloads grow backward from the page end.
/// Each slot stores the payload offset and length plus the tuple's meta.
/// Pages chain through `next_page_id` to form the heap.
pub struct TablePage<B> {
    data: B,
}

impl<B: AsRef<[u8]>> TablePage<B> {
    pub fn new(data: B) -> Self {
        Self { data }
    }

    fn slot_offset(slot: u16) -> usize {
        PAGE_HEADER_SIZE + slot as usize * SLOT_SIZE
    }

    pub fn next_page_id(&self) -> PageId {
        read_i32_at(self.data.as_ref(), NEXT_PAGE_OFFSET)
    }

    pub fn num_slots(&self) -> u16 {
        read_u16_at(self.data.as_ref(), NUM_SLOTS_OFFSET)
    }

    fn last_used_offset(&self) -> u16 {
        read_u16_at(self.data.as_ref(), LAST_USED_OFFSET)
    }

    pub fn free_space(&self) -> usize {
        self.last_used_offset() as usize - Self::slot_offset(self.num_slots())
    }

    pub fn can_insert(&self, payload_len: usize) -> bool {
        payload_len + SLOT_SIZE <= self.free_space()
    }

    /// Largest payload an empty page can take.
    pub fn max_payload_size(page_size: usize) -> usize {
        page_size - PAGE_HEADER_SIZE - SLOT_SIZE
    }

    pub fn get(&self, slot: u16) -> Option<(TupleMeta, &[u8])> {
        if slot >= self.num_slots() {
            return None;
        }

        let data = self.data.as_ref();
        let base = Self::slot_offset(slot);
        let offset = read_u16_at(data, base) as usize;
        let len = read_u16_at(data, base + 2) as usize;
        let meta = TupleMeta::decode(&data[base + 4..base + 4 + TupleMeta::SIZE]).ok()?;

        Some((meta, &data[offset..offset + len]))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> TablePage<B> {
    pub fn init(&mut self) {
        let page_size = self.data.as_ref().len() as u16;
        let data = self.data.as_mut();

        write_i32_at(data, NEXT_PAGE_OFFSET, INVALID_PAGE_ID);
        write_u16_at(data, NUM_SLOTS_OFFSET, 0);
        write_u16_at(data, LAST_USED_OFFSET, page_size);
    }

    pub fn set_next_page_id(&mut self, page_id: PageId) {
        write_i32_at(self.data.as_mut(), NEXT_PAGE_OFFSET, page_id);
    }

    /// Appends the payload and returns its new slot number. Callers check
    /// `can_insert` first.
    pub fn insert(&mut self, meta: TupleMeta, payload: &[u8]) -> Option<u16> {
        if !self.can_insert(payload.len()) {
            return None;
        }

        let slot = self.num_slots();
        let offset = self.last_used_offset() as usize - payload.len();
        let base = Self::slot_offset(slot);

        let data = self.data.as_mut();
        data[offset..offset + payload.len()].copy_from_slice(payload);
        write_u16_at(data, base, offset as u16);
        write_u16_at(data, base + 2, payload.len() as u16);
        meta.encode(&mut data[base + 4..base + 4 + TupleMeta::SIZE]);

        write_u16_at(self.data.as_mut(), NUM_SLOTS_OFFSET, slot + 1);
        write_u16_at(self.data.as_mut(), LAST_USED_OFFSET, offset as u16);

        Some(slot)
    }

    pub fn set_meta(&mut self, slot: u16, meta: TupleMeta) -> bool {
        if slot >= self.num_slots() {
            return false;
        }

        let base = Self::slot_offset(slot);
        meta.encode(&mut self.data.as_mut()[base + 4..base + 4 + TupleMeta::SIZE]);
        true
    }

    /// Overwrites the payload in its existing slot. Fails when the new
    /// payload does not fit in the space the tuple already occupies.
    pub fn update_in_place(&mut self, slot: u16, meta: TupleMeta, payload: &[u8]) -> bool {
        if slot >= self.num_slots() {
            return false;
        }

        let base = Self::slot_offset(slot);
        let offset = read_u16_at(self.data.as_ref(), base) as usize;
        let len = read_u16_at(self.data.as_ref(), base + 2) as usize;
        if payload.len() > len {
            return false;
        }

        let data = self.data.as_mut();
        data[offset..offset + payload.len()].copy_from_slice(payload);
        write_u16_at(data, base + 2, payload.len() as u16);
        meta.encode(&mut data[base + 4..base + 4 + TupleMeta::SIZE]);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(ts: u64) -> TupleMeta {
        TupleMeta {
            ts,
            is_deleted: false,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut buf = vec![0u8; 256];
        let mut page = TablePage::new(buf.as_mut_slice());
        page.init();

        assert_eq!(page.next_page_id(), INVALID_PAGE_ID);

        let a = page.insert(meta(1), b"first").unwrap();
        let b = page.insert(meta(2), b"second").unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(page.num_slots(), 2);

        let (got_meta, payload) = page.get(0).unwrap();
        assert_eq!(got_meta.ts, 1);
        assert_eq!(payload, b"first");

        let (got_meta, payload) = page.get(1).unwrap();
        assert_eq!(got_meta.ts, 2);
        assert_eq!(payload, b"second");

        assert!(page.get(2).is_none());
    }

    #[test]
    fn test_fills_up() {
        let mut buf = vec![0u8; 64];
        let mut page = TablePage::new(buf.as_mut_slice());
        page.init();

        let payload = [0xAA; 16];
        let mut inserted = 0;
        while page.insert(meta(0), &payload).is_some() {
            inserted += 1;
        }

        // 64 - 8 header = 56; each tuple takes 16 + 13 slot = 29
        assert_eq!(inserted, 1);
        assert!(!page.can_insert(payload.len()));
    }

    #[test]
    fn test_update_in_place() {
        let mut buf = vec![0u8; 128];
        let mut page = TablePage::new(buf.as_mut_slice());
        page.init();

        let slot = page.insert(meta(1), b"longer payload").unwrap();

        // equal or smaller payloads fit
        assert!(page.update_in_place(slot, meta(2), b"short"));
        let (got_meta, payload) = page.get(slot).unwrap();
        assert_eq!(got_meta.ts, 2);
        assert_eq!(payload, b"short");

        // a larger payload does not
        assert!(!page.update_in_place(slot, meta(3), &[0u8; 100]));
    }

    #[test]
    fn test_set_meta_marks_deleted() {
        let mut buf = vec![0u8; 128];
        let mut page = TablePage::new(buf.as_mut_slice());
        page.init();

        let slot = page.insert(meta(1), b"row").unwrap();
        assert!(page.set_meta(
            slot,
            TupleMeta {
                ts: 9,
                is_deleted: true
            }
        ));

        let (got_meta, _) = page.get(slot).unwrap();
        assert!(got_meta.is_deleted);
        assert_eq!(got_meta.ts, 9);

        assert!(!page.set_meta(5, meta(0)));
    }
}
