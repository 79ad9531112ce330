use crate::{
    storage::{INVALID_PAGE_ID, PageId},
    utils::bytes::{read_i32_at, read_u32_at, write_i32_at, write_u32_at},
};

const MAX_DEPTH_OFFSET: usize = 0;
const DIRECTORY_IDS_OFFSET: usize = 4;

/// First level of the extendible hash table. Routes the high bits of a key
/// hash to one of `2^max_depth` directory pages.
///
/// Layout: `[max_depth: u32][directory_page_ids: i32 x 2^max_depth]`.
pub struct HashHeaderPage<B> {
    data: B,
}

impl<B: AsRef<[u8]>> HashHeaderPage<B> {
    pub fn new(data: B) -> Self {
        Self { data }
    }

    pub fn max_depth(&self) -> u32 {
        read_u32_at(self.data.as_ref(), MAX_DEPTH_OFFSET)
    }

    pub fn max_size(&self) -> u32 {
        1 << self.max_depth()
    }

    pub fn hash_to_directory_index(&self, hash: u32) -> u32 {
        let max_depth = self.max_depth();
        if max_depth == 0 {
            return 0;
        }
        hash >> (32 - max_depth)
    }

    pub fn directory_page_id(&self, directory_idx: u32) -> PageId {
        assert!(directory_idx < self.max_size());
        read_i32_at(
            self.data.as_ref(),
            DIRECTORY_IDS_OFFSET + directory_idx as usize * 4,
        )
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> HashHeaderPage<B> {
    pub fn init(&mut self, max_depth: u32) {
        assert!(
            DIRECTORY_IDS_OFFSET + (1usize << max_depth) * 4 <= self.data.as_ref().len(),
            "header max depth {max_depth} does not fit in a page"
        );

        write_u32_at(self.data.as_mut(), MAX_DEPTH_OFFSET, max_depth);
        for idx in 0..self.max_size() {
            self.set_directory_page_id(idx, INVALID_PAGE_ID);
        }
    }

    pub fn set_directory_page_id(&mut self, directory_idx: u32, page_id: PageId) {
        assert!(directory_idx < self.max_size());
        write_i32_at(
            self.data.as_mut(),
            DIRECTORY_IDS_OFFSET + directory_idx as usize * 4,
            page_id,
        );
    }
}
