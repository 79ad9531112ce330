use std::{marker::PhantomData, sync::Arc};

use crate::storage::{
    INVALID_PAGE_ID, PageId, Result,
    buffer_pool::BufferPoolManager,
    guard::WritePageGuard,
    hash::{
        bucket::HashBucketPage,
        directory::HashDirectoryPage,
        header::HashHeaderPage,
        key::{DefaultKeyHasher, KeyHasher, Storable},
    },
};

pub mod bucket;
pub mod directory;
pub mod header;
pub mod index;
pub mod key;

/// Disk-backed extendible hash table over three page types: one header page
/// routing hashes to directory pages, directories routing to bucket pages,
/// and buckets holding fixed-size entries. Buckets split when full and merge
/// with their split image when drained; the directory doubles and halves
/// with them, up to `directory_max_depth`.
pub struct DiskExtendibleHashTable<K, V, H = DefaultKeyHasher> {
    name: String,
    bpm: Arc<BufferPoolManager>,
    hasher: H,
    header_page_id: PageId,
    directory_max_depth: u32,
    bucket_max_size: u32,
    _marker: PhantomData<(K, V)>,
}

impl<K, V, H> DiskExtendibleHashTable<K, V, H>
where
    K: Storable + PartialEq,
    V: Storable,
    H: KeyHasher<K>,
{
    pub fn new(
        name: impl Into<String>,
        bpm: Arc<BufferPoolManager>,
        hasher: H,
        header_max_depth: u32,
        directory_max_depth: u32,
        bucket_max_size: u32,
    ) -> Result<Self> {
        let mut header_guard = bpm.new_page_guarded()?.upgrade_write();
        let header_page_id = header_guard.page_id();
        HashHeaderPage::new(header_guard.data_mut()).init(header_max_depth);
        drop(header_guard);

        let name = name.into();
        log::debug!("created hash table \"{name}\" with header page {header_page_id}");

        Ok(Self {
            name,
            bpm,
            hasher,
            header_page_id,
            directory_max_depth,
            bucket_max_size,
            _marker: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    /// Point lookup. Each level's guard is released as soon as the next
    /// page id is known.
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        let hash = self.hasher.hash_key(key);

        let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
        let directory_page_id = {
            let header = HashHeaderPage::new(header_guard.data());
            let directory_idx = header.hash_to_directory_index(hash);
            header.directory_page_id(directory_idx)
        };
        drop(header_guard);
        if directory_page_id == INVALID_PAGE_ID {
            return Ok(None);
        }

        let directory_guard = self.bpm.fetch_page_read(directory_page_id)?;
        let bucket_page_id = {
            let directory = HashDirectoryPage::new(directory_guard.data());
            let bucket_idx = directory.hash_to_bucket_index(hash);
            directory.bucket_page_id(bucket_idx)
        };
        drop(directory_guard);
        if bucket_page_id == INVALID_PAGE_ID {
            return Ok(None);
        }

        let bucket_guard = self.bpm.fetch_page_read(bucket_page_id)?;
        let bucket = HashBucketPage::<_, K, V>::new(bucket_guard.data());
        Ok(bucket.lookup(key))
    }

    /// Inserts the pair, splitting the target bucket as many times as the
    /// directory allows. Returns `Ok(false)` for duplicate keys and for
    /// buckets that cannot split further at `directory_max_depth`.
    pub fn insert(&self, key: &K, value: &V) -> Result<bool> {
        let hash = self.hasher.hash_key(key);

        loop {
            let mut header_guard = self.bpm.fetch_page_write(self.header_page_id)?;
            let directory_page_id = {
                let directory_idx =
                    HashHeaderPage::new(header_guard.data()).hash_to_directory_index(hash);
                let existing =
                    HashHeaderPage::new(header_guard.data()).directory_page_id(directory_idx);

                if existing == INVALID_PAGE_ID {
                    let mut directory_guard = self.bpm.new_page_guarded()?.upgrade_write();
                    let new_page_id = directory_guard.page_id();
                    HashDirectoryPage::new(directory_guard.data_mut())
                        .init(self.directory_max_depth);
                    HashHeaderPage::new(header_guard.data_mut())
                        .set_directory_page_id(directory_idx, new_page_id);
                    new_page_id
                } else {
                    existing
                }
            };
            drop(header_guard);

            let mut directory_guard = self.bpm.fetch_page_write(directory_page_id)?;
            let bucket_idx =
                HashDirectoryPage::new(directory_guard.data()).hash_to_bucket_index(hash);
            let bucket_page_id = {
                let existing =
                    HashDirectoryPage::new(directory_guard.data()).bucket_page_id(bucket_idx);

                if existing == INVALID_PAGE_ID {
                    let mut bucket_guard = self.bpm.new_page_guarded()?.upgrade_write();
                    let new_page_id = bucket_guard.page_id();
                    HashBucketPage::<_, K, V>::new(bucket_guard.data_mut())
                        .init(self.bucket_max_size);
                    let mut directory = HashDirectoryPage::new(directory_guard.data_mut());
                    directory.set_bucket_page_id(bucket_idx, new_page_id);
                    directory.set_local_depth(bucket_idx, 0);
                    new_page_id
                } else {
                    existing
                }
            };

            let mut bucket_guard = self.bpm.fetch_page_write(bucket_page_id)?;
            {
                let mut bucket = HashBucketPage::<_, K, V>::new(bucket_guard.data_mut());
                if bucket.lookup(key).is_some() {
                    return Ok(false);
                }
                if !bucket.is_full() {
                    return Ok(bucket.insert(key, value));
                }
            }

            // full bucket: deepen the mapping, split, then retry the insert
            {
                let mut directory = HashDirectoryPage::new(directory_guard.data_mut());
                if directory.local_depth(bucket_idx) == directory.global_depth() {
                    if directory.global_depth() >= directory.max_depth() {
                        return Ok(false);
                    }
                    directory.incr_global_depth();
                }
                directory.incr_local_depth(bucket_idx);
            }

            self.split_bucket(&mut directory_guard, &mut bucket_guard, bucket_idx)?;

            drop(bucket_guard);
            drop(directory_guard);
        }
    }

    /// Moves the overflowing bucket's entries onto itself and a freshly
    /// allocated split image, rewiring every directory slot that aliases
    /// either of them. The caller has already bumped the bucket's local
    /// depth.
    fn split_bucket(
        &self,
        directory_guard: &mut WritePageGuard,
        bucket_guard: &mut WritePageGuard,
        bucket_idx: u32,
    ) -> Result<()> {
        let mut split_guard = self.bpm.new_page_guarded()?.upgrade_write();
        let split_page_id = split_guard.page_id();
        HashBucketPage::<_, K, V>::new(split_guard.data_mut()).init(self.bucket_max_size);

        let bucket_page_id;
        {
            let mut directory = HashDirectoryPage::new(directory_guard.data_mut());
            let split_idx = directory.split_image_index(bucket_idx);
            let local_depth = directory.local_depth(bucket_idx);
            bucket_page_id = directory.bucket_page_id(bucket_idx);

            // every slot aliasing either half follows its own page id and
            // the new depth
            let stride = 1u32 << local_depth;
            let mut idx = bucket_idx % stride;
            while idx < directory.size() {
                directory.set_local_depth(idx, local_depth);
                idx += stride;
            }
            let mut idx = split_idx % stride;
            while idx < directory.size() {
                directory.set_bucket_page_id(idx, split_page_id);
                directory.set_local_depth(idx, local_depth);
                idx += stride;
            }
        }

        let entries: Vec<(K, V)> = {
            let mut bucket = HashBucketPage::<_, K, V>::new(bucket_guard.data_mut());
            let drained = (0..bucket.size()).map(|i| bucket.entry_at(i)).collect();
            bucket.clear();
            drained
        };

        for (key, value) in entries {
            let target_page_id = {
                let directory = HashDirectoryPage::new(directory_guard.data());
                let target_idx = directory.hash_to_bucket_index(self.hasher.hash_key(&key));
                directory.bucket_page_id(target_idx)
            };
            assert!(
                target_page_id == bucket_page_id || target_page_id == split_page_id,
                "rehashed entry must land in the split pair"
            );

            if target_page_id == bucket_page_id {
                HashBucketPage::<_, K, V>::new(bucket_guard.data_mut()).insert(&key, &value);
            } else {
                HashBucketPage::<_, K, V>::new(split_guard.data_mut()).insert(&key, &value);
            }
        }

        Ok(())
    }

    /// Removes the key. A drained bucket greedily merges with its split
    /// image while both sit at the same local depth, and the directory
    /// shrinks while no bucket needs its top bit.
    pub fn remove(&self, key: &K) -> Result<bool> {
        let hash = self.hasher.hash_key(key);

        let header_guard = self.bpm.fetch_page_write(self.header_page_id)?;
        let directory_page_id = {
            let header = HashHeaderPage::new(header_guard.data());
            let directory_idx = header.hash_to_directory_index(hash);
            header.directory_page_id(directory_idx)
        };
        drop(header_guard);
        if directory_page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        let mut directory_guard = self.bpm.fetch_page_write(directory_page_id)?;
        let bucket_idx = HashDirectoryPage::new(directory_guard.data()).hash_to_bucket_index(hash);
        let bucket_page_id =
            HashDirectoryPage::new(directory_guard.data()).bucket_page_id(bucket_idx);
        if bucket_page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        let mut bucket_guard = self.bpm.fetch_page_write(bucket_page_id)?;
        let (removed, now_empty) = {
            let mut bucket = HashBucketPage::<_, K, V>::new(bucket_guard.data_mut());
            let removed = bucket.remove(key);
            (removed, bucket.is_empty())
        };
        drop(bucket_guard);

        if !removed {
            return Ok(false);
        }

        if now_empty {
            self.merge_bucket(&mut directory_guard, bucket_idx)?;

            while HashDirectoryPage::new(directory_guard.data()).can_shrink() {
                HashDirectoryPage::new(directory_guard.data_mut()).decr_global_depth();
            }
        }

        Ok(true)
    }

    /// While the split image is also empty at the same depth, points every
    /// alias of the pair at the surviving page, reclaims the image's page
    /// and steps one level shallower.
    fn merge_bucket(&self, directory_guard: &mut WritePageGuard, bucket_idx: u32) -> Result<()> {
        loop {
            let (split_idx, split_page_id, bucket_page_id) = {
                let directory = HashDirectoryPage::new(directory_guard.data());
                if directory.local_depth(bucket_idx) == 0 {
                    return Ok(());
                }
                let split_idx = directory.split_image_index(bucket_idx);
                (
                    split_idx,
                    directory.bucket_page_id(split_idx),
                    directory.bucket_page_id(bucket_idx),
                )
            };
            if split_page_id == INVALID_PAGE_ID {
                return Ok(());
            }
            {
                let directory = HashDirectoryPage::new(directory_guard.data());
                if directory.local_depth(bucket_idx) != directory.local_depth(split_idx) {
                    return Ok(());
                }
            }

            let split_guard = self.bpm.fetch_page_write(split_page_id)?;
            let split_empty =
                HashBucketPage::<_, K, V>::new(split_guard.data()).is_empty();
            drop(split_guard);
            if !split_empty {
                return Ok(());
            }

            {
                let mut directory = HashDirectoryPage::new(directory_guard.data_mut());
                directory.decr_local_depth(bucket_idx);
                let local_depth = directory.local_depth(bucket_idx);
                let stride = 1u32 << local_depth;

                let mut idx = bucket_idx % stride;
                while idx < directory.size() {
                    directory.set_bucket_page_id(idx, bucket_page_id);
                    directory.set_local_depth(idx, local_depth);
                    idx += stride;
                }
            }

            self.bpm.delete_page(split_page_id)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DEFAULT_PAGE_SIZE, disk::MemDiskManager, hash::key::IdentityKeyHasher};

    fn test_table(
        bucket_max_size: u32,
        directory_max_depth: u32,
    ) -> Result<DiskExtendibleHashTable<u32, u64, IdentityKeyHasher>> {
        let disk = Arc::new(MemDiskManager::new(DEFAULT_PAGE_SIZE));
        let bpm = Arc::new(BufferPoolManager::new(16, 2, disk));
        DiskExtendibleHashTable::new(
            "test_ht",
            bpm,
            IdentityKeyHasher,
            2,
            directory_max_depth,
            bucket_max_size,
        )
    }

    #[test]
    fn test_insert_and_get() -> anyhow::Result<()> {
        let ht = test_table(8, 4)?;

        for key in 0..32u32 {
            assert!(ht.insert(&key, &(key as u64 * 10))?);
        }
        for key in 0..32u32 {
            assert_eq!(ht.get(&key)?, Some(key as u64 * 10));
        }
        assert_eq!(ht.get(&99)?, None);

        // duplicate insert is rejected, value unchanged
        assert!(!ht.insert(&5, &123)?);
        assert_eq!(ht.get(&5)?, Some(50));

        Ok(())
    }

    #[test]
    fn test_split_chain_on_colliding_keys() -> anyhow::Result<()> {
        // keys 0 and 4 fill the sole bucket; key 2 collides with them on the
        // low bit, forcing global depth 0 -> 1 -> 2 before it separates
        let ht = test_table(2, 2)?;

        assert!(ht.insert(&0, &0)?);
        assert!(ht.insert(&4, &40)?);
        assert!(ht.insert(&2, &20)?);

        assert_eq!(ht.get(&0)?, Some(0));
        assert_eq!(ht.get(&4)?, Some(40));
        assert_eq!(ht.get(&2)?, Some(20));

        // 8 is ≡ 0 (mod 4) like 0 and 4: that bucket is full and already at
        // max depth, so the insert is refused
        assert!(!ht.insert(&8, &80)?);
        assert_eq!(ht.get(&8)?, None);

        Ok(())
    }

    #[test]
    fn test_remove_and_merge() -> anyhow::Result<()> {
        let ht = test_table(2, 3)?;

        for key in 0..8u32 {
            assert!(ht.insert(&key, &(key as u64))?);
        }
        for key in 0..8u32 {
            assert!(ht.remove(&key)?);
        }
        for key in 0..8u32 {
            assert_eq!(ht.get(&key)?, None);
        }

        // removing from the drained table reports absence
        assert!(!ht.remove(&0)?);

        // table is still usable after merging back down
        assert!(ht.insert(&3, &33)?);
        assert_eq!(ht.get(&3)?, Some(33));

        Ok(())
    }

    #[test]
    fn test_remove_on_empty_table() -> anyhow::Result<()> {
        let ht = test_table(2, 2)?;
        assert!(!ht.remove(&7)?);
        Ok(())
    }

    #[test]
    fn test_round_trip_mixed_workload() -> anyhow::Result<()> {
        let ht = test_table(4, 4)?;

        for key in 0..64u32 {
            assert!(ht.insert(&key, &(key as u64 + 1000))?);
        }
        for key in (0..64u32).step_by(2) {
            assert!(ht.remove(&key)?);
        }
        for key in 0..64u32 {
            let expected = (key % 2 == 1).then_some(key as u64 + 1000);
            assert_eq!(ht.get(&key)?, expected);
        }

        // re-insert removed keys with new values
        for key in (0..64u32).step_by(2) {
            assert!(ht.insert(&key, &(key as u64 + 2000))?);
        }
        for key in (0..64u32).step_by(2) {
            assert_eq!(ht.get(&key)?, Some(key as u64 + 2000));
        }

        Ok(())
    }
}
