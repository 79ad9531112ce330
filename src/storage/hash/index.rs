use std::sync::Arc;

use bytes::BufMut;

use crate::{
    sql::{
        schema::SchemaRef,
        tuple::{Rid, Tuple},
        types::Value,
    },
    storage::{
        Result,
        buffer_pool::BufferPoolManager,
        hash::{DiskExtendibleHashTable, key::DefaultKeyHasher, key::GenericKey},
    },
};

/// Width of the opaque keys the index stores. Integer keys fit exactly;
/// longer text keys are truncated to their prefix, which is safe because
/// lookups re-check the tuple against the predicate.
const INDEX_KEY_SIZE: usize = 8;

/// Secondary index over a table: an extendible hash table from encoded key
/// tuples to RIDs. Point lookups only; keys are unique.
pub struct HashIndex {
    ht: DiskExtendibleHashTable<GenericKey<INDEX_KEY_SIZE>, Rid, DefaultKeyHasher>,
    key_schema: SchemaRef,
    key_attrs: Vec<usize>,
}

impl HashIndex {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        bpm: Arc<BufferPoolManager>,
        key_schema: SchemaRef,
        key_attrs: Vec<usize>,
        header_max_depth: u32,
        directory_max_depth: u32,
        bucket_max_size: u32,
    ) -> Result<Self> {
        let ht = DiskExtendibleHashTable::new(
            name,
            bpm,
            DefaultKeyHasher,
            header_max_depth,
            directory_max_depth,
            bucket_max_size,
        )?;

        Ok(Self {
            ht,
            key_schema,
            key_attrs,
        })
    }

    pub fn name(&self) -> &str {
        self.ht.name()
    }

    pub fn key_schema(&self) -> &SchemaRef {
        &self.key_schema
    }

    pub fn key_attrs(&self) -> &[usize] {
        &self.key_attrs
    }

    fn make_key(&self, key_tuple: &Tuple) -> GenericKey<INDEX_KEY_SIZE> {
        let mut encoded = Vec::with_capacity(INDEX_KEY_SIZE);

        for value in key_tuple.values() {
            match value {
                Value::Null(_) => {}
                Value::Bool(v) => encoded.put_u8(*v as u8),
                Value::Int(v) => encoded.put_i64_le(*v),
                Value::Text(v) => encoded.put_slice(v.as_bytes()),
            }
        }

        GenericKey::from_slice(&encoded)
    }

    pub fn insert_entry(&self, key_tuple: &Tuple, rid: Rid) -> Result<bool> {
        self.ht.insert(&self.make_key(key_tuple), &rid)
    }

    pub fn delete_entry(&self, key_tuple: &Tuple) -> Result<bool> {
        self.ht.remove(&self.make_key(key_tuple))
    }

    /// Point lookup: zero or one RID for the key.
    pub fn scan_key(&self, key_tuple: &Tuple) -> Result<Vec<Rid>> {
        Ok(self
            .ht
            .get(&self.make_key(key_tuple))?
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sql::{
            schema::{Column, Schema},
            types::ValueType,
        },
        storage::{DEFAULT_PAGE_SIZE, disk::MemDiskManager},
    };

    fn test_index() -> Result<HashIndex> {
        let disk = Arc::new(MemDiskManager::new(DEFAULT_PAGE_SIZE));
        let bpm = Arc::new(BufferPoolManager::new(16, 2, disk));
        let key_schema = Schema::shared(vec![Column::new("id", ValueType::Int)]);
        HashIndex::new("idx_id", bpm, key_schema, vec![0], 2, 6, 16)
    }

    fn key(id: i64) -> Tuple {
        Tuple::from_values(vec![Value::Int(id)])
    }

    #[test]
    fn test_insert_scan_delete() -> anyhow::Result<()> {
        let index = test_index()?;

        let rid = Rid::new(3, 1);
        assert!(index.insert_entry(&key(7), rid)?);
        assert_eq!(index.scan_key(&key(7))?, vec![rid]);
        assert_eq!(index.scan_key(&key(8))?, Vec::<Rid>::new());

        // unique key: a second insert for the same key is rejected
        assert!(!index.insert_entry(&key(7), Rid::new(9, 9))?);
        assert_eq!(index.scan_key(&key(7))?, vec![rid]);

        assert!(index.delete_entry(&key(7))?);
        assert!(!index.delete_entry(&key(7))?);
        assert_eq!(index.scan_key(&key(7))?, Vec::<Rid>::new());

        Ok(())
    }

    #[test]
    fn test_many_keys() -> anyhow::Result<()> {
        let index = test_index()?;

        for id in 0..200i64 {
            assert!(index.insert_entry(&key(id), Rid::new(id as i32, 0))?);
        }
        for id in 0..200i64 {
            assert_eq!(index.scan_key(&key(id))?, vec![Rid::new(id as i32, 0)]);
        }

        Ok(())
    }
}
