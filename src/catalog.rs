use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use dashmap::DashMap;
use thiserror::Error;

use crate::{
    sql::schema::SchemaRef,
    storage::{buffer_pool::BufferPoolManager, hash::index::HashIndex, heap::TableHeap},
};

pub type TableOid = u32;
pub type IndexOid = u32;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("table \"{0}\" not found in database")]
    TableNotFound(String),
    #[error("table oid {0} not found in database")]
    TableOidNotFound(TableOid),
    #[error("table \"{0}\" already exists")]
    TableExists(String),
    #[error("index oid {0} not found in database")]
    IndexOidNotFound(IndexOid),

    #[error(transparent)]
    Storage(#[from] crate::storage::Error),

    #[error(transparent)]
    Sql(#[from] crate::sql::Error),
}

pub struct TableInfo {
    pub oid: TableOid,
    pub name: String,
    pub schema: SchemaRef,
    pub heap: Arc<TableHeap>,
}

pub struct IndexInfo {
    pub oid: IndexOid,
    pub name: String,
    pub table_name: String,
    pub key_schema: SchemaRef,
    pub key_attrs: Vec<usize>,
    pub index: Arc<HashIndex>,
}

/// Registry of tables and their secondary indexes. Lookup service for the
/// executor layer; all registries are concurrent maps so scans and DDL can
/// interleave.
pub struct Catalog {
    bpm: Arc<BufferPoolManager>,
    tables: DashMap<TableOid, Arc<TableInfo>>,
    table_names: DashMap<String, TableOid>,
    indexes: DashMap<IndexOid, Arc<IndexInfo>>,
    /// `table name -> index oids`, insertion ordered per table.
    table_indexes: DashMap<String, Vec<IndexOid>>,
    next_table_oid: AtomicU32,
    next_index_oid: AtomicU32,
    header_max_depth: u32,
    directory_max_depth: u32,
    bucket_max_size: u32,
}

impl Catalog {
    pub fn new(
        bpm: Arc<BufferPoolManager>,
        header_max_depth: u32,
        directory_max_depth: u32,
        bucket_max_size: u32,
    ) -> Self {
        Self {
            bpm,
            tables: DashMap::new(),
            table_names: DashMap::new(),
            indexes: DashMap::new(),
            table_indexes: DashMap::new(),
            next_table_oid: AtomicU32::new(0),
            next_index_oid: AtomicU32::new(0),
            header_max_depth,
            directory_max_depth,
            bucket_max_size,
        }
    }

    pub fn create_table(&self, name: &str, schema: SchemaRef) -> Result<Arc<TableInfo>> {
        if self.table_names.contains_key(name) {
            return Err(Error::TableExists(name.to_string()));
        }

        let oid = self.next_table_oid.fetch_add(1, Ordering::SeqCst);
        let heap = Arc::new(TableHeap::create(self.bpm.clone())?);
        let info = Arc::new(TableInfo {
            oid,
            name: name.to_string(),
            schema,
            heap,
        });

        self.tables.insert(oid, info.clone());
        self.table_names.insert(name.to_string(), oid);
        self.table_indexes.insert(name.to_string(), Vec::new());

        log::info!("created table \"{name}\" with oid {oid}");

        Ok(info)
    }

    pub fn get_table(&self, oid: TableOid) -> Result<Arc<TableInfo>> {
        self.tables
            .get(&oid)
            .map(|entry| entry.value().clone())
            .ok_or(Error::TableOidNotFound(oid))
    }

    pub fn get_table_by_name(&self, name: &str) -> Result<Arc<TableInfo>> {
        let oid = *self
            .table_names
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
        self.get_table(oid)
    }

    /// Builds a hash index over `key_attrs` of the table and backfills it
    /// from the rows already in the heap.
    pub fn create_index(
        &self,
        index_name: &str,
        table_name: &str,
        key_attrs: Vec<usize>,
    ) -> Result<Arc<IndexInfo>> {
        let table = self.get_table_by_name(table_name)?;
        let key_schema = Arc::new(table.schema.project(&key_attrs));

        let oid = self.next_index_oid.fetch_add(1, Ordering::SeqCst);
        let index = Arc::new(HashIndex::new(
            index_name,
            self.bpm.clone(),
            key_schema.clone(),
            key_attrs.clone(),
            self.header_max_depth,
            self.directory_max_depth,
            self.bucket_max_size,
        )?);

        let mut iter = table.heap.iter();
        while let Some((meta, tuple, rid)) = iter.next()? {
            if meta.is_deleted {
                continue;
            }
            index.insert_entry(&tuple.key_from_tuple(&key_attrs)?, rid)?;
        }

        let info = Arc::new(IndexInfo {
            oid,
            name: index_name.to_string(),
            table_name: table_name.to_string(),
            key_schema,
            key_attrs,
            index,
        });

        self.indexes.insert(oid, info.clone());
        self.table_indexes
            .entry(table_name.to_string())
            .or_default()
            .push(oid);

        log::info!("created index \"{index_name}\" on \"{table_name}\" with oid {oid}");

        Ok(info)
    }

    pub fn get_index(&self, oid: IndexOid) -> Result<Arc<IndexInfo>> {
        self.indexes
            .get(&oid)
            .map(|entry| entry.value().clone())
            .ok_or(Error::IndexOidNotFound(oid))
    }

    pub fn get_table_indexes(&self, table_name: &str) -> Vec<Arc<IndexInfo>> {
        let Some(oids) = self.table_indexes.get(table_name) else {
            return Vec::new();
        };

        oids.iter()
            .filter_map(|oid| self.indexes.get(oid).map(|entry| entry.value().clone()))
            .collect()
    }

    /// Finds a single-column index keyed exactly on `col_idx`, the shape
    /// the seq-scan-to-index-scan rewrite can use.
    pub fn match_index(&self, table_name: &str, col_idx: usize) -> Option<(IndexOid, String)> {
        self.get_table_indexes(table_name)
            .into_iter()
            .find(|info| info.key_attrs == [col_idx])
            .map(|info| (info.oid, info.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sql::{
            schema::{Column, Schema},
            tuple::{Tuple, TupleMeta},
            types::{Value, ValueType},
        },
        storage::{DEFAULT_PAGE_SIZE, disk::MemDiskManager},
    };

    fn test_catalog() -> Catalog {
        let disk = Arc::new(MemDiskManager::new(DEFAULT_PAGE_SIZE));
        let bpm = Arc::new(BufferPoolManager::new(32, 2, disk));
        Catalog::new(bpm, 2, 6, 16)
    }

    fn people_schema() -> SchemaRef {
        Schema::shared(vec![
            Column::new("id", ValueType::Int),
            Column::new("name", ValueType::Text),
        ])
    }

    #[test]
    fn test_create_and_lookup_table() -> anyhow::Result<()> {
        let catalog = test_catalog();

        let info = catalog.create_table("people", people_schema())?;
        assert_eq!(info.name, "people");

        assert_eq!(catalog.get_table(info.oid)?.oid, info.oid);
        assert_eq!(catalog.get_table_by_name("people")?.oid, info.oid);
        assert!(catalog.get_table_by_name("missing").is_err());
        assert!(catalog.create_table("people", people_schema()).is_err());

        Ok(())
    }

    #[test]
    fn test_create_index_backfills() -> anyhow::Result<()> {
        let catalog = test_catalog();
        let table = catalog.create_table("people", people_schema())?;

        let meta = TupleMeta {
            ts: 0,
            is_deleted: false,
        };
        let rid = table.heap.insert_tuple(
            meta,
            &Tuple::from_values(vec![Value::Int(1), Value::Text("ada".into())]),
        )?;

        let index = catalog.create_index("people_id", "people", vec![0])?;
        let found = index
            .index
            .scan_key(&Tuple::from_values(vec![Value::Int(1)]))?;
        assert_eq!(found, vec![rid]);

        assert_eq!(
            catalog.match_index("people", 0),
            Some((index.oid, "people_id".to_string()))
        );
        assert_eq!(catalog.match_index("people", 1), None);

        Ok(())
    }
}
