use std::sync::Arc;

use crate::{
    execution::{Error, ExecutorContext, Result, executor::Executor, plan::IndexScanNode},
    sql::{
        expression::Expression,
        schema::SchemaRef,
        tuple::{Rid, Tuple},
        types::Value,
    },
    storage::heap::TableHeap,
};

/// Point lookup through a hash index. At init the equality filter's
/// constant becomes the probe key; `next` walks the resulting RID list,
/// skipping deleted rows and re-checking the filter against the fetched
/// tuple in case the index holds a stale entry.
pub struct IndexScanExecutor {
    ctx: Arc<ExecutorContext>,
    plan: IndexScanNode,
    heap: Option<Arc<TableHeap>>,
    rids: Vec<Rid>,
    cursor: usize,
}

impl IndexScanExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: IndexScanNode) -> Self {
        Self {
            ctx,
            plan,
            heap: None,
            rids: Vec::new(),
            cursor: 0,
        }
    }
}

/// The rewrite only produces `column = constant` filters; dig the constant
/// out of the right-hand side.
fn probe_constant(filter: &Expression) -> Result<Value> {
    if let Expression::Comparison { right, .. } = filter {
        if let Expression::Constant(value) = &**right {
            return Ok(value.clone());
        }
    }
    Err(Error::InvalidIndexPredicate)
}

impl Executor for IndexScanExecutor {
    fn init(&mut self) -> Result<()> {
        let index_info = self.ctx.catalog.get_index(self.plan.index_oid)?;
        let table = self.ctx.catalog.get_table_by_name(&index_info.table_name)?;
        self.heap = Some(table.heap.clone());
        self.rids.clear();
        self.cursor = 0;

        if let Some(filter) = &self.plan.filter {
            let key = Tuple::from_values(vec![probe_constant(filter)?]);
            self.rids = index_info.index.scan_key(&key)?;
        }

        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        let heap = self
            .heap
            .as_ref()
            .ok_or(Error::NotInitialized("index scan"))?;

        while self.cursor < self.rids.len() {
            let rid = self.rids[self.cursor];
            self.cursor += 1;

            let (meta, tuple) = heap.get_tuple(rid)?;
            if meta.is_deleted {
                continue;
            }

            if let Some(filter) = &self.plan.filter {
                if !filter.evaluate(&tuple, &self.plan.output_schema)?.is_true() {
                    continue;
                }
            }

            return Ok(Some((tuple, rid)));
        }

        Ok(None)
    }

    fn output_schema(&self) -> &SchemaRef {
        &self.plan.output_schema
    }
}
