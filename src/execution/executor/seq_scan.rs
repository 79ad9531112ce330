use std::sync::Arc;

use crate::{
    execution::{Error, ExecutorContext, Result, executor::Executor, plan::SeqScanNode},
    sql::{
        schema::SchemaRef,
        tuple::{Rid, Tuple},
    },
    storage::heap::TableIterator,
};

/// Walks the table heap front to back, skipping deleted rows and rows the
/// optional filter rejects.
pub struct SeqScanExecutor {
    ctx: Arc<ExecutorContext>,
    plan: SeqScanNode,
    iter: Option<TableIterator>,
}

impl SeqScanExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: SeqScanNode) -> Self {
        Self {
            ctx,
            plan,
            iter: None,
        }
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> Result<()> {
        let table = self.ctx.catalog.get_table(self.plan.table_oid)?;
        self.iter = Some(table.heap.iter());
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        let iter = self
            .iter
            .as_mut()
            .ok_or(Error::NotInitialized("seq scan"))?;

        while let Some((meta, tuple, rid)) = iter.next()? {
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
