use std::sync::Arc;

use crate::{
    execution::{
        ExecutorContext, Result,
        executor::{BoxedExecutor, Executor},
        plan::DeleteNode,
    },
    sql::{
        schema::SchemaRef,
        tuple::{Rid, Tuple, TupleMeta},
        types::Value,
    },
};

/// Single-shot: marks each child row deleted in its tuple meta and removes
/// its key from every index, then emits the affected-row count.
pub struct DeleteExecutor {
    ctx: Arc<ExecutorContext>,
    plan: DeleteNode,
    child: BoxedExecutor,
    done: bool,
}

impl DeleteExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: DeleteNode, child: BoxedExecutor) -> Self {
        Self {
            ctx,
            plan,
            child,
            done: false,
        }
    }
}

impl Executor for DeleteExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()?;
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.done {
            return Ok(None);
        }

        let table = self.ctx.catalog.get_table(self.plan.table_oid)?;
        let indexes = self.ctx.catalog.get_table_indexes(&table.name);
        let meta = TupleMeta {
            ts: self.ctx.transaction.temp_ts(),
            is_deleted: true,
        };

        let mut affected_rows = 0i64;
        while let Some((tuple, rid)) = self.child.next()? {
            table.heap.update_tuple_meta(meta, rid)?;

            for index_info in &indexes {
                index_info
                    .index
                    .delete_entry(&tuple.key_from_tuple(&index_info.key_attrs)?)?;
            }

            affected_rows += 1;
        }

        self.done = true;
        Ok(Some((
            Tuple::from_values(vec![Value::Int(affected_rows)]),
            Rid::invalid(),
        )))
    }

    fn output_schema(&self) -> &SchemaRef {
        &self.plan.output_schema
    }
}
