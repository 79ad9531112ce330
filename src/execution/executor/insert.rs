use std::sync::Arc;

use crate::{
    execution::{
        ExecutorContext, Result,
        executor::{BoxedExecutor, Executor},
        plan::InsertNode,
    },
    sql::{
        schema::SchemaRef,
        tuple::{Rid, Tuple, TupleMeta},
        types::Value,
    },
};

/// Single-shot: the first `next` drains the child, appends every tuple to
/// the table heap, mirrors it into each secondary index, and emits one row
/// holding the affected-row count.
pub struct InsertExecutor {
    ctx: Arc<ExecutorContext>,
    plan: InsertNode,
    child: BoxedExecutor,
    done: bool,
}

impl InsertExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: InsertNode, child: BoxedExecutor) -> Self {
        Self {
            ctx,
            plan,
            child,
            done: false,
        }
    }
}

impl Executor for InsertExecutor {
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
            is_deleted: false,
        };

        let mut affected_rows = 0i64;
        while let Some((tuple, _)) = self.child.next()? {
            let rid = table.heap.insert_tuple(meta, &tuple)?;

            for index_info in &indexes {
                index_info
                    .index
                    .insert_entry(&tuple.key_from_tuple(&index_info.key_attrs)?, rid)?;
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
