use std::sync::Arc;

use crate::{
    execution::{
        ExecutorContext, Result,
        executor::{BoxedExecutor, Executor},
        plan::UpdateNode,
    },
    sql::{
        schema::SchemaRef,
        tuple::{Rid, Tuple, TupleMeta},
        types::Value,
    },
};

/// Single-shot: rewrites each child row in place with the target
/// expressions evaluated against the old row, and refreshes every index
/// entry (old key out, new key in, same RID). Rows whose new payload no
/// longer fits their slot are skipped and not counted.
pub struct UpdateExecutor {
    ctx: Arc<ExecutorContext>,
    plan: UpdateNode,
    child: BoxedExecutor,
    done: bool,
}

impl UpdateExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: UpdateNode, child: BoxedExecutor) -> Self {
        Self {
            ctx,
            plan,
            child,
            done: false,
        }
    }
}

impl Executor for UpdateExecutor {
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
        while let Some((old_tuple, rid)) = self.child.next()? {
            let new_values = self
                .plan
                .target_expressions
                .iter()
                .map(|expr| expr.evaluate(&old_tuple, self.child.output_schema()))
                .collect::<crate::sql::Result<Vec<Value>>>()?;
            let new_tuple = Tuple::from_values(new_values);

            if !table.heap.update_tuple_in_place(meta, &new_tuple, rid)? {
                continue;
            }

            for index_info in &indexes {
                index_info
                    .index
                    .delete_entry(&old_tuple.key_from_tuple(&index_info.key_attrs)?)?;
                index_info
                    .index
                    .insert_entry(&new_tuple.key_from_tuple(&index_info.key_attrs)?, rid)?;
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
