use crate::{
    execution::{Result, executor::Executor, plan::ValuesNode},
    sql::{
        schema::SchemaRef,
        tuple::{Rid, Tuple},
    },
};

/// Leaf operator that emits a fixed list of literal rows. The usual child
/// of INSERT.
pub struct ValuesExecutor {
    plan: ValuesNode,
    cursor: usize,
}

impl ValuesExecutor {
    pub fn new(plan: ValuesNode) -> Self {
        Self { plan, cursor: 0 }
    }
}

impl Executor for ValuesExecutor {
    fn init(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        let Some(row) = self.plan.rows.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;

        Ok(Some((Tuple::from_values(row.clone()), Rid::invalid())))
    }

    fn output_schema(&self) -> &SchemaRef {
        &self.plan.output_schema
    }
}
