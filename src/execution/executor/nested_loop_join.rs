use crate::{
    execution::{
        Error, Result,
        executor::{BoxedExecutor, Executor},
        plan::{JoinType, NestedLoopJoinNode},
    },
    sql::{
        schema::SchemaRef,
        tuple::{Rid, Tuple},
    },
};

/// For every left tuple, pulls the right side to exhaustion and emits each
/// predicate match; then the right child is re-initialized and the left
/// advances. In LEFT mode an unmatched left tuple is emitted once, padded
/// with typed nulls for the right columns. INNER and LEFT only.
pub struct NestedLoopJoinExecutor {
    plan: NestedLoopJoinNode,
    left: BoxedExecutor,
    right: BoxedExecutor,
    left_tuple: Option<Tuple>,
    left_matched: bool,
}

impl NestedLoopJoinExecutor {
    pub fn new(
        plan: NestedLoopJoinNode,
        left: BoxedExecutor,
        right: BoxedExecutor,
    ) -> Result<Self> {
        if !matches!(plan.join_type, JoinType::Inner | JoinType::Left) {
            return Err(Error::UnsupportedJoinType(plan.join_type));
        }

        Ok(Self {
            plan,
            left,
            right,
            left_tuple: None,
            left_matched: false,
        })
    }

    fn joined(&self, left_tuple: &Tuple, right_tuple: &Tuple) -> Tuple {
        let mut values = left_tuple.values().to_vec();
        values.extend_from_slice(right_tuple.values());
        Tuple::from_values(values)
    }

    fn null_padded(&self, left_tuple: &Tuple) -> Tuple {
        let mut values = left_tuple.values().to_vec();
        values.extend(Tuple::nulls_for(self.right.output_schema()));
        Tuple::from_values(values)
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn init(&mut self) -> Result<()> {
        self.left.init()?;
        self.right.init()?;
        self.left_tuple = self.left.next()?.map(|(tuple, _)| tuple);
        self.left_matched = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        loop {
            let Some(left_tuple) = self.left_tuple.clone() else {
                return Ok(None);
            };

            match self.right.next()? {
                Some((right_tuple, _)) => {
                    let matched = self.plan.predicate.evaluate_join(
                        &left_tuple,
                        self.left.output_schema(),
                        &right_tuple,
                        self.right.output_schema(),
                    )?;

                    if matched.is_true() {
                        self.left_matched = true;
                        return Ok(Some((self.joined(&left_tuple, &right_tuple), Rid::invalid())));
                    }
                }
                None => {
                    if self.plan.join_type == JoinType::Left && !self.left_matched {
                        self.left_matched = true;
                        return Ok(Some((self.null_padded(&left_tuple), Rid::invalid())));
                    }

                    self.right.init()?;
                    self.left_tuple = self.left.next()?.map(|(tuple, _)| tuple);
                    self.left_matched = false;
                }
            }
        }
    }

    fn output_schema(&self) -> &SchemaRef {
        &self.plan.output_schema
    }
}
