use std::collections::HashMap;

use crate::{
    execution::{
        Error, Result,
        executor::{BoxedExecutor, Executor},
        plan::{HashJoinNode, JoinType},
    },
    sql::{
        schema::SchemaRef,
        tuple::{Rid, Tuple},
        types::Value,
    },
};

/// Join key: the key expressions evaluated on one side. Only fully
/// non-null keys are hashable; tuples with a null key component never enter
/// or probe the table, which gives SQL's "null matches nothing" for free.
#[derive(PartialEq, Eq, Hash)]
struct JoinKey {
    values: Vec<Value>,
}

impl JoinKey {
    fn is_hashable(&self) -> bool {
        self.values.iter().all(|value| !value.is_null())
    }
}

/// Materializes the right child into a multimap keyed by its join keys,
/// then streams the left child against it. Unmatched left tuples are
/// null-padded once in LEFT mode. INNER and LEFT only.
pub struct HashJoinExecutor {
    plan: HashJoinNode,
    left: BoxedExecutor,
    right: BoxedExecutor,
    table: HashMap<JoinKey, Vec<Tuple>>,
    left_tuple: Option<Tuple>,
    matches: std::vec::IntoIter<Tuple>,
    left_matched: bool,
}

impl HashJoinExecutor {
    pub fn new(plan: HashJoinNode, left: BoxedExecutor, right: BoxedExecutor) -> Result<Self> {
        if !matches!(plan.join_type, JoinType::Inner | JoinType::Left) {
            return Err(Error::UnsupportedJoinType(plan.join_type));
        }

        Ok(Self {
            plan,
            left,
            right,
            table: HashMap::new(),
            left_tuple: None,
            matches: Vec::new().into_iter(),
            left_matched: false,
        })
    }

    fn right_key(&self, tuple: &Tuple) -> Result<JoinKey> {
        let values = self
            .plan
            .right_key_expressions
            .iter()
            .map(|expr| expr.evaluate(tuple, self.right.output_schema()))
            .collect::<crate::sql::Result<Vec<_>>>()?;
        Ok(JoinKey { values })
    }

    fn left_key(&self, tuple: &Tuple) -> Result<JoinKey> {
        let values = self
            .plan
            .left_key_expressions
            .iter()
            .map(|expr| expr.evaluate(tuple, self.left.output_schema()))
            .collect::<crate::sql::Result<Vec<_>>>()?;
        Ok(JoinKey { values })
    }

    /// Pulls the next left tuple and lines up its matching right bucket.
    fn advance_left(&mut self) -> Result<()> {
        self.left_tuple = self.left.next()?.map(|(tuple, _)| tuple);
        self.matches = Vec::new().into_iter();
        self.left_matched = false;

        if let Some(left_tuple) = &self.left_tuple {
            let key = self.left_key(left_tuple)?;
            if key.is_hashable() {
                if let Some(bucket) = self.table.get(&key) {
                    self.matches = bucket.clone().into_iter();
                    self.left_matched = true;
                }
            }
        }

        Ok(())
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

impl Executor for HashJoinExecutor {
    fn init(&mut self) -> Result<()> {
        self.left.init()?;
        self.right.init()?;

        self.table.clear();
        while let Some((right_tuple, _)) = self.right.next()? {
            let key = self.right_key(&right_tuple)?;
            if key.is_hashable() {
                self.table.entry(key).or_default().push(right_tuple);
            }
        }

        self.advance_left()
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        loop {
            let Some(left_tuple) = self.left_tuple.clone() else {
                return Ok(None);
            };

            if let Some(right_tuple) = self.matches.next() {
                return Ok(Some((self.joined(&left_tuple, &right_tuple), Rid::invalid())));
            }

            if self.plan.join_type == JoinType::Left && !self.left_matched {
                self.left_matched = true;
                return Ok(Some((self.null_padded(&left_tuple), Rid::invalid())));
            }

            self.advance_left()?;
        }
    }

    fn output_schema(&self) -> &SchemaRef {
        &self.plan.output_schema
    }
}
