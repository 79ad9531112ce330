use std::sync::Arc;

use crate::sql::{
    Result,
    schema::Schema,
    tuple::Tuple,
    types::{Value, ValueType},
};

pub type ExprRef = Arc<Expression>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// Closed expression tree. Column references carry the tuple side they bind
/// to (0 = left / only child, 1 = right child of a join).
#[derive(Debug, Clone)]
pub enum Expression {
    ColumnValue { tuple_idx: usize, col_idx: usize },
    Constant(Value),
    Comparison {
        op: ComparisonOp,
        left: ExprRef,
        right: ExprRef,
    },
}

impl Expression {
    pub fn column(col_idx: usize) -> ExprRef {
        Arc::new(Self::ColumnValue {
            tuple_idx: 0,
            col_idx,
        })
    }

    pub fn column_of(tuple_idx: usize, col_idx: usize) -> ExprRef {
        Arc::new(Self::ColumnValue { tuple_idx, col_idx })
    }

    pub fn constant(value: Value) -> ExprRef {
        Arc::new(Self::Constant(value))
    }

    pub fn comparison(op: ComparisonOp, left: ExprRef, right: ExprRef) -> ExprRef {
        Arc::new(Self::Comparison { op, left, right })
    }

    /// Shorthand for the common `column = constant` filter.
    pub fn column_equals(col_idx: usize, value: Value) -> ExprRef {
        Self::comparison(ComparisonOp::Eq, Self::column(col_idx), Self::constant(value))
    }

    pub fn evaluate(&self, tuple: &Tuple, schema: &Schema) -> Result<Value> {
        match self {
            Self::ColumnValue { col_idx, .. } => Ok(tuple.value(*col_idx)?.clone()),
            Self::Constant(value) => Ok(value.clone()),
            Self::Comparison { op, left, right } => {
                let lhs = left.evaluate(tuple, schema)?;
                let rhs = right.evaluate(tuple, schema)?;
                Ok(compare_values(*op, &lhs, &rhs))
            }
        }
    }

    /// Evaluation over a pair of join inputs; column references pick their
    /// side through `tuple_idx`.
    pub fn evaluate_join(
        &self,
        left_tuple: &Tuple,
        left_schema: &Schema,
        right_tuple: &Tuple,
        right_schema: &Schema,
    ) -> Result<Value> {
        match self {
            Self::ColumnValue { tuple_idx, col_idx } => {
                let tuple = if *tuple_idx == 0 { left_tuple } else { right_tuple };
                Ok(tuple.value(*col_idx)?.clone())
            }
            Self::Constant(value) => Ok(value.clone()),
            Self::Comparison { op, left, right } => {
                let lhs = left.evaluate_join(left_tuple, left_schema, right_tuple, right_schema)?;
                let rhs = right.evaluate_join(left_tuple, left_schema, right_tuple, right_schema)?;
                Ok(compare_values(*op, &lhs, &rhs))
            }
        }
    }
}

/// Null operands make the comparison itself null.
fn compare_values(op: ComparisonOp, lhs: &Value, rhs: &Value) -> Value {
    if lhs.is_null() || rhs.is_null() {
        return Value::null(ValueType::Bool);
    }

    let ordering = lhs.compare(rhs);
    let result = match op {
        ComparisonOp::Eq => ordering.is_eq(),
        ComparisonOp::NotEq => ordering.is_ne(),
        ComparisonOp::Lt => ordering.is_lt(),
        ComparisonOp::LtEq => ordering.is_le(),
        ComparisonOp::Gt => ordering.is_gt(),
        ComparisonOp::GtEq => ordering.is_ge(),
    };
    Value::Bool(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::schema::{Column, Schema};

    fn row_schema() -> Schema {
        Schema::new(vec![
            Column::new("id", ValueType::Int),
            Column::new("name", ValueType::Text),
        ])
    }

    #[test]
    fn test_filter_evaluation() -> anyhow::Result<()> {
        let schema = row_schema();
        let tuple = Tuple::from_values(vec![Value::Int(7), Value::Text("seven".into())]);

        let filter = Expression::column_equals(0, Value::Int(7));
        assert!(filter.evaluate(&tuple, &schema)?.is_true());

        let miss = Expression::column_equals(0, Value::Int(8));
        assert!(!miss.evaluate(&tuple, &schema)?.is_true());

        Ok(())
    }

    #[test]
    fn test_null_comparison_is_null() -> anyhow::Result<()> {
        let schema = row_schema();
        let tuple = Tuple::from_values(vec![Value::null(ValueType::Int), Value::Text("x".into())]);

        let filter = Expression::column_equals(0, Value::Int(1));
        assert!(filter.evaluate(&tuple, &schema)?.is_null());

        Ok(())
    }

    #[test]
    fn test_join_predicate() -> anyhow::Result<()> {
        let schema = row_schema();
        let left = Tuple::from_values(vec![Value::Int(2), Value::Text("l".into())]);
        let right = Tuple::from_values(vec![Value::Int(2), Value::Text("r".into())]);

        let predicate = Expression::comparison(
            ComparisonOp::Eq,
            Expression::column_of(0, 0),
            Expression::column_of(1, 0),
        );

        assert!(
            predicate
                .evaluate_join(&left, &schema, &right, &schema)?
                .is_true()
        );

        Ok(())
    }
}
