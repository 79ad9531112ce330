use std::cmp::Ordering;

use crate::{
    execution::{
        Result,
        executor::{BoxedExecutor, Executor},
        plan::{OrderBy, OrderByType, SortNode},
    },
    sql::{
        schema::{Schema, SchemaRef},
        tuple::{Rid, Tuple},
        types::Value,
    },
};

/// Evaluates each order key on the tuple, producing the decorated key
/// vector the comparators work over.
pub(crate) fn evaluate_sort_keys(
    tuple: &Tuple,
    schema: &Schema,
    order_bys: &[OrderBy],
) -> Result<Vec<Value>> {
    order_bys
        .iter()
        .map(|(_, expr)| expr.evaluate(tuple, schema).map_err(Into::into))
        .collect()
}

/// Lexicographic comparison over decorated keys. ASC, DEFAULT and INVALID
/// order ascending; DESC inverts. Equal keys fall through to the next
/// order key.
pub(crate) fn compare_sort_keys(a: &[Value], b: &[Value], order_bys: &[OrderBy]) -> Ordering {
    for (index, (order_type, _)) in order_bys.iter().enumerate() {
        let ordering = match order_type {
            OrderByType::Invalid | OrderByType::Default | OrderByType::Asc => {
                a[index].compare(&b[index])
            }
            OrderByType::Desc => b[index].compare(&a[index]),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Materializes the child and sorts it with a stable comparator, so rows
/// with fully equal keys keep their child order.
pub struct SortExecutor {
    plan: SortNode,
    child: BoxedExecutor,
    sorted: Vec<Tuple>,
    cursor: usize,
}

impl SortExecutor {
    pub fn new(plan: SortNode, child: BoxedExecutor) -> Self {
        Self {
            plan,
            child,
            sorted: Vec::new(),
            cursor: 0,
        }
    }
}

impl Executor for SortExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()?;
        self.sorted.clear();
        self.cursor = 0;

        let mut decorated = Vec::new();
        while let Some((tuple, _)) = self.child.next()? {
            let keys = evaluate_sort_keys(&tuple, self.child.output_schema(), &self.plan.order_bys)?;
            decorated.push((keys, tuple));
        }

        decorated.sort_by(|a, b| compare_sort_keys(&a.0, &b.0, &self.plan.order_bys));
        self.sorted = decorated.into_iter().map(|(_, tuple)| tuple).collect();

        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        let Some(tuple) = self.sorted.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;

        let rid = tuple.rid();
        Ok(Some((tuple.clone(), rid)))
    }

    fn output_schema(&self) -> &SchemaRef {
        &self.plan.output_schema
    }
}
