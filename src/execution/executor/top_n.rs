use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc};

use crate::{
    execution::{
        Result,
        executor::{
            BoxedExecutor, Executor,
            sort::{compare_sort_keys, evaluate_sort_keys},
        },
        plan::{OrderBy, TopNNode},
    },
    sql::{
        schema::SchemaRef,
        tuple::{Rid, Tuple},
        types::Value,
    },
};

/// Heap entry ordered by the requested sort order, so the heap's max is the
/// worst candidate and gets popped whenever the heap grows past N.
struct HeapEntry {
    keys: Vec<Value>,
    tuple: Tuple,
    order_bys: Arc<Vec<OrderBy>>,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_sort_keys(&self.keys, &other.keys, &self.order_bys)
    }
}

/// Keeps a bounded heap of the N best rows while draining the child, then
/// emits them in the requested order. Equivalent to sort-then-take-N
/// without materializing more than N rows.
pub struct TopNExecutor {
    plan: TopNNode,
    child: BoxedExecutor,
    output: Vec<Tuple>,
    cursor: usize,
}

impl TopNExecutor {
    pub fn new(plan: TopNNode, child: BoxedExecutor) -> Self {
        Self {
            plan,
            child,
            output: Vec::new(),
            cursor: 0,
        }
    }
}

impl Executor for TopNExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()?;
        self.output.clear();
        self.cursor = 0;

        let order_bys = Arc::new(self.plan.order_bys.clone());
        let mut heap = BinaryHeap::new();

        while let Some((tuple, _)) = self.child.next()? {
            let keys = evaluate_sort_keys(&tuple, self.child.output_schema(), &order_bys)?;
            heap.push(HeapEntry {
                keys,
                tuple,
                order_bys: order_bys.clone(),
            });

            if heap.len() > self.plan.n {
                heap.pop();
            }
        }

        // popping yields worst-first; reverse into the requested order
        let mut output = Vec::with_capacity(heap.len());
        while let Some(entry) = heap.pop() {
            output.push(entry.tuple);
        }
        output.reverse();
        self.output = output;

        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        let Some(tuple) = self.output.get(self.cursor) else {
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
