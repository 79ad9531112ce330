use std::sync::Arc;

use crate::{
    catalog::Catalog,
    execution::plan::{IndexScanNode, PlanNode, PlanRef},
    sql::expression::{ComparisonOp, Expression},
};

/// Applies every rewrite rule to the plan. Currently that is the single
/// seq-scan-to-index-scan rule.
pub fn optimize(plan: &PlanRef, catalog: &Catalog) -> PlanRef {
    seq_scan_as_index_scan(plan, catalog)
}

/// Post-order rewrite: a sequential scan filtered by `column = constant`
/// over a table with a matching single-column index becomes a point index
/// scan carrying the same filter.
pub fn seq_scan_as_index_scan(plan: &PlanRef, catalog: &Catalog) -> PlanRef {
    let rebuilt = rebuild_children(plan, catalog);

    let PlanNode::SeqScan(seq_scan) = &*rebuilt else {
        return rebuilt;
    };
    let Some(filter) = &seq_scan.filter else {
        return rebuilt;
    };

    let Expression::Comparison {
        op: ComparisonOp::Eq,
        left,
        right,
    } = &**filter
    else {
        return rebuilt;
    };
    let Expression::ColumnValue { col_idx, .. } = &**left else {
        return rebuilt;
    };
    if !matches!(&**right, Expression::Constant(_)) {
        return rebuilt;
    }

    let Some((index_oid, index_name)) = catalog.match_index(&seq_scan.table_name, *col_idx) else {
        return rebuilt;
    };

    log::debug!(
        "rewrote seq scan of \"{}\" into index scan via \"{index_name}\"",
        seq_scan.table_name
    );

    Arc::new(PlanNode::IndexScan(IndexScanNode {
        output_schema: seq_scan.output_schema.clone(),
        table_oid: seq_scan.table_oid,
        index_oid,
        filter: seq_scan.filter.clone(),
    }))
}

fn rebuild_children(plan: &PlanRef, catalog: &Catalog) -> PlanRef {
    let node = match &**plan {
        PlanNode::Values(_) | PlanNode::SeqScan(_) | PlanNode::IndexScan(_) => {
            return plan.clone();
        }
        PlanNode::Insert(node) => {
            let mut node = node.clone();
            node.child = seq_scan_as_index_scan(&node.child, catalog);
            PlanNode::Insert(node)
        }
        PlanNode::Update(node) => {
            let mut node = node.clone();
            node.child = seq_scan_as_index_scan(&node.child, catalog);
            PlanNode::Update(node)
        }
        PlanNode::Delete(node) => {
            let mut node = node.clone();
            node.child = seq_scan_as_index_scan(&node.child, catalog);
            PlanNode::Delete(node)
        }
        PlanNode::NestedLoopJoin(node) => {
            let mut node = node.clone();
            node.left = seq_scan_as_index_scan(&node.left, catalog);
            node.right = seq_scan_as_index_scan(&node.right, catalog);
            PlanNode::NestedLoopJoin(node)
        }
        PlanNode::HashJoin(node) => {
            let mut node = node.clone();
            node.left = seq_scan_as_index_scan(&node.left, catalog);
            node.right = seq_scan_as_index_scan(&node.right, catalog);
            PlanNode::HashJoin(node)
        }
        PlanNode::Sort(node) => {
            let mut node = node.clone();
            node.child = seq_scan_as_index_scan(&node.child, catalog);
            PlanNode::Sort(node)
        }
        PlanNode::TopN(node) => {
            let mut node = node.clone();
            node.child = seq_scan_as_index_scan(&node.child, catalog);
            PlanNode::TopN(node)
        }
    };

    Arc::new(node)
}
