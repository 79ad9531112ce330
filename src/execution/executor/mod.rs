use std::sync::Arc;

use crate::{
    execution::{ExecutorContext, Result, plan::PlanNode, plan::PlanRef},
    sql::{schema::SchemaRef, tuple::Rid, tuple::Tuple},
};

pub mod delete;
pub mod hash_join;
pub mod index_scan;
pub mod insert;
pub mod nested_loop_join;
pub mod seq_scan;
pub mod sort;
pub mod top_n;
pub mod update;
pub mod values;

/// Pull-based iterator protocol. `init` is called once before the first
/// `next` and may be called again to restart the operator (the nested loop
/// join re-inits its right child for every left tuple); `next` yields one
/// tuple per call until exhausted.
pub trait Executor {
    fn init(&mut self) -> Result<()>;
    fn next(&mut self) -> Result<Option<(Tuple, Rid)>>;
    fn output_schema(&self) -> &SchemaRef;
}

pub type BoxedExecutor = Box<dyn Executor + Send>;

/// Builds the executor tree for a plan. Unsupported plan shapes (join types
/// other than INNER and LEFT) fail here, before execution starts.
pub fn create_executor(ctx: &Arc<ExecutorContext>, plan: &PlanRef) -> Result<BoxedExecutor> {
    Ok(match &**plan {
        PlanNode::Values(node) => Box::new(values::ValuesExecutor::new(node.clone())),
        PlanNode::SeqScan(node) => {
            Box::new(seq_scan::SeqScanExecutor::new(ctx.clone(), node.clone()))
        }
        PlanNode::IndexScan(node) => {
            Box::new(index_scan::IndexScanExecutor::new(ctx.clone(), node.clone()))
        }
        PlanNode::Insert(node) => {
            let child = create_executor(ctx, &node.child)?;
            Box::new(insert::InsertExecutor::new(ctx.clone(), node.clone(), child))
        }
        PlanNode::Update(node) => {
            let child = create_executor(ctx, &node.child)?;
            Box::new(update::UpdateExecutor::new(ctx.clone(), node.clone(), child))
        }
        PlanNode::Delete(node) => {
            let child = create_executor(ctx, &node.child)?;
            Box::new(delete::DeleteExecutor::new(ctx.clone(), node.clone(), child))
        }
        PlanNode::NestedLoopJoin(node) => {
            let left = create_executor(ctx, &node.left)?;
            let right = create_executor(ctx, &node.right)?;
            Box::new(nested_loop_join::NestedLoopJoinExecutor::new(
                node.clone(),
                left,
                right,
            )?)
        }
        PlanNode::HashJoin(node) => {
            let left = create_executor(ctx, &node.left)?;
            let right = create_executor(ctx, &node.right)?;
            Box::new(hash_join::HashJoinExecutor::new(node.clone(), left, right)?)
        }
        PlanNode::Sort(node) => {
            let child = create_executor(ctx, &node.child)?;
            Box::new(sort::SortExecutor::new(node.clone(), child))
        }
        PlanNode::TopN(node) => {
            let child = create_executor(ctx, &node.child)?;
            Box::new(top_n::TopNExecutor::new(node.clone(), child))
        }
    })
}
