use std::sync::Arc;

use crate::{
    catalog::{IndexOid, TableOid},
    sql::{expression::ExprRef, schema::SchemaRef, types::Value},
};

pub type PlanRef = Arc<PlanNode>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByType {
    Invalid,
    Default,
    Asc,
    Desc,
}

pub type OrderBy = (OrderByType, ExprRef);

/// Immutable plan tree. Every node carries its output schema; children are
/// shared references so the optimizer can rebuild trees cheaply.
#[derive(Debug, Clone)]
pub enum PlanNode {
    Values(ValuesNode),
    SeqScan(SeqScanNode),
    IndexScan(IndexScanNode),
    Insert(InsertNode),
    Update(UpdateNode),
    Delete(DeleteNode),
    NestedLoopJoin(NestedLoopJoinNode),
    HashJoin(HashJoinNode),
    Sort(SortNode),
    TopN(TopNNode),
}

#[derive(Debug, Clone)]
pub struct ValuesNode {
    pub output_schema: SchemaRef,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct SeqScanNode {
    pub output_schema: SchemaRef,
    pub table_oid: TableOid,
    pub table_name: String,
    pub filter: Option<ExprRef>,
}

#[derive(Debug, Clone)]
pub struct IndexScanNode {
    pub output_schema: SchemaRef,
    pub table_oid: TableOid,
    pub index_oid: IndexOid,
    pub filter: Option<ExprRef>,
}

#[derive(Debug, Clone)]
pub struct InsertNode {
    pub output_schema: SchemaRef,
    pub table_oid: TableOid,
    pub child: PlanRef,
}

#[derive(Debug, Clone)]
pub struct UpdateNode {
    pub output_schema: SchemaRef,
    pub table_oid: TableOid,
    /// One expression per output column, evaluated against the old tuple.
    pub target_expressions: Vec<ExprRef>,
    pub child: PlanRef,
}

#[derive(Debug, Clone)]
pub struct DeleteNode {
    pub output_schema: SchemaRef,
    pub table_oid: TableOid,
    pub child: PlanRef,
}

#[derive(Debug, Clone)]
pub struct NestedLoopJoinNode {
    pub output_schema: SchemaRef,
    pub join_type: JoinType,
    pub predicate: ExprRef,
    pub left: PlanRef,
    pub right: PlanRef,
}

#[derive(Debug, Clone)]
pub struct HashJoinNode {
    pub output_schema: SchemaRef,
    pub join_type: JoinType,
    pub left_key_expressions: Vec<ExprRef>,
    pub right_key_expressions: Vec<ExprRef>,
    pub left: PlanRef,
    pub right: PlanRef,
}

#[derive(Debug, Clone)]
pub struct SortNode {
    pub output_schema: SchemaRef,
    pub order_bys: Vec<OrderBy>,
    pub child: PlanRef,
}

#[derive(Debug, Clone)]
pub struct TopNNode {
    pub output_schema: SchemaRef,
    pub order_bys: Vec<OrderBy>,
    pub n: usize,
    pub child: PlanRef,
}

impl PlanNode {
    pub fn output_schema(&self) -> &SchemaRef {
        match self {
            Self::Values(node) => &node.output_schema,
            Self::SeqScan(node) => &node.output_schema,
            Self::IndexScan(node) => &node.output_schema,
            Self::Insert(node) => &node.output_schema,
            Self::Update(node) => &node.output_schema,
            Self::Delete(node) => &node.output_schema,
            Self::NestedLoopJoin(node) => &node.output_schema,
            Self::HashJoin(node) => &node.output_schema,
            Self::Sort(node) => &node.output_schema,
            Self::TopN(node) => &node.output_schema,
        }
    }

    pub fn children(&self) -> Vec<&PlanRef> {
        match self {
            Self::Values(_) | Self::SeqScan(_) | Self::IndexScan(_) => Vec::new(),
            Self::Insert(node) => vec![&node.child],
            Self::Update(node) => vec![&node.child],
            Self::Delete(node) => vec![&node.child],
            Self::NestedLoopJoin(node) => vec![&node.left, &node.right],
            Self::HashJoin(node) => vec![&node.left, &node.right],
            Self::Sort(node) => vec![&node.child],
            Self::TopN(node) => vec![&node.child],
        }
    }

    pub fn shared(self) -> PlanRef {
        Arc::new(self)
    }
}
