use thiserror::Error;

pub mod context;
pub mod executor;
pub mod plan;

pub use context::{ExecutorContext, LockManager, Transaction};
pub use executor::{BoxedExecutor, Executor, create_executor};

use crate::execution::plan::JoinType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} executor used before init")]
    NotInitialized(&'static str),
    #[error("join type {0:?} is not supported")]
    UnsupportedJoinType(JoinType),
    #[error("index scan filter is not an equality against a constant")]
    InvalidIndexPredicate,

    #[error(transparent)]
    Storage(#[from] crate::storage::Error),

    #[error(transparent)]
    Sql(#[from] crate::sql::Error),

    #[error(transparent)]
    Catalog(#[from] crate::catalog::Error),
}
