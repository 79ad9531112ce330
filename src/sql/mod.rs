use thiserror::Error;

pub mod expression;
pub mod schema;
pub mod tuple;
pub mod types;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("column {0} is out of range")]
    ColumnOutOfRange(usize),
    #[error("invalid tuple bytes")]
    InvalidTupleBytes,

    #[error(transparent)]
    Utils(#[from] crate::utils::Error),
}
