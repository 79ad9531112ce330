use thiserror::Error;

pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("provided path is not a file: {0}")]
    InvalidFilePath(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    // internal
    #[error(transparent)]
    Utils(#[from] crate::utils::Error),

    #[error(transparent)]
    Storage(#[from] crate::storage::Error),

    #[error(transparent)]
    Sql(#[from] crate::sql::Error),

    #[error(transparent)]
    Catalog(#[from] crate::catalog::Error),

    #[error(transparent)]
    Execution(#[from] crate::execution::Error),
}
