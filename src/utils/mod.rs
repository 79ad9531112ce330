use thiserror::Error;

pub mod bytes;

/// Utilities `Result` type.
pub type Result<T> = std::result::Result<T, Error>;

/// Utilities `Error`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid bytes")]
    InvalidBytes,
    #[error("attempted to access outside buffer. buffer overflow")]
    OutOfSpace,
}
