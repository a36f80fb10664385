use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Policy not found: {0}")]
    NotFound(String),

    #[error("Policy already exists: {0}")]
    AlreadyExists(String),

    #[error("Token mismatch for policy {0}; it was modified since it was read")]
    TokenMismatch(String),

    #[error("Invalid policy name: {0:?}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
