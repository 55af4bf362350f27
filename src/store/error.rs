use thiserror::Error;

use crate::jobs::ValidationError;

use super::ids::IdError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Malformed identifier: {0}")]
    MalformedId(#[from] IdError),

    #[error("Invalid key format: {0}")]
    CorruptKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
