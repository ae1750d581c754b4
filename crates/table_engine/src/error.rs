//! Error types for table editing operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Table is not active")]
    NotActive,

    #[error("Table model error: {0}")]
    Model(#[from] table_model::ModelError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
