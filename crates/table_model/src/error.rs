//! Error types for table model operations

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Element not found: {0}")]
    ElementNotFound(Uuid),

    #[error("Row index out of bounds: {0}")]
    RowOutOfBounds(usize),

    #[error("Cell is not attached to a row: {0}")]
    DetachedCell(Uuid),

    #[error("Malformed markup: {0}")]
    MalformedMarkup(String),

    #[error("Tree structure error: {0}")]
    TreeStructure(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
