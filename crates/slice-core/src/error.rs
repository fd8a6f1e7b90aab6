//! Error types for NetSlice

use thiserror::Error;

/// NetSlice core error type
#[derive(Error, Debug)]
pub enum SliceError {
    /// Two slices share the same name
    #[error("duplicate slice name: {0}")]
    DuplicateSliceName(String),

    /// Two slices share the same classification key
    #[error("duplicate classification key: {0}")]
    DuplicateClassificationKey(u16),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for NetSlice core operations
pub type SliceResult<T> = Result<T, SliceError>;
