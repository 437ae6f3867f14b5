//! Error types for the engine ABI

use crate::value::{ClassHandle, ObjectHandle};

/// Result type for engine operations that cannot throw script exceptions
pub type EngineResult<T> = Result<T, EngineError>;

/// Violations of the engine contract
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Handle does not refer to a live object
    #[error("Invalid object handle: {0:?}")]
    InvalidHandle(ObjectHandle),

    /// Class handle was never issued by this engine
    #[error("Unknown class handle: {0:?}")]
    UnknownClass(ClassHandle),

    /// A class with this name already exists
    #[error("Class already defined: {0}")]
    ClassExists(String),

    /// Object cannot be called
    #[error("Object is not callable: {0:?}")]
    NotCallable(ObjectHandle),

    /// Operation not supported by this engine
    #[error("Unsupported engine operation: {0}")]
    Unsupported(String),
}
