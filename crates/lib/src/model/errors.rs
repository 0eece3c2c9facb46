//! Error types for model operations.
//!
//! Resolution can fail in two fatal ways: a reference cycle, or a path that
//! walks into something it cannot be walked into. Reading a path whose
//! intermediate containers do not exist is *not* an error; it yields `None`.

use thiserror::Error;

/// Structured error types for model operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ModelError {
    /// A resolution revisited a path it had already substituted
    #[error("Reference cycle detected at '{path}'")]
    ReferenceCycle { path: String },

    /// A computed value depends on itself through its argument paths
    #[error("Function '{name}' depends on its own value")]
    FunctionCycle { name: String },

    /// More segments remain after reaching a scalar
    #[error("Cannot traverse into scalar at '{path}' (next segment '{segment}')")]
    ScalarTraversal { path: String, segment: String },

    /// A key segment was used against an array
    #[error("Array at '{path}' cannot be indexed by '{segment}'")]
    NonIndexSegment { path: String, segment: String },

    /// Array writes may append but not leave holes
    #[error("Index {index} out of bounds for array of length {len} at '{path}'")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    /// Push target is not an array
    #[error("Cannot push onto {actual} at '{path}'")]
    NotAnArray { path: String, actual: String },

    /// Computed values are read-only
    #[error("Cannot write through computed value at '{path}'")]
    WriteThroughFunction { path: String },

    /// No function registered under this name
    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },

    /// A reference key path did not hold a usable scalar
    #[error("Reference key at '{path}' must be a scalar, found {actual}")]
    InvalidKey { path: String, actual: String },

    /// Value conversion failed
    #[error("Type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// JSON text could not be parsed into a document
    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },
}

impl ModelError {
    /// Check if this error is a reference or function cycle
    pub fn is_cycle_error(&self) -> bool {
        matches!(
            self,
            ModelError::ReferenceCycle { .. } | ModelError::FunctionCycle { .. }
        )
    }

    /// Check if this error comes from walking a path into the wrong kind of node
    pub fn is_path_error(&self) -> bool {
        matches!(
            self,
            ModelError::ScalarTraversal { .. }
                | ModelError::NonIndexSegment { .. }
                | ModelError::IndexOutOfBounds { .. }
                | ModelError::NotAnArray { .. }
                | ModelError::WriteThroughFunction { .. }
                | ModelError::InvalidKey { .. }
        )
    }

    pub fn is_type_error(&self) -> bool {
        matches!(self, ModelError::TypeMismatch { .. })
    }

    pub fn is_function_error(&self) -> bool {
        matches!(
            self,
            ModelError::UnknownFunction { .. } | ModelError::FunctionCycle { .. }
        )
    }

    /// Get the path if this is a path-related error
    pub fn path(&self) -> Option<&str> {
        match self {
            ModelError::ReferenceCycle { path }
            | ModelError::ScalarTraversal { path, .. }
            | ModelError::NonIndexSegment { path, .. }
            | ModelError::IndexOutOfBounds { path, .. }
            | ModelError::NotAnArray { path, .. }
            | ModelError::WriteThroughFunction { path }
            | ModelError::InvalidKey { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization {
            reason: err.to_string(),
        }
    }
}

// Conversion from ModelError to the main Error type
impl From<ModelError> for crate::Error {
    fn from(err: ModelError) -> Self {
        crate::Error::Model(err)
    }
}
