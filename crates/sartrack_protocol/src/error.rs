//! Error types for message parsing.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while validating a request body.
///
/// These are client-correctable: the message always names the operation
/// and the exact fields at fault, so a node's UI can show what to fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The body is missing one or more required keys.
    #[error("{operation}: missing required fields: {}", fields.join(", "))]
    MissingFields {
        /// Operation the body was submitted to.
        operation: &'static str,
        /// Every required key absent from the body.
        fields: Vec<String>,
    },

    /// A required key is present but holds the wrong JSON type.
    #[error("{operation}: field '{field}' must be {expected}")]
    InvalidField {
        /// Operation the body was submitted to.
        operation: &'static str,
        /// The offending key.
        field: &'static str,
        /// Human-readable expected type.
        expected: &'static str,
    },

    /// The body is not a JSON object at all.
    #[error("{operation}: request has no JSON object payload")]
    NotAnObject {
        /// Operation the body was submitted to.
        operation: &'static str,
    },
}
