//! Error types for the peer cache.

use sartrack_core::EntityId;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur reconciling local state with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CacheError {
    /// No staged entity exists under this placeholder ID.
    #[error("unknown placeholder id {0}")]
    UnknownPlaceholder(EntityId),

    /// A create acknowledgement carried a non-positive ID.
    #[error("host returned non-canonical id {0}")]
    NotCanonical(EntityId),
}
