//! Error types for store operations.

use crate::entity::{EntityId, EntityKind};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the entity store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The referenced canonical ID is unknown to the store.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind that was looked up.
        kind: EntityKind,
        /// The ID that did not resolve.
        id: EntityId,
    },

    /// A pairing referenced an assignment or team that is not canonical.
    ///
    /// Raised instead of queueing: the caller must retry after its own
    /// referenced entities have been acknowledged by the host.
    #[error("dangling reference: {kind} {id} is not a canonical entity")]
    DanglingReference {
        /// Which side of the pairing failed to resolve.
        kind: EntityKind,
        /// The unresolved ID as supplied by the caller.
        id: EntityId,
    },
}
