//! API error surface.
//!
//! Every failure carries a distinct kind so a node's UI can tell "you made
//! a bad request" from "the host rejected a forward reference" from "you
//! are not authorized", instead of one generic unavailability signal.

use sartrack_core::{EntityId, EntityKind, StoreError};
use sartrack_protocol::ProtocolError;
use serde_json::json;
use thiserror::Error;

/// Result type for request handling.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced to calling nodes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The request body failed validation; the message names the keys.
    #[error("malformed request: {0}")]
    Malformed(#[from] ProtocolError),

    /// The operation referenced an ID the store does not know.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind that was looked up.
        kind: EntityKind,
        /// The ID that did not resolve.
        id: EntityId,
    },

    /// A pairing raced ahead of ID reconciliation for one of its sides.
    /// The caller should retry after its referenced entities resolve.
    #[error("dangling reference: {kind} {id} is not a canonical entity")]
    DanglingReference {
        /// The side that failed to resolve.
        kind: EntityKind,
        /// The unresolved ID.
        id: EntityId,
    },

    /// The bearer credential was missing or wrong.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => ApiError::NotFound { kind, id },
            StoreError::DanglingReference { kind, id } => ApiError::DanglingReference { kind, id },
        }
    }
}

impl ApiError {
    /// Stable machine-readable kind name for the structured payload.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ApiError::Malformed(_) => "malformed_request",
            ApiError::NotFound { .. } => "not_found",
            ApiError::DanglingReference { .. } => "dangling_reference",
            ApiError::Unauthorized(_) => "unauthorized",
        }
    }

    /// HTTP-equivalent status code for transports that want one.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Malformed(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotFound { .. } => 404,
            ApiError::DanglingReference { .. } => 409,
        }
    }

    /// True for every kind in this enum; none are host faults.
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }

    /// Structured payload distinguishing the failure kind from a generic
    /// unavailability signal.
    pub fn to_payload(&self) -> serde_json::Value {
        json!({
            "error": self.kind_name(),
            "message": self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_api_kinds() {
        let err: ApiError = StoreError::NotFound {
            kind: EntityKind::Team,
            id: 4,
        }
        .into();
        assert_eq!(err.kind_name(), "not_found");
        assert_eq!(err.status_code(), 404);

        let err: ApiError = StoreError::DanglingReference {
            kind: EntityKind::Assignment,
            id: -1,
        }
        .into();
        assert_eq!(err.kind_name(), "dangling_reference");
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn payload_carries_kind_and_message() {
        let err = ApiError::Unauthorized("missing bearer credential".into());
        let payload = err.to_payload();
        assert_eq!(payload["error"], "unauthorized");
        assert!(payload["message"]
            .as_str()
            .unwrap()
            .contains("missing bearer credential"));
    }

    #[test]
    fn malformed_wraps_protocol_error() {
        let err: ApiError = ProtocolError::MissingFields {
            operation: "teams/new",
            fields: vec!["resource".into()],
        }
        .into();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("resource"));
    }
}
