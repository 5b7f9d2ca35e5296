//! Request and response messages.
//!
//! Every request type can be built two ways: directly (typed callers), or
//! from a raw JSON body via `from_body`, which checks the required keys up
//! front and reports every missing one at once rather than failing on the
//! first.

use crate::error::{ProtocolError, ProtocolResult};
use sartrack_core::{ChangeSet, EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A validated view over a JSON object body.
struct Body<'a> {
    operation: &'static str,
    map: &'a Map<String, Value>,
}

impl<'a> Body<'a> {
    fn new(operation: &'static str, value: &'a Value) -> ProtocolResult<Self> {
        let map = value
            .as_object()
            .ok_or(ProtocolError::NotAnObject { operation })?;
        Ok(Self { operation, map })
    }

    /// Fails with every absent key, not just the first.
    fn require(&self, keys: &[&str]) -> ProtocolResult<()> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|k| !self.map.contains_key(**k))
            .map(|k| (*k).to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::MissingFields {
                operation: self.operation,
                fields: missing,
            })
        }
    }

    fn str_field(&self, field: &'static str) -> ProtocolResult<String> {
        self.map
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ProtocolError::InvalidField {
                operation: self.operation,
                field,
                expected: "a string",
            })
    }

    fn i64_field(&self, field: &'static str) -> ProtocolResult<i64> {
        self.map
            .get(field)
            .and_then(Value::as_i64)
            .ok_or(ProtocolError::InvalidField {
                operation: self.operation,
                field,
                expected: "an integer",
            })
    }

    fn bool_field(&self, field: &'static str) -> ProtocolResult<bool> {
        self.map
            .get(field)
            .and_then(Value::as_bool)
            .ok_or(ProtocolError::InvalidField {
                operation: self.operation,
                field,
                expected: "a boolean",
            })
    }

    fn timestamp_field(&self, field: &'static str) -> ProtocolResult<Timestamp> {
        self.map
            .get(field)
            .and_then(Value::as_f64)
            .map(Timestamp::from_seconds)
            .ok_or(ProtocolError::InvalidField {
                operation: self.operation,
                field,
                expected: "a number of seconds",
            })
    }
}

/// Role assigned to a node by the join protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// This node initialized the activity and hosts the store.
    First,
    /// This node joined an existing activity.
    Joined,
}

/// One registered peer, as reported to joiners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Node name as supplied at join.
    pub name: String,
    /// Network address the node reported.
    pub ip: String,
}

/// Join an activity, possibly as its first node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Name this node registers under.
    pub node_name: String,
    /// Network address other peers may use to reach this node.
    pub ip: String,
    /// True if this node believes no activity exists yet.
    pub is_init: bool,
}

impl JoinRequest {
    /// Parses and validates a raw JSON body.
    pub fn from_body(body: &Value) -> ProtocolResult<Self> {
        let body = Body::new("join", body)?;
        body.require(&["node_name", "ip", "is_init"])?;
        Ok(Self {
            node_name: body.str_field("node_name")?,
            ip: body.str_field("ip")?,
            is_init: body.bool_field("is_init")?,
        })
    }
}

/// Result of a join: the node's role and the full peer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    /// Role assigned by the registry.
    pub role: NodeRole,
    /// Every registered node, including the caller.
    pub peers: Vec<PeerInfo>,
}

/// Create a team on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTeamRequest {
    /// Team name.
    pub name: String,
    /// Resource type the team fields.
    pub resource: String,
}

impl CreateTeamRequest {
    /// Parses and validates a raw JSON body.
    pub fn from_body(body: &Value) -> ProtocolResult<Self> {
        let body = Body::new("teams/new", body)?;
        body.require(&["name", "resource"])?;
        Ok(Self {
            name: body.str_field("name")?,
            resource: body.str_field("resource")?,
        })
    }
}

/// Create an assignment on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAssignmentRequest {
    /// Assignment name.
    pub name: String,
    /// Resource type the assignment calls for.
    pub intended_resource: String,
}

impl CreateAssignmentRequest {
    /// Parses and validates a raw JSON body.
    pub fn from_body(body: &Value) -> ProtocolResult<Self> {
        let body = Body::new("assignments/new", body)?;
        body.require(&["name", "intended_resource"])?;
        Ok(Self {
            name: body.str_field("name")?,
            intended_resource: body.str_field("intended_resource")?,
        })
    }
}

/// Pair an assignment with a team. Both IDs must already be canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePairingRequest {
    /// Canonical assignment ID.
    pub assignment_id: EntityId,
    /// Canonical team ID.
    pub team_id: EntityId,
}

impl CreatePairingRequest {
    /// Parses and validates a raw JSON body.
    pub fn from_body(body: &Value) -> ProtocolResult<Self> {
        let body = Body::new("pairings/new", body)?;
        body.require(&["assignment_id", "team_id"])?;
        Ok(Self {
            assignment_id: body.i64_field("assignment_id")?,
            team_id: body.i64_field("team_id")?,
        })
    }
}

/// Record a status transition on one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStatusRequest {
    /// The new status string; any value is accepted.
    pub new_status: String,
}

impl SetStatusRequest {
    /// Parses and validates a raw JSON body.
    pub fn from_body(body: &Value) -> ProtocolResult<Self> {
        let body = Body::new("status", body)?;
        body.require(&["new_status"])?;
        Ok(Self {
            new_status: body.str_field("new_status")?,
        })
    }
}

/// Pull everything committed after the caller's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// The timestamp returned by the caller's previous poll, or zero.
    pub since: Timestamp,
}

impl SyncRequest {
    /// Parses and validates a raw JSON body.
    pub fn from_body(body: &Value) -> ProtocolResult<Self> {
        let body = Body::new("sync", body)?;
        body.require(&["since"])?;
        Ok(Self {
            since: body.timestamp_field("since")?,
        })
    }
}

/// The sync response is the store's change set verbatim.
pub type SyncResponse = ChangeSet;
