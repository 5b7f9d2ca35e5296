//! Row types for the four store collections.
//!
//! IDs are `i64`: positive values are canonical (store-assigned, globally
//! unique for the activity), negative values are node-local placeholders
//! that exist only until the host acknowledges the create. The store never
//! persists a placeholder.

use crate::clock::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An entity identity: positive canonical or negative placeholder.
pub type EntityId = i64;

/// Returns true for store-assigned identities.
pub fn is_canonical(id: EntityId) -> bool {
    id > 0
}

/// Returns true for node-local provisional identities.
pub fn is_placeholder(id: EntityId) -> bool {
    id < 0
}

/// The three mutable entity kinds the store manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A field team.
    Team,
    /// A search assignment.
    Assignment,
    /// The association of one team to one assignment.
    Pairing,
}

impl EntityKind {
    /// Status given to a freshly created entity of this kind.
    ///
    /// Status values are otherwise free-form strings; the store validates
    /// neither the vocabulary nor the transitions between values.
    pub fn default_status(self) -> &'static str {
        match self {
            EntityKind::Team | EntityKind::Assignment => "UNASSIGNED",
            EntityKind::Pairing => "CURRENT",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Team => write!(f, "Team"),
            EntityKind::Assignment => write!(f, "Assignment"),
            EntityKind::Pairing => write!(f, "Pairing"),
        }
    }
}

/// A field team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Canonical or placeholder identity.
    pub id: EntityId,
    /// Team name, e.g. "Alpha".
    pub name: String,
    /// Resource type fielded by the team, e.g. "K9".
    pub resource: String,
    /// Current status string.
    pub status: String,
    /// Store time of the last commit touching this row.
    pub last_edit: Timestamp,
}

/// A search assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Canonical or placeholder identity.
    pub id: EntityId,
    /// Assignment name, e.g. "Grid 7".
    pub name: String,
    /// Resource type the assignment calls for.
    pub intended_resource: String,
    /// Current status string.
    pub status: String,
    /// Store time of the last commit touching this row.
    pub last_edit: Timestamp,
}

/// The association of one team to one assignment.
///
/// Only created once both referenced IDs are canonical; the store rejects
/// anything else with a dangling-reference error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pairing {
    /// Canonical or placeholder identity.
    pub id: EntityId,
    /// Canonical ID of the referenced assignment.
    pub assignment_id: EntityId,
    /// Canonical ID of the referenced team.
    pub team_id: EntityId,
    /// Current status string.
    pub status: String,
    /// Store time of the last commit touching this row.
    pub last_edit: Timestamp,
}

/// One immutable status transition, appended by the store and never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Append-order identity of this record.
    pub id: EntityId,
    /// Kind of the entity that transitioned.
    pub entity_kind: EntityKind,
    /// Canonical ID of the entity that transitioned.
    pub entity_id: EntityId,
    /// Status before the transition.
    pub old_status: String,
    /// Status after the transition.
    pub new_status: String,
    /// Store time of the transition; equals the entity's `last_edit`.
    pub timestamp: Timestamp,
}

/// A committed row of any of the three mutable kinds.
///
/// Returned by kind-dispatched store operations such as status updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    /// A team row.
    Team(Team),
    /// An assignment row.
    Assignment(Assignment),
    /// A pairing row.
    Pairing(Pairing),
}

impl Entity {
    /// Returns the kind of the wrapped row.
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Team(_) => EntityKind::Team,
            Entity::Assignment(_) => EntityKind::Assignment,
            Entity::Pairing(_) => EntityKind::Pairing,
        }
    }

    /// Returns the row's identity.
    pub fn id(&self) -> EntityId {
        match self {
            Entity::Team(t) => t.id,
            Entity::Assignment(a) => a.id,
            Entity::Pairing(p) => p.id,
        }
    }

    /// Returns the row's current status string.
    pub fn status(&self) -> &str {
        match self {
            Entity::Team(t) => &t.status,
            Entity::Assignment(a) => &a.status,
            Entity::Pairing(p) => &p.status,
        }
    }

    /// Returns the row's last commit time.
    pub fn last_edit(&self) -> Timestamp {
        match self {
            Entity::Team(t) => t.last_edit,
            Entity::Assignment(a) => a.last_edit,
            Entity::Pairing(p) => p.last_edit,
        }
    }
}
