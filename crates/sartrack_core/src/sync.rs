//! The change cursor: "everything newer than timestamp T" queries.
//!
//! A node keeps a single scalar cursor, the timestamp returned by its last
//! poll, and asks the store for every record committed strictly after it.
//! All four collections are read under the one store lock, so a snapshot is
//! a consistent instant: a pairing can never appear ahead of the team and
//! assignment it references, and a status update never appears without its
//! history record.

use crate::clock::Timestamp;
use crate::entity::{Assignment, HistoryRecord, Pairing, Team};
use crate::store::TrackerStore;
use serde::{Deserialize, Serialize};

/// Everything committed after a cursor, plus the next cursor value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// The store watermark at snapshot time; the caller's next `since`.
    pub timestamp: Timestamp,
    /// Teams with `last_edit` strictly after the cursor.
    pub teams: Vec<Team>,
    /// Assignments with `last_edit` strictly after the cursor.
    pub assignments: Vec<Assignment>,
    /// Pairings with `last_edit` strictly after the cursor.
    pub pairings: Vec<Pairing>,
    /// History records with `timestamp` strictly after the cursor.
    pub history: Vec<HistoryRecord>,
}

impl ChangeSet {
    /// Returns true if no record was newer than the cursor.
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
            && self.assignments.is_empty()
            && self.pairings.is_empty()
            && self.history.is_empty()
    }

    /// Total number of records across all four collections.
    pub fn len(&self) -> usize {
        self.teams.len() + self.assignments.len() + self.pairings.len() + self.history.len()
    }
}

impl TrackerStore {
    /// Takes a consistent snapshot of every record newer than `since`.
    ///
    /// The returned `timestamp` is at or above every included record and
    /// below anything committed after the snapshot, except that a commit
    /// landing in the same centisecond as the snapshot can tie it; the
    /// fixed centisecond resolution bounds, but does not eliminate, that
    /// window.
    pub fn changes_since(&self, since: Timestamp) -> ChangeSet {
        let mut inner = self.inner.lock();
        let timestamp = inner.clock.tick();
        ChangeSet {
            timestamp,
            teams: inner
                .teams
                .values()
                .filter(|t| t.last_edit > since)
                .cloned()
                .collect(),
            assignments: inner
                .assignments
                .values()
                .filter(|a| a.last_edit > since)
                .cloned()
                .collect(),
            pairings: inner
                .pairings
                .values()
                .filter(|p| p.last_edit > since)
                .cloned()
                .collect(),
            history: inner
                .history
                .iter()
                .filter(|r| r.timestamp > since)
                .cloned()
                .collect(),
        }
    }

    /// Teams edited strictly after `since`.
    pub fn teams_since(&self, since: Timestamp) -> Vec<Team> {
        self.inner
            .lock()
            .teams
            .values()
            .filter(|t| t.last_edit > since)
            .cloned()
            .collect()
    }

    /// Assignments edited strictly after `since`.
    pub fn assignments_since(&self, since: Timestamp) -> Vec<Assignment> {
        self.inner
            .lock()
            .assignments
            .values()
            .filter(|a| a.last_edit > since)
            .cloned()
            .collect()
    }

    /// Pairings edited strictly after `since`.
    pub fn pairings_since(&self, since: Timestamp) -> Vec<Pairing> {
        self.inner
            .lock()
            .pairings
            .values()
            .filter(|p| p.last_edit > since)
            .cloned()
            .collect()
    }

    /// History records appended strictly after `since`.
    pub fn history_since(&self, since: Timestamp) -> Vec<HistoryRecord> {
        self.inner
            .lock()
            .history
            .iter()
            .filter(|r| r.timestamp > since)
            .cloned()
            .collect()
    }
}
