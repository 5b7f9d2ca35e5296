//! The authoritative entity store.
//!
//! One store exists per activity, on the host node. It exclusively owns
//! canonical ID allocation and commit timestamps. A single mutex around the
//! interior serializes every commit, which is what makes ID allocation, the
//! status-update-plus-history append, and snapshot reads atomic with respect
//! to one another.

use crate::clock::{Clock, Timestamp};
use crate::entity::{
    is_canonical, Assignment, Entity, EntityId, EntityKind, HistoryRecord, Pairing, Team,
};
use crate::error::{StoreError, StoreResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;

/// Interior state, guarded as a whole.
#[derive(Debug, Default)]
pub(crate) struct StoreInner {
    pub(crate) teams: BTreeMap<EntityId, Team>,
    pub(crate) assignments: BTreeMap<EntityId, Assignment>,
    pub(crate) pairings: BTreeMap<EntityId, Pairing>,
    pub(crate) history: Vec<HistoryRecord>,
    next_team_id: EntityId,
    next_assignment_id: EntityId,
    next_pairing_id: EntityId,
    next_history_id: EntityId,
    pub(crate) clock: Clock,
}

impl StoreInner {
    fn empty() -> Self {
        Self {
            next_team_id: 1,
            next_assignment_id: 1,
            next_pairing_id: 1,
            next_history_id: 1,
            ..Self::default()
        }
    }
}

/// The authoritative table-like store for one activity.
///
/// Holds teams, assignments, pairings, and the append-only history log.
/// Constructed at host start and injected wherever store access is needed;
/// there is no ambient global instance.
#[derive(Debug)]
pub struct TrackerStore {
    pub(crate) inner: Mutex<StoreInner>,
}

impl TrackerStore {
    /// Creates an empty store with all ID counters at 1.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::empty()),
        }
    }

    /// Rebuilds a store from previously committed records.
    ///
    /// ID counters and the clock are seeded above every restored ID and
    /// timestamp, so identities are never reused across restarts.
    pub fn restore(
        teams: Vec<Team>,
        assignments: Vec<Assignment>,
        pairings: Vec<Pairing>,
        history: Vec<HistoryRecord>,
    ) -> Self {
        let mut inner = StoreInner::empty();
        let mut floor = Timestamp::ZERO;

        for team in teams {
            inner.next_team_id = inner.next_team_id.max(team.id + 1);
            floor = floor.max(team.last_edit);
            inner.teams.insert(team.id, team);
        }
        for assignment in assignments {
            inner.next_assignment_id = inner.next_assignment_id.max(assignment.id + 1);
            floor = floor.max(assignment.last_edit);
            inner.assignments.insert(assignment.id, assignment);
        }
        for pairing in pairings {
            inner.next_pairing_id = inner.next_pairing_id.max(pairing.id + 1);
            floor = floor.max(pairing.last_edit);
            inner.pairings.insert(pairing.id, pairing);
        }
        for record in &history {
            inner.next_history_id = inner.next_history_id.max(record.id + 1);
            floor = floor.max(record.timestamp);
        }
        inner.history = history;
        inner.clock = Clock::seeded(floor);

        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Discards every record and restarts all counters at 1.
    ///
    /// Called by the join protocol when the first node initializes the
    /// activity.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        *inner = StoreInner::empty();
        debug!("store reset");
    }

    /// Creates a team with the next canonical team ID.
    pub fn create_team(&self, name: &str, resource: &str) -> Team {
        let mut inner = self.inner.lock();
        let id = inner.next_team_id;
        inner.next_team_id += 1;
        let team = Team {
            id,
            name: name.to_string(),
            resource: resource.to_string(),
            status: EntityKind::Team.default_status().to_string(),
            last_edit: inner.clock.tick(),
        };
        inner.teams.insert(id, team.clone());
        debug!(id, name, "team created");
        team
    }

    /// Creates an assignment with the next canonical assignment ID.
    pub fn create_assignment(&self, name: &str, intended_resource: &str) -> Assignment {
        let mut inner = self.inner.lock();
        let id = inner.next_assignment_id;
        inner.next_assignment_id += 1;
        let assignment = Assignment {
            id,
            name: name.to_string(),
            intended_resource: intended_resource.to_string(),
            status: EntityKind::Assignment.default_status().to_string(),
            last_edit: inner.clock.tick(),
        };
        inner.assignments.insert(id, assignment.clone());
        debug!(id, name, "assignment created");
        assignment
    }

    /// Creates a pairing of one assignment to one team.
    ///
    /// Both references must resolve to canonical entities already in the
    /// store; otherwise the call fails with [`StoreError::DanglingReference`]
    /// and leaves no trace (no pairing row, no history append).
    pub fn create_pairing(
        &self,
        assignment_id: EntityId,
        team_id: EntityId,
    ) -> StoreResult<Pairing> {
        let mut inner = self.inner.lock();
        if !is_canonical(assignment_id) || !inner.assignments.contains_key(&assignment_id) {
            return Err(StoreError::DanglingReference {
                kind: EntityKind::Assignment,
                id: assignment_id,
            });
        }
        if !is_canonical(team_id) || !inner.teams.contains_key(&team_id) {
            return Err(StoreError::DanglingReference {
                kind: EntityKind::Team,
                id: team_id,
            });
        }

        let id = inner.next_pairing_id;
        inner.next_pairing_id += 1;
        let pairing = Pairing {
            id,
            assignment_id,
            team_id,
            status: EntityKind::Pairing.default_status().to_string(),
            last_edit: inner.clock.tick(),
        };
        inner.pairings.insert(id, pairing.clone());
        debug!(id, assignment_id, team_id, "pairing created");
        Ok(pairing)
    }

    /// Records a status transition on one entity.
    ///
    /// Updates the row's status and `last_edit`, and appends a history
    /// record carrying the same timestamp, in one critical section: a
    /// reader can never observe one without the other. Any status string
    /// is accepted; the store keeps no table of legal transitions.
    pub fn set_status(
        &self,
        kind: EntityKind,
        id: EntityId,
        new_status: &str,
    ) -> StoreResult<Entity> {
        let mut inner = self.inner.lock();
        let now = inner.clock.tick();

        let (old_status, updated) = match kind {
            EntityKind::Team => {
                let team = inner
                    .teams
                    .get_mut(&id)
                    .ok_or(StoreError::NotFound { kind, id })?;
                let old = std::mem::replace(&mut team.status, new_status.to_string());
                team.last_edit = now;
                (old, Entity::Team(team.clone()))
            }
            EntityKind::Assignment => {
                let assignment = inner
                    .assignments
                    .get_mut(&id)
                    .ok_or(StoreError::NotFound { kind, id })?;
                let old = std::mem::replace(&mut assignment.status, new_status.to_string());
                assignment.last_edit = now;
                (old, Entity::Assignment(assignment.clone()))
            }
            EntityKind::Pairing => {
                let pairing = inner
                    .pairings
                    .get_mut(&id)
                    .ok_or(StoreError::NotFound { kind, id })?;
                let old = std::mem::replace(&mut pairing.status, new_status.to_string());
                pairing.last_edit = now;
                (old, Entity::Pairing(pairing.clone()))
            }
        };

        let record_id = inner.next_history_id;
        inner.next_history_id += 1;
        inner.history.push(HistoryRecord {
            id: record_id,
            entity_kind: kind,
            entity_id: id,
            old_status,
            new_status: new_status.to_string(),
            timestamp: now,
        });
        debug!(%kind, id, new_status, "status updated");
        Ok(updated)
    }

    /// Looks up one entity by canonical ID.
    pub fn get(&self, kind: EntityKind, id: EntityId) -> StoreResult<Entity> {
        let inner = self.inner.lock();
        let found = match kind {
            EntityKind::Team => inner.teams.get(&id).cloned().map(Entity::Team),
            EntityKind::Assignment => inner.assignments.get(&id).cloned().map(Entity::Assignment),
            EntityKind::Pairing => inner.pairings.get(&id).cloned().map(Entity::Pairing),
        };
        found.ok_or(StoreError::NotFound { kind, id })
    }

    /// Returns every committed row of one kind, in ID order.
    pub fn get_all(&self, kind: EntityKind) -> Vec<Entity> {
        let inner = self.inner.lock();
        match kind {
            EntityKind::Team => inner.teams.values().cloned().map(Entity::Team).collect(),
            EntityKind::Assignment => inner
                .assignments
                .values()
                .cloned()
                .map(Entity::Assignment)
                .collect(),
            EntityKind::Pairing => inner
                .pairings
                .values()
                .cloned()
                .map(Entity::Pairing)
                .collect(),
        }
    }

    /// Returns all committed teams in ID order.
    pub fn teams(&self) -> Vec<Team> {
        self.inner.lock().teams.values().cloned().collect()
    }

    /// Returns all committed assignments in ID order.
    pub fn assignments(&self) -> Vec<Assignment> {
        self.inner.lock().assignments.values().cloned().collect()
    }

    /// Returns all committed pairings in ID order.
    pub fn pairings(&self) -> Vec<Pairing> {
        self.inner.lock().pairings.values().cloned().collect()
    }

    /// Returns the full history log in append order.
    pub fn history(&self) -> Vec<HistoryRecord> {
        self.inner.lock().history.clone()
    }

    /// Returns the history log scoped to one entity.
    pub fn history_for(&self, kind: EntityKind, id: EntityId) -> Vec<HistoryRecord> {
        self.inner
            .lock()
            .history
            .iter()
            .filter(|r| r.entity_kind == kind && r.entity_id == id)
            .cloned()
            .collect()
    }

    /// Returns the highest timestamp the store has issued.
    pub fn watermark(&self) -> Timestamp {
        self.inner.lock().clock.watermark()
    }
}

impl Default for TrackerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn create_assigns_sequential_canonical_ids() {
        let store = TrackerStore::new();
        assert_eq!(store.create_team("Alpha", "K9").id, 1);
        assert_eq!(store.create_team("Bravo", "Ground").id, 2);
        assert_eq!(store.create_assignment("Grid 7", "K9").id, 1);
    }

    #[test]
    fn create_stamps_default_status_and_time() {
        let store = TrackerStore::new();
        let team = store.create_team("Alpha", "K9");
        assert_eq!(team.status, "UNASSIGNED");
        assert!(team.last_edit > Timestamp::ZERO);
    }

    #[test]
    fn concurrent_creates_never_share_an_id() {
        let store = Arc::new(TrackerStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                (0..50)
                    .map(|_| store.create_team("t", "r").id)
                    .collect::<Vec<_>>()
            }));
        }
        let mut ids: Vec<EntityId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 400);
        assert!(ids.iter().all(|&id| id > 0));
    }

    #[test]
    fn set_status_appends_matching_history() {
        let store = TrackerStore::new();
        let team = store.create_team("Alpha", "K9");
        let updated = store
            .set_status(EntityKind::Team, team.id, "WORKING")
            .unwrap();

        assert_eq!(updated.status(), "WORKING");
        let history = store.history();
        assert_eq!(history.len(), 1);
        let record = &history[0];
        assert_eq!(record.entity_kind, EntityKind::Team);
        assert_eq!(record.entity_id, team.id);
        assert_eq!(record.old_status, "UNASSIGNED");
        assert_eq!(record.new_status, "WORKING");
        assert_eq!(record.timestamp, updated.last_edit());
    }

    #[test]
    fn set_status_unknown_id_fails_without_history() {
        let store = TrackerStore::new();
        let err = store
            .set_status(EntityKind::Assignment, 9, "WORKING")
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                kind: EntityKind::Assignment,
                id: 9
            }
        );
        assert!(store.history().is_empty());
    }

    #[test]
    fn any_status_string_is_accepted() {
        let store = TrackerStore::new();
        let team = store.create_team("Alpha", "K9");
        // No transition table exists; arbitrary strings commit.
        store
            .set_status(EntityKind::Team, team.id, "definitely not canonical")
            .unwrap();
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn pairing_requires_both_references() {
        let store = TrackerStore::new();
        let team = store.create_team("Alpha", "K9");

        let err = store.create_pairing(5, team.id).unwrap_err();
        assert_eq!(
            err,
            StoreError::DanglingReference {
                kind: EntityKind::Assignment,
                id: 5
            }
        );
        // No side effects on failure.
        assert!(store.pairings().is_empty());
        assert!(store.history().is_empty());

        let assignment = store.create_assignment("Grid 7", "K9");
        let err = store.create_pairing(assignment.id, -3).unwrap_err();
        assert_eq!(
            err,
            StoreError::DanglingReference {
                kind: EntityKind::Team,
                id: -3
            }
        );

        let pairing = store.create_pairing(assignment.id, team.id).unwrap();
        assert_eq!(pairing.id, 1);
        assert_eq!(pairing.status, "CURRENT");
    }

    #[test]
    fn placeholder_ids_never_resolve() {
        let store = TrackerStore::new();
        store.create_team("Alpha", "K9");
        assert!(store.get(EntityKind::Team, -1).is_err());
    }

    #[test]
    fn history_filter_scopes_to_one_entity() {
        let store = TrackerStore::new();
        let a = store.create_team("Alpha", "K9");
        let b = store.create_team("Bravo", "Ground");
        store.set_status(EntityKind::Team, a.id, "ENROUTE").unwrap();
        store.set_status(EntityKind::Team, b.id, "WORKING").unwrap();
        store.set_status(EntityKind::Team, a.id, "WORKING").unwrap();

        let scoped = store.history_for(EntityKind::Team, a.id);
        assert_eq!(scoped.len(), 2);
        assert!(scoped.iter().all(|r| r.entity_id == a.id));
    }

    #[test]
    fn restore_seeds_counters_past_existing_ids() {
        let store = TrackerStore::new();
        store.create_team("Alpha", "K9");
        store.create_team("Bravo", "Ground");
        store.set_status(EntityKind::Team, 1, "WORKING").unwrap();

        let restored = TrackerStore::restore(
            store.teams(),
            store.assignments(),
            store.pairings(),
            store.history(),
        );
        let team = restored.create_team("Charlie", "Ground");
        assert_eq!(team.id, 3);
        // Restored clock never re-issues an old timestamp.
        assert!(team.last_edit >= store.watermark());
        let next = restored.history();
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn reset_discards_everything() {
        let store = TrackerStore::new();
        store.create_team("Alpha", "K9");
        store.set_status(EntityKind::Team, 1, "WORKING").unwrap();

        store.reset();
        assert!(store.teams().is_empty());
        assert!(store.history().is_empty());
        // Counters restart at 1.
        assert_eq!(store.create_team("Alpha", "K9").id, 1);
    }
}
