//! The node-local cache and its reconciliation bookkeeping.
//!
//! A node never mutates the authoritative store directly. Locally created
//! entities get negative placeholder IDs for UI bookkeeping; the host's
//! create response is the sole path that turns a placeholder into a
//! canonical record, and the periodic sync poll is how everything else
//! arrives. A canonical copy always supersedes a placeholder wholesale;
//! nothing is field-merged.

use crate::error::{CacheError, CacheResult};
use parking_lot::Mutex;
use sartrack_core::{
    is_canonical, is_placeholder, Assignment, ChangeSet, EntityId, EntityKind, HistoryRecord,
    Pairing, Team, Timestamp,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// A pairing staged before both of its references are canonical.
///
/// Held locally and excluded from submission until reconciliation has
/// resolved both sides; the host would reject it anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredPairing {
    /// Local placeholder for the pairing itself.
    pub placeholder_id: EntityId,
    /// Assignment reference: canonical, or a local placeholder.
    pub assignment_ref: EntityId,
    /// Team reference: canonical, or a local placeholder.
    pub team_ref: EntityId,
}

/// A deferred pairing whose references both resolved to canonical IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyPairing {
    /// The local placeholder to acknowledge once the host responds.
    pub placeholder_id: EntityId,
    /// Canonical assignment ID to submit.
    pub assignment_id: EntityId,
    /// Canonical team ID to submit.
    pub team_id: EntityId,
}

#[derive(Debug, Default)]
struct CacheInner {
    teams: BTreeMap<EntityId, Team>,
    assignments: BTreeMap<EntityId, Assignment>,
    pairings: BTreeMap<EntityId, Pairing>,
    history: BTreeMap<EntityId, HistoryRecord>,
    cursor: Timestamp,
    next_placeholder: EntityId,
    id_map: HashMap<EntityId, EntityId>,
    deferred: Vec<DeferredPairing>,
    orphaned: HashSet<EntityId>,
}

impl CacheInner {
    fn allocate_placeholder(&mut self) -> EntityId {
        self.next_placeholder -= 1;
        self.next_placeholder
    }

    fn resolve(&self, reference: EntityId) -> EntityId {
        if is_canonical(reference) {
            reference
        } else {
            self.id_map.get(&reference).copied().unwrap_or(reference)
        }
    }
}

/// One node's view of the activity, derived from create acknowledgements
/// and sync polls.
#[derive(Debug, Default)]
pub struct NodeCache {
    inner: Mutex<CacheInner>,
}

impl NodeCache {
    /// Creates an empty cache with a zero cursor.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                next_placeholder: 0,
                ..CacheInner::default()
            }),
        }
    }

    /// Stages a locally created team under the next placeholder ID.
    pub fn stage_team(&self, name: &str, resource: &str) -> Team {
        let mut inner = self.inner.lock();
        let id = inner.allocate_placeholder();
        let team = Team {
            id,
            name: name.to_string(),
            resource: resource.to_string(),
            status: EntityKind::Team.default_status().to_string(),
            last_edit: Timestamp::ZERO,
        };
        inner.teams.insert(id, team.clone());
        debug!(id, name, "team staged locally");
        team
    }

    /// Stages a locally created assignment under the next placeholder ID.
    pub fn stage_assignment(&self, name: &str, intended_resource: &str) -> Assignment {
        let mut inner = self.inner.lock();
        let id = inner.allocate_placeholder();
        let assignment = Assignment {
            id,
            name: name.to_string(),
            intended_resource: intended_resource.to_string(),
            status: EntityKind::Assignment.default_status().to_string(),
            last_edit: Timestamp::ZERO,
        };
        inner.assignments.insert(id, assignment.clone());
        debug!(id, name, "assignment staged locally");
        assignment
    }

    /// Stages a pairing whose references may still be placeholders.
    ///
    /// The pairing is held back from submission until both references
    /// resolve; see [`NodeCache::ready_pairings`].
    pub fn stage_pairing(&self, assignment_ref: EntityId, team_ref: EntityId) -> DeferredPairing {
        let mut inner = self.inner.lock();
        let deferred = DeferredPairing {
            placeholder_id: inner.allocate_placeholder(),
            assignment_ref,
            team_ref,
        };
        inner.deferred.push(deferred);
        debug!(
            id = deferred.placeholder_id,
            assignment_ref, team_ref, "pairing deferred"
        );
        deferred
    }

    /// Replaces a staged team with the host's canonical record.
    pub fn acknowledge_team(&self, placeholder_id: EntityId, canonical: Team) -> CacheResult<()> {
        if !is_canonical(canonical.id) {
            return Err(CacheError::NotCanonical(canonical.id));
        }
        let mut inner = self.inner.lock();
        if !is_placeholder(placeholder_id) || inner.teams.remove(&placeholder_id).is_none() {
            return Err(CacheError::UnknownPlaceholder(placeholder_id));
        }
        inner.id_map.insert(placeholder_id, canonical.id);
        inner.orphaned.remove(&placeholder_id);
        debug!(placeholder_id, canonical_id = canonical.id, "team acknowledged");
        inner.teams.insert(canonical.id, canonical);
        Ok(())
    }

    /// Replaces a staged assignment with the host's canonical record.
    pub fn acknowledge_assignment(
        &self,
        placeholder_id: EntityId,
        canonical: Assignment,
    ) -> CacheResult<()> {
        if !is_canonical(canonical.id) {
            return Err(CacheError::NotCanonical(canonical.id));
        }
        let mut inner = self.inner.lock();
        if !is_placeholder(placeholder_id) || inner.assignments.remove(&placeholder_id).is_none() {
            return Err(CacheError::UnknownPlaceholder(placeholder_id));
        }
        inner.id_map.insert(placeholder_id, canonical.id);
        inner.orphaned.remove(&placeholder_id);
        debug!(
            placeholder_id,
            canonical_id = canonical.id,
            "assignment acknowledged"
        );
        inner.assignments.insert(canonical.id, canonical);
        Ok(())
    }

    /// Completes a deferred pairing with the host's canonical record.
    pub fn acknowledge_pairing(
        &self,
        placeholder_id: EntityId,
        canonical: Pairing,
    ) -> CacheResult<()> {
        if !is_canonical(canonical.id) {
            return Err(CacheError::NotCanonical(canonical.id));
        }
        let mut inner = self.inner.lock();
        let before = inner.deferred.len();
        inner.deferred.retain(|d| d.placeholder_id != placeholder_id);
        if inner.deferred.len() == before {
            return Err(CacheError::UnknownPlaceholder(placeholder_id));
        }
        inner.id_map.insert(placeholder_id, canonical.id);
        inner.orphaned.remove(&placeholder_id);
        debug!(
            placeholder_id,
            canonical_id = canonical.id,
            "pairing acknowledged"
        );
        inner.pairings.insert(canonical.id, canonical);
        Ok(())
    }

    /// Flags a staged entity whose create response was lost.
    ///
    /// Without idempotency keys the node cannot tell whether the host
    /// committed the create; the entity stays visible as unsynced until a
    /// full refresh settles the question (or the operator resubmits,
    /// accepting a possible duplicate).
    pub fn mark_orphaned(&self, placeholder_id: EntityId) -> CacheResult<()> {
        let mut inner = self.inner.lock();
        let staged = inner.teams.contains_key(&placeholder_id)
            || inner.assignments.contains_key(&placeholder_id)
            || inner.deferred.iter().any(|d| d.placeholder_id == placeholder_id);
        if !staged {
            return Err(CacheError::UnknownPlaceholder(placeholder_id));
        }
        inner.orphaned.insert(placeholder_id);
        Ok(())
    }

    /// Deferred pairings whose references have both resolved to canonical
    /// IDs and are now safe to submit to the host.
    pub fn ready_pairings(&self) -> Vec<ReadyPairing> {
        let inner = self.inner.lock();
        inner
            .deferred
            .iter()
            .filter_map(|d| {
                let assignment_id = inner.resolve(d.assignment_ref);
                let team_id = inner.resolve(d.team_ref);
                (is_canonical(assignment_id) && is_canonical(team_id)).then_some(ReadyPairing {
                    placeholder_id: d.placeholder_id,
                    assignment_id,
                    team_id,
                })
            })
            .collect()
    }

    /// Applies one sync snapshot: canonical records are upserted wholesale
    /// and the cursor advances to the snapshot's watermark. Placeholders
    /// are untouched; only an acknowledgement retires them.
    pub fn apply(&self, changes: &ChangeSet) {
        let mut inner = self.inner.lock();
        for team in &changes.teams {
            inner.teams.insert(team.id, team.clone());
        }
        for assignment in &changes.assignments {
            inner.assignments.insert(assignment.id, assignment.clone());
        }
        for pairing in &changes.pairings {
            inner.pairings.insert(pairing.id, pairing.clone());
        }
        for record in &changes.history {
            inner.history.insert(record.id, record.clone());
        }
        inner.cursor = inner.cursor.max(changes.timestamp);
        debug!(records = changes.len(), cursor = %changes.timestamp, "snapshot applied");
    }

    /// The cursor to supply on the next sync poll.
    pub fn cursor(&self) -> Timestamp {
        self.inner.lock().cursor
    }

    /// All cached teams; staged placeholders sort before canonical rows.
    pub fn teams(&self) -> Vec<Team> {
        self.inner.lock().teams.values().cloned().collect()
    }

    /// All cached assignments.
    pub fn assignments(&self) -> Vec<Assignment> {
        self.inner.lock().assignments.values().cloned().collect()
    }

    /// All cached pairings (canonical only; deferred ones are not yet
    /// pairings as far as the activity is concerned).
    pub fn pairings(&self) -> Vec<Pairing> {
        self.inner.lock().pairings.values().cloned().collect()
    }

    /// All cached history records in append order.
    pub fn history(&self) -> Vec<HistoryRecord> {
        self.inner.lock().history.values().cloned().collect()
    }

    /// IDs of staged entities still awaiting host acknowledgement.
    pub fn unsynced(&self) -> Vec<EntityId> {
        let inner = self.inner.lock();
        let mut ids: Vec<EntityId> = inner
            .teams
            .keys()
            .chain(inner.assignments.keys())
            .copied()
            .filter(|id| is_placeholder(*id))
            .chain(inner.deferred.iter().map(|d| d.placeholder_id))
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Staged IDs flagged as orphaned by [`NodeCache::mark_orphaned`].
    pub fn orphaned(&self) -> Vec<EntityId> {
        let inner = self.inner.lock();
        let mut ids: Vec<EntityId> = inner.orphaned.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Resolves a local reference through the placeholder-to-canonical map.
    pub fn canonical_id(&self, reference: EntityId) -> Option<EntityId> {
        let resolved = self.inner.lock().resolve(reference);
        is_canonical(resolved).then_some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_team(id: EntityId, name: &str) -> Team {
        Team {
            id,
            name: name.to_string(),
            resource: "K9".into(),
            status: "UNASSIGNED".into(),
            last_edit: Timestamp::from_centis(100),
        }
    }

    fn canonical_assignment(id: EntityId, name: &str) -> Assignment {
        Assignment {
            id,
            name: name.to_string(),
            intended_resource: "K9".into(),
            status: "UNASSIGNED".into(),
            last_edit: Timestamp::from_centis(100),
        }
    }

    #[test]
    fn staging_allocates_descending_placeholders() {
        let cache = NodeCache::new();
        assert_eq!(cache.stage_team("Alpha", "K9").id, -1);
        assert_eq!(cache.stage_assignment("Grid 7", "K9").id, -2);
        assert_eq!(cache.unsynced(), vec![-2, -1]);
    }

    #[test]
    fn acknowledge_supersedes_the_placeholder() {
        let cache = NodeCache::new();
        let staged = cache.stage_team("Alpha", "K9");

        cache
            .acknowledge_team(staged.id, canonical_team(1, "Alpha"))
            .unwrap();

        let teams = cache.teams();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].id, 1);
        assert!(cache.unsynced().is_empty());
        assert_eq!(cache.canonical_id(staged.id), Some(1));
    }

    #[test]
    fn acknowledge_rejects_unknown_or_noncanonical() {
        let cache = NodeCache::new();
        let staged = cache.stage_team("Alpha", "K9");

        assert_eq!(
            cache.acknowledge_team(-99, canonical_team(1, "Alpha")),
            Err(CacheError::UnknownPlaceholder(-99))
        );
        assert_eq!(
            cache.acknowledge_team(staged.id, canonical_team(-5, "Alpha")),
            Err(CacheError::NotCanonical(-5))
        );
    }

    #[test]
    fn pairing_stays_deferred_until_both_sides_resolve() {
        let cache = NodeCache::new();
        let team = cache.stage_team("Alpha", "K9");
        let assignment = cache.stage_assignment("Grid 7", "K9");
        let deferred = cache.stage_pairing(assignment.id, team.id);

        assert!(cache.ready_pairings().is_empty());

        cache
            .acknowledge_assignment(assignment.id, canonical_assignment(1, "Grid 7"))
            .unwrap();
        assert!(cache.ready_pairings().is_empty());

        cache
            .acknowledge_team(team.id, canonical_team(1, "Alpha"))
            .unwrap();
        let ready = cache.ready_pairings();
        assert_eq!(
            ready,
            vec![ReadyPairing {
                placeholder_id: deferred.placeholder_id,
                assignment_id: 1,
                team_id: 1,
            }]
        );
    }

    #[test]
    fn pairing_against_known_canonical_ids_is_ready_immediately() {
        let cache = NodeCache::new();
        let deferred = cache.stage_pairing(3, 4);
        assert_eq!(cache.ready_pairings().len(), 1);

        cache
            .acknowledge_pairing(
                deferred.placeholder_id,
                Pairing {
                    id: 1,
                    assignment_id: 3,
                    team_id: 4,
                    status: "CURRENT".into(),
                    last_edit: Timestamp::from_centis(100),
                },
            )
            .unwrap();
        assert!(cache.ready_pairings().is_empty());
        assert_eq!(cache.pairings().len(), 1);
    }

    #[test]
    fn orphan_flag_survives_until_acknowledged() {
        let cache = NodeCache::new();
        let staged = cache.stage_team("Alpha", "K9");
        cache.mark_orphaned(staged.id).unwrap();
        assert_eq!(cache.orphaned(), vec![staged.id]);

        // A later full refresh that confirms the create clears the flag
        // via acknowledgement.
        cache
            .acknowledge_team(staged.id, canonical_team(1, "Alpha"))
            .unwrap();
        assert!(cache.orphaned().is_empty());
    }

    #[test]
    fn mark_orphaned_requires_a_staged_entity() {
        let cache = NodeCache::new();
        assert_eq!(
            cache.mark_orphaned(-4),
            Err(CacheError::UnknownPlaceholder(-4))
        );
    }

    #[test]
    fn apply_upserts_and_advances_the_cursor() {
        let cache = NodeCache::new();
        let changes = ChangeSet {
            timestamp: Timestamp::from_centis(500),
            teams: vec![canonical_team(1, "Alpha")],
            assignments: vec![canonical_assignment(1, "Grid 7")],
            pairings: vec![],
            history: vec![],
        };
        cache.apply(&changes);
        assert_eq!(cache.cursor(), Timestamp::from_centis(500));
        assert_eq!(cache.teams().len(), 1);

        // A newer copy of the same row supersedes, never merges.
        let mut newer = canonical_team(1, "Alpha");
        newer.status = "WORKING".into();
        newer.last_edit = Timestamp::from_centis(600);
        cache.apply(&ChangeSet {
            timestamp: Timestamp::from_centis(600),
            teams: vec![newer.clone()],
            assignments: vec![],
            pairings: vec![],
            history: vec![],
        });
        assert_eq!(cache.teams(), vec![newer]);
        assert_eq!(cache.cursor(), Timestamp::from_centis(600));
    }

    #[test]
    fn apply_leaves_placeholders_alone() {
        let cache = NodeCache::new();
        let staged = cache.stage_team("Alpha", "K9");
        cache.apply(&ChangeSet {
            timestamp: Timestamp::from_centis(500),
            teams: vec![canonical_team(1, "Bravo")],
            assignments: vec![],
            pairings: vec![],
            history: vec![],
        });
        // Both the staged copy and the canonical stranger coexist; the
        // protocol has no way to equate them.
        assert_eq!(cache.teams().len(), 2);
        assert_eq!(cache.unsynced(), vec![staged.id]);
    }

    #[test]
    fn replayed_history_records_do_not_duplicate() {
        let cache = NodeCache::new();
        let record = HistoryRecord {
            id: 1,
            entity_kind: EntityKind::Team,
            entity_id: 1,
            old_status: "UNASSIGNED".into(),
            new_status: "WORKING".into(),
            timestamp: Timestamp::from_centis(400),
        };
        let changes = ChangeSet {
            timestamp: Timestamp::from_centis(500),
            teams: vec![],
            assignments: vec![],
            pairings: vec![],
            history: vec![record],
        };
        // A full refresh (since = 0) replays records already seen.
        cache.apply(&changes);
        cache.apply(&changes);
        assert_eq!(cache.history().len(), 1);
    }
}
