//! Request handlers, one per protocol operation.
//!
//! Handlers are transport-free: the framing layer parses a body into a
//! typed request (or hands over raw JSON), passes the `Authorization`
//! value along, and serializes whatever comes back. Each invocation is
//! independent and may run concurrently with any other.

use crate::auth::BearerValidator;
use crate::config::ServerConfig;
use crate::error::ApiResult;
use crate::registry::NodeRegistry;
use sartrack_core::{
    Assignment, ChangeSet, Entity, EntityId, EntityKind, HistoryRecord, Pairing, Team,
    Timestamp, TrackerStore,
};
use sartrack_protocol::{
    CreateAssignmentRequest, CreatePairingRequest, CreateTeamRequest, JoinRequest, JoinResponse,
    NodeRole, PeerInfo, SetStatusRequest, SyncRequest,
};
use std::sync::Arc;
use tracing::debug;

/// Shared state behind every handler invocation.
pub struct HandlerContext {
    /// Host configuration.
    pub config: ServerConfig,
    /// The authoritative entity store.
    pub store: Arc<TrackerStore>,
    /// The node registry.
    pub registry: Arc<NodeRegistry>,
    validator: Option<BearerValidator>,
}

impl HandlerContext {
    /// Creates a context around an existing store and registry.
    pub fn new(config: ServerConfig, store: Arc<TrackerStore>, registry: Arc<NodeRegistry>) -> Self {
        let validator = config
            .require_auth
            .then(|| config.auth_secret.clone())
            .flatten()
            .map(BearerValidator::new);
        Self {
            config,
            store,
            registry,
            validator,
        }
    }
}

/// Handles protocol requests against one activity.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a handler over the shared context.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Checks the bearer credential on mutation paths.
    fn authorize(&self, bearer: Option<&str>) -> ApiResult<()> {
        match &self.context.validator {
            Some(validator) => validator.validate(bearer),
            None => Ok(()),
        }
    }

    /// Registers a node; the winning first join resets the store.
    pub fn handle_join(&self, bearer: Option<&str>, request: JoinRequest) -> ApiResult<JoinResponse> {
        self.authorize(bearer)?;
        let outcome = self
            .context
            .registry
            .join(&request.node_name, &request.ip, request.is_init);
        if outcome.role == NodeRole::First {
            self.context.store.reset();
        }
        Ok(JoinResponse {
            role: outcome.role,
            peers: outcome
                .peers
                .into_iter()
                .map(|n| PeerInfo {
                    name: n.name,
                    ip: n.ip,
                })
                .collect(),
        })
    }

    /// Commits a team and returns the canonical record.
    ///
    /// The response body is the only path by which the creating node learns
    /// the canonical ID; there is no idempotency key, so a retry after a
    /// lost response creates a second canonical team.
    pub fn handle_create_team(
        &self,
        bearer: Option<&str>,
        request: CreateTeamRequest,
    ) -> ApiResult<Team> {
        self.authorize(bearer)?;
        debug!(name = %request.name, "create team");
        Ok(self.context.store.create_team(&request.name, &request.resource))
    }

    /// Commits an assignment and returns the canonical record.
    pub fn handle_create_assignment(
        &self,
        bearer: Option<&str>,
        request: CreateAssignmentRequest,
    ) -> ApiResult<Assignment> {
        self.authorize(bearer)?;
        debug!(name = %request.name, "create assignment");
        Ok(self
            .context
            .store
            .create_assignment(&request.name, &request.intended_resource))
    }

    /// Commits a pairing; fails with a dangling-reference error if either
    /// side has not been acknowledged as canonical yet.
    pub fn handle_create_pairing(
        &self,
        bearer: Option<&str>,
        request: CreatePairingRequest,
    ) -> ApiResult<Pairing> {
        self.authorize(bearer)?;
        debug!(
            assignment_id = request.assignment_id,
            team_id = request.team_id,
            "create pairing"
        );
        Ok(self
            .context
            .store
            .create_pairing(request.assignment_id, request.team_id)?)
    }

    /// Records a status transition and returns the updated record.
    pub fn handle_set_status(
        &self,
        bearer: Option<&str>,
        kind: EntityKind,
        id: EntityId,
        request: SetStatusRequest,
    ) -> ApiResult<Entity> {
        self.authorize(bearer)?;
        debug!(%kind, id, new_status = %request.new_status, "set status");
        Ok(self.context.store.set_status(kind, id, &request.new_status)?)
    }

    /// Returns every committed row of one kind.
    pub fn handle_get_all(&self, kind: EntityKind) -> Vec<Entity> {
        self.context.store.get_all(kind)
    }

    /// Returns one row by canonical ID.
    pub fn handle_get(&self, kind: EntityKind, id: EntityId) -> ApiResult<Entity> {
        Ok(self.context.store.get(kind, id)?)
    }

    /// Returns the history log, optionally scoped to one entity.
    pub fn handle_history(&self, filter: Option<(EntityKind, EntityId)>) -> Vec<HistoryRecord> {
        match filter {
            Some((kind, id)) => self.context.store.history_for(kind, id),
            None => self.context.store.history(),
        }
    }

    /// Returns everything committed after the caller's cursor.
    pub fn handle_sync(&self, request: SyncRequest) -> ChangeSet {
        self.handle_sync_since(request.since)
    }

    /// As [`RequestHandler::handle_sync`], from a bare cursor.
    pub fn handle_sync_since(&self, since: Timestamp) -> ChangeSet {
        let changes = self.context.store.changes_since(since);
        debug!(
            since = %since,
            returned = changes.len(),
            cursor = %changes.timestamp,
            "sync poll"
        );
        changes
    }
}
