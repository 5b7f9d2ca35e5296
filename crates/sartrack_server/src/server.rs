//! The host facade.

use crate::config::ServerConfig;
use crate::error::ApiResult;
use crate::handler::{HandlerContext, RequestHandler};
use crate::registry::NodeRegistry;
use sartrack_core::{
    ChangeSet, Entity, EntityId, EntityKind, HistoryRecord, Timestamp, TrackerStore,
};
use sartrack_protocol::{
    CreateAssignmentRequest, CreatePairingRequest, CreateTeamRequest, JoinRequest, JoinResponse,
    SetStatusRequest, SyncRequest,
};
use serde::Serialize;
use std::sync::Arc;

/// One protocol operation, framing-independent.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    /// Register a node with the activity.
    Join(JoinRequest),
    /// Create a team.
    CreateTeam(CreateTeamRequest),
    /// Create an assignment.
    CreateAssignment(CreateAssignmentRequest),
    /// Pair an assignment with a team.
    CreatePairing(CreatePairingRequest),
    /// Record a status transition on one entity.
    SetStatus {
        /// Kind of the entity to update.
        kind: EntityKind,
        /// Canonical ID of the entity to update.
        id: EntityId,
        /// The transition.
        request: SetStatusRequest,
    },
    /// Fetch every row of one kind.
    GetAll(EntityKind),
    /// Fetch one row by canonical ID.
    GetOne(EntityKind, EntityId),
    /// Fetch the history log, optionally scoped to one entity.
    GetHistory(Option<(EntityKind, EntityId)>),
    /// Pull everything committed after a cursor.
    Sync(SyncRequest),
}

/// The matching response payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    /// Join result.
    Joined(JoinResponse),
    /// One committed row.
    Entity(Entity),
    /// Several committed rows of one kind.
    Entities(Vec<Entity>),
    /// History records.
    History(Vec<HistoryRecord>),
    /// A sync snapshot.
    Changes(ChangeSet),
}

/// A tracker host: the store, the registry, and the request surface,
/// bundled the way a transport layer consumes them.
pub struct TrackerHost {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl TrackerHost {
    /// Creates a host with a fresh store and registry.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(TrackerStore::new()))
    }

    /// Creates a host around an existing store (e.g. one restored from
    /// persisted records).
    pub fn with_store(config: ServerConfig, store: Arc<TrackerStore>) -> Self {
        let registry = Arc::new(NodeRegistry::new());
        let context = Arc::new(HandlerContext::new(config, store, registry));
        let handler = RequestHandler::new(Arc::clone(&context));
        Self { handler, context }
    }

    /// Dispatches one operation to its handler.
    pub fn handle(&self, bearer: Option<&str>, request: ApiRequest) -> ApiResult<ApiResponse> {
        match request {
            ApiRequest::Join(req) => self
                .handler
                .handle_join(bearer, req)
                .map(ApiResponse::Joined),
            ApiRequest::CreateTeam(req) => self
                .handler
                .handle_create_team(bearer, req)
                .map(|t| ApiResponse::Entity(Entity::Team(t))),
            ApiRequest::CreateAssignment(req) => self
                .handler
                .handle_create_assignment(bearer, req)
                .map(|a| ApiResponse::Entity(Entity::Assignment(a))),
            ApiRequest::CreatePairing(req) => self
                .handler
                .handle_create_pairing(bearer, req)
                .map(|p| ApiResponse::Entity(Entity::Pairing(p))),
            ApiRequest::SetStatus { kind, id, request } => self
                .handler
                .handle_set_status(bearer, kind, id, request)
                .map(ApiResponse::Entity),
            ApiRequest::GetAll(kind) => Ok(ApiResponse::Entities(self.handler.handle_get_all(kind))),
            ApiRequest::GetOne(kind, id) => {
                self.handler.handle_get(kind, id).map(ApiResponse::Entity)
            }
            ApiRequest::GetHistory(filter) => {
                Ok(ApiResponse::History(self.handler.handle_history(filter)))
            }
            ApiRequest::Sync(req) => Ok(ApiResponse::Changes(self.handler.handle_sync(req))),
        }
    }

    /// Direct access to the underlying handler.
    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<TrackerStore> {
        &self.context.store
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.context.registry
    }

    /// The store's current watermark.
    pub fn watermark(&self) -> Timestamp {
        self.context.store.watermark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sartrack_protocol::NodeRole;

    #[test]
    fn dispatch_covers_the_operation_table() {
        let host = TrackerHost::new(ServerConfig::new());

        let joined = host
            .handle(
                None,
                ApiRequest::Join(JoinRequest {
                    node_name: "ic".into(),
                    ip: "10.1.1.5".into(),
                    is_init: true,
                }),
            )
            .unwrap();
        assert!(matches!(
            joined,
            ApiResponse::Joined(JoinResponse {
                role: NodeRole::First,
                ..
            })
        ));

        let team = host
            .handle(
                None,
                ApiRequest::CreateTeam(CreateTeamRequest {
                    name: "Alpha".into(),
                    resource: "K9".into(),
                }),
            )
            .unwrap();
        let ApiResponse::Entity(entity) = &team else {
            panic!("expected entity response");
        };
        assert_eq!(entity.id(), 1);

        let all = host.handle(None, ApiRequest::GetAll(EntityKind::Team)).unwrap();
        assert!(matches!(all, ApiResponse::Entities(v) if v.len() == 1));

        let one = host
            .handle(None, ApiRequest::GetOne(EntityKind::Team, 1))
            .unwrap();
        assert!(matches!(one, ApiResponse::Entity(_)));

        let history = host.handle(None, ApiRequest::GetHistory(None)).unwrap();
        assert!(matches!(history, ApiResponse::History(v) if v.is_empty()));

        let sync = host
            .handle(
                None,
                ApiRequest::Sync(SyncRequest {
                    since: Timestamp::ZERO,
                }),
            )
            .unwrap();
        assert!(matches!(sync, ApiResponse::Changes(c) if c.teams.len() == 1));
    }

    #[test]
    fn restored_store_keeps_its_identities() {
        let first = TrackerHost::new(ServerConfig::new());
        first
            .handle(
                None,
                ApiRequest::CreateTeam(CreateTeamRequest {
                    name: "Alpha".into(),
                    resource: "K9".into(),
                }),
            )
            .unwrap();

        let store = first.store();
        let restored = Arc::new(TrackerStore::restore(
            store.teams(),
            store.assignments(),
            store.pairings(),
            store.history(),
        ));
        let second = TrackerHost::with_store(ServerConfig::new(), restored);

        let team = second
            .handle(
                None,
                ApiRequest::CreateTeam(CreateTeamRequest {
                    name: "Bravo".into(),
                    resource: "Ground".into(),
                }),
            )
            .unwrap();
        let ApiResponse::Entity(entity) = team else {
            panic!("expected entity response");
        };
        // ID 1 is never reused after the restart.
        assert_eq!(entity.id(), 2);
    }
}
