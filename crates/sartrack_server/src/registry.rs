//! Node registry and the join protocol.
//!
//! Membership is add-only for the lifetime of the process: no heartbeat,
//! no eviction. That is a deliberate fit for short-lived field activities,
//! not a general membership protocol.

use parking_lot::RwLock;
use sartrack_core::Timestamp;
use sartrack_protocol::NodeRole;
use serde::Serialize;
use tracing::info;

/// Whether an activity exists yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    /// No activity exists anywhere; the first `is_init` join creates it.
    Uninitialized,
    /// An activity (possibly empty of entities) exists.
    Initialized,
}

/// One registered node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    /// Node name as supplied at join.
    pub name: String,
    /// Network address the node reported.
    pub ip: String,
    /// When the node joined, registry-local time.
    pub joined_at: Timestamp,
}

/// Outcome of a join call.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    /// Role assigned to the joining node.
    pub role: NodeRole,
    /// The full accumulated node list, caller included.
    pub peers: Vec<NodeRecord>,
}

#[derive(Debug)]
struct RegistryInner {
    state: ActivityState,
    host_addr: Option<String>,
    nodes: Vec<NodeRecord>,
}

/// Tracks which nodes are part of the activity and who initialized it.
///
/// Created at host start and injected alongside the store; never ambient
/// global state, so tests construct isolated instances.
#[derive(Debug)]
pub struct NodeRegistry {
    inner: RwLock<RegistryInner>,
}

impl NodeRegistry {
    /// Creates an empty, uninitialized registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                state: ActivityState::Uninitialized,
                host_addr: None,
                nodes: Vec::new(),
            }),
        }
    }

    /// Registers a node, possibly initializing the activity.
    ///
    /// The uninitialized-to-initialized transition happens at most once,
    /// inside this one critical section: of two racing `is_init` joins,
    /// exactly one gets [`NodeRole::First`]; the other is registered as an
    /// ordinary joiner. A join with `is_init` false against an
    /// uninitialized registry is accepted without complaint, matching the
    /// protocol's historical behavior.
    pub fn join(&self, name: &str, ip: &str, is_init: bool) -> JoinOutcome {
        let mut inner = self.inner.write();
        let role = if is_init && inner.state == ActivityState::Uninitialized {
            inner.state = ActivityState::Initialized;
            inner.host_addr = Some(ip.to_string());
            info!(name, ip, "first node initialized the activity");
            NodeRole::First
        } else {
            info!(name, ip, "node joined");
            NodeRole::Joined
        };
        inner.nodes.push(NodeRecord {
            name: name.to_string(),
            ip: ip.to_string(),
            joined_at: Timestamp::now(),
        });
        JoinOutcome {
            role,
            peers: inner.nodes.clone(),
        }
    }

    /// Returns the current activity state.
    pub fn state(&self) -> ActivityState {
        self.inner.read().state
    }

    /// Returns the reference address recorded by the initializing node.
    pub fn host_addr(&self) -> Option<String> {
        self.inner.read().host_addr.clone()
    }

    /// Returns every registered node in join order.
    pub fn peers(&self) -> Vec<NodeRecord> {
        self.inner.read().nodes.clone()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// True if no node has joined yet.
    pub fn is_empty(&self) -> bool {
        self.inner.read().nodes.is_empty()
    }
}

impl Default for NodeRegistry {
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
    fn first_init_join_wins_the_transition() {
        let registry = NodeRegistry::new();
        assert_eq!(registry.state(), ActivityState::Uninitialized);

        let outcome = registry.join("ic", "10.1.1.5", true);
        assert_eq!(outcome.role, NodeRole::First);
        assert_eq!(outcome.peers.len(), 1);
        assert_eq!(registry.state(), ActivityState::Initialized);
        assert_eq!(registry.host_addr().as_deref(), Some("10.1.1.5"));
    }

    #[test]
    fn later_init_joins_are_ordinary() {
        let registry = NodeRegistry::new();
        registry.join("ic", "10.1.1.5", true);

        let outcome = registry.join("late", "10.1.1.9", true);
        assert_eq!(outcome.role, NodeRole::Joined);
        // The reference address stays with the real first node.
        assert_eq!(registry.host_addr().as_deref(), Some("10.1.1.5"));
    }

    #[test]
    fn join_without_init_on_empty_registry_is_accepted() {
        let registry = NodeRegistry::new();
        let outcome = registry.join("eager", "10.1.1.7", false);
        assert_eq!(outcome.role, NodeRole::Joined);
        assert_eq!(registry.state(), ActivityState::Uninitialized);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn peer_list_accumulates_in_join_order() {
        let registry = NodeRegistry::new();
        registry.join("ic", "10.1.1.5", true);
        registry.join("team-lead", "10.1.1.6", false);
        let outcome = registry.join("ops", "10.1.1.7", false);

        let names: Vec<&str> = outcome.peers.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["ic", "team-lead", "ops"]);
    }

    #[test]
    fn concurrent_init_joins_yield_exactly_one_first() {
        let registry = Arc::new(NodeRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.join(&format!("node-{i}"), "10.1.1.1", true).role)
            })
            .collect();

        let firsts = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| *r == NodeRole::First)
            .count();
        assert_eq!(firsts, 1);
        assert_eq!(registry.len(), 8);
    }
}
