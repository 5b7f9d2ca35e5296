//! # sartrack core
//!
//! Synchronization core for a field activity tracker: the authoritative
//! entity store, canonical ID allocation, the append-only status history,
//! and the change-cursor snapshot that peers poll to converge on the host's
//! view of the activity.
//!
//! This crate is transport-free. The host wraps [`TrackerStore`] in request
//! handling (see `sartrack_server`); peers keep a derived cache (see
//! `sartrack_node`).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod entity;
mod error;
mod store;
mod sync;

pub use clock::{Clock, Timestamp};
pub use entity::{
    is_canonical, is_placeholder, Assignment, Entity, EntityId, EntityKind, HistoryRecord,
    Pairing, Team,
};
pub use error::{StoreError, StoreResult};
pub use store::TrackerStore;
pub use sync::ChangeSet;
