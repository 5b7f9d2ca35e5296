//! # sartrack sync protocol
//!
//! Transport-agnostic request/response message types for the sartrack
//! field network, with JSON body validation that names every missing
//! required key. Any framing (HTTP, or otherwise) can carry these.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod messages;

pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    CreateAssignmentRequest, CreatePairingRequest, CreateTeamRequest, JoinRequest, JoinResponse,
    NodeRole, PeerInfo, SetStatusRequest, SyncRequest, SyncResponse,
};
