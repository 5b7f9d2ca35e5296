//! # sartrack host
//!
//! Host-side of the sartrack field network: the node registry and join
//! protocol, bearer credential validation, and one request handler per
//! protocol operation, all transport-free. A framing layer (HTTP or
//! otherwise) parses bodies with `sartrack_protocol`, calls into
//! [`TrackerHost`], and serializes the typed results.
//!
//! The store and registry are explicitly owned, injected state: created at
//! host start, dropped at process end, never ambient globals.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod config;
mod error;
mod handler;
mod registry;
mod server;

pub use auth::BearerValidator;
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use handler::{HandlerContext, RequestHandler};
pub use registry::{ActivityState, JoinOutcome, NodeRecord, NodeRegistry};
pub use server::{ApiRequest, ApiResponse, TrackerHost};
