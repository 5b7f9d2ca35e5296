//! # sartrack node
//!
//! The peer side of the sartrack field network: a local cache of the
//! activity derived from host acknowledgements and sync polls, with the
//! placeholder-ID bookkeeping that bridges locally created entities to
//! their host-assigned canonical identities.
//!
//! Polling frequency and retry are the embedding application's concern;
//! this crate only keeps the cursor and the cache consistent.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod error;

pub use cache::{DeferredPairing, NodeCache, ReadyPairing};
pub use error::{CacheError, CacheResult};
