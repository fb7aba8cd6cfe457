//! Sync module for the stitchkit sync server.
//!
//! Remote synchronization is a straight replay protocol: every local
//! mutation becomes a pending operation, and a drain posts each one to the
//! server in enqueue order.
//!
//! ## Endpoints
//!
//! 1. `GET /health` - reachability probe, no authentication
//! 2. `POST /ops/{entity_type}` - replay one queued mutation
//! 3. `GET /collections/{entity_type}` - fetch a collection for caching
//!
//! Requests authenticate with a bearer API key; opaque payloads travel
//! base64-encoded inside JSON bodies.

mod client;
mod error;

pub use client::{check_server, RemoteClient, RemoteSync};
pub use error::SyncError;
