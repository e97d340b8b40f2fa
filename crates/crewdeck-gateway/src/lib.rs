//! Subscription gateway: bridges external client connections to the event
//! bus and carries the execute/read-through HTTP contract.
//!
//! Clients connect over WebSocket and send `subscribe:execution` /
//! `unsubscribe:execution` messages; every event published for a subscribed
//! execution is forwarded as a typed `{type, timestamp, data}` message.
//! Disconnecting removes all of a client's registrations.

/// HTTP handlers for execute and read-throughs.
pub mod routes;
/// WebSocket message routing.
pub mod router;
/// Router construction and the WebSocket loop.
pub mod server;

pub use server::{AppState, GatewayServer};
