//! In-process publish/subscribe fan-out of execution lifecycle events.
//!
//! The [`EventBus`] holds no durable state — the trace log lives in the store.
//! One bus instance is constructed at process start and handed by `Arc` to
//! both the orchestrator (publisher) and the gateway (subscriber side).

/// The event bus and subscriber handle.
pub mod bus;

pub use bus::{EventBus, ExecutionEvent, Subscriber};
