//! Durable record of crews, agents, tasks, executions, trace events, and
//! metrics.
//!
//! The orchestrator talks to the [`Store`] trait; backends can be swapped
//! without touching the state machine. Two implementations ship here:
//!
//! - [`MemoryStore`] — in-process registries, used by tests and one-shot runs.
//! - [`FileStore`] — JSON files on disk, used by the long-running server.

/// JSON-file-backed store.
pub mod file;
/// In-memory store.
pub mod memory;
/// The `Store` trait and update types.
pub mod store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{ExecutionUpdate, Store};
