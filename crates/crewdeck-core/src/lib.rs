//! Shared domain types and the error type for the Crewdeck workspace.
//!
//! # Main types
//!
//! - [`Crew`] — a named grouping of agents and tasks plus an execution process mode.
//! - [`Execution`] — one run attempt of a crew, with lifecycle status.
//! - [`TraceEvent`] — an immutable, timestamped record of an execution milestone.
//! - [`Metric`] — a resource-usage snapshot recorded once per completed execution.
//! - [`CrewdeckError`] — the workspace-wide error enum.

/// Error enum and result alias.
pub mod error;
/// Domain entities: agents, tasks, crews, executions, traces, metrics.
pub mod types;

pub use error::{CrewdeckError, CrewdeckResult};
pub use types::{
    AgentConfig, ApprovalStatus, Crew, EventKind, Execution, ExecutionStatus, Metric, Metadata,
    ProcessMode, TaskConfig, TraceEvent,
};
