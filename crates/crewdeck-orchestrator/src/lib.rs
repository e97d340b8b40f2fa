//! Crew execution orchestrator: the state-machine driver.
//!
//! [`Orchestrator::execute`] takes a stored crew through
//! `running → {completed | failed}`, recording a trace event and publishing a
//! live event at every transition, and persisting metrics on success. All of
//! its collaborators — store, engine, event bus — are injected once at
//! construction; nothing here branches on configuration at call time.

/// The orchestrator itself.
pub mod executor;

pub use executor::Orchestrator;
