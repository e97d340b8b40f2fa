//! Worker process adapter: runs exactly one external engine invocation per
//! execution and normalizes its outcome.
//!
//! The [`Engine`] capability has two implementations, selected once at
//! construction time:
//!
//! - [`ProcessEngine`] — spawns the configured engine command, feeds it the
//!   job as a single serialized payload on stdin, and reads a single result
//!   payload from stdout.
//! - [`SimulatedEngine`] — deterministic success synthesized from the job,
//!   used when the real engine is unavailable or explicitly disabled.
//!
//! The orchestrator's control flow is identical either way; callers must not
//! special-case the fallback.

/// Job and outcome wire types.
pub mod job;
/// Subprocess-backed engine.
pub mod process;
/// Deterministic fallback engine.
pub mod simulated;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub use job::{CrewJob, EngineOutcome};
pub use process::ProcessEngine;
pub use simulated::SimulatedEngine;

/// The external computation that carries out a crew's tasks.
///
/// Strictly request/response: no partial or streaming results. All failure
/// classes are normalized into `EngineOutcome { success: false, error }`.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn run(&self, job: &CrewJob) -> EngineOutcome;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Engine section of the deployment config.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Engine command; an absolute path is availability-probed at startup.
    #[serde(default = "default_command")]
    pub command: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Force the simulated engine regardless of availability.
    #[serde(default)]
    pub simulated: bool,
}

fn default_command() -> PathBuf {
    PathBuf::from("python3")
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            timeout_secs: default_timeout_secs(),
            simulated: false,
        }
    }
}

/// Select the engine implementation once, at construction time.
///
/// Falls back to [`SimulatedEngine`] when simulation is requested explicitly
/// or the configured command fails the availability probe.
pub fn engine_from_config(config: &EngineConfig) -> Arc<dyn Engine> {
    if config.simulated {
        info!("Engine: simulated mode requested by config");
        return Arc::new(SimulatedEngine::new());
    }
    if !command_available(&config.command) {
        info!(
            command = %config.command.display(),
            "Engine: command not available, falling back to simulated mode"
        );
        return Arc::new(SimulatedEngine::new());
    }
    info!(command = %config.command.display(), "Engine: using external process");
    Arc::new(ProcessEngine::new(
        config.command.clone(),
        config.args.clone(),
        std::time::Duration::from_secs(config.timeout_secs),
    ))
}

/// Availability probe. Absolute paths must exist on disk; bare command names
/// are resolved through PATH at spawn time and assumed present.
fn command_available(command: &Path) -> bool {
    if command.is_absolute() {
        command.exists()
    } else {
        true
    }
}
