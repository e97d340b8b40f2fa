use crewdeck_core::{AgentConfig, Crew, ProcessMode, TaskConfig};
use serde::{Deserialize, Serialize};

/// The job description handed to the engine: one serialized payload written
/// at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewJob {
    pub name: String,
    pub process: ProcessMode,
    pub verbose: bool,
    pub agents: Vec<AgentConfig>,
    pub tasks: Vec<TaskConfig>,
}

impl CrewJob {
    /// Build a job from a crew definition and its resolved agents and tasks.
    pub fn from_crew(crew: &Crew, agents: Vec<AgentConfig>, tasks: Vec<TaskConfig>) -> Self {
        Self {
            name: crew.name.clone(),
            process: crew.process,
            verbose: crew.verbose,
            agents,
            tasks,
        }
    }
}

/// The engine's result: one serialized payload read at process end.
///
/// On success `output` is set and `error` absent; on failure the reverse.
/// Usage fields are optional — engines that do not meter themselves report
/// nothing and the orchestrator defaults them to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOutcome {
    pub success: bool,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub token_usage: Option<u64>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub agents_count: Option<usize>,
    #[serde(default)]
    pub tasks_count: Option<usize>,
}

impl EngineOutcome {
    /// Normalized failure. Infrastructure, engine, and protocol errors all
    /// take this shape; the distinction lives only in the message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            token_usage: None,
            cost: None,
            agents_count: None,
            tasks_count: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crewdeck_core::Crew;

    #[test]
    fn test_job_from_crew() {
        let agent = AgentConfig::new("a", "Analyst", "analyze");
        let task = TaskConfig::new("t", "do the thing");
        let mut crew = Crew::new("demo", vec![agent.id], vec![task.id]);
        crew.process = ProcessMode::Hierarchical;
        crew.verbose = true;

        let job = CrewJob::from_crew(&crew, vec![agent], vec![task]);
        assert_eq!(job.name, "demo");
        assert_eq!(job.process, ProcessMode::Hierarchical);
        assert!(job.verbose);
        assert_eq!(job.agents.len(), 1);
        assert_eq!(job.tasks.len(), 1);
    }

    #[test]
    fn test_outcome_parses_minimal_payload() {
        // An engine only has to report success and output.
        let outcome: EngineOutcome =
            serde_json::from_str(r#"{"success": true, "output": "done"}"#).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output.as_deref(), Some("done"));
        assert!(outcome.token_usage.is_none());
        assert!(outcome.cost.is_none());
    }

    #[test]
    fn test_failure_shape() {
        let outcome = EngineOutcome::failure("engine exploded");
        assert!(!outcome.success);
        assert!(outcome.output.is_none());
        assert_eq!(outcome.error.as_deref(), Some("engine exploded"));
    }
}
