use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crewdeck_core::{
    AgentConfig, Crew, CrewdeckResult, Execution, ExecutionStatus, Metric, TaskConfig, TraceEvent,
};
use uuid::Uuid;

/// Partial update applied to an execution row. Fields left `None` are
/// untouched; the store performs one read-then-write per call.
#[derive(Debug, Clone, Default)]
pub struct ExecutionUpdate {
    pub status: Option<ExecutionStatus>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionUpdate {
    /// Terminal update for a successful run.
    pub fn completed(output: impl Into<String>) -> Self {
        Self {
            status: Some(ExecutionStatus::Completed),
            output: Some(output.into()),
            error: None,
            completed_at: Some(Utc::now()),
        }
    }

    /// Terminal update for a failed run.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(ExecutionStatus::Failed),
            output: None,
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
        }
    }

    /// Apply this update to an execution row.
    pub fn apply(&self, execution: &mut Execution) {
        if let Some(status) = self.status {
            execution.status = status;
        }
        if let Some(output) = &self.output {
            execution.output = Some(output.clone());
        }
        if let Some(error) = &self.error {
            execution.error = Some(error.clone());
        }
        if let Some(completed_at) = self.completed_at {
            execution.completed_at = Some(completed_at);
        }
    }
}

/// Persistent store for entities and execution history.
///
/// Trace events are append-only; `list_traces` must return them in append
/// order. Per-row atomicity is the backend's responsibility; no cross-row
/// transactions are required.
#[async_trait]
pub trait Store: Send + Sync {
    async fn put_agent(&self, agent: &AgentConfig) -> CrewdeckResult<()>;
    async fn get_agent(&self, id: Uuid) -> CrewdeckResult<Option<AgentConfig>>;

    async fn put_task(&self, task: &TaskConfig) -> CrewdeckResult<()>;
    async fn get_task(&self, id: Uuid) -> CrewdeckResult<Option<TaskConfig>>;

    async fn put_crew(&self, crew: &Crew) -> CrewdeckResult<()>;
    async fn get_crew(&self, id: Uuid) -> CrewdeckResult<Option<Crew>>;

    async fn create_execution(&self, execution: &Execution) -> CrewdeckResult<()>;
    /// Returns the updated row, or `None` if the id is unknown.
    async fn update_execution(
        &self,
        id: Uuid,
        update: ExecutionUpdate,
    ) -> CrewdeckResult<Option<Execution>>;
    async fn get_execution(&self, id: Uuid) -> CrewdeckResult<Option<Execution>>;

    async fn append_trace(&self, event: &TraceEvent) -> CrewdeckResult<()>;
    async fn list_traces(&self, execution_id: Uuid) -> CrewdeckResult<Vec<TraceEvent>>;

    async fn create_metric(&self, metric: &Metric) -> CrewdeckResult<()>;
    async fn list_metrics(&self, execution_id: Uuid) -> CrewdeckResult<Vec<Metric>>;
}
