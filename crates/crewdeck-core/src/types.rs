use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Open key-value bag for structured detail produced by an external, evolving
/// engine. Not validated beyond being serializable.
pub type Metadata = HashMap<String, serde_json::Value>;

/// How a crew's tasks are driven by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMode {
    Sequential,
    Hierarchical,
    Consensual,
}

impl Default for ProcessMode {
    fn default() -> Self {
        ProcessMode::Sequential
    }
}

impl std::fmt::Display for ProcessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessMode::Sequential => write!(f, "sequential"),
            ProcessMode::Hierarchical => write!(f, "hierarchical"),
            ProcessMode::Consensual => write!(f, "consensual"),
        }
    }
}

/// Stored configuration for one crew participant. Opaque to the orchestrator
/// beyond being part of the job payload handed to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub allow_delegation: bool,
    #[serde(default)]
    pub verbose: bool,
    /// Engine-specific model tuning (provider, temperature, max_iter, ...).
    /// Kept as an open bag; its schema belongs to the engine.
    #[serde(default)]
    pub llm_config: Metadata,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, role: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
            backstory: String::new(),
            tools: Vec::new(),
            allow_delegation: false,
            verbose: false,
            llm_config: Metadata::new(),
        }
    }

    pub fn with_backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }
}

/// A stored unit of work, optionally assigned to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub expected_output: Option<String>,
    #[serde(default)]
    pub agent_id: Option<Uuid>,
    /// Requires a human decision before the engine proceeds (reserved; the
    /// synchronous core path never gates on it).
    #[serde(default)]
    pub human_input: bool,
    #[serde(default)]
    pub async_execution: bool,
}

impl TaskConfig {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            expected_output: None,
            agent_id: None,
            human_input: false,
            async_execution: false,
        }
    }

    pub fn assigned_to(mut self, agent_id: Uuid) -> Self {
        self.agent_id = Some(agent_id);
        self
    }
}

/// A named, stored grouping of agent ids and task ids plus a process mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crew {
    pub id: Uuid,
    /// Owning user, when the crew was created through an authenticated surface.
    /// Unowned crews (CLI-loaded) are executable by anyone.
    #[serde(default)]
    pub owner: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub process: ProcessMode,
    #[serde(default)]
    pub verbose: bool,
    pub agent_ids: Vec<Uuid>,
    pub task_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Crew {
    pub fn new(name: impl Into<String>, agent_ids: Vec<Uuid>, task_ids: Vec<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: None,
            name: name.into(),
            description: None,
            process: ProcessMode::Sequential,
            verbose: false,
            agent_ids,
            task_ids,
            created_at: Utc::now(),
        }
    }

    pub fn owned_by(mut self, owner: Uuid) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// Lifecycle status of an execution.
///
/// `pending → running → {completed | failed}`, plus the reserved
/// `awaiting_approval` side branch for human-in-the-loop task gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    AwaitingApproval,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "pending"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::AwaitingApproval => write!(f, "awaiting_approval"),
        }
    }
}

/// Decision state for a human-gated task (reserved extension point).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// One attempt to run a crew.
///
/// Invariant: `output` and `error` are mutually exclusive; at most one is ever
/// set, and only on the terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: Uuid,
    pub crew_id: Uuid,
    #[serde(default)]
    pub owner: Option<Uuid>,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub awaiting_approval_task_id: Option<Uuid>,
    #[serde(default)]
    pub approval_status: Option<ApprovalStatus>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Execution {
    /// A fresh execution entering `running`, as created by the orchestrator at
    /// the start of an execute request.
    pub fn started(crew_id: Uuid, owner: Option<Uuid>, input: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            crew_id,
            owner,
            status: ExecutionStatus::Running,
            input,
            output: None,
            error: None,
            awaiting_approval_task_id: None,
            approval_status: None,
            started_at: Some(now),
            completed_at: None,
            created_at: now,
        }
    }
}

/// The closed vocabulary of trace event kinds. New kinds must not silently
/// appear; the engine's free-form detail rides in [`TraceEvent::metadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CrewStart,
    CrewComplete,
    CrewError,
    TaskStart,
    TaskComplete,
    AgentAction,
    Log,
}

impl EventKind {
    /// Wire name used for real-time delivery to subscribed clients.
    pub fn channel(self) -> &'static str {
        match self {
            EventKind::CrewStart => "crew:start",
            EventKind::CrewComplete => "crew:complete",
            EventKind::CrewError => "crew:error",
            EventKind::TaskStart => "task:start",
            EventKind::TaskComplete => "task:complete",
            EventKind::AgentAction => "agent:action",
            EventKind::Log => "log",
        }
    }
}

/// An immutable, append-only record of something that happened during an
/// execution. Created only by the orchestrator, never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub id: Uuid,
    pub execution_id: Uuid,
    #[serde(default)]
    pub agent_id: Option<Uuid>,
    #[serde(default)]
    pub task_id: Option<Uuid>,
    pub kind: EventKind,
    pub message: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
}

impl TraceEvent {
    pub fn new(execution_id: Uuid, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            execution_id,
            agent_id: None,
            task_id: None,
            kind,
            message: message.into(),
            metadata: Metadata::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A single resource-usage snapshot for one execution, recorded exactly once
/// on successful completion. Never recorded on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub token_usage: u64,
    pub execution_time_ms: u64,
    pub cost: f64,
    /// 0–100.
    pub success_rate: u8,
    pub created_at: DateTime<Utc>,
}

impl Metric {
    pub fn new(execution_id: Uuid, token_usage: u64, execution_time_ms: u64, cost: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            execution_id,
            token_usage,
            execution_time_ms,
            cost,
            success_rate: 100,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_started_enters_running() {
        let crew_id = Uuid::new_v4();
        let exec = Execution::started(crew_id, None, Some("context".to_string()));
        assert_eq!(exec.status, ExecutionStatus::Running);
        assert!(exec.started_at.is_some());
        assert!(exec.completed_at.is_none());
        assert!(exec.output.is_none());
        assert!(exec.error.is_none());
    }

    #[test]
    fn test_status_terminal() {
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(!ExecutionStatus::AwaitingApproval.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ExecutionStatus::AwaitingApproval).unwrap();
        assert_eq!(json, "\"awaiting_approval\"");
        let parsed: ExecutionStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, ExecutionStatus::Failed);
    }

    #[test]
    fn test_event_kind_channel_names() {
        assert_eq!(EventKind::CrewStart.channel(), "crew:start");
        assert_eq!(EventKind::CrewComplete.channel(), "crew:complete");
        assert_eq!(EventKind::CrewError.channel(), "crew:error");
        assert_eq!(EventKind::Log.channel(), "log");
    }

    #[test]
    fn test_event_kind_stored_form() {
        let json = serde_json::to_string(&EventKind::CrewStart).unwrap();
        assert_eq!(json, "\"crew_start\"");
    }

    #[test]
    fn test_process_mode_roundtrip() {
        let json = serde_json::to_string(&ProcessMode::Hierarchical).unwrap();
        assert_eq!(json, "\"hierarchical\"");
        let parsed: ProcessMode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ProcessMode::Hierarchical);
    }

    #[test]
    fn test_crew_builder() {
        let owner = Uuid::new_v4();
        let crew = Crew::new("research", vec![Uuid::new_v4()], vec![Uuid::new_v4()]).owned_by(owner);
        assert_eq!(crew.owner, Some(owner));
        assert_eq!(crew.process, ProcessMode::Sequential);
    }

    #[test]
    fn test_trace_event_metadata() {
        let mut meta = Metadata::new();
        meta.insert("agent_count".to_string(), serde_json::json!(2));
        let event = TraceEvent::new(Uuid::new_v4(), EventKind::CrewStart, "started")
            .with_metadata(meta);
        assert_eq!(event.metadata["agent_count"], 2);
    }

    #[test]
    fn test_metric_defaults_to_full_success() {
        let metric = Metric::new(Uuid::new_v4(), 500, 1200, 0.05);
        assert_eq!(metric.success_rate, 100);
        assert_eq!(metric.token_usage, 500);
    }
}
