use thiserror::Error;
use uuid::Uuid;

pub type CrewdeckResult<T> = Result<T, CrewdeckError>;

#[derive(Error, Debug)]
pub enum CrewdeckError {
    #[error("Crew not found: {0}")]
    CrewNotFound(Uuid),

    #[error("Crew is not owned by the caller")]
    Forbidden,

    #[error("No valid agents or tasks found for this crew")]
    NoValidAgentsOrTasks,

    /// A caller-minted execution id collides with an existing record.
    #[error("Execution id already in use: {0}")]
    ExecutionIdInUse(Uuid),

    /// The engine ran (or failed to run) and the execution was durably recorded
    /// as failed. The failed row stays readable under `execution_id`.
    #[error("Execution {execution_id} failed: {message}")]
    Engine { execution_id: Uuid, message: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
