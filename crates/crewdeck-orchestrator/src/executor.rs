use crewdeck_core::{
    AgentConfig, Crew, CrewdeckError, CrewdeckResult, EventKind, Execution, Metadata, Metric,
    TaskConfig, TraceEvent,
};
use crewdeck_engine::{CrewJob, Engine};
use crewdeck_events::EventBus;
use crewdeck_store::{ExecutionUpdate, Store};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Drives one crew execution through its state machine.
///
/// The whole sequence runs on the caller's task; the engine invocation is the
/// only suspension point. Concurrent executions share nothing but the store
/// and the bus registry, so nothing here serializes same-crew runs.
pub struct Orchestrator {
    store: Arc<dyn Store>,
    engine: Arc<dyn Engine>,
    bus: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, engine: Arc<dyn Engine>, bus: Arc<EventBus>) -> Self {
        Self { store, engine, bus }
    }

    /// Execute a crew and return the terminal execution row.
    ///
    /// Caller errors (`CrewNotFound`, `Forbidden`, `NoValidAgentsOrTasks`,
    /// `ExecutionIdInUse`) are detected before any row is created and have no
    /// side effects. Engine failures are durably recorded as a failed
    /// execution and surfaced as [`CrewdeckError::Engine`] carrying the
    /// execution id. Store faults after row creation drive the row to
    /// `failed` before the error is returned.
    pub async fn execute(
        &self,
        crew_id: Uuid,
        caller: Option<Uuid>,
        input: Option<String>,
    ) -> CrewdeckResult<Execution> {
        self.execute_as(Uuid::new_v4(), crew_id, caller, input).await
    }

    /// Like [`execute`](Self::execute), but with a caller-minted execution id.
    ///
    /// Lets a client subscribe to the id on the event bus before the run
    /// starts, so no lifecycle event is missed.
    pub async fn execute_as(
        &self,
        execution_id: Uuid,
        crew_id: Uuid,
        caller: Option<Uuid>,
        input: Option<String>,
    ) -> CrewdeckResult<Execution> {
        let crew = self
            .store
            .get_crew(crew_id)
            .await?
            .ok_or(CrewdeckError::CrewNotFound(crew_id))?;

        if let Some(owner) = crew.owner {
            if caller != Some(owner) {
                return Err(CrewdeckError::Forbidden);
            }
        }

        let agents = self.resolve_agents(&crew.agent_ids).await?;
        let tasks = self.resolve_tasks(&crew.task_ids).await?;
        if agents.is_empty() || tasks.is_empty() {
            return Err(CrewdeckError::NoValidAgentsOrTasks);
        }

        // A minted id must be fresh: an existing record and its trace stream
        // are immutable history, never re-run in place.
        if self.store.get_execution(execution_id).await?.is_some() {
            return Err(CrewdeckError::ExecutionIdInUse(execution_id));
        }

        // Entry into `running`: the first durable side effect.
        let mut execution = Execution::started(crew.id, crew.owner, input);
        execution.id = execution_id;
        self.store.create_execution(&execution).await?;

        info!(
            execution_id = %execution.id,
            crew = %crew.name,
            agents = agents.len(),
            tasks = tasks.len(),
            "Execution started"
        );

        match self.drive(&crew, execution_id, agents, tasks).await {
            // Engine failures already drove the row to `failed`; everything
            // else escaping here left it in `running`.
            Err(e) if !matches!(e, CrewdeckError::Engine { .. }) => {
                self.abandon(execution_id, &e).await;
                Err(e)
            }
            result => result,
        }
    }

    /// Run a created execution to its terminal state.
    async fn drive(
        &self,
        crew: &Crew,
        execution_id: Uuid,
        agents: Vec<AgentConfig>,
        tasks: Vec<TaskConfig>,
    ) -> CrewdeckResult<Execution> {
        let start_message = format!("Crew \"{}\" execution started", crew.name);
        self.store
            .append_trace(
                &TraceEvent::new(execution_id, EventKind::CrewStart, start_message.as_str())
                    .with_metadata(Metadata::from([
                        ("crew_id".to_string(), serde_json::json!(crew.id)),
                        ("process".to_string(), serde_json::json!(crew.process)),
                        ("agent_count".to_string(), serde_json::json!(agents.len())),
                        ("task_count".to_string(), serde_json::json!(tasks.len())),
                    ])),
            )
            .await?;
        self.bus
            .publish(
                execution_id,
                EventKind::CrewStart,
                serde_json::json!({
                    "crew_name": crew.name,
                    "message": start_message,
                }),
            )
            .await;

        let job = CrewJob::from_crew(crew, agents, tasks);
        let started = Instant::now();
        let outcome = self.engine.run(&job).await;
        let execution_time_ms = started.elapsed().as_millis() as u64;

        if outcome.success {
            self.complete(&crew.name, execution_id, execution_time_ms, outcome)
                .await
        } else {
            let error = outcome
                .error
                .unwrap_or_else(|| "Engine reported failure without detail".to_string());
            self.fail(&crew.name, execution_id, execution_time_ms, error)
                .await
        }
    }

    /// Best-effort terminal write for a row orphaned by a store fault, so an
    /// error never leaves an execution stuck in `running`.
    async fn abandon(&self, execution_id: Uuid, cause: &CrewdeckError) {
        let running = matches!(
            self.store.get_execution(execution_id).await,
            Ok(Some(row)) if !row.status.is_terminal()
        );
        if !running {
            return;
        }
        let update = ExecutionUpdate::failed(format!("Aborted by internal error: {cause}"));
        if let Err(e) = self.store.update_execution(execution_id, update).await {
            warn!(
                execution_id = %execution_id,
                error = %e,
                "Could not mark abandoned execution as failed"
            );
        }
    }

    /// Read-through: one execution row.
    pub async fn execution(&self, id: Uuid) -> CrewdeckResult<Option<Execution>> {
        self.store.get_execution(id).await
    }

    /// Read-through: trace events in append order.
    pub async fn trace_logs(&self, execution_id: Uuid) -> CrewdeckResult<Vec<TraceEvent>> {
        self.store.list_traces(execution_id).await
    }

    /// Read-through: metrics for an execution.
    pub async fn metrics(&self, execution_id: Uuid) -> CrewdeckResult<Vec<Metric>> {
        self.store.list_metrics(execution_id).await
    }

    async fn resolve_agents(&self, ids: &[Uuid]) -> CrewdeckResult<Vec<AgentConfig>> {
        let mut agents = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get_agent(*id).await? {
                Some(agent) => agents.push(agent),
                // Dangling references are dropped, not fatal.
                None => warn!(agent_id = %id, "Agent not found, skipping"),
            }
        }
        Ok(agents)
    }

    async fn resolve_tasks(&self, ids: &[Uuid]) -> CrewdeckResult<Vec<TaskConfig>> {
        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get_task(*id).await? {
                Some(task) => tasks.push(task),
                None => warn!(task_id = %id, "Task not found, skipping"),
            }
        }
        Ok(tasks)
    }

    async fn complete(
        &self,
        crew_name: &str,
        execution_id: Uuid,
        execution_time_ms: u64,
        outcome: crewdeck_engine::EngineOutcome,
    ) -> CrewdeckResult<Execution> {
        let output = outcome.output.unwrap_or_default();

        let updated = self
            .store
            .update_execution(execution_id, ExecutionUpdate::completed(output.as_str()))
            .await?
            .ok_or_else(|| {
                CrewdeckError::Store(format!("Execution {execution_id} vanished during update"))
            })?;

        let message = format!("Crew \"{crew_name}\" execution completed");
        let preview: String = output.chars().take(200).collect();
        self.store
            .append_trace(
                &TraceEvent::new(execution_id, EventKind::CrewComplete, message.as_str())
                    .with_metadata(Metadata::from([
                        (
                            "execution_time_ms".to_string(),
                            serde_json::json!(execution_time_ms),
                        ),
                        ("result".to_string(), serde_json::json!(preview)),
                    ])),
            )
            .await?;
        self.bus
            .publish(
                execution_id,
                EventKind::CrewComplete,
                serde_json::json!({
                    "crew_name": crew_name,
                    "message": message,
                    "result": output,
                }),
            )
            .await;

        let metric = Metric::new(
            execution_id,
            outcome.token_usage.unwrap_or(0),
            execution_time_ms,
            outcome.cost.unwrap_or(0.0),
        );
        self.store.create_metric(&metric).await?;

        info!(
            execution_id = %execution_id,
            execution_time_ms,
            token_usage = metric.token_usage,
            "Execution completed"
        );

        Ok(updated)
    }

    async fn fail(
        &self,
        crew_name: &str,
        execution_id: Uuid,
        execution_time_ms: u64,
        error: String,
    ) -> CrewdeckResult<Execution> {
        self.store
            .update_execution(execution_id, ExecutionUpdate::failed(error.as_str()))
            .await?
            .ok_or_else(|| {
                CrewdeckError::Store(format!("Execution {execution_id} vanished during update"))
            })?;

        let message = format!("Crew execution failed: {error}");
        self.store
            .append_trace(
                &TraceEvent::new(execution_id, EventKind::CrewError, message.as_str()).with_metadata(
                    Metadata::from([
                        (
                            "execution_time_ms".to_string(),
                            serde_json::json!(execution_time_ms),
                        ),
                        ("error".to_string(), serde_json::json!(error)),
                    ]),
                ),
            )
            .await?;
        self.bus
            .publish(
                execution_id,
                EventKind::CrewError,
                serde_json::json!({
                    "crew_name": crew_name,
                    "message": message,
                    "error": error,
                }),
            )
            .await;

        warn!(
            execution_id = %execution_id,
            execution_time_ms,
            error = %error,
            "Execution failed"
        );

        // No metric row on failure. The failed row stays inspectable; the
        // caller sees the same error string that was persisted.
        Err(CrewdeckError::Engine {
            execution_id,
            message: error,
        })
    }
}
