#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end orchestration flows: store + engine + event bus together.

use async_trait::async_trait;
use crewdeck_core::{AgentConfig, Crew, CrewdeckError, ExecutionStatus, TaskConfig};
use crewdeck_engine::{CrewJob, Engine, EngineOutcome, SimulatedEngine};
use crewdeck_events::{EventBus, Subscriber};
use crewdeck_orchestrator::Orchestrator;
use crewdeck_store::{MemoryStore, Store};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

struct StubEngine(EngineOutcome);

#[async_trait]
impl Engine for StubEngine {
    async fn run(&self, _job: &CrewJob) -> EngineOutcome {
        self.0.clone()
    }
    fn name(&self) -> &'static str {
        "stub"
    }
}

async fn seed_crew(store: &MemoryStore, name: &str, agents: usize, tasks: usize) -> Crew {
    let mut agent_ids = Vec::new();
    for i in 0..agents {
        let agent = AgentConfig::new(format!("{name} agent {i}"), "Worker", "work");
        store.put_agent(&agent).await.unwrap();
        agent_ids.push(agent.id);
    }
    let mut task_ids = Vec::new();
    for i in 0..tasks {
        let task = TaskConfig::new(format!("{name} task {i}"), format!("step {i} of {name}"));
        store.put_task(&task).await.unwrap();
        task_ids.push(task.id);
    }
    let crew = Crew::new(name, agent_ids, task_ids);
    store.put_crew(&crew).await.unwrap();
    crew
}

fn subscriber() -> (Subscriber, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Subscriber { id: Uuid::new_v4(), tx }, rx)
}

fn event_type(raw: &str) -> String {
    let parsed: serde_json::Value = serde_json::from_str(raw).unwrap();
    parsed["type"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_completed_run_with_metrics() {
    // Scenario: 2 agents, 2 tasks, engine succeeds with output "done" and 500 tokens.
    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(EventBus::new());
    let crew = seed_crew(&store, "research", 2, 2).await;
    let engine = StubEngine(EngineOutcome {
        success: true,
        output: Some("done".to_string()),
        error: None,
        token_usage: Some(500),
        cost: Some(0.02),
        agents_count: Some(2),
        tasks_count: Some(2),
    });
    let orch = Orchestrator::new(store.clone(), Arc::new(engine), bus);

    let execution = orch.execute(crew.id, None, None).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.output.as_deref(), Some("done"));

    let metrics = orch.metrics(execution.id).await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].token_usage, 500);
    assert_eq!(metrics[0].success_rate, 100);

    // Re-read through the store: the row is terminal and consistent.
    let row = store.get_execution(execution.id).await.unwrap().unwrap();
    assert!(row.status.is_terminal());
    assert!(row.completed_at.unwrap() >= row.started_at.unwrap());
}

#[tokio::test]
async fn test_failed_run_has_no_metrics() {
    // Scenario: engine times out; failed row, zero metric rows.
    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(EventBus::new());
    let crew = seed_crew(&store, "flaky", 1, 1).await;
    let engine = StubEngine(EngineOutcome::failure("Engine process timed out after 1s"));
    let orch = Orchestrator::new(store.clone(), Arc::new(engine), bus);

    let err = orch.execute(crew.id, None, None).await.unwrap_err();
    let CrewdeckError::Engine { execution_id, message } = err else {
        panic!("expected engine error");
    };
    assert!(message.contains("timed out"));
    assert!(orch.metrics(execution_id).await.unwrap().is_empty());

    let row = orch.execution(execution_id).await.unwrap().unwrap();
    assert_eq!(row.status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn test_subscriber_joining_before_execute_sees_full_lifecycle() {
    // Scenario: the client mints the execution id, subscribes, then triggers
    // the run. It receives exactly start then complete, in order.
    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(EventBus::new());
    let crew = seed_crew(&store, "streamed", 1, 2).await;
    let orch = Orchestrator::new(store.clone(), Arc::new(SimulatedEngine::new()), bus.clone());

    let execution_id = Uuid::new_v4();
    let (sub, mut rx) = subscriber();
    // Subscribing before the row exists is allowed.
    bus.subscribe(execution_id, sub).await;

    let execution = orch
        .execute_as(execution_id, crew.id, None, None)
        .await
        .unwrap();
    assert_eq!(execution.id, execution_id);

    assert_eq!(event_type(&rx.recv().await.unwrap()), "crew:start");
    assert_eq!(event_type(&rx.recv().await.unwrap()), "crew:complete");
    assert!(rx.try_recv().is_err(), "no further events after completion");
}

#[tokio::test]
async fn test_events_are_not_buffered_for_late_subscribers() {
    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(EventBus::new());
    let crew = seed_crew(&store, "late", 1, 1).await;
    let orch = Orchestrator::new(store, Arc::new(SimulatedEngine::new()), bus.clone());

    let execution = orch.execute(crew.id, None, None).await.unwrap();

    let (sub, mut rx) = subscriber();
    bus.subscribe(execution.id, sub).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_unsubscribed_client_misses_completion() {
    // Two subscribers on one execution's room; one leaves before completion.
    let bus = Arc::new(EventBus::new());
    let execution_id = Uuid::new_v4();
    let (stay, mut rx_stay) = subscriber();
    let (leave, mut rx_leave) = subscriber();
    let leave_id = leave.id;
    bus.subscribe(execution_id, stay).await;
    bus.subscribe(execution_id, leave).await;

    bus.publish(
        execution_id,
        crewdeck_core::EventKind::CrewStart,
        serde_json::json!({"crew_name": "pair"}),
    )
    .await;
    bus.unsubscribe(execution_id, leave_id).await;
    bus.publish(
        execution_id,
        crewdeck_core::EventKind::CrewComplete,
        serde_json::json!({"result": "ok"}),
    )
    .await;

    assert_eq!(event_type(&rx_stay.recv().await.unwrap()), "crew:start");
    assert_eq!(event_type(&rx_stay.recv().await.unwrap()), "crew:complete");

    assert_eq!(event_type(&rx_leave.recv().await.unwrap()), "crew:start");
    assert!(rx_leave.try_recv().is_err());
}

#[tokio::test]
async fn test_concurrent_runs_of_same_crew_are_independent() {
    // No mutual exclusion: two concurrent executes produce two rows.
    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(EventBus::new());
    let crew = seed_crew(&store, "parallel", 1, 1).await;
    let orch = Arc::new(Orchestrator::new(
        store.clone(),
        Arc::new(SimulatedEngine::new()),
        bus,
    ));

    let (a, b) = tokio::join!(
        orch.execute(crew.id, None, None),
        orch.execute(crew.id, None, None),
    );
    let a = a.unwrap();
    let b = b.unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(a.status, ExecutionStatus::Completed);
    assert_eq!(b.status, ExecutionStatus::Completed);

    // Each has its own trace stream.
    assert_eq!(orch.trace_logs(a.id).await.unwrap().len(), 2);
    assert_eq!(orch.trace_logs(b.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_caller_error_leaves_no_rows() {
    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(EventBus::new());
    // Crew with tasks but zero agents.
    let task = TaskConfig::new("t", "desc");
    store.put_task(&task).await.unwrap();
    let crew = Crew::new("empty", vec![], vec![task.id]);
    store.put_crew(&crew).await.unwrap();

    let orch = Orchestrator::new(store, Arc::new(SimulatedEngine::new()), bus.clone());
    let err = orch.execute(crew.id, None, None).await.unwrap_err();
    assert!(matches!(err, CrewdeckError::NoValidAgentsOrTasks));
}
