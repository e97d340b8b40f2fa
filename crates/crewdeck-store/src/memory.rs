use crate::store::{ExecutionUpdate, Store};
use async_trait::async_trait;
use crewdeck_core::{
    AgentConfig, Crew, CrewdeckResult, Execution, Metric, TaskConfig, TraceEvent,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory store. Suitable for tests and one-shot CLI runs; everything is
/// lost on process exit.
pub struct MemoryStore {
    agents: RwLock<HashMap<Uuid, AgentConfig>>,
    tasks: RwLock<HashMap<Uuid, TaskConfig>>,
    crews: RwLock<HashMap<Uuid, Crew>>,
    executions: RwLock<HashMap<Uuid, Execution>>,
    // Vec per execution preserves append order for reads.
    traces: RwLock<HashMap<Uuid, Vec<TraceEvent>>>,
    metrics: RwLock<HashMap<Uuid, Vec<Metric>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            tasks: RwLock::new(HashMap::new()),
            crews: RwLock::new(HashMap::new()),
            executions: RwLock::new(HashMap::new()),
            traces: RwLock::new(HashMap::new()),
            metrics: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put_agent(&self, agent: &AgentConfig) -> CrewdeckResult<()> {
        self.agents.write().await.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn get_agent(&self, id: Uuid) -> CrewdeckResult<Option<AgentConfig>> {
        Ok(self.agents.read().await.get(&id).cloned())
    }

    async fn put_task(&self, task: &TaskConfig) -> CrewdeckResult<()> {
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> CrewdeckResult<Option<TaskConfig>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn put_crew(&self, crew: &Crew) -> CrewdeckResult<()> {
        self.crews.write().await.insert(crew.id, crew.clone());
        Ok(())
    }

    async fn get_crew(&self, id: Uuid) -> CrewdeckResult<Option<Crew>> {
        Ok(self.crews.read().await.get(&id).cloned())
    }

    async fn create_execution(&self, execution: &Execution) -> CrewdeckResult<()> {
        self.executions
            .write()
            .await
            .insert(execution.id, execution.clone());
        Ok(())
    }

    async fn update_execution(
        &self,
        id: Uuid,
        update: ExecutionUpdate,
    ) -> CrewdeckResult<Option<Execution>> {
        let mut executions = self.executions.write().await;
        match executions.get_mut(&id) {
            Some(execution) => {
                update.apply(execution);
                Ok(Some(execution.clone()))
            }
            None => Ok(None),
        }
    }

    async fn get_execution(&self, id: Uuid) -> CrewdeckResult<Option<Execution>> {
        Ok(self.executions.read().await.get(&id).cloned())
    }

    async fn append_trace(&self, event: &TraceEvent) -> CrewdeckResult<()> {
        self.traces
            .write()
            .await
            .entry(event.execution_id)
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn list_traces(&self, execution_id: Uuid) -> CrewdeckResult<Vec<TraceEvent>> {
        Ok(self
            .traces
            .read()
            .await
            .get(&execution_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_metric(&self, metric: &Metric) -> CrewdeckResult<()> {
        self.metrics
            .write()
            .await
            .entry(metric.execution_id)
            .or_default()
            .push(metric.clone());
        Ok(())
    }

    async fn list_metrics(&self, execution_id: Uuid) -> CrewdeckResult<Vec<Metric>> {
        Ok(self
            .metrics
            .read()
            .await
            .get(&execution_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crewdeck_core::{EventKind, ExecutionStatus};

    #[tokio::test]
    async fn test_crew_roundtrip() {
        let store = MemoryStore::new();
        let crew = Crew::new("demo", vec![], vec![]);
        store.put_crew(&crew).await.unwrap();
        let loaded = store.get_crew(crew.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "demo");
        assert!(store.get_crew(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_execution_update() {
        let store = MemoryStore::new();
        let exec = Execution::started(Uuid::new_v4(), None, None);
        store.create_execution(&exec).await.unwrap();

        let updated = store
            .update_execution(exec.id, ExecutionUpdate::completed("done"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ExecutionStatus::Completed);
        assert_eq!(updated.output.as_deref(), Some("done"));
        assert!(updated.error.is_none());
        assert!(updated.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_update_unknown_execution() {
        let store = MemoryStore::new();
        let result = store
            .update_execution(Uuid::new_v4(), ExecutionUpdate::failed("nope"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_traces_preserve_append_order() {
        let store = MemoryStore::new();
        let execution_id = Uuid::new_v4();
        for i in 0..5 {
            let event =
                TraceEvent::new(execution_id, EventKind::Log, format!("line {i}"));
            store.append_trace(&event).await.unwrap();
        }
        let traces = store.list_traces(execution_id).await.unwrap();
        assert_eq!(traces.len(), 5);
        for (i, event) in traces.iter().enumerate() {
            assert_eq!(event.message, format!("line {i}"));
        }
    }

    #[tokio::test]
    async fn test_metrics_scoped_by_execution() {
        let store = MemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.create_metric(&Metric::new(a, 500, 100, 0.01)).await.unwrap();
        assert_eq!(store.list_metrics(a).await.unwrap().len(), 1);
        assert!(store.list_metrics(b).await.unwrap().is_empty());
    }
}
