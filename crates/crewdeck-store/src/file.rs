use crate::store::{ExecutionUpdate, Store};
use async_trait::async_trait;
use crewdeck_core::{
    AgentConfig, Crew, CrewdeckError, CrewdeckResult, Execution, Metric, TaskConfig, TraceEvent,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// File-based store: one JSON file per entity, JSONL append files for trace
/// events and metrics. Good enough for a single-process deployment.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn new(dir: impl Into<PathBuf>) -> CrewdeckResult<Self> {
        let dir = dir.into();
        for sub in ["agents", "tasks", "crews", "executions", "traces", "metrics"] {
            tokio::fs::create_dir_all(dir.join(sub)).await?;
        }
        Ok(Self { dir })
    }

    fn entity_path(&self, kind: &str, id: Uuid) -> PathBuf {
        self.dir.join(kind).join(format!("{id}.json"))
    }

    fn log_path(&self, kind: &str, execution_id: Uuid) -> PathBuf {
        self.dir.join(kind).join(format!("{execution_id}.jsonl"))
    }

    async fn write_entity<T: Serialize>(&self, kind: &str, id: Uuid, value: &T) -> CrewdeckResult<()> {
        let json = serde_json::to_string_pretty(value)?;
        tokio::fs::write(self.entity_path(kind, id), json).await?;
        Ok(())
    }

    async fn read_entity<T: DeserializeOwned>(
        &self,
        kind: &str,
        id: Uuid,
    ) -> CrewdeckResult<Option<T>> {
        let path = self.entity_path(kind, id);
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(path).await?;
        let value = serde_json::from_str(&data)
            .map_err(|e| CrewdeckError::Store(format!("Failed to parse {kind} {id}: {e}")))?;
        Ok(Some(value))
    }

    async fn append_line<T: Serialize>(&self, path: &Path, value: &T) -> CrewdeckResult<()> {
        let mut line = serde_json::to_string(value)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_lines<T: DeserializeOwned>(&self, path: &Path) -> CrewdeckResult<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = tokio::fs::read_to_string(path).await?;
        let mut out = Vec::new();
        for line in data.lines().filter(|l| !l.trim().is_empty()) {
            let value = serde_json::from_str(line)
                .map_err(|e| CrewdeckError::Store(format!("Corrupt log line: {e}")))?;
            out.push(value);
        }
        Ok(out)
    }
}

#[async_trait]
impl Store for FileStore {
    async fn put_agent(&self, agent: &AgentConfig) -> CrewdeckResult<()> {
        self.write_entity("agents", agent.id, agent).await
    }

    async fn get_agent(&self, id: Uuid) -> CrewdeckResult<Option<AgentConfig>> {
        self.read_entity("agents", id).await
    }

    async fn put_task(&self, task: &TaskConfig) -> CrewdeckResult<()> {
        self.write_entity("tasks", task.id, task).await
    }

    async fn get_task(&self, id: Uuid) -> CrewdeckResult<Option<TaskConfig>> {
        self.read_entity("tasks", id).await
    }

    async fn put_crew(&self, crew: &Crew) -> CrewdeckResult<()> {
        self.write_entity("crews", crew.id, crew).await
    }

    async fn get_crew(&self, id: Uuid) -> CrewdeckResult<Option<Crew>> {
        self.read_entity("crews", id).await
    }

    async fn create_execution(&self, execution: &Execution) -> CrewdeckResult<()> {
        self.write_entity("executions", execution.id, execution).await
    }

    async fn update_execution(
        &self,
        id: Uuid,
        update: ExecutionUpdate,
    ) -> CrewdeckResult<Option<Execution>> {
        match self.read_entity::<Execution>("executions", id).await? {
            Some(mut execution) => {
                update.apply(&mut execution);
                self.write_entity("executions", id, &execution).await?;
                Ok(Some(execution))
            }
            None => Ok(None),
        }
    }

    async fn get_execution(&self, id: Uuid) -> CrewdeckResult<Option<Execution>> {
        self.read_entity("executions", id).await
    }

    async fn append_trace(&self, event: &TraceEvent) -> CrewdeckResult<()> {
        let path = self.log_path("traces", event.execution_id);
        self.append_line(&path, event).await
    }

    async fn list_traces(&self, execution_id: Uuid) -> CrewdeckResult<Vec<TraceEvent>> {
        let path = self.log_path("traces", execution_id);
        self.read_lines(&path).await
    }

    async fn create_metric(&self, metric: &Metric) -> CrewdeckResult<()> {
        let path = self.log_path("metrics", metric.execution_id);
        self.append_line(&path, metric).await
    }

    async fn list_metrics(&self, execution_id: Uuid) -> CrewdeckResult<Vec<Metric>> {
        let path = self.log_path("metrics", execution_id);
        self.read_lines(&path).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crewdeck_core::EventKind;

    #[tokio::test]
    async fn test_entity_roundtrip_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path()).await.unwrap();

        let agent = AgentConfig::new("researcher", "Researcher", "Find facts");
        store.put_agent(&agent).await.unwrap();
        let loaded = store.get_agent(agent.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "researcher");

        assert!(store.get_agent(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_execution_update_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path()).await.unwrap();

        let exec = Execution::started(Uuid::new_v4(), None, None);
        store.create_execution(&exec).await.unwrap();
        store
            .update_execution(exec.id, ExecutionUpdate::failed("boom"))
            .await
            .unwrap()
            .unwrap();

        // Re-open the store to prove the update hit disk.
        let reopened = FileStore::new(tmp.path()).await.unwrap();
        let loaded = reopened.get_execution(exec.id).await.unwrap().unwrap();
        assert_eq!(loaded.error.as_deref(), Some("boom"));
        assert!(loaded.output.is_none());
    }

    #[tokio::test]
    async fn test_trace_append_order_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path()).await.unwrap();
        let execution_id = Uuid::new_v4();

        for i in 0..3 {
            store
                .append_trace(&TraceEvent::new(
                    execution_id,
                    EventKind::Log,
                    format!("line {i}"),
                ))
                .await
                .unwrap();
        }

        let reopened = FileStore::new(tmp.path()).await.unwrap();
        let traces = reopened.list_traces(execution_id).await.unwrap();
        assert_eq!(traces.len(), 3);
        assert_eq!(traces[0].message, "line 0");
        assert_eq!(traces[2].message, "line 2");
    }

    #[tokio::test]
    async fn test_empty_listings() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path()).await.unwrap();
        let id = Uuid::new_v4();
        assert!(store.list_traces(id).await.unwrap().is_empty());
        assert!(store.list_metrics(id).await.unwrap().is_empty());
    }
}
