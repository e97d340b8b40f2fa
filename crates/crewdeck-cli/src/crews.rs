//! Crew definition files.
//!
//! A crew is declared in a single TOML file: a `[crew]` header, `[[agents]]`
//! entries, and `[[tasks]]` entries that reference agents by name. Loading a
//! file registers all three entity kinds with the store.

use anyhow::{bail, Context};
use crewdeck_core::{AgentConfig, Crew, ProcessMode, TaskConfig};
use crewdeck_store::Store;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct CrewFile {
    pub crew: CrewSection,
    #[serde(default)]
    pub agents: Vec<AgentSection>,
    #[serde(default)]
    pub tasks: Vec<TaskSection>,
}

#[derive(Debug, Deserialize)]
pub struct CrewSection {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub process: ProcessMode,
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Deserialize)]
pub struct AgentSection {
    pub name: String,
    pub role: String,
    pub goal: String,
    #[serde(default)]
    pub backstory: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskSection {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub expected_output: Option<String>,
    /// Name of the agent this task is assigned to.
    #[serde(default)]
    pub agent: Option<String>,
}

/// Parse one crew file and register its agents, tasks, and crew.
pub async fn load_crew(store: &dyn Store, path: &Path) -> anyhow::Result<Crew> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read crew file '{}'", path.display()))?;
    let file: CrewFile = toml::from_str(&raw)
        .with_context(|| format!("Invalid crew file '{}'", path.display()))?;
    register_crew(store, file).await
}

pub async fn register_crew(store: &dyn Store, file: CrewFile) -> anyhow::Result<Crew> {
    let mut agent_ids = Vec::new();
    let mut agents_by_name = HashMap::new();
    for section in &file.agents {
        let agent = AgentConfig::new(
            section.name.as_str(),
            section.role.as_str(),
            section.goal.as_str(),
        )
        .with_backstory(section.backstory.as_str());
        store.put_agent(&agent).await?;
        agents_by_name.insert(section.name.clone(), agent.id);
        agent_ids.push(agent.id);
    }

    let mut task_ids = Vec::new();
    for section in &file.tasks {
        let mut task = TaskConfig::new(section.name.as_str(), section.description.as_str());
        task.expected_output = section.expected_output.clone();
        if let Some(agent_name) = &section.agent {
            let Some(agent_id) = agents_by_name.get(agent_name) else {
                bail!(
                    "Task '{}' references unknown agent '{}'",
                    section.name,
                    agent_name
                );
            };
            task = task.assigned_to(*agent_id);
        }
        store.put_task(&task).await?;
        task_ids.push(task.id);
    }

    let mut crew = Crew::new(file.crew.name.as_str(), agent_ids, task_ids);
    crew.description = file.crew.description.clone();
    crew.process = file.crew.process;
    crew.verbose = file.crew.verbose;
    store.put_crew(&crew).await?;

    info!(
        crew = %crew.name,
        crew_id = %crew.id,
        agents = crew.agent_ids.len(),
        tasks = crew.task_ids.len(),
        "Crew registered"
    );
    Ok(crew)
}

/// Load every `.toml` file from the crew directory. A missing directory is
/// fine; serving with zero crews is allowed.
pub async fn load_crew_dir(store: &dyn Store, dir: &Path) -> anyhow::Result<Vec<Crew>> {
    let mut crews = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(crews),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read crew dir '{}'", dir.display()))
        }
    };
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            crews.push(load_crew(store, &path).await?);
        }
    }
    Ok(crews)
}
