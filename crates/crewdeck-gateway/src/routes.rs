use crate::server::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crewdeck_core::CrewdeckError;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Body of `POST /executions`.
///
/// `execution_id` is optional: a client that wants to subscribe to the live
/// stream before the run starts mints the id itself and passes it here.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub crew_id: Uuid,
    #[serde(default)]
    pub execution_id: Option<Uuid>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub caller: Option<Uuid>,
}

pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExecuteRequest>,
) -> Response {
    let execution_id = req.execution_id.unwrap_or_else(Uuid::new_v4);
    match state
        .orchestrator
        .execute_as(execution_id, req.crew_id, req.caller, req.input)
        .await
    {
        Ok(execution) => (StatusCode::OK, Json(execution)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn get_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.orchestrator.execution(id).await {
        Ok(Some(execution)) => (StatusCode::OK, Json(execution)).into_response(),
        Ok(None) => not_found("Execution not found"),
        Err(e) => error_response(&e),
    }
}

pub async fn list_trace(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.orchestrator.trace_logs(id).await {
        Ok(traces) => (StatusCode::OK, Json(traces)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn list_metrics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.orchestrator.metrics(id).await {
        Ok(metrics) => (StatusCode::OK, Json(metrics)).into_response(),
        Err(e) => error_response(&e),
    }
}

fn not_found(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": message})),
    )
        .into_response()
}

/// Map domain errors onto the HTTP surface. Engine failures carry the
/// execution id so the caller can inspect the durably recorded failed row.
fn error_response(e: &CrewdeckError) -> Response {
    let (status, body) = match e {
        CrewdeckError::CrewNotFound(_) => (
            StatusCode::NOT_FOUND,
            serde_json::json!({"error": e.to_string()}),
        ),
        CrewdeckError::Forbidden => (
            StatusCode::FORBIDDEN,
            serde_json::json!({"error": e.to_string()}),
        ),
        CrewdeckError::NoValidAgentsOrTasks => (
            StatusCode::UNPROCESSABLE_ENTITY,
            serde_json::json!({"error": e.to_string()}),
        ),
        CrewdeckError::ExecutionIdInUse(_) => (
            StatusCode::CONFLICT,
            serde_json::json!({"error": e.to_string()}),
        ),
        CrewdeckError::Engine {
            execution_id,
            message,
        } => (
            StatusCode::BAD_GATEWAY,
            serde_json::json!({"error": message, "execution_id": execution_id}),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({"error": e.to_string()}),
        ),
    };
    (status, Json(body)).into_response()
}
