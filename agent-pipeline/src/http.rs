//! HTTP surface
//!
//! JSON API over axum: the orchestrator operations under `/workflow`, the
//! per-agent surface under `/agent/{name}`, and health probes. Bodies use
//! defaulted fields so missing keys surface as our own validation errors
//! instead of deserializer rejections.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::agent::AgentRuntime;
use crate::error::PipelineError;
use crate::orchestrator::Orchestrator;
use agent_pipeline_sdk::{TaskOutcome, TaskRequest, ORCHESTRATOR_AGENT};

/// Default priority for tasks whose decomposition entry has none.
const DEFAULT_TASK_PRIORITY: i64 = 5;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Agent runtimes keyed by role name.
    pub runtimes: HashMap<String, Arc<AgentRuntime>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/workflow/start", post(start_workflow))
        .route("/workflow/:id/status", get(workflow_status))
        .route("/workflow/:id/decision", post(record_decision))
        .route("/workflow/:id/outputs", get(workflow_outputs))
        .route("/agent/:name", post(agent_task))
        .route("/agent/:name/health", get(agent_health))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match &self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::Upstream(_) => StatusCode::BAD_GATEWAY,
            PipelineError::TaskExecution(_)
            | PipelineError::Persistence(_)
            | PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct StartWorkflowBody {
    #[serde(default)]
    feature_request: String,
    #[serde(default)]
    priority: Option<i64>,
}

async fn start_workflow(
    State(state): State<AppState>,
    Json(body): Json<StartWorkflowBody>,
) -> Result<impl IntoResponse, PipelineError> {
    let receipt = state
        .orchestrator
        .start_workflow(
            &body.feature_request,
            body.priority.unwrap_or(DEFAULT_TASK_PRIORITY),
        )
        .await?;
    Ok(Json(receipt))
}

async fn workflow_status(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<impl IntoResponse, PipelineError> {
    let snapshot = state.orchestrator.get_status(&workflow_id)?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct DecisionBody {
    #[serde(default)]
    decision_id: String,
    #[serde(default)]
    choice: String,
    #[serde(default)]
    reasoning: Option<String>,
}

async fn record_decision(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> Result<impl IntoResponse, PipelineError> {
    let ack = state.orchestrator.record_decision(
        &workflow_id,
        &body.decision_id,
        &body.choice,
        body.reasoning.as_deref(),
    )?;
    Ok(Json(ack))
}

async fn workflow_outputs(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<impl IntoResponse, PipelineError> {
    let report = state.orchestrator.get_outputs(&workflow_id).await?;
    Ok(Json(report))
}

async fn agent_task(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<TaskRequest>,
) -> Result<impl IntoResponse, PipelineError> {
    let runtime = state
        .runtimes
        .get(&name)
        .ok_or_else(|| PipelineError::not_found(format!("Unknown agent: {name}")))?;

    let response = runtime.handle_task(&request).await?;
    let status = if response.status == TaskOutcome::Failed {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

async fn agent_health(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, PipelineError> {
    let runtime = state
        .runtimes
        .get(&name)
        .ok_or_else(|| PipelineError::not_found(format!("Unknown agent: {name}")))?;

    Ok(Json(json!({
        "status": "healthy",
        "agent": name,
        "capabilities": runtime.role().capabilities(),
    })))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "agent": ORCHESTRATOR_AGENT }))
}
