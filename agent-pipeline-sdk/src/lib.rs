//! Shared domain types for the agent pipeline.
//!
//! Everything that crosses a component boundary lives here: the records
//! persisted by the store, the dispatch message carried by the queue, and the
//! request/response envelopes exposed over HTTP. The orchestrator and the
//! agent runtime both depend on this crate and nothing else shared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Identity the orchestrator uses when writing messages and audit entries.
pub const ORCHESTRATOR_AGENT: &str = "orchestrator";

/// Default retry budget for newly created tasks.
pub const DEFAULT_MAX_RETRIES: i64 = 3;

// ============================================================================
// Statuses
// ============================================================================

/// Lifecycle status of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    InProgress,
    Complete,
    Failed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Complete => "complete",
            WorkflowStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(WorkflowStatus::InProgress),
            "complete" => Some(WorkflowStatus::Complete),
            "failed" => Some(WorkflowStatus::Failed),
            _ => None,
        }
    }
}

/// Lifecycle status of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Complete => "complete",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "complete" => Some(TaskStatus::Complete),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

/// How consequential a pending decision is for the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl ImpactLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::Low => "low",
            ImpactLevel::Medium => "medium",
            ImpactLevel::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(ImpactLevel::Low),
            "medium" => Some(ImpactLevel::Medium),
            "high" => Some(ImpactLevel::High),
            _ => None,
        }
    }
}

/// Kind of entry in the agent message log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Escalation,
    Status,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Escalation => "escalation",
            MessageType::Status => "status",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "escalation" => Some(MessageType::Escalation),
            "status" => Some(MessageType::Status),
            _ => None,
        }
    }
}

// ============================================================================
// Store records
// ============================================================================

/// One end-to-end pipeline run for a single feature request.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRecord {
    pub workflow_id: String,
    pub feature_request: String,
    pub status: WorkflowStatus,
    pub current_step: String,
    /// Decomposition result, kept as an opaque blob.
    pub context: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One unit of work assigned to exactly one agent role.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub task_id: String,
    pub workflow_id: String,
    pub assigned_agent: String,
    pub task_type: String,
    /// Higher is more urgent.
    pub priority: i64,
    pub input: Value,
    pub status: TaskStatus,
    pub retry_count: i64,
    pub max_retries: i64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Append-only record of one successful task execution.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutputRecord {
    pub agent_name: String,
    pub task_id: String,
    pub task_type: String,
    pub output: Value,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub status: TaskStatus,
}

/// A human-resolvable choice raised by an agent.
///
/// `decision` stays `None` until exactly one resolution lands; a resolved
/// decision is immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    pub decision_id: String,
    pub workflow_id: Option<String>,
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub recommendation: Option<Value>,
    pub decision: Option<String>,
    pub decided_by: String,
    pub reasoning: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub impact_level: ImpactLevel,
}

/// Per-agent durable key/value scratchpad entry with optional expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub agent_name: String,
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Append-only mailbox entry. Never consumed; a pure event log.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentMessageRecord {
    pub message_id: String,
    pub from_agent: String,
    pub to_agent: String,
    pub message_type: MessageType,
    pub payload: Value,
    pub workflow_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Write-only observability trail entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub actor: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Queue and task envelopes
// ============================================================================

/// Message carried by the dispatch queue. Delivery is at-least-once; a retry
/// re-enqueues the original dispatch verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDispatch {
    pub task_id: String,
    pub workflow_id: String,
    pub agent: String,
    pub task_type: String,
    pub input: Value,
}

/// Extra context handed to an agent alongside a task request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    #[serde(default)]
    pub workflow_id: Option<String>,
    /// Latest output per prior agent, when the caller already has them.
    #[serde(default)]
    pub previous_outputs: HashMap<String, Value>,
}

/// Task execution request as received by an agent worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub context: TaskContext,
}

impl TaskRequest {
    /// Build the request an agent sees for a queue-delivered dispatch.
    pub fn from_dispatch(dispatch: &TaskDispatch) -> Self {
        Self {
            task_id: dispatch.task_id.clone(),
            task_type: dispatch.task_type.clone(),
            input: dispatch.input.clone(),
            context: TaskContext {
                workflow_id: Some(dispatch.workflow_id.clone()),
                previous_outputs: HashMap::new(),
            },
        }
    }
}

/// Outcome reported for one delivery of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Complete,
    /// Done, but a decision was escalated; downstream work may need revision.
    NeedsInput,
    Failed,
    /// Duplicate delivery detected by the claim update and discarded.
    Duplicate,
}

/// Result envelope returned by an agent worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub agent_name: String,
    pub task_id: String,
    pub status: TaskOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub output: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Completion-service envelopes
// ============================================================================

/// One question an agent wants a human to settle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(default = "Question::default_title")]
    pub title: String,
    #[serde(default = "Question::default_description")]
    pub description: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub recommendation: Option<Value>,
    #[serde(default)]
    pub impact_level: ImpactLevel,
}

impl Question {
    fn default_title() -> String {
        "Decision Required".to_string()
    }

    fn default_description() -> String {
        "Input needed from human".to_string()
    }
}

impl Default for Question {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            description: Self::default_description(),
            options: Vec::new(),
            recommendation: None,
            impact_level: ImpactLevel::default(),
        }
    }
}

/// Structured result parsed out of a completion-service response.
///
/// Every field is defaulted so a partial JSON object from the model still
/// deserializes; a free-text response is wrapped instead of failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub needs_input: bool,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub remember: Map<String, Value>,
}

/// One entry of a request decomposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTask {
    pub agent: String,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub input: Value,
}

/// Decomposition of a feature request into agent tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    #[serde(default = "Decomposition::default_estimate")]
    pub estimated_time: String,
    pub tasks: Vec<PlannedTask>,
}

impl Decomposition {
    fn default_estimate() -> String {
        "120 minutes".to_string()
    }
}

// ============================================================================
// Orchestrator response envelopes
// ============================================================================

/// Response to a workflow start request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartReceipt {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub estimated_time: String,
    pub tasks_created: usize,
}

/// Per-status task counts within a workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub failed: usize,
}

/// Projection of an unresolved decision for the status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDecision {
    pub decision_id: String,
    pub title: String,
    pub impact_level: ImpactLevel,
}

/// Point-in-time view of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub current_step: String,
    /// `round(100 * completed / total)`, `0` when there are no tasks.
    pub progress: u32,
    pub tasks: TaskCounts,
    pub pending_decisions: Vec<PendingDecision>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Acknowledgement of a recorded decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionAck {
    pub status: String,
    pub decision_id: String,
    pub choice: String,
}

/// Projection of one agent output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSummary {
    pub agent: String,
    pub task_type: String,
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
    pub status: TaskStatus,
}

/// Collected outputs plus a natural-language summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputsReport {
    pub workflow_id: String,
    pub outputs: Vec<OutputSummary>,
    pub summary: String,
}

// ============================================================================
// Identifiers
// ============================================================================

/// New prefixed workflow id (`wf_…`).
pub fn new_workflow_id() -> String {
    format!("wf_{}", Uuid::new_v4().simple())
}

/// New prefixed task id (`task_…`).
pub fn new_task_id() -> String {
    format!("task_{}", Uuid::new_v4().simple())
}

/// New prefixed decision id (`dec_…`).
pub fn new_decision_id() -> String {
    format!("dec_{}", Uuid::new_v4().simple())
}

/// New prefixed message id (`msg_…`).
pub fn new_message_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Complete,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("unknown"), None);
    }

    #[test]
    fn execution_result_defaults_are_lenient() {
        let result: ExecutionResult = serde_json::from_str("{}").unwrap();
        assert!(result.output.is_null());
        assert!(!result.needs_input);
        assert!(result.questions.is_empty());

        let result: ExecutionResult =
            serde_json::from_str(r#"{"output": "done", "confidence": 0.9}"#).unwrap();
        assert_eq!(result.output, Value::String("done".to_string()));
        assert_eq!(result.confidence, Some(0.9));
    }

    #[test]
    fn question_fields_default_per_entry() {
        let question: Question = serde_json::from_str(r#"{"options": ["a", "b"]}"#).unwrap();
        assert_eq!(question.title, "Decision Required");
        assert_eq!(question.impact_level, ImpactLevel::Medium);
        assert_eq!(question.options.len(), 2);
    }

    #[test]
    fn planned_task_uses_type_key() {
        let task: PlannedTask =
            serde_json::from_str(r#"{"agent": "qa-engineer", "type": "test"}"#).unwrap();
        assert_eq!(task.task_type, "test");
        assert_eq!(task.priority, None);
    }

    #[test]
    fn ids_are_prefixed() {
        assert!(new_workflow_id().starts_with("wf_"));
        assert!(new_task_id().starts_with("task_"));
        assert!(new_decision_id().starts_with("dec_"));
        assert!(new_message_id().starts_with("msg_"));
    }
}
