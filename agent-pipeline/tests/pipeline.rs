//! End-to-end pipeline scenarios: start a workflow, drain the dispatch
//! queue the way the worker does, and observe the store through the
//! orchestrator's read operations.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use agent_pipeline::agent::roles::AgentRole;
use agent_pipeline::agent::AgentRuntime;
use agent_pipeline::claude::CompletionClient;
use agent_pipeline::database::Database;
use agent_pipeline::error::{PipelineError, Result};
use agent_pipeline::orchestrator::Orchestrator;
use agent_pipeline::queue::{dispatch_queue, DispatchQueue, DispatchReceiver};
use agent_pipeline_sdk::{TaskOutcome, TaskRequest, TaskStatus, WorkflowStatus};

/// Completion client with a fixed reply or a fixed failure.
struct StubCompletion {
    reply: std::result::Result<String, String>,
}

impl StubCompletion {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl CompletionClient for StubCompletion {
    async fn complete(
        &self,
        _system: Option<&str>,
        _prompt: &str,
        _max_tokens: u32,
    ) -> Result<String> {
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(PipelineError::Upstream(message.clone())),
        }
    }
}

struct Pipeline {
    db: Database,
    orchestrator: Orchestrator,
    runtimes: HashMap<AgentRole, AgentRuntime>,
    queue: DispatchQueue,
    rx: DispatchReceiver,
}

fn pipeline(completion: StubCompletion) -> Pipeline {
    let db = Database::new_in_memory().unwrap();
    db.initialize_schema().unwrap();
    let completion: Arc<dyn CompletionClient> = Arc::new(completion);
    let (queue, rx) = dispatch_queue();

    let orchestrator = Orchestrator::new(db.clone(), completion.clone(), queue.clone());
    let mut runtimes = HashMap::new();
    for role in AgentRole::all() {
        runtimes.insert(
            role,
            AgentRuntime::new(role, db.clone(), completion.clone(), queue.clone()),
        );
    }

    Pipeline {
        db,
        orchestrator,
        runtimes,
        queue,
        rx,
    }
}

impl Pipeline {
    /// Drain the queue to quiescence, routing dispatches like the worker
    /// loop does. Retries re-enqueue, so this runs until nothing is left.
    async fn drain(&mut self) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::new();
        while let Some(dispatch) = self.rx.try_recv() {
            let role = AgentRole::from_name(&dispatch.agent).unwrap();
            let request = TaskRequest::from_dispatch(&dispatch);
            let response = self.runtimes[&role].handle_task(&request).await.unwrap();
            outcomes.push(response.status);
        }
        outcomes
    }
}

#[tokio::test]
async fn fallback_decomposition_runs_to_completion() {
    // A plain-prose decomposition reply forces the fixed fallback pipeline;
    // the same reply is a valid raw-text result for every agent execution.
    let mut pipeline = pipeline(StubCompletion::replying("no structured output today"));

    let receipt = pipeline
        .orchestrator
        .start_workflow("Add dark mode to the dashboard", 5)
        .await
        .unwrap();
    assert_eq!(receipt.tasks_created, 4);
    assert_eq!(receipt.estimated_time, "120 minutes");

    let outcomes = pipeline.drain().await;
    assert_eq!(outcomes.len(), 4);
    assert!(outcomes.iter().all(|o| *o == TaskOutcome::Complete));

    let snapshot = pipeline.orchestrator.get_status(&receipt.workflow_id).unwrap();
    assert_eq!(snapshot.status, WorkflowStatus::Complete);
    assert_eq!(snapshot.progress, 100);
    assert_eq!(snapshot.tasks.total, 4);
    assert_eq!(snapshot.tasks.completed, 4);
    assert!(snapshot.pending_decisions.is_empty());

    // Raw-text wrapping carries the reduced default confidence
    let report = pipeline
        .orchestrator
        .get_outputs(&receipt.workflow_id)
        .await
        .unwrap();
    assert_eq!(report.outputs.len(), 4);
    assert!(report.outputs.iter().all(|o| o.confidence == 0.7));
    assert_eq!(report.summary, "no structured output today");

    // Reads did not disturb anything: a second snapshot is identical
    assert_eq!(
        pipeline.orchestrator.get_status(&receipt.workflow_id).unwrap(),
        snapshot
    );
}

#[tokio::test]
async fn structured_replies_fill_outputs_and_memory() {
    let mut pipeline = pipeline(StubCompletion::replying(
        r#"{"output": {"summary": "done"}, "confidence": 0.92,
            "next_steps": ["ship it"], "remember": {"last_feature": "dark mode"}}"#,
    ));

    // The structured reply above lacks a "tasks" array, so decomposition
    // still falls back to the fixed pipeline.
    let receipt = pipeline
        .orchestrator
        .start_workflow("Add dark mode", 5)
        .await
        .unwrap();
    pipeline.drain().await;

    let report = pipeline
        .orchestrator
        .get_outputs(&receipt.workflow_id)
        .await
        .unwrap();
    assert_eq!(report.outputs.len(), 4);
    assert!(report.outputs.iter().all(|o| o.confidence == 0.92));

    // Every role remembered its entry
    for role in AgentRole::all() {
        let memory = pipeline
            .db
            .load_memory(role.name(), chrono::Utc::now(), 10)
            .unwrap();
        assert_eq!(memory.len(), 1);
        assert_eq!(memory[0].key, "last_feature");
    }
}

#[tokio::test]
async fn persistent_failure_exhausts_retries_and_fails_the_workflow() {
    let mut pipeline = pipeline(StubCompletion::failing("completion service down"));

    let receipt = pipeline
        .orchestrator
        .start_workflow("Add dark mode", 5)
        .await
        .unwrap();
    assert_eq!(receipt.tasks_created, 4);

    let outcomes = pipeline.drain().await;
    // Each of the 4 tasks fails once, requeues twice, then stops: 12 failures
    assert_eq!(outcomes.len(), 12);
    assert!(outcomes.iter().all(|o| *o == TaskOutcome::Failed));

    let snapshot = pipeline.orchestrator.get_status(&receipt.workflow_id).unwrap();
    assert_eq!(snapshot.status, WorkflowStatus::Failed);
    assert_eq!(snapshot.progress, 0);
    assert_eq!(snapshot.tasks.failed, 4);

    for task in pipeline.db.tasks_for_workflow(&receipt.workflow_id).unwrap() {
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.retry_count, 3);
        assert_eq!(task.max_retries, 3);
    }

    // No outputs were recorded, and the summary degrades instead of failing
    let report = pipeline
        .orchestrator
        .get_outputs(&receipt.workflow_id)
        .await
        .unwrap();
    assert!(report.outputs.is_empty());
    assert_eq!(
        report.summary,
        "0 outputs recorded from 0 agents. Summary generation unavailable."
    );
}

#[tokio::test]
async fn escalation_surfaces_in_status_and_decision_propagates() {
    let mut pipeline = pipeline(StubCompletion::replying(
        r#"{"output": "drafted two palettes", "needs_input": true, "questions": [
            {"title": "Which palette?", "description": "Pick the dark mode base",
             "options": ["slate", "zinc"], "recommendation": "slate",
             "impact_level": "high"}
        ]}"#,
    ));

    let receipt = pipeline
        .orchestrator
        .start_workflow("Add dark mode", 5)
        .await
        .unwrap();
    let outcomes = pipeline.drain().await;
    assert!(outcomes.iter().all(|o| *o == TaskOutcome::NeedsInput));

    // Escalated tasks are still complete; the workflow waits on humans only
    // through its pending decisions
    let snapshot = pipeline.orchestrator.get_status(&receipt.workflow_id).unwrap();
    assert_eq!(snapshot.status, WorkflowStatus::Complete);
    assert_eq!(snapshot.pending_decisions.len(), 4);
    let pending = &snapshot.pending_decisions[0];
    assert_eq!(pending.title, "Which palette?");
    assert_eq!(pending.impact_level, agent_pipeline_sdk::ImpactLevel::High);

    // 4 escalation messages were logged, one per agent
    let escalations = pipeline
        .db
        .messages_for_workflow(&receipt.workflow_id)
        .unwrap();
    assert_eq!(escalations.len(), 4);

    let decision_id = pending.decision_id.clone();
    let ack = pipeline
        .orchestrator
        .record_decision(&receipt.workflow_id, &decision_id, "slate", Some("brand fit"))
        .unwrap();
    assert_eq!(ack.status, "acknowledged");

    // One status message per distinct agent joined the log
    let messages = pipeline
        .db
        .messages_for_workflow(&receipt.workflow_id)
        .unwrap();
    let status_messages: Vec<_> = messages
        .iter()
        .filter(|m| m.message_type == agent_pipeline_sdk::MessageType::Status)
        .collect();
    assert_eq!(status_messages.len(), 4);
    assert!(status_messages
        .iter()
        .all(|m| m.payload["decision_id"] == json!(decision_id)));

    // The resolved decision left the pending list and cannot be re-resolved
    let snapshot = pipeline.orchestrator.get_status(&receipt.workflow_id).unwrap();
    assert_eq!(snapshot.pending_decisions.len(), 3);
    let err = pipeline
        .orchestrator
        .record_decision(&receipt.workflow_id, &decision_id, "zinc", None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
}

#[tokio::test]
async fn duplicate_queue_delivery_is_harmless() {
    let mut pipeline = pipeline(StubCompletion::replying(r#"{"output": "done"}"#));

    let receipt = pipeline
        .orchestrator
        .start_workflow("Add dark mode", 5)
        .await
        .unwrap();

    // Simulate at-least-once delivery by re-sending every dispatch
    let mut dispatches = Vec::new();
    while let Some(dispatch) = pipeline.rx.try_recv() {
        dispatches.push(dispatch);
    }
    for dispatch in &dispatches {
        pipeline.queue.enqueue(dispatch.clone()).unwrap();
        pipeline.queue.enqueue(dispatch.clone()).unwrap();
    }

    let outcomes = pipeline.drain().await;
    assert_eq!(outcomes.len(), 8);
    assert_eq!(
        outcomes.iter().filter(|o| **o == TaskOutcome::Complete).count(),
        4
    );
    assert_eq!(
        outcomes.iter().filter(|o| **o == TaskOutcome::Duplicate).count(),
        4
    );

    // Exactly one output per task despite double delivery
    let report = pipeline
        .orchestrator
        .get_outputs(&receipt.workflow_id)
        .await
        .unwrap();
    assert_eq!(report.outputs.len(), 4);
}
