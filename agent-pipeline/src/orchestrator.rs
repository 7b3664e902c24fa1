//! Workflow orchestrator
//!
//! Owns the workflow lifecycle: decomposes a feature request into agent
//! tasks, enqueues dispatches, answers status and outputs queries, and applies
//! human decisions with fanout to the workflow's agents.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::claude::{extract_json, CompletionClient};
use crate::database::Database;
use crate::error::{PipelineError, Result};
use crate::queue::DispatchQueue;
use agent_pipeline_sdk::{
    new_message_id, new_task_id, new_workflow_id, AgentMessageRecord, AuditEntry, DecisionAck,
    Decomposition, MessageType, OutputSummary, OutputsReport, PendingDecision, PlannedTask,
    StartReceipt, StatusSnapshot, TaskCounts, TaskDispatch, TaskRecord, TaskStatus,
    WorkflowRecord, WorkflowStatus, DEFAULT_MAX_RETRIES, ORCHESTRATOR_AGENT,
};

/// Token budget for request decomposition.
const DECOMPOSE_MAX_TOKENS: u32 = 2000;

/// Token budget for outputs summaries.
const SUMMARY_MAX_TOKENS: u32 = 1000;

/// Per-output digest budget in the summary prompt.
const SUMMARY_DIGEST: usize = 200;

pub struct Orchestrator {
    db: Database,
    completion: Arc<dyn CompletionClient>,
    queue: DispatchQueue,
}

impl Orchestrator {
    pub fn new(db: Database, completion: Arc<dyn CompletionClient>, queue: DispatchQueue) -> Self {
        Self {
            db,
            completion,
            queue,
        }
    }

    /// Decompose a feature request, persist the workflow and its tasks, and
    /// enqueue one dispatch per task.
    pub async fn start_workflow(
        &self,
        feature_request: &str,
        default_priority: i64,
    ) -> Result<StartReceipt> {
        if feature_request.trim().is_empty() {
            return Err(PipelineError::validation("feature_request is required"));
        }

        let decomposition = self.decompose(feature_request).await;
        let workflow_id = new_workflow_id();
        let now = Utc::now();

        self.db.insert_workflow(&WorkflowRecord {
            workflow_id: workflow_id.clone(),
            feature_request: feature_request.to_string(),
            status: WorkflowStatus::InProgress,
            current_step: "research".to_string(),
            context: serde_json::to_value(&decomposition)?,
            created_at: now,
            updated_at: now,
        })?;

        for planned in &decomposition.tasks {
            let task_id = new_task_id();
            self.db.insert_task(&TaskRecord {
                task_id: task_id.clone(),
                workflow_id: workflow_id.clone(),
                assigned_agent: planned.agent.clone(),
                task_type: planned.task_type.clone(),
                priority: planned.priority.unwrap_or(default_priority),
                input: planned.input.clone(),
                status: TaskStatus::Pending,
                retry_count: 0,
                max_retries: DEFAULT_MAX_RETRIES,
                created_at: now,
                started_at: None,
                completed_at: None,
            })?;

            self.queue.enqueue(TaskDispatch {
                task_id,
                workflow_id: workflow_id.clone(),
                agent: planned.agent.clone(),
                task_type: planned.task_type.clone(),
                input: planned.input.clone(),
            })?;
        }

        self.db.insert_audit(&AuditEntry {
            actor: ORCHESTRATOR_AGENT.to_string(),
            action: "workflow_started".to_string(),
            resource_type: "workflow".to_string(),
            resource_id: workflow_id.clone(),
            details: json!({
                "feature_request": feature_request,
                "estimated_time": decomposition.estimated_time,
            }),
            timestamp: now,
        })?;

        info!(
            workflow_id = %workflow_id,
            tasks = decomposition.tasks.len(),
            "workflow started"
        );

        Ok(StartReceipt {
            workflow_id,
            status: WorkflowStatus::InProgress,
            estimated_time: decomposition.estimated_time,
            tasks_created: decomposition.tasks.len(),
        })
    }

    /// Point-in-time status snapshot. Read-only; calling it twice in a quiet
    /// system returns identical results.
    pub fn get_status(&self, workflow_id: &str) -> Result<StatusSnapshot> {
        let workflow = self
            .db
            .get_workflow(workflow_id)?
            .ok_or_else(|| PipelineError::not_found("Workflow not found"))?;

        let tasks = self.db.tasks_for_workflow(workflow_id)?;
        let counts = TaskCounts {
            total: tasks.len(),
            completed: count_status(&tasks, TaskStatus::Complete),
            pending: count_status(&tasks, TaskStatus::Pending),
            in_progress: count_status(&tasks, TaskStatus::InProgress),
            failed: count_status(&tasks, TaskStatus::Failed),
        };

        let progress = if counts.total > 0 {
            (counts.completed as f64 / counts.total as f64 * 100.0).round() as u32
        } else {
            0
        };

        let pending_decisions = self
            .db
            .pending_decisions(workflow_id)?
            .into_iter()
            .map(|d| PendingDecision {
                decision_id: d.decision_id,
                title: d.title,
                impact_level: d.impact_level,
            })
            .collect();

        Ok(StatusSnapshot {
            workflow_id: workflow_id.to_string(),
            status: derive_status(workflow.status, &tasks),
            current_step: workflow.current_step,
            progress,
            tasks: counts,
            pending_decisions,
            created_at: workflow.created_at,
            updated_at: workflow.updated_at,
        })
    }

    /// Record a human decision and fan the choice out to every agent with a
    /// task in the workflow.
    pub fn record_decision(
        &self,
        workflow_id: &str,
        decision_id: &str,
        choice: &str,
        reasoning: Option<&str>,
    ) -> Result<DecisionAck> {
        if decision_id.is_empty() || choice.is_empty() {
            return Err(PipelineError::validation(
                "decision_id and choice are required",
            ));
        }

        let decision = self
            .db
            .get_decision(decision_id, workflow_id)?
            .ok_or_else(|| PipelineError::not_found("Decision not found"))?;
        if decision.decision.is_some() {
            return Err(PipelineError::validation("Decision already resolved"));
        }

        let now = Utc::now();
        let rows = self
            .db
            .resolve_decision(decision_id, workflow_id, choice, reasoning, "human", now)?;
        if rows == 0 {
            // Lost a race with another resolution
            return Err(PipelineError::validation("Decision already resolved"));
        }

        // One status message per distinct agent in the workflow
        for agent in self.db.distinct_agents_for_workflow(workflow_id)? {
            self.db.insert_message(&AgentMessageRecord {
                message_id: new_message_id(),
                from_agent: ORCHESTRATOR_AGENT.to_string(),
                to_agent: agent,
                message_type: MessageType::Status,
                payload: json!({
                    "decision_id": decision_id,
                    "choice": choice,
                    "type": "decision_update",
                }),
                workflow_id: Some(workflow_id.to_string()),
                timestamp: now,
            })?;
        }

        self.db.insert_audit(&AuditEntry {
            actor: "human".to_string(),
            action: "decision_made".to_string(),
            resource_type: "decision".to_string(),
            resource_id: decision_id.to_string(),
            details: json!({ "choice": choice, "reasoning": reasoning }),
            timestamp: now,
        })?;

        Ok(DecisionAck {
            status: "acknowledged".to_string(),
            decision_id: decision_id.to_string(),
            choice: choice.to_string(),
        })
    }

    /// Collected outputs plus an executive summary. Summary generation
    /// degrades to a counted fallback; this call never fails on upstream
    /// errors.
    pub async fn get_outputs(&self, workflow_id: &str) -> Result<OutputsReport> {
        let outputs = self.db.outputs_for_workflow(workflow_id)?;
        let summary = self.summarize(workflow_id, &outputs).await;

        Ok(OutputsReport {
            workflow_id: workflow_id.to_string(),
            outputs: outputs
                .into_iter()
                .map(|o| OutputSummary {
                    agent: o.agent_name,
                    task_type: o.task_type,
                    timestamp: o.timestamp,
                    confidence: o.confidence,
                    status: o.status,
                })
                .collect(),
            summary,
        })
    }

    /// Decompose a feature request into agent tasks. Any upstream or parse
    /// failure falls back to the fixed four-task pipeline.
    async fn decompose(&self, feature_request: &str) -> Decomposition {
        let prompt = format!(
            "You are the Chief of Staff for a multi-agent delivery pipeline.\n\n\
             Analyze this feature request and break it down into tasks for our agents:\n\
             1. Market Research Agent (market-research)\n\
             2. UI/UX Designer Agent (ui-designer)\n\
             3. Frontend Engineer Agent (frontend-engineer)\n\
             4. QA Engineer Agent (qa-engineer)\n\n\
             Feature Request: {feature_request}\n\n\
             Respond ONLY with valid JSON in this format:\n\
             {{\n\
             \x20 \"estimated_time\": \"time estimate in minutes\",\n\
             \x20 \"tasks\": [\n\
             \x20   {{\n\
             \x20     \"agent\": \"agent name\",\n\
             \x20     \"type\": \"task type\",\n\
             \x20     \"priority\": 1-10,\n\
             \x20     \"input\": {{ \"description\": \"what the agent should do\" }}\n\
             \x20   }}\n\
             \x20 ]\n\
             }}"
        );

        match self
            .completion
            .complete(None, &prompt, DECOMPOSE_MAX_TOKENS)
            .await
        {
            Ok(text) => match extract_json(&text)
                .and_then(|value| serde_json::from_value::<Decomposition>(value).ok())
            {
                Some(decomposition) if !decomposition.tasks.is_empty() => decomposition,
                _ => {
                    warn!("unparseable decomposition, using fallback pipeline");
                    fallback_decomposition(feature_request)
                }
            },
            Err(err) => {
                warn!(error = %err, "decomposition request failed, using fallback pipeline");
                fallback_decomposition(feature_request)
            }
        }
    }

    async fn summarize(
        &self,
        workflow_id: &str,
        outputs: &[agent_pipeline_sdk::AgentOutputRecord],
    ) -> String {
        let digests = outputs
            .iter()
            .map(|o| {
                let serialized = o.output.to_string();
                let digest: String = serialized.chars().take(SUMMARY_DIGEST).collect();
                format!("{}: {digest}...", o.agent_name)
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Summarize these agent outputs for workflow {workflow_id}:\n\n\
             {digests}\n\n\
             Provide a brief executive summary of what was accomplished."
        );

        match self
            .completion
            .complete(None, &prompt, SUMMARY_MAX_TOKENS)
            .await
        {
            Ok(summary) => summary,
            Err(err) => {
                warn!(error = %err, "summary generation failed, using counted fallback");
                let agents: std::collections::BTreeSet<_> =
                    outputs.iter().map(|o| o.agent_name.as_str()).collect();
                format!(
                    "{} outputs recorded from {} agents. Summary generation unavailable.",
                    outputs.len(),
                    agents.len()
                )
            }
        }
    }
}

fn count_status(tasks: &[TaskRecord], status: TaskStatus) -> usize {
    tasks.iter().filter(|t| t.status == status).count()
}

/// Reported workflow status, derived from the aggregate task set. The stored
/// row is never mutated by reads.
fn derive_status(stored: WorkflowStatus, tasks: &[TaskRecord]) -> WorkflowStatus {
    if stored != WorkflowStatus::InProgress || tasks.is_empty() {
        return stored;
    }
    if tasks.iter().all(|t| t.status == TaskStatus::Complete) {
        return WorkflowStatus::Complete;
    }
    if tasks
        .iter()
        .any(|t| t.status == TaskStatus::Failed && t.retry_count >= t.max_retries)
    {
        return WorkflowStatus::Failed;
    }
    stored
}

/// Fixed decomposition used when the completion service cannot produce one.
fn fallback_decomposition(feature_request: &str) -> Decomposition {
    let input = json!({ "description": feature_request });
    Decomposition {
        estimated_time: "120 minutes".to_string(),
        tasks: vec![
            PlannedTask {
                agent: "market-research".to_string(),
                task_type: "research".to_string(),
                priority: Some(10),
                input: input.clone(),
            },
            PlannedTask {
                agent: "ui-designer".to_string(),
                task_type: "design".to_string(),
                priority: Some(8),
                input: input.clone(),
            },
            PlannedTask {
                agent: "frontend-engineer".to_string(),
                task_type: "implement".to_string(),
                priority: Some(6),
                input: input.clone(),
            },
            PlannedTask {
                agent: "qa-engineer".to_string(),
                task_type: "test".to_string(),
                priority: Some(4),
                input,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{dispatch_queue, DispatchReceiver};
    use crate::test_support::MockCompletion;
    use agent_pipeline_sdk::{AgentOutputRecord, DecisionRecord, ImpactLevel};
    use chrono::Duration;

    fn orchestrator(completion: MockCompletion) -> (Orchestrator, Database, DispatchReceiver) {
        let db = Database::new_in_memory().unwrap();
        db.initialize_schema().unwrap();
        let (queue, rx) = dispatch_queue();
        (
            Orchestrator::new(db.clone(), Arc::new(completion), queue),
            db,
            rx,
        )
    }

    fn seed_workflow(db: &Database, workflow_id: &str) {
        db.insert_workflow(&WorkflowRecord {
            workflow_id: workflow_id.to_string(),
            feature_request: "Add dark mode".to_string(),
            status: WorkflowStatus::InProgress,
            current_step: "research".to_string(),
            context: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap();
    }

    fn seed_task(db: &Database, task_id: &str, workflow_id: &str, agent: &str, status: TaskStatus) {
        db.insert_task(&TaskRecord {
            task_id: task_id.to_string(),
            workflow_id: workflow_id.to_string(),
            assigned_agent: agent.to_string(),
            task_type: "research".to_string(),
            priority: 5,
            input: json!({}),
            status,
            retry_count: 0,
            max_retries: 3,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        })
        .unwrap();
    }

    #[tokio::test]
    async fn empty_request_is_rejected() {
        let (orchestrator, _db, _rx) = orchestrator(MockCompletion::replying("{}"));
        let err = orchestrator.start_workflow("   ", 5).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn upstream_failure_falls_back_to_fixed_pipeline() {
        let (orchestrator, db, mut rx) = orchestrator(MockCompletion::failing("api down"));

        let receipt = orchestrator.start_workflow("Add dark mode", 5).await.unwrap();
        assert_eq!(receipt.tasks_created, 4);
        assert_eq!(receipt.estimated_time, "120 minutes");
        assert_eq!(receipt.status, WorkflowStatus::InProgress);

        let tasks = db.tasks_for_workflow(&receipt.workflow_id).unwrap();
        let assignments: Vec<_> = tasks
            .iter()
            .map(|t| (t.assigned_agent.as_str(), t.priority))
            .collect();
        assert_eq!(
            assignments,
            vec![
                ("market-research", 10),
                ("ui-designer", 8),
                ("frontend-engineer", 6),
                ("qa-engineer", 4),
            ]
        );

        // One dispatch per task
        for _ in 0..4 {
            assert!(rx.try_recv().is_some());
        }
        assert!(rx.try_recv().is_none());

        assert_eq!(
            db.audit_count("workflow", &receipt.workflow_id).unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn parsed_decomposition_drives_task_creation() {
        let (orchestrator, db, mut rx) = orchestrator(MockCompletion::replying(
            r#"Here you go:
            {"estimated_time": "45 minutes", "tasks": [
                {"agent": "ui-designer", "type": "design", "priority": 9,
                 "input": {"description": "Design the toggle"}},
                {"agent": "frontend-engineer", "type": "implement",
                 "input": {"description": "Build the toggle"}}
            ]}"#,
        ));

        let receipt = orchestrator.start_workflow("Add dark mode", 5).await.unwrap();
        assert_eq!(receipt.tasks_created, 2);
        assert_eq!(receipt.estimated_time, "45 minutes");

        let tasks = db.tasks_for_workflow(&receipt.workflow_id).unwrap();
        assert_eq!(tasks[0].assigned_agent, "ui-designer");
        assert_eq!(tasks[0].priority, 9);
        // Missing priority falls back to the request default
        assert_eq!(tasks[1].priority, 5);

        let dispatch = rx.try_recv().unwrap();
        assert_eq!(dispatch.agent, "ui-designer");
        assert_eq!(dispatch.workflow_id, receipt.workflow_id);
    }

    #[tokio::test]
    async fn status_progress_is_zero_without_tasks() {
        let (orchestrator, db, _rx) = orchestrator(MockCompletion::replying("{}"));
        seed_workflow(&db, "wf_1");

        let snapshot = orchestrator.get_status("wf_1").unwrap();
        assert_eq!(snapshot.progress, 0);
        assert_eq!(snapshot.tasks.total, 0);
        assert_eq!(snapshot.status, WorkflowStatus::InProgress);
    }

    #[tokio::test]
    async fn status_progress_rounds() {
        let (orchestrator, db, _rx) = orchestrator(MockCompletion::replying("{}"));
        seed_workflow(&db, "wf_1");
        seed_task(&db, "task_1", "wf_1", "a", TaskStatus::Complete);
        seed_task(&db, "task_2", "wf_1", "b", TaskStatus::Complete);
        seed_task(&db, "task_3", "wf_1", "c", TaskStatus::Pending);
        seed_task(&db, "task_4", "wf_1", "d", TaskStatus::InProgress);

        let snapshot = orchestrator.get_status("wf_1").unwrap();
        assert_eq!(snapshot.progress, 50);
        assert_eq!(snapshot.tasks.completed, 2);
        assert_eq!(snapshot.tasks.pending, 1);
        assert_eq!(snapshot.tasks.in_progress, 1);

        seed_task(&db, "task_5", "wf_1", "e", TaskStatus::Pending);
        seed_task(&db, "task_6", "wf_1", "f", TaskStatus::Pending);
        // 2 of 6 complete rounds to 33
        assert_eq!(orchestrator.get_status("wf_1").unwrap().progress, 33);
    }

    #[tokio::test]
    async fn status_is_derived_from_task_set() {
        let (orchestrator, db, _rx) = orchestrator(MockCompletion::replying("{}"));
        seed_workflow(&db, "wf_1");
        seed_task(&db, "task_1", "wf_1", "a", TaskStatus::Complete);
        seed_task(&db, "task_2", "wf_1", "b", TaskStatus::Complete);

        assert_eq!(
            orchestrator.get_status("wf_1").unwrap().status,
            WorkflowStatus::Complete
        );
        // The stored row is untouched
        assert_eq!(
            db.get_workflow("wf_1").unwrap().unwrap().status,
            WorkflowStatus::InProgress
        );

        seed_workflow(&db, "wf_2");
        seed_task(&db, "task_3", "wf_2", "a", TaskStatus::Complete);
        seed_task(&db, "task_4", "wf_2", "b", TaskStatus::Pending);
        db.claim_task("task_4", Utc::now()).unwrap();
        for _ in 0..3 {
            db.fail_task("task_4").unwrap();
        }
        assert_eq!(
            orchestrator.get_status("wf_2").unwrap().status,
            WorkflowStatus::Failed
        );
    }

    #[tokio::test]
    async fn status_of_unknown_workflow_is_not_found() {
        let (orchestrator, _db, _rx) = orchestrator(MockCompletion::replying("{}"));
        let err = orchestrator.get_status("wf_missing").unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_status_is_idempotent() {
        let (orchestrator, db, _rx) = orchestrator(MockCompletion::replying("{}"));
        seed_workflow(&db, "wf_1");
        seed_task(&db, "task_1", "wf_1", "a", TaskStatus::Complete);

        let first = orchestrator.get_status("wf_1").unwrap();
        let second = orchestrator.get_status("wf_1").unwrap();
        assert_eq!(first, second);
    }

    fn seed_decision(db: &Database, decision_id: &str, workflow_id: &str) {
        db.insert_decision(&DecisionRecord {
            decision_id: decision_id.to_string(),
            workflow_id: Some(workflow_id.to_string()),
            task_id: "task_1".to_string(),
            title: "Pick a palette".to_string(),
            description: "Dark mode base color".to_string(),
            options: vec!["slate".to_string(), "zinc".to_string()],
            recommendation: None,
            decision: None,
            decided_by: "pending".to_string(),
            reasoning: None,
            timestamp: Utc::now(),
            impact_level: ImpactLevel::Medium,
        })
        .unwrap();
    }

    #[tokio::test]
    async fn decision_propagates_once_per_distinct_agent() {
        let (orchestrator, db, _rx) = orchestrator(MockCompletion::replying("{}"));
        seed_workflow(&db, "wf_1");
        seed_task(&db, "task_1", "wf_1", "market-research", TaskStatus::Complete);
        seed_task(&db, "task_2", "wf_1", "market-research", TaskStatus::Pending);
        seed_task(&db, "task_3", "wf_1", "ui-designer", TaskStatus::Pending);
        seed_decision(&db, "dec_1", "wf_1");

        let ack = orchestrator
            .record_decision("wf_1", "dec_1", "slate", Some("matches brand"))
            .unwrap();
        assert_eq!(ack.status, "acknowledged");

        let decision = db.get_decision("dec_1", "wf_1").unwrap().unwrap();
        assert_eq!(decision.decided_by, "human");
        assert_eq!(decision.decision.as_deref(), Some("slate"));
        assert_eq!(decision.reasoning.as_deref(), Some("matches brand"));

        // Three tasks over two agents means exactly two messages
        let messages = db.messages_for_workflow("wf_1").unwrap();
        assert_eq!(messages.len(), 2);
        let mut recipients: Vec<_> = messages.iter().map(|m| m.to_agent.clone()).collect();
        recipients.sort();
        assert_eq!(recipients, vec!["market-research", "ui-designer"]);
        for message in &messages {
            assert_eq!(message.message_type, MessageType::Status);
            assert_eq!(message.payload["decision_id"], "dec_1");
            assert_eq!(message.payload["choice"], "slate");
            assert_eq!(message.payload["type"], "decision_update");
        }
    }

    #[tokio::test]
    async fn decision_resolution_is_guarded() {
        let (orchestrator, db, _rx) = orchestrator(MockCompletion::replying("{}"));
        seed_workflow(&db, "wf_1");
        seed_task(&db, "task_1", "wf_1", "market-research", TaskStatus::Pending);
        seed_decision(&db, "dec_1", "wf_1");

        let err = orchestrator
            .record_decision("wf_1", "dec_1", "", None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));

        // Wrong workflow scope is a missing decision, not a silent no-op
        let err = orchestrator
            .record_decision("wf_other", "dec_1", "slate", None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));

        orchestrator
            .record_decision("wf_1", "dec_1", "slate", None)
            .unwrap();
        let err = orchestrator
            .record_decision("wf_1", "dec_1", "zinc", None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(
            db.get_decision("dec_1", "wf_1")
                .unwrap()
                .unwrap()
                .decision
                .as_deref(),
            Some("slate")
        );
    }

    fn seed_output(db: &Database, task_id: &str, agent: &str, offset_secs: i64) {
        db.insert_output(&AgentOutputRecord {
            agent_name: agent.to_string(),
            task_id: task_id.to_string(),
            task_type: "research".to_string(),
            output: json!({"finding": "x"}),
            confidence: 0.8,
            timestamp: Utc::now() + Duration::seconds(offset_secs),
            status: TaskStatus::Complete,
        })
        .unwrap();
    }

    #[tokio::test]
    async fn outputs_report_uses_completion_summary() {
        let (orchestrator, db, _rx) =
            orchestrator(MockCompletion::replying("All agents delivered."));
        seed_workflow(&db, "wf_1");
        seed_task(&db, "task_1", "wf_1", "market-research", TaskStatus::Complete);
        seed_output(&db, "task_1", "market-research", 0);

        let report = orchestrator.get_outputs("wf_1").await.unwrap();
        assert_eq!(report.outputs.len(), 1);
        assert_eq!(report.outputs[0].agent, "market-research");
        assert_eq!(report.summary, "All agents delivered.");
    }

    #[tokio::test]
    async fn outputs_summary_degrades_on_upstream_failure() {
        let (orchestrator, db, _rx) = orchestrator(MockCompletion::failing("api down"));
        seed_workflow(&db, "wf_1");
        seed_task(&db, "task_1", "wf_1", "market-research", TaskStatus::Complete);
        seed_task(&db, "task_2", "wf_1", "ui-designer", TaskStatus::Complete);
        seed_output(&db, "task_1", "market-research", 0);
        seed_output(&db, "task_2", "ui-designer", 1);

        let report = orchestrator.get_outputs("wf_1").await.unwrap();
        assert_eq!(report.outputs.len(), 2);
        assert_eq!(
            report.summary,
            "2 outputs recorded from 2 agents. Summary generation unavailable."
        );
        // Most recent first
        assert_eq!(report.outputs[0].agent, "ui-designer");
    }

    #[tokio::test]
    async fn get_outputs_is_idempotent() {
        let (orchestrator, db, _rx) = orchestrator(MockCompletion::failing("api down"));
        seed_workflow(&db, "wf_1");
        seed_task(&db, "task_1", "wf_1", "market-research", TaskStatus::Complete);
        seed_output(&db, "task_1", "market-research", 0);

        let first = orchestrator.get_outputs("wf_1").await.unwrap();
        let second = orchestrator.get_outputs("wf_1").await.unwrap();
        assert_eq!(first, second);
    }
}
