//! Agent runtime
//!
//! One runtime per role. A runtime claims a task, executes it through the
//! completion client, persists the result (output, memory, escalations,
//! audit), and drives the retry path on failure. All coordination happens
//! through the store and the dispatch queue.

pub mod roles;

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::claude::{parse_execution_result, CompletionClient};
use crate::database::Database;
use crate::error::{PipelineError, Result};
use crate::queue::DispatchQueue;
use agent_pipeline_sdk::{
    new_decision_id, new_message_id, AgentMessageRecord, AgentOutputRecord, AuditEntry,
    DecisionRecord, ExecutionResult, MemoryEntry, MessageType, Question, TaskDispatch,
    TaskOutcome, TaskRequest, TaskResponse, TaskStatus, ORCHESTRATOR_AGENT,
};

use roles::AgentRole;

/// Memory rows folded into the system prompt per execution.
const MEMORY_LIMIT: usize = 10;

/// Token budget for task executions.
const TASK_MAX_TOKENS: u32 = 4000;

/// Per-agent digest budget in the system prompt.
const PREVIOUS_OUTPUT_DIGEST: usize = 200;

/// Worker for a single agent role.
#[derive(Clone)]
pub struct AgentRuntime {
    role: AgentRole,
    db: Database,
    completion: Arc<dyn CompletionClient>,
    queue: DispatchQueue,
}

impl AgentRuntime {
    pub fn new(
        role: AgentRole,
        db: Database,
        completion: Arc<dyn CompletionClient>,
        queue: DispatchQueue,
    ) -> Self {
        Self {
            role,
            db,
            completion,
            queue,
        }
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Handle one task delivery end to end.
    ///
    /// The claim update decides ownership: a lost claim means this delivery is
    /// a duplicate and is discarded without side effects. Anything that fails
    /// after the claim marks the task failed and feeds the retry path; the
    /// returned envelope then reports `failed` with the error detail.
    pub async fn handle_task(&self, request: &TaskRequest) -> Result<TaskResponse> {
        if request.task_id.is_empty() || request.task_type.is_empty() {
            return Err(PipelineError::validation("task_id and task_type required"));
        }

        if !self.db.claim_task(&request.task_id, Utc::now())? {
            info!(
                agent = self.role.name(),
                task_id = %request.task_id,
                "duplicate delivery discarded"
            );
            return Ok(TaskResponse {
                agent_name: self.role.name().to_string(),
                task_id: request.task_id.clone(),
                status: TaskOutcome::Duplicate,
                confidence: None,
                output: Value::Null,
                next_steps: Vec::new(),
                error: None,
            });
        }

        match self.execute_and_persist(request).await {
            Ok((result, escalated)) => Ok(TaskResponse {
                agent_name: self.role.name().to_string(),
                task_id: request.task_id.clone(),
                status: if escalated {
                    TaskOutcome::NeedsInput
                } else {
                    TaskOutcome::Complete
                },
                confidence: result.confidence,
                output: result.output,
                next_steps: result.next_steps,
                error: None,
            }),
            Err(err) => {
                warn!(
                    agent = self.role.name(),
                    task_id = %request.task_id,
                    error = %err,
                    "task execution failed"
                );
                self.record_failure(request)?;
                Ok(TaskResponse {
                    agent_name: self.role.name().to_string(),
                    task_id: request.task_id.clone(),
                    status: TaskOutcome::Failed,
                    confidence: None,
                    output: Value::Null,
                    next_steps: Vec::new(),
                    error: Some(err.to_string()),
                })
            }
        }
    }

    async fn execute_and_persist(&self, request: &TaskRequest) -> Result<(ExecutionResult, bool)> {
        let now = Utc::now();
        let workflow_id = request.context.workflow_id.as_deref();

        let memory = self.db.load_memory(self.role.name(), now, MEMORY_LIMIT)?;
        let previous = self.gather_previous_outputs(request)?;

        let system = self.build_system_prompt(workflow_id, &memory, &previous);
        let prompt = self
            .role
            .build_task_prompt(&request.task_type, &request.input, &previous);

        let text = self
            .completion
            .complete(Some(&system), &prompt, TASK_MAX_TOKENS)
            .await
            .map_err(|err| PipelineError::TaskExecution(err.to_string()))?;
        let result = parse_execution_result(&text);

        let completed_at = Utc::now();
        self.db.insert_output(&AgentOutputRecord {
            agent_name: self.role.name().to_string(),
            task_id: request.task_id.clone(),
            task_type: request.task_type.clone(),
            output: result.output.clone(),
            confidence: result.confidence.unwrap_or(0.8),
            timestamp: completed_at,
            status: TaskStatus::Complete,
        })?;
        self.db.complete_task(&request.task_id, completed_at)?;

        for (key, value) in &result.remember {
            self.db.upsert_memory(&MemoryEntry {
                agent_name: self.role.name().to_string(),
                key: key.clone(),
                value: value.clone(),
                updated_at: completed_at,
                expires_at: None,
            })?;
        }

        let escalated = result.needs_input;
        if escalated {
            self.escalate(&request.task_id, workflow_id, &result.questions)?;
        }

        self.db.insert_audit(&AuditEntry {
            actor: self.role.name().to_string(),
            action: "task_completed".to_string(),
            resource_type: "task".to_string(),
            resource_id: request.task_id.clone(),
            details: json!({
                "task_type": request.task_type,
                "confidence": result.confidence,
            }),
            timestamp: completed_at,
        })?;

        Ok((result, escalated))
    }

    /// Raise the full question list as individually resolvable decisions and
    /// notify the orchestrator with one escalation message.
    fn escalate(
        &self,
        task_id: &str,
        workflow_id: Option<&str>,
        questions: &[Question],
    ) -> Result<Vec<String>> {
        let now = Utc::now();
        let default_question = [Question::default()];
        let questions = if questions.is_empty() {
            // needs_input with no questions still deserves a human look
            &default_question[..]
        } else {
            questions
        };

        let mut decision_ids = Vec::with_capacity(questions.len());
        for question in questions {
            let decision_id = new_decision_id();
            self.db.insert_decision(&DecisionRecord {
                decision_id: decision_id.clone(),
                workflow_id: workflow_id.map(str::to_string),
                task_id: task_id.to_string(),
                title: question.title.clone(),
                description: question.description.clone(),
                options: question.options.clone(),
                recommendation: question.recommendation.clone(),
                decision: None,
                decided_by: "pending".to_string(),
                reasoning: None,
                timestamp: now,
                impact_level: question.impact_level,
            })?;
            decision_ids.push(decision_id);
        }

        self.db.insert_message(&AgentMessageRecord {
            message_id: new_message_id(),
            from_agent: self.role.name().to_string(),
            to_agent: ORCHESTRATOR_AGENT.to_string(),
            message_type: MessageType::Escalation,
            payload: json!({
                "decision_ids": decision_ids,
                "task_id": task_id,
            }),
            workflow_id: workflow_id.map(str::to_string),
            timestamp: now,
        })?;

        Ok(decision_ids)
    }

    /// Mark the task failed and requeue the original dispatch while the retry
    /// budget lasts.
    fn record_failure(&self, request: &TaskRequest) -> Result<()> {
        self.db.fail_task(&request.task_id)?;

        let Some(task) = self.db.get_task(&request.task_id)? else {
            return Ok(());
        };

        if task.retry_count < task.max_retries {
            info!(
                task_id = %request.task_id,
                retry_count = task.retry_count,
                max_retries = task.max_retries,
                "requeueing failed task"
            );
            self.queue.enqueue(TaskDispatch {
                task_id: task.task_id,
                workflow_id: task.workflow_id,
                agent: task.assigned_agent,
                task_type: task.task_type,
                input: task.input,
            })?;
        } else {
            warn!(
                task_id = %request.task_id,
                max_retries = task.max_retries,
                "retry budget exhausted, task stays failed"
            );
        }

        Ok(())
    }

    /// Latest upstream outputs, from the request context plus the store.
    /// Explicit context entries win over what the store has.
    fn gather_previous_outputs(&self, request: &TaskRequest) -> Result<HashMap<String, Value>> {
        let mut previous = HashMap::new();

        if let Some(workflow_id) = request.context.workflow_id.as_deref() {
            for (agent, output) in self.db.latest_outputs_by_agent(workflow_id)? {
                if agent != self.role.name() {
                    previous.insert(agent, output);
                }
            }
        }

        for (agent, output) in &request.context.previous_outputs {
            previous.insert(agent.clone(), output.clone());
        }

        Ok(previous)
    }

    fn build_system_prompt(
        &self,
        workflow_id: Option<&str>,
        memory: &[MemoryEntry],
        previous: &HashMap<String, Value>,
    ) -> String {
        let mut prompt = self.role.system_prompt().to_string();

        if let Some(workflow_id) = workflow_id {
            prompt.push_str(&format!("\n\nYou are working on workflow {workflow_id}."));
        }

        if !memory.is_empty() {
            prompt.push_str("\n\nRelevant context from memory:");
            for entry in memory {
                prompt.push_str(&format!("\n- {}: {}", entry.key, entry.value));
            }
        }

        if !previous.is_empty() {
            prompt.push_str("\n\nPrevious agent outputs:");
            let mut agents: Vec<_> = previous.keys().collect();
            agents.sort();
            for agent in agents {
                let serialized = previous[agent].to_string();
                let digest: String = serialized.chars().take(PREVIOUS_OUTPUT_DIGEST).collect();
                prompt.push_str(&format!("\n{agent}: {digest}..."));
            }
        }

        prompt.push_str(
            "\n\nIMPORTANT: Respond ONLY with valid JSON in this format:\n\
             {\n\
             \x20 \"output\": \"your main output/result\",\n\
             \x20 \"confidence\": 0.0-1.0,\n\
             \x20 \"next_steps\": [\"step 1\", \"step 2\"],\n\
             \x20 \"needs_input\": false,\n\
             \x20 \"questions\": [],\n\
             \x20 \"remember\": {}\n\
             }",
        );

        prompt
    }
}
