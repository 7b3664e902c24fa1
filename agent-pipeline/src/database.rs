//! SQLite store backing the whole pipeline
//!
//! Single source of truth for workflows, tasks, outputs, decisions, agent
//! memory, messages, and the audit trail. Components never talk to each other
//! directly; everything flows through these tables.
//!
//! # Database Schema
//!
//! 1. **workflows** - one row per feature request (status, step, decomposition context)
//! 2. **task_queue** - task lifecycle: assignment, priority, retries, timestamps
//! 3. **agent_outputs** - append-only results of successful executions
//! 4. **decisions** - human-in-the-loop questions; `decision` is NULL until resolved
//! 5. **agent_memory** - per-agent key/value scratchpad with optional expiry
//! 6. **agent_messages** - append-only message log (escalations, status fanout)
//! 7. **audit_log** - write-only observability trail
//!
//! Timestamps are stored as RFC 3339 text, JSON payloads as serialized text.
//! WAL mode is enabled for concurrent access from the worker loops.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{PipelineError, Result};
use agent_pipeline_sdk::{
    AgentMessageRecord, AgentOutputRecord, AuditEntry, DecisionRecord, ImpactLevel, MemoryEntry,
    MessageType, TaskRecord, TaskStatus, WorkflowRecord, WorkflowStatus,
};

/// Database wrapper shared by the orchestrator and the agent runtimes.
///
/// Cloning is cheap; all clones serialize access through one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at the specified path
    pub fn new(path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(PipelineError::persistence)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.pragma_update(None, "journal_mode", "WAL")?;

        // Enable foreign key constraints
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PipelineError::Internal("database mutex poisoned".to_string()))
    }

    /// Initialize database schema with all tables and indexes
    pub fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                workflow_id TEXT PRIMARY KEY,
                feature_request TEXT NOT NULL,
                status TEXT NOT NULL,
                current_step TEXT NOT NULL,
                context TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_workflows_status ON workflows(status);
            "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS task_queue (
                task_id TEXT PRIMARY KEY,
                workflow_id TEXT NOT NULL,
                assigned_to TEXT NOT NULL,
                task_type TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 5,
                input TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                retry_count INTEGER NOT NULL DEFAULT 0,
                max_retries INTEGER NOT NULL DEFAULT 3,
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,

                FOREIGN KEY(workflow_id) REFERENCES workflows(workflow_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_workflow_id ON task_queue(workflow_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON task_queue(status);
            "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS agent_outputs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_name TEXT NOT NULL,
                task_id TEXT NOT NULL,
                task_type TEXT NOT NULL,
                output TEXT NOT NULL,
                confidence_score REAL NOT NULL,
                timestamp TEXT NOT NULL,
                status TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_outputs_task_id ON agent_outputs(task_id);
            CREATE INDEX IF NOT EXISTS idx_outputs_agent_name ON agent_outputs(agent_name);
            "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS decisions (
                decision_id TEXT PRIMARY KEY,
                workflow_id TEXT,
                task_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                options TEXT NOT NULL,
                recommendation TEXT,
                decision TEXT,
                decided_by TEXT NOT NULL DEFAULT 'pending',
                reasoning TEXT,
                timestamp TEXT NOT NULL,
                impact_level TEXT NOT NULL DEFAULT 'medium'
            );

            CREATE INDEX IF NOT EXISTS idx_decisions_workflow_id ON decisions(workflow_id);
            "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS agent_memory (
                agent_name TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                expires_at TEXT,

                PRIMARY KEY(agent_name, key)
            );
            "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS agent_messages (
                message_id TEXT PRIMARY KEY,
                from_agent TEXT NOT NULL,
                to_agent TEXT NOT NULL,
                message_type TEXT NOT NULL,
                payload TEXT NOT NULL,
                workflow_id TEXT,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_workflow_id ON agent_messages(workflow_id);
            "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                actor TEXT NOT NULL,
                action TEXT NOT NULL,
                resource_type TEXT NOT NULL,
                resource_id TEXT NOT NULL,
                details TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_resource ON audit_log(resource_type, resource_id);
            "#,
        )?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Workflows
    // ------------------------------------------------------------------

    /// Insert a new workflow record
    pub fn insert_workflow(&self, workflow: &WorkflowRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO workflows (
                workflow_id, feature_request, status, current_step, context,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                workflow.workflow_id,
                workflow.feature_request,
                workflow.status.as_str(),
                workflow.current_step,
                serde_json::to_string(&workflow.context)?,
                workflow.created_at.to_rfc3339(),
                workflow.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a single workflow by ID
    pub fn get_workflow(&self, workflow_id: &str) -> Result<Option<WorkflowRecord>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                r#"
                SELECT workflow_id, feature_request, status, current_step, context,
                       created_at, updated_at
                FROM workflows
                WHERE workflow_id = ?1
                "#,
                params![workflow_id],
                map_workflow_row,
            )
            .optional()?;
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Insert a new task record
    pub fn insert_task(&self, task: &TaskRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO task_queue (
                task_id, workflow_id, assigned_to, task_type, priority, input,
                status, retry_count, max_retries, created_at, started_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                task.task_id,
                task.workflow_id,
                task.assigned_agent,
                task.task_type,
                task.priority,
                serde_json::to_string(&task.input)?,
                task.status.as_str(),
                task.retry_count,
                task.max_retries,
                task.created_at.to_rfc3339(),
                task.started_at.map(|dt| dt.to_rfc3339()),
                task.completed_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Get a single task by ID
    pub fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                &format!("{TASK_COLUMNS} WHERE task_id = ?1"),
                params![task_id],
                map_task_row,
            )
            .optional()?;
        Ok(result)
    }

    /// List a workflow's tasks, most urgent first
    pub fn tasks_for_workflow(&self, workflow_id: &str) -> Result<Vec<TaskRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{TASK_COLUMNS} WHERE workflow_id = ?1 ORDER BY priority DESC, created_at ASC"
        ))?;
        let tasks = stmt
            .query_map(params![workflow_id], map_task_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Claim a task for execution.
    ///
    /// Conditional update `pending|failed -> in_progress`; returns `false`
    /// when the task is already claimed or finished, which is how duplicate
    /// queue deliveries are detected.
    pub fn claim_task(&self, task_id: &str, started_at: DateTime<Utc>) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute(
            r#"
            UPDATE task_queue
            SET status = 'in_progress', started_at = ?2
            WHERE task_id = ?1 AND status IN ('pending', 'failed')
            "#,
            params![task_id, started_at.to_rfc3339()],
        )?;
        Ok(rows == 1)
    }

    /// Mark a task complete
    pub fn complete_task(&self, task_id: &str, completed_at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            UPDATE task_queue
            SET status = 'complete', completed_at = ?2
            WHERE task_id = ?1
            "#,
            params![task_id, completed_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Mark a task failed and bump its retry counter.
    ///
    /// The CASE keeps `retry_count <= max_retries` even if failure recording
    /// races or repeats.
    pub fn fail_task(&self, task_id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            UPDATE task_queue
            SET status = 'failed',
                retry_count = CASE
                    WHEN retry_count < max_retries THEN retry_count + 1
                    ELSE max_retries
                END
            WHERE task_id = ?1
            "#,
            params![task_id],
        )?;
        Ok(())
    }

    /// Distinct agents with at least one task in the workflow
    pub fn distinct_agents_for_workflow(&self, workflow_id: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT assigned_to
            FROM task_queue
            WHERE workflow_id = ?1
            ORDER BY assigned_to
            "#,
        )?;
        let agents = stmt
            .query_map(params![workflow_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(agents)
    }

    // ------------------------------------------------------------------
    // Agent outputs
    // ------------------------------------------------------------------

    /// Append an agent output row
    pub fn insert_output(&self, output: &AgentOutputRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO agent_outputs (
                agent_name, task_id, task_type, output, confidence_score,
                timestamp, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                output.agent_name,
                output.task_id,
                output.task_type,
                serde_json::to_string(&output.output)?,
                output.confidence,
                output.timestamp.to_rfc3339(),
                output.status.as_str(),
            ],
        )?;
        Ok(())
    }

    /// All outputs produced for a workflow's tasks, most recent first
    pub fn outputs_for_workflow(&self, workflow_id: &str) -> Result<Vec<AgentOutputRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT agent_name, task_id, task_type, output, confidence_score,
                   timestamp, status
            FROM agent_outputs
            WHERE task_id IN (SELECT task_id FROM task_queue WHERE workflow_id = ?1)
            ORDER BY timestamp DESC
            "#,
        )?;
        let outputs = stmt
            .query_map(params![workflow_id], map_output_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(outputs)
    }

    /// Latest output per agent within a workflow, for downstream task context
    pub fn latest_outputs_by_agent(&self, workflow_id: &str) -> Result<Vec<(String, Value)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT agent_name, output, MAX(timestamp)
            FROM agent_outputs
            WHERE task_id IN (SELECT task_id FROM task_queue WHERE workflow_id = ?1)
            GROUP BY agent_name
            "#,
        )?;
        let rows = stmt
            .query_map(params![workflow_id], |row| {
                let agent: String = row.get(0)?;
                let output: String = row.get(1)?;
                Ok((agent, output))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut outputs = Vec::with_capacity(rows.len());
        for (agent, raw) in rows {
            outputs.push((agent, serde_json::from_str(&raw)?));
        }
        Ok(outputs)
    }

    // ------------------------------------------------------------------
    // Decisions
    // ------------------------------------------------------------------

    /// Insert a pending decision row
    pub fn insert_decision(&self, decision: &DecisionRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO decisions (
                decision_id, workflow_id, task_id, title, description, options,
                recommendation, decision, decided_by, reasoning, timestamp, impact_level
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                decision.decision_id,
                decision.workflow_id,
                decision.task_id,
                decision.title,
                decision.description,
                serde_json::to_string(&decision.options)?,
                decision
                    .recommendation
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                decision.decision,
                decision.decided_by,
                decision.reasoning,
                decision.timestamp.to_rfc3339(),
                decision.impact_level.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Get a decision scoped to its workflow
    pub fn get_decision(
        &self,
        decision_id: &str,
        workflow_id: &str,
    ) -> Result<Option<DecisionRecord>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                &format!("{DECISION_COLUMNS} WHERE decision_id = ?1 AND workflow_id = ?2"),
                params![decision_id, workflow_id],
                map_decision_row,
            )
            .optional()?;
        Ok(result)
    }

    /// Resolve a decision. Conditional on `decision IS NULL`, so a resolved
    /// decision can never be overwritten; returns the number of rows updated.
    pub fn resolve_decision(
        &self,
        decision_id: &str,
        workflow_id: &str,
        choice: &str,
        reasoning: Option<&str>,
        decided_by: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<usize> {
        let conn = self.lock()?;
        let rows = conn.execute(
            r#"
            UPDATE decisions
            SET decision = ?3, decided_by = ?5, reasoning = ?4, timestamp = ?6
            WHERE decision_id = ?1 AND workflow_id = ?2 AND decision IS NULL
            "#,
            params![
                decision_id,
                workflow_id,
                choice,
                reasoning,
                decided_by,
                timestamp.to_rfc3339(),
            ],
        )?;
        Ok(rows)
    }

    /// Unresolved decisions for a workflow, newest first
    pub fn pending_decisions(&self, workflow_id: &str) -> Result<Vec<DecisionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{DECISION_COLUMNS} WHERE workflow_id = ?1 AND decision IS NULL ORDER BY timestamp DESC"
        ))?;
        let decisions = stmt
            .query_map(params![workflow_id], map_decision_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(decisions)
    }

    // ------------------------------------------------------------------
    // Agent memory
    // ------------------------------------------------------------------

    /// Upsert a memory entry on `(agent_name, key)`
    pub fn upsert_memory(&self, entry: &MemoryEntry) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO agent_memory (agent_name, key, value, updated_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(agent_name, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at,
                expires_at = excluded.expires_at
            "#,
            params![
                entry.agent_name,
                entry.key,
                serde_json::to_string(&entry.value)?,
                entry.updated_at.to_rfc3339(),
                entry.expires_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Most recently updated non-expired memory for an agent.
    ///
    /// Expiry is filtered at query time; there is no background sweep.
    pub fn load_memory(
        &self,
        agent_name: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT agent_name, key, value, updated_at, expires_at
            FROM agent_memory
            WHERE agent_name = ?1 AND (expires_at IS NULL OR expires_at > ?2)
            ORDER BY updated_at DESC
            LIMIT ?3
            "#,
        )?;
        let entries = stmt
            .query_map(params![agent_name, now.to_rfc3339(), limit], map_memory_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ------------------------------------------------------------------
    // Messages and audit
    // ------------------------------------------------------------------

    /// Append a message to the agent message log
    pub fn insert_message(&self, message: &AgentMessageRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO agent_messages (
                message_id, from_agent, to_agent, message_type, payload,
                workflow_id, timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                message.message_id,
                message.from_agent,
                message.to_agent,
                message.message_type.as_str(),
                serde_json::to_string(&message.payload)?,
                message.workflow_id,
                message.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Messages logged for a workflow, oldest first
    pub fn messages_for_workflow(&self, workflow_id: &str) -> Result<Vec<AgentMessageRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT message_id, from_agent, to_agent, message_type, payload,
                   workflow_id, timestamp
            FROM agent_messages
            WHERE workflow_id = ?1
            ORDER BY timestamp ASC, message_id ASC
            "#,
        )?;
        let messages = stmt
            .query_map(params![workflow_id], map_message_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    /// Append an audit trail entry
    pub fn insert_audit(&self, entry: &AuditEntry) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO audit_log (actor, action, resource_type, resource_id, details, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.actor,
                entry.action,
                entry.resource_type,
                entry.resource_id,
                serde_json::to_string(&entry.details)?,
                entry.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Audit entry count for a resource (used by tests and diagnostics)
    pub fn audit_count(&self, resource_type: &str, resource_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: usize = conn.query_row(
            "SELECT COUNT(*) FROM audit_log WHERE resource_type = ?1 AND resource_id = ?2",
            params![resource_type, resource_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

const TASK_COLUMNS: &str = r#"
    SELECT task_id, workflow_id, assigned_to, task_type, priority, input,
           status, retry_count, max_retries, created_at, started_at, completed_at
    FROM task_queue
"#;

const DECISION_COLUMNS: &str = r#"
    SELECT decision_id, workflow_id, task_id, title, description, options,
           recommendation, decision, decided_by, reasoning, timestamp, impact_level
    FROM decisions
"#;

// Helper functions for mapping between database and Rust types

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_json(idx: usize, value: &str) -> rusqlite::Result<Value> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Map a database row to WorkflowRecord
fn map_workflow_row(row: &Row) -> rusqlite::Result<WorkflowRecord> {
    let status_str: String = row.get(2)?;
    let context_str: String = row.get(4)?;
    let created_at_str: String = row.get(5)?;
    let updated_at_str: String = row.get(6)?;

    Ok(WorkflowRecord {
        workflow_id: row.get(0)?,
        feature_request: row.get(1)?,
        status: WorkflowStatus::parse(&status_str).ok_or(rusqlite::Error::InvalidQuery)?,
        current_step: row.get(3)?,
        context: parse_json(4, &context_str)?,
        created_at: parse_timestamp(5, &created_at_str)?,
        updated_at: parse_timestamp(6, &updated_at_str)?,
    })
}

/// Map a database row to TaskRecord
fn map_task_row(row: &Row) -> rusqlite::Result<TaskRecord> {
    let input_str: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(9)?;
    let started_at_str: Option<String> = row.get(10)?;
    let completed_at_str: Option<String> = row.get(11)?;

    Ok(TaskRecord {
        task_id: row.get(0)?,
        workflow_id: row.get(1)?,
        assigned_agent: row.get(2)?,
        task_type: row.get(3)?,
        priority: row.get(4)?,
        input: parse_json(5, &input_str)?,
        status: TaskStatus::parse(&status_str).ok_or(rusqlite::Error::InvalidQuery)?,
        retry_count: row.get(7)?,
        max_retries: row.get(8)?,
        created_at: parse_timestamp(9, &created_at_str)?,
        started_at: started_at_str
            .as_deref()
            .map(|s| parse_timestamp(10, s))
            .transpose()?,
        completed_at: completed_at_str
            .as_deref()
            .map(|s| parse_timestamp(11, s))
            .transpose()?,
    })
}

/// Map a database row to AgentOutputRecord
fn map_output_row(row: &Row) -> rusqlite::Result<AgentOutputRecord> {
    let output_str: String = row.get(3)?;
    let timestamp_str: String = row.get(5)?;
    let status_str: String = row.get(6)?;

    Ok(AgentOutputRecord {
        agent_name: row.get(0)?,
        task_id: row.get(1)?,
        task_type: row.get(2)?,
        output: parse_json(3, &output_str)?,
        confidence: row.get(4)?,
        timestamp: parse_timestamp(5, &timestamp_str)?,
        status: TaskStatus::parse(&status_str).ok_or(rusqlite::Error::InvalidQuery)?,
    })
}

/// Map a database row to DecisionRecord
fn map_decision_row(row: &Row) -> rusqlite::Result<DecisionRecord> {
    let options_str: String = row.get(5)?;
    let recommendation_str: Option<String> = row.get(6)?;
    let timestamp_str: String = row.get(10)?;
    let impact_str: String = row.get(11)?;

    let options: Vec<String> = serde_json::from_str(&options_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(DecisionRecord {
        decision_id: row.get(0)?,
        workflow_id: row.get(1)?,
        task_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        options,
        recommendation: recommendation_str
            .as_deref()
            .map(|s| parse_json(6, s))
            .transpose()?,
        decision: row.get(7)?,
        decided_by: row.get(8)?,
        reasoning: row.get(9)?,
        timestamp: parse_timestamp(10, &timestamp_str)?,
        impact_level: ImpactLevel::parse(&impact_str).ok_or(rusqlite::Error::InvalidQuery)?,
    })
}

/// Map a database row to MemoryEntry
fn map_memory_row(row: &Row) -> rusqlite::Result<MemoryEntry> {
    let value_str: String = row.get(2)?;
    let updated_at_str: String = row.get(3)?;
    let expires_at_str: Option<String> = row.get(4)?;

    Ok(MemoryEntry {
        agent_name: row.get(0)?,
        key: row.get(1)?,
        value: parse_json(2, &value_str)?,
        updated_at: parse_timestamp(3, &updated_at_str)?,
        expires_at: expires_at_str
            .as_deref()
            .map(|s| parse_timestamp(4, s))
            .transpose()?,
    })
}

/// Map a database row to AgentMessageRecord
fn map_message_row(row: &Row) -> rusqlite::Result<AgentMessageRecord> {
    let message_type_str: String = row.get(3)?;
    let payload_str: String = row.get(4)?;
    let timestamp_str: String = row.get(6)?;

    Ok(AgentMessageRecord {
        message_id: row.get(0)?,
        from_agent: row.get(1)?,
        to_agent: row.get(2)?,
        message_type: MessageType::parse(&message_type_str).ok_or(rusqlite::Error::InvalidQuery)?,
        payload: parse_json(4, &payload_str)?,
        workflow_id: row.get(5)?,
        timestamp: parse_timestamp(6, &timestamp_str)?,
    })
}
