//! Dispatch consumer
//!
//! Single loop draining the dispatch queue and routing each message to the
//! runtime for its assigned role. Task outcomes are already persisted by the
//! runtime; the loop only logs them.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::agent::roles::AgentRole;
use crate::agent::AgentRuntime;
use crate::database::Database;
use crate::error::Result;
use crate::queue::DispatchReceiver;
use agent_pipeline_sdk::{TaskDispatch, TaskOutcome, TaskRequest};

pub struct Worker {
    db: Database,
    runtimes: HashMap<AgentRole, Arc<AgentRuntime>>,
}

impl Worker {
    pub fn new(db: Database, runtimes: HashMap<AgentRole, Arc<AgentRuntime>>) -> Self {
        Self { db, runtimes }
    }

    /// Drain the queue until every sender is gone.
    pub async fn run(self, mut rx: DispatchReceiver) {
        while let Some(dispatch) = rx.recv().await {
            if let Err(err) = self.handle_dispatch(&dispatch).await {
                error!(
                    task_id = %dispatch.task_id,
                    error = %err,
                    "dispatch handling failed"
                );
            }
        }
        info!("dispatch queue closed, worker exiting");
    }

    async fn handle_dispatch(&self, dispatch: &TaskDispatch) -> Result<()> {
        let Some(role) = AgentRole::from_name(&dispatch.agent) else {
            warn!(
                agent = %dispatch.agent,
                task_id = %dispatch.task_id,
                "dispatch for unknown agent, marking task failed"
            );
            self.db.fail_task(&dispatch.task_id)?;
            return Ok(());
        };

        let Some(runtime) = self.runtimes.get(&role).cloned() else {
            warn!(
                agent = %dispatch.agent,
                task_id = %dispatch.task_id,
                "no runtime registered for role, marking task failed"
            );
            self.db.fail_task(&dispatch.task_id)?;
            return Ok(());
        };

        let request = TaskRequest::from_dispatch(dispatch);
        let response = runtime.handle_task(&request).await?;
        match response.status {
            TaskOutcome::Complete | TaskOutcome::NeedsInput => info!(
                agent = %dispatch.agent,
                task_id = %dispatch.task_id,
                status = ?response.status,
                "task finished"
            ),
            TaskOutcome::Duplicate => {}
            TaskOutcome::Failed => warn!(
                agent = %dispatch.agent,
                task_id = %dispatch.task_id,
                error = response.error.as_deref().unwrap_or("unknown"),
                "task failed"
            ),
        }

        Ok(())
    }
}
