//! In-process dispatch queue
//!
//! At-least-once delivery of `TaskDispatch` messages from the orchestrator
//! (and the retry path) to the agent worker loops. Redelivery is just another
//! send; the claim update in the store makes duplicates harmless.

use tokio::sync::mpsc;

use crate::error::{PipelineError, Result};
use agent_pipeline_sdk::TaskDispatch;

/// Sending half of the dispatch queue. Cheap to clone; the orchestrator and
/// every agent runtime (for retries) hold one.
#[derive(Clone)]
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<TaskDispatch>,
}

/// Receiving half, consumed by the worker loop.
pub struct DispatchReceiver {
    rx: mpsc::UnboundedReceiver<TaskDispatch>,
}

/// Create a connected queue pair.
pub fn dispatch_queue() -> (DispatchQueue, DispatchReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DispatchQueue { tx }, DispatchReceiver { rx })
}

impl DispatchQueue {
    /// Enqueue a dispatch. Fails only when the worker side has shut down.
    pub fn enqueue(&self, dispatch: TaskDispatch) -> Result<()> {
        self.tx
            .send(dispatch)
            .map_err(|_| PipelineError::Internal("dispatch queue closed".to_string()))
    }
}

impl DispatchReceiver {
    /// Receive the next dispatch; `None` when all senders are gone.
    pub async fn recv(&mut self) -> Option<TaskDispatch> {
        self.rx.recv().await
    }

    /// Non-blocking receive, used by tests to drain the queue.
    pub fn try_recv(&mut self) -> Option<TaskDispatch> {
        self.rx.try_recv().ok()
    }
}
