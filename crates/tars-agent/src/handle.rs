//! A cloneable handle for reaching the agent while a query is running.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::policy::Mode;

/// Cloneable handle shared with the input-reading side of the session.
///
/// Messages sent here are buffered and drained by the dispatcher between
/// invocations; they never preempt a tool that is already running.
#[derive(Clone)]
pub struct AgentHandle {
    queue_tx: mpsc::UnboundedSender<String>,
    mode: Arc<RwLock<Mode>>,
}

impl AgentHandle {
    pub(crate) fn new(queue_tx: mpsc::UnboundedSender<String>, mode: Arc<RwLock<Mode>>) -> Self {
        Self { queue_tx, mode }
    }

    /// Queue an operator message that interrupts the current batch.
    ///
    /// Blank messages are ignored.
    pub fn enqueue_message(&self, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        if self.queue_tx.send(text).is_err() {
            tracing::warn!("Agent is gone, dropping queued message");
        }
    }

    /// Switch mode; takes effect at the next invocation
    pub fn set_mode(&self, mode: Mode) {
        *self.mode.write() = mode;
    }

    pub fn mode(&self) -> Mode {
        *self.mode.read()
    }
}
