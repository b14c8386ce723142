//! Agent event types

use serde::{Deserialize, Serialize};

use crate::policy::Mode;
use crate::tasks::TaskChecklist;

/// Events emitted while a query is processed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Query accepted
    AgentStart,

    /// About to call the model
    TurnStart { turn_number: u32 },

    /// Streamed model text, for live display only
    ResponseDelta { delta: String },

    /// Full model reply received
    ResponseEnd { text: String },

    /// Checklist replaced
    TaskListUpdated { task_list: TaskChecklist },

    /// Tool about to run
    InvocationStart {
        tool: String,
        description: Option<String>,
        options: serde_json::Value,
    },

    /// Tool finished (or failed)
    InvocationEnd {
        tool: String,
        display: String,
        is_error: bool,
    },

    /// Mutating tool refused by mode policy
    PolicyBlocked { tool: String, mode: Mode },

    /// Invocation arguments rejected
    ValidationFailed { tool: String, message: String },

    /// Queued operator messages cut the batch short
    Interrupted { messages: usize, skipped: usize },

    /// Model reply could not be decoded
    ParseFailed { message: String },

    /// Model produced its final answer
    FinalAnswer { text: String },

    /// Query finished
    AgentEnd { total_turns: u32 },

    /// Query aborted by an error
    Error { message: String },
}
