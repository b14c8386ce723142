//! tars-agent: orchestration core for the tars coding agent
//!
//! Assembles a token-budgeted prompt each turn, parses the model's reply
//! into validated tool invocations, applies the session's mode policy and
//! dispatches the survivors one at a time, folding every result back into
//! the conversation.

pub mod agent;
pub mod context;
pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod invocation;
pub mod policy;
pub mod prompt;
pub mod protocol;
pub mod tasks;
pub mod tool;

pub use agent::{Agent, AgentConfig, AgentStatus, INTERRUPTION_NOTICE, TurnOutcome};
pub use context::{ContextBuilder, DEFAULT_MAX_TOKENS, ProjectState};
pub use conversation::{ConversationEntry, ConversationStats, Role};
pub use error::Error;
pub use events::AgentEvent;
pub use handle::AgentHandle;
pub use invocation::{
    CallValidator, EditFileArgs, GlobArgs, GrepArgs, NewFileArgs, ReadFileArgs, ShellCommandArgs,
    ToolCall, ToolInvocation, ToolKind, ValidationError,
};
pub use policy::Mode;
pub use protocol::{ModelReply, ParseError, parse_reply};
pub use tasks::{TaskChecklist, TaskItem, TaskStatus};
pub use tool::{BoxedTool, Tool, ToolError, ToolResult};
