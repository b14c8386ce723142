//! Tool trait and execution results

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::invocation::{ToolCall, ToolKind};

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Folded into conversation history verbatim
    #[serde(rename = "LLMresult")]
    pub llm_result: String,
    /// Operator-facing only, never sent to the model
    #[serde(rename = "DisplayResult")]
    pub display_result: String,
}

impl ToolResult {
    /// Separate model and display text
    pub fn new(llm_result: impl Into<String>, display_result: impl Into<String>) -> Self {
        Self {
            llm_result: llm_result.into(),
            display_result: display_result.into(),
        }
    }
}

/// Implementation-level tool failure
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Path must be absolute: {0}")]
    RelativePath(String),

    /// The call was routed to a tool that does not handle it
    #[error("{tool} cannot execute a {call} call")]
    Mismatch { tool: ToolKind, call: ToolKind },

    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn failed(message: impl Into<String>) -> Self {
        ToolError::Failed(message.into())
    }

    pub fn mismatch(tool: ToolKind, call: &ToolCall) -> Self {
        ToolError::Mismatch {
            tool,
            call: call.kind(),
        }
    }
}

/// Trait for executable tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which catalog entry this tool implements
    fn kind(&self) -> ToolKind;

    /// Execute a validated call
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError>;
}

/// Type alias for boxed tools
pub type BoxedTool = Arc<dyn Tool>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::GlobArgs;

    #[test]
    fn test_result_wire_names() {
        let json = serde_json::to_value(ToolResult::new("for model", "for human")).unwrap();
        assert_eq!(json["LLMresult"], "for model");
        assert_eq!(json["DisplayResult"], "for human");
    }

    #[test]
    fn test_mismatch_names_both_tools() {
        let call = ToolCall::Glob(GlobArgs {
            pattern: "*".into(),
        });
        let err = ToolError::mismatch(ToolKind::ReadFile, &call);
        assert_eq!(err.to_string(), "read_file cannot execute a glob call");
    }
}
