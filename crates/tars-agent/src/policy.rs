//! Operating modes and the mutation policy they enforce.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::invocation::ToolKind;

/// Tools that change the workspace. Everything else is always permitted.
pub const MUTATING_TOOLS: &[ToolKind] = &[ToolKind::EditFile, ToolKind::NewFile, ToolKind::ShellCommand];

/// Session-wide policy gate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Execute tasks, including edits and shell commands
    #[default]
    Agent,
    /// Plan without touching files
    Planning,
    /// Read-only question answering
    Ask,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Agent => "agent",
            Mode::Planning => "planning",
            Mode::Ask => "ask",
        }
    }

    /// Whether `kind` may run in this mode
    pub fn permits(&self, kind: ToolKind) -> bool {
        match self {
            Mode::Agent => true,
            Mode::Planning | Mode::Ask => !is_mutating(kind),
        }
    }
}

/// Whether a tool is in the mutating set
pub fn is_mutating(kind: ToolKind) -> bool {
    MUTATING_TOOLS.contains(&kind)
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized mode name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown mode: \"{0}\". Use: agent, planning, ask")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "agent" => Ok(Mode::Agent),
            "planning" | "plan" => Ok(Mode::Planning),
            "ask" => Ok(Mode::Ask),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Message folded back to the model when a mutating tool is blocked
pub fn rejection_message(mode: Mode, kind: ToolKind) -> String {
    format!(
        "Blocked: {} is not allowed in {} mode. {} mode is read-only; \
         describe the change instead of making it, or ask the operator to switch to agent mode.",
        kind.name(),
        mode.as_str().to_uppercase(),
        mode.as_str().to_uppercase(),
    )
}
