//! Conversation history: append-only entries with a fixed token cost.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters per token-equivalent used for cost estimation
pub const CHARS_PER_TOKEN: usize = 4;

/// Who produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The human driving the session
    Operator,
    /// The orchestrator, folding tool output back in
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Operator => write!(f, "operator"),
            Role::Agent => write!(f, "agent"),
        }
    }
}

/// One exchange unit in the conversation.
///
/// Immutable once created; `token_cost` is computed here and never again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    role: Role,
    content: String,
    token_cost: u32,
}

impl ConversationEntry {
    /// Create an entry, estimating its token cost
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let content = content.into();
        let token_cost = estimate_tokens(&content);
        Self {
            role,
            content,
            token_cost,
        }
    }

    /// Create an operator entry
    pub fn operator(content: impl Into<String>) -> Self {
        Self::new(Role::Operator, content)
    }

    /// Create an agent entry
    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn token_cost(&self) -> u32 {
        self.token_cost
    }

    /// Render as a `<role>: <content>` prompt line
    pub fn render(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}

/// Estimate token-equivalents for a piece of text (chars / 4, rounded up)
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    u32::try_from(chars.div_ceil(CHARS_PER_TOKEN)).unwrap_or(u32::MAX)
}

/// Aggregate numbers over the whole history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStats {
    /// Number of entries ever appended
    pub message_count: usize,
    /// Summed token cost of every entry
    pub total_tokens: u64,
}
