//! Context builder: owns the history and project snapshot and assembles the
//! single prompt string sent to the model each turn.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::conversation::{CHARS_PER_TOKEN, ConversationEntry, ConversationStats};
use crate::invocation::catalog;
use crate::policy::Mode;
use crate::prompt;

/// Default window budget in token-equivalents
pub const DEFAULT_MAX_TOKENS: u32 = 20_000;

const CONVERSATION_HEADER: &str = "--- Recent Conversation ---";
const SUMMARY_LABEL: &str = "Summary of earlier conversation:";

/// Workspace snapshot shown to the model
#[derive(Debug, Clone)]
pub struct ProjectState {
    root_dir: PathBuf,
    /// Current focus directory
    pub cwd: PathBuf,
    /// Rendered tree, rebuilt only on request
    pub file_tree: String,
}

impl ProjectState {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        Self {
            cwd: root_dir.clone(),
            root_dir,
            file_tree: String::new(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}

/// Token-budgeted prompt assembly
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    history: Vec<ConversationEntry>,
    /// First history index the window may use; raised by `clear_history`
    window_start: usize,
    project: ProjectState,
    summary: Option<String>,
    max_tokens: u32,
}

impl ContextBuilder {
    pub fn new(root_dir: impl Into<PathBuf>, max_tokens: u32) -> Self {
        Self {
            history: Vec::new(),
            window_start: 0,
            project: ProjectState::new(root_dir),
            summary: None,
            max_tokens,
        }
    }

    pub fn append_operator_message(&mut self, text: impl Into<String>) {
        self.history.push(ConversationEntry::operator(text));
    }

    /// Fold a tool result (or a rejection) into history.
    ///
    /// Results longer than half the window budget are cut so the entry
    /// cannot push the rest of the window out on its own.
    pub fn append_tool_result<I: Serialize + ?Sized>(&mut self, invocation: &I, result: &str) {
        let serialized = serde_json::to_string(invocation).unwrap_or_default();
        let result = cap_chars(result, self.fold_limit());
        self.history.push(ConversationEntry::agent(format!(
            "Output of {}:\n{}",
            serialized, result
        )));
    }

    /// Character budget for one folded result
    pub fn fold_limit(&self) -> usize {
        (self.max_tokens as usize).saturating_mul(CHARS_PER_TOKEN) / 2
    }

    /// Assemble the full prompt for the current state
    pub fn build_prompt(&self, mode: Mode) -> String {
        [
            prompt::system_instructions(mode),
            self.project_section(),
            self.tool_section(),
            self.conversation_section(),
        ]
        .join("\n\n")
    }

    /// The contiguous newest suffix of history that fits the budget.
    ///
    /// Walks newest-first and stops at the first entry that would overflow,
    /// so an older entry is never included when a newer one was dropped.
    /// Entries before the last `clear_history` are never considered.
    pub fn window(&self) -> &[ConversationEntry] {
        let mut used: u64 = 0;
        let mut start = self.history.len();
        for (idx, entry) in self.history.iter().enumerate().skip(self.window_start).rev() {
            let next = used + u64::from(entry.token_cost());
            if next > u64::from(self.max_tokens) {
                break;
            }
            used = next;
            start = idx;
        }
        &self.history[start..]
    }

    fn project_section(&self) -> String {
        format!(
            "CWD: {}\nFile Tree:\n{}",
            self.project.cwd.display(),
            self.project.file_tree
        )
    }

    fn tool_section(&self) -> String {
        let tools = serde_json::to_string(&catalog()).unwrap_or_default();
        format!(
            "These are your tools and what they expect:\n{}\n\nHere are some examples:\n{}\n\nThe expected response format is:\n{}",
            tools,
            prompt::EXAMPLES,
            prompt::FORMAT_CONTRACT
        )
    }

    fn conversation_section(&self) -> String {
        let mut lines = vec![CONVERSATION_HEADER.to_string()];
        if let Some(summary) = &self.summary {
            lines.push(format!("{}\n{}", SUMMARY_LABEL, summary));
        }
        lines.extend(self.window().iter().map(ConversationEntry::render));
        lines.join("\n")
    }

    /// Totals over the whole history, not just the window
    pub fn stats(&self) -> ConversationStats {
        ConversationStats {
            message_count: self.history.len(),
            total_tokens: self
                .history
                .iter()
                .map(|e| u64::from(e.token_cost()))
                .sum(),
        }
    }

    /// Start a fresh window: everything appended so far stays in history
    /// and in `stats` but is excluded from the prompt. The summary is
    /// dropped; the project snapshot is kept.
    pub fn clear_history(&mut self) {
        self.window_start = self.history.len();
        self.summary = None;
    }

    pub fn history(&self) -> &[ConversationEntry] {
        &self.history
    }

    pub fn project(&self) -> &ProjectState {
        &self.project
    }

    pub fn set_cwd(&mut self, cwd: impl Into<PathBuf>) {
        self.project.cwd = cwd.into();
    }

    pub fn set_file_tree(&mut self, snapshot: impl Into<String>) {
        self.project.file_tree = snapshot.into();
    }

    /// Replace the rolling summary. Nothing in this crate produces one.
    pub fn set_summary(&mut self, summary: Option<String>) {
        self.summary = summary;
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Keep at most `limit` characters, noting how much was cut
fn cap_chars(text: &str, limit: usize) -> std::borrow::Cow<'_, str> {
    let total = text.chars().count();
    if total <= limit {
        return std::borrow::Cow::Borrowed(text);
    }
    let kept: String = text.chars().take(limit).collect();
    std::borrow::Cow::Owned(format!(
        "{}\n... (output truncated: {} of {} characters shown)",
        kept, limit, total
    ))
}
