//! Operator-facing task checklist maintained by the model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of one checklist item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
}

/// The whole checklist. Each update replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChecklist {
    pub goal: String,
    pub items: Vec<TaskItem>,
}

impl TaskChecklist {
    /// Number of finished items (done or failed)
    pub fn finished(&self) -> usize {
        self.items.iter().filter(|i| i.status.is_finished()).count()
    }

    pub fn is_complete(&self) -> bool {
        !self.items.is_empty() && self.finished() == self.items.len()
    }

    /// The item currently being worked on, if any
    pub fn current(&self) -> Option<&TaskItem> {
        self.items
            .iter()
            .find(|i| i.status == TaskStatus::InProgress)
    }
}
