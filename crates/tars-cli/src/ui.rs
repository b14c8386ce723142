//! Plain-terminal rendering: status bar, task checklist and agent events.

use std::io::{self, Write};
use tars_agent::{AgentEvent, AgentStatus, TaskChecklist, TaskStatus};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::utils::{format_tokens, truncate_chars};

/// `[MODE] msgs:N  ~X.Yk tokens  (:help for commands)`
pub fn status_bar(status: &AgentStatus) -> String {
    format!(
        "[{}] msgs:{}  ~{} tokens  (:help for commands)",
        status.mode.as_str().to_uppercase(),
        status.message_count,
        format_tokens(status.total_tokens)
    )
}

fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "○",
        TaskStatus::InProgress => "▶",
        TaskStatus::Done => "✓",
        TaskStatus::Failed => "✗",
    }
}

/// Goal line followed by one line per item
pub fn render_task_list(list: &TaskChecklist) -> String {
    let mut out = format!(" {} ({}/{})", list.goal, list.finished(), list.items.len());
    for item in &list.items {
        out.push_str(&format!("\n  {} {}", status_icon(item.status), item.title));
    }
    out
}

/// One-line rendering of an event, `None` for events that print nothing
pub fn format_event(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::InvocationStart {
            tool, description, ..
        } => Some(match description {
            Some(d) => format!("[{}] {}", tool, d),
            None => format!("[{}]", tool),
        }),
        AgentEvent::InvocationEnd {
            display, is_error, ..
        } => {
            let first_line = display.lines().next().unwrap_or("");
            let preview = truncate_chars(first_line, 80);
            if *is_error {
                Some(format!("  ✗ {}", preview))
            } else if display.lines().count() > 1 {
                Some(format!("  ✓ {} (+{} lines)", preview, display.lines().count() - 1))
            } else {
                Some(format!("  ✓ {}", preview))
            }
        }
        AgentEvent::PolicyBlocked { tool, mode } => Some(format!(
            "  ✗ {} blocked in {} mode",
            tool,
            mode.as_str().to_uppercase()
        )),
        AgentEvent::ValidationFailed { message, .. } => Some(format!("  ✗ {}", message)),
        AgentEvent::TaskListUpdated { task_list } => Some(render_task_list(task_list)),
        AgentEvent::Interrupted { skipped, .. } => Some(format!(
            "[Interrupted: {} pending invocation(s) skipped]",
            skipped
        )),
        AgentEvent::ParseFailed { message } => Some(format!("[Could not read model reply: {}]", message)),
        AgentEvent::FinalAnswer { text } => Some(format!("\n{}", text)),
        AgentEvent::Error { message } => Some(format!("Error: {}", message)),
        _ => None,
    }
}

/// Print events for one query; the task ends after `AgentEnd`.
///
/// With `raw` set, model output is streamed as it is generated.
pub fn spawn_event_printer(
    mut receiver: broadcast::Receiver<AgentEvent>,
    raw: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("Event printer lagged by {} events", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match &event {
                AgentEvent::ResponseDelta { delta } if raw => {
                    print!("{}", delta);
                    io::stdout().flush().ok();
                }
                AgentEvent::ResponseEnd { .. } if raw => println!(),
                AgentEvent::TurnStart { turn_number } => {
                    tracing::debug!(turn_number, "Model turn started");
                }
                AgentEvent::AgentEnd { .. } => break,
                AgentEvent::Error { .. } => {
                    if let Some(line) = format_event(&event) {
                        eprintln!("{}", line);
                    }
                }
                _ => {
                    if let Some(line) = format_event(&event) {
                        println!("{}", line);
                    }
                }
            }
        }
    })
}
