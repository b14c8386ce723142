//! Colon commands for interactive mode

mod mode;
mod status;

pub use mode::{ModeCommand, switched_message};
pub use status::StatusCommand;

use tars_agent::{Agent, Mode};

use crate::ui::render_task_list;

/// Result of executing a colon command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Clear the conversation
    Clear,
    /// Switch mode
    ChangeMode(Mode),
    /// Rebuild the file tree snapshot
    Refresh,
    /// Show a message to the user (not sent to agent)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command, carrying the raw input
    Unknown(String),
}

/// Parse and execute a colon command. `None` for ordinary queries.
pub fn execute_command(input: &str, agent: &Agent) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix(':')?;

    let mut parts = rest.split_whitespace();
    let command = parts.next().unwrap_or("").to_lowercase();
    let args = parts.next().unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "mode" | "m" => ModeCommand::execute(args, agent.mode()),

        "status" | "s" => StatusCommand::execute(agent),

        "tasks" | "t" => CommandResult::Message(match agent.task_list() {
            Some(list) => render_task_list(list),
            None => "No task list yet.".to_string(),
        }),

        "refresh" | "r" => CommandResult::Refresh,

        "clear" | "c" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(input.to_string()),
    })
}

/// Message printed for [`CommandResult::Unknown`]
pub fn unknown_message(input: &str) -> String {
    format!("Unknown command: {}. Type :help to see commands.", input)
}

fn help_message() -> String {
    r#"Available commands:
  :help, :h, :?          Show this help message
  :mode, :m [name]       Show the current mode or switch (agent, planning, ask)
  :status, :s            Show mode, message count and token usage
  :tasks, :t             Show the current task list
  :refresh, :r           Rebuild the file tree shown to the model
  :clear, :c             Start a fresh conversation window
  :quit, :exit, :q       Exit tars

Modes:
  agent      Read, edit, create files and run commands
  planning   Read-only; produces a step-by-step plan
  ask        Read-only; answers questions about the code

Anything typed while the agent is working interrupts it after the
current tool finishes and is sent along with the next prompt."#
        .to_string()
}
