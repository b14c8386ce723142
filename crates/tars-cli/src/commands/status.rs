//! :status command - show session info

use super::CommandResult;
use tars_agent::{Agent, Role};

use crate::utils::format_tokens;

pub struct StatusCommand;

impl StatusCommand {
    pub fn execute(agent: &Agent) -> CommandResult {
        let status = agent.status();
        let context = agent.context();
        let history = context.history();
        let operator = history.iter().filter(|e| e.role() == Role::Operator).count();
        let window = context.window();
        let window_tokens: u64 = window.iter().map(|e| u64::from(e.token_cost())).sum();

        let mut output = String::from("Session Info\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');

        output.push_str(&format!("Mode:       {}\n", status.mode.as_str().to_uppercase()));
        output.push_str(&format!(
            "Root:       {}\n",
            context.project().root_dir().display()
        ));
        output.push('\n');

        output.push_str(&format!("Messages:   {} total\n", status.message_count));
        output.push_str(&format!(
            "            {} operator, {} tool results\n",
            operator,
            status.message_count - operator
        ));
        output.push('\n');

        output.push_str(&format!("History:    ~{} tokens\n", format_tokens(status.total_tokens)));
        output.push_str(&format!(
            "Window:     {} messages, ~{} of {} tokens",
            window.len(),
            format_tokens(window_tokens),
            format_tokens(u64::from(context.max_tokens()))
        ));
        if let Some(list) = agent.task_list() {
            output.push_str(&format!(
                "\nTasks:      {}/{} finished",
                list.finished(),
                list.items.len()
            ));
        }

        CommandResult::Message(output)
    }
}
