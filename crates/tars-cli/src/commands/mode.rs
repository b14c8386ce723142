//! :mode command - show and switch the operating mode

use super::CommandResult;
use tars_agent::Mode;

pub struct ModeCommand;

impl ModeCommand {
    pub fn execute(args: &str, current: Mode) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message(format!(
                "Current mode: {}",
                current.as_str().to_uppercase()
            ));
        }
        match args.parse::<Mode>() {
            Ok(mode) => CommandResult::ChangeMode(mode),
            Err(e) => CommandResult::Message(format!("✗ {}", e)),
        }
    }
}

/// Confirmation printed after a switch
pub fn switched_message(mode: Mode) -> String {
    format!("✓ Switched to {} mode", mode.as_str().to_uppercase())
}
