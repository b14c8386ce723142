//! shell_command: run `bash -c` with a timeout

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tars_agent::{Tool, ToolCall, ToolError, ToolKind, ToolResult};
use tokio::process::Command;

use super::absolute;
use crate::utils::truncate_chars;

/// Default time a command may run before it is killed
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum characters kept per stream
const MAX_OUTPUT_CHARS: usize = 100_000;

/// Tool for executing shell commands
pub struct ShellCommandTool {
    root: PathBuf,
    timeout: Duration,
}

impl ShellCommandTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Tool for ShellCommandTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ShellCommand
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let ToolCall::ShellCommand(args) = call else {
            return Err(ToolError::mismatch(self.kind(), call));
        };

        let directory = match &args.directory {
            Some(dir) => absolute(dir)?,
            None => self.root.clone(),
        };
        if !directory.is_dir() {
            return Err(ToolError::failed(format!(
                "Directory does not exist: {}",
                directory.display()
            )));
        }

        tracing::debug!(command = %args.command, dir = %directory.display(), "Running shell command");

        let child = Command::new("bash")
            .arg("-c")
            .arg(&args.command)
            .current_dir(&directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::failed(format!("Failed to spawn command: {}", e)))?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            _ = tokio::time::sleep(self.timeout) => {
                return Err(ToolError::failed(format!(
                    "Command timed out after {} seconds: {}",
                    self.timeout.as_secs(),
                    args.command
                )));
            }
        };

        let stdout = truncate_chars(String::from_utf8_lossy(&output.stdout).trim_end(), MAX_OUTPUT_CHARS);
        let stderr = truncate_chars(String::from_utf8_lossy(&output.stderr).trim_end(), MAX_OUTPUT_CHARS);
        let exit_code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "(terminated by signal)".to_string());

        let llm_result = format!(
            "Command: {}\nDirectory: {}\nStdout: {}\nStderr: {}\nExit Code: {}",
            args.command,
            directory.display(),
            if stdout.is_empty() { "(empty)" } else { stdout.as_str() },
            if stderr.is_empty() { "(empty)" } else { stderr.as_str() },
            exit_code
        );

        let mut display = match &args.description {
            Some(d) => format!("{}\n$ {}", d, args.command),
            None => format!("$ {}", args.command),
        };
        for text in [&stdout, &stderr] {
            if !text.is_empty() {
                display.push('\n');
                display.push_str(text);
            }
        }
        if !output.status.success() {
            display.push_str(&format!("\n(exit code {})", exit_code));
        }

        Ok(ToolResult::new(llm_result, display))
    }
}
