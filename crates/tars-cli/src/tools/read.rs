//! read_file: file contents, optionally a line range

use async_trait::async_trait;
use tars_agent::{Tool, ToolCall, ToolError, ToolKind, ToolResult};
use tokio::fs;

use super::absolute;
use crate::utils::truncate_chars;

const MAX_LINES: usize = 2000;
const MAX_LINE_LENGTH: usize = 2000;

/// Tool for reading file contents
pub struct ReadFileTool;

impl ReadFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ReadFile
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let ToolCall::ReadFile(args) = call else {
            return Err(ToolError::mismatch(self.kind(), call));
        };
        let path = absolute(&args.absolute_path)?;

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::failed(format!("Failed to read {}: {}", path.display(), e)))?;

        let lines: Vec<&str> = content.lines().collect();
        let total_lines = lines.len();

        // 1-based inclusive range; validation guarantees both or neither
        let (start, end) = match (args.start_line, args.end_line) {
            (Some(s), Some(e)) => (s as usize, (e as usize).min(total_lines)),
            _ => (1, total_lines.min(MAX_LINES)),
        };

        if total_lines > 0 && start > total_lines {
            return Err(ToolError::failed(format!(
                "startLine {} is beyond end of file ({} lines total)",
                start, total_lines
            )));
        }

        let mut had_truncated = false;
        let selected: Vec<String> = lines
            .iter()
            .take(end)
            .skip(start.saturating_sub(1))
            .map(|line| {
                let truncated = truncate_chars(line, MAX_LINE_LENGTH);
                if truncated.len() != line.len() {
                    had_truncated = true;
                }
                truncated
            })
            .collect();

        let mut output = selected.join("\n");

        let mut notices = Vec::new();
        if had_truncated {
            notices.push(format!(
                "Some lines were truncated to {} characters",
                MAX_LINE_LENGTH
            ));
        }
        if end < total_lines {
            notices.push(format!(
                "{} more lines not shown. Use startLine={} and endLine to continue reading",
                total_lines - end,
                end + 1
            ));
        }
        if !notices.is_empty() {
            output.push_str(&format!("\n\n... ({})", notices.join(". ")));
        }

        let display = if selected.is_empty() {
            format!("{} is empty", path.display())
        } else {
            format!("Read lines {}-{} of {}", start, end, path.display())
        };

        Ok(ToolResult::new(output, display))
    }
}
