//! new_file: create or overwrite a file

use async_trait::async_trait;
use tars_agent::{Tool, ToolCall, ToolError, ToolKind, ToolResult};
use tokio::fs;

use super::absolute;

/// Tool for writing whole files
pub struct NewFileTool;

impl NewFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NewFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for NewFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::NewFile
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let ToolCall::NewFile(args) = call else {
            return Err(ToolError::mismatch(self.kind(), call));
        };
        let path = absolute(&args.file_path)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let existed = fs::try_exists(&path).await.unwrap_or(false);
        fs::write(&path, &args.content).await?;

        let lines = args.content.lines().count();
        let verb = if existed { "Overwrote" } else { "Created" };
        Ok(ToolResult::new(
            format!(
                "{} {} ({} bytes).",
                verb,
                path.display(),
                args.content.len()
            ),
            format!("{} {} ({} lines)", verb, path.display(), lines),
        ))
    }
}
