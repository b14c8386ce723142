//! Built-in tool implementations

mod edit;
mod glob;
mod grep;
mod new_file;
mod read;
mod shell;

pub use edit::EditFileTool;
pub use glob::GlobTool;
pub use grep::GrepTool;
pub use new_file::NewFileTool;
pub use read::ReadFileTool;
pub use shell::{DEFAULT_TIMEOUT as DEFAULT_SHELL_TIMEOUT, ShellCommandTool};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tars_agent::{BoxedTool, ToolError};

use crate::ignore::IgnoreRules;

/// Every catalog tool, wired to the project root
pub fn all_tools(root: &Path, ignore: Arc<IgnoreRules>, shell_timeout: Duration) -> Vec<BoxedTool> {
    vec![
        Arc::new(ReadFileTool::new()),
        Arc::new(EditFileTool::new()),
        Arc::new(NewFileTool::new()),
        Arc::new(GrepTool::new(root, Arc::clone(&ignore))),
        Arc::new(GlobTool::new(root, ignore)),
        Arc::new(ShellCommandTool::new(root).with_timeout(shell_timeout)),
    ]
}

/// Reject relative paths
pub(crate) fn absolute(path: &str) -> Result<PathBuf, ToolError> {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(ToolError::RelativePath(path.display().to_string()))
    }
}
