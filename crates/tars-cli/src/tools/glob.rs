//! glob: find files by pattern under the project root

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tars_agent::{Tool, ToolCall, ToolError, ToolKind, ToolResult};

use crate::ignore::IgnoreRules;

const MAX_RESULTS: usize = 500;

/// Tool for finding files by glob pattern
pub struct GlobTool {
    root: PathBuf,
    ignore: Arc<IgnoreRules>,
}

impl GlobTool {
    pub fn new(root: impl Into<PathBuf>, ignore: Arc<IgnoreRules>) -> Self {
        Self {
            root: root.into(),
            ignore,
        }
    }
}

#[async_trait]
impl Tool for GlobTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Glob
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let ToolCall::Glob(args) = call else {
            return Err(ToolError::mismatch(self.kind(), call));
        };

        // Relative patterns are rooted at the project root
        let full_pattern = if args.pattern.starts_with('/') {
            args.pattern.clone()
        } else {
            self.root.join(&args.pattern).to_string_lossy().to_string()
        };

        let entries = glob::glob(&full_pattern)
            .map_err(|e| ToolError::failed(format!("Invalid glob pattern: {}", e)))?;

        let mut results: Vec<(PathBuf, SystemTime)> = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => {
                    if let Ok(relative) = path.strip_prefix(&self.root) {
                        if self.ignore.is_ignored(relative) {
                            continue;
                        }
                    }
                    let modified = path
                        .metadata()
                        .and_then(|m| m.modified())
                        .unwrap_or(SystemTime::UNIX_EPOCH);
                    results.push((path, modified));
                }
                Err(e) => {
                    // Skip unreadable entries but continue
                    tracing::debug!("Glob entry error: {}", e);
                }
            }
        }

        if results.is_empty() {
            return Ok(ToolResult::new(
                format!("No files found matching pattern: {}", args.pattern),
                "No files found",
            ));
        }

        // Newest first
        results.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let total = results.len();
        let mut output = results
            .iter()
            .take(MAX_RESULTS)
            .map(|(path, _)| path.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        if total > MAX_RESULTS {
            output.push_str(&format!("\n\n(showing first {} of {} results)", MAX_RESULTS, total));
        }

        Ok(ToolResult::new(output, format!("Found {} file(s)", total)))
    }
}
