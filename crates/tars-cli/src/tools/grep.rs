//! grep: regex search over file contents

use async_trait::async_trait;
use glob::Pattern;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tars_agent::{Tool, ToolCall, ToolError, ToolKind, ToolResult};

use super::absolute;
use crate::ignore::IgnoreRules;
use crate::utils::truncate_chars;

const MAX_RESULTS: usize = 1000;
const MAX_LINE_LENGTH: usize = 500;

/// Tool for searching file contents
pub struct GrepTool {
    root: PathBuf,
    ignore: Arc<IgnoreRules>,
}

impl GrepTool {
    pub fn new(root: impl Into<PathBuf>, ignore: Arc<IgnoreRules>) -> Self {
        Self {
            root: root.into(),
            ignore,
        }
    }
}

struct Match {
    path: PathBuf,
    line_number: usize,
    line: String,
}

#[async_trait]
impl Tool for GrepTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Grep
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let ToolCall::Grep(args) = call else {
            return Err(ToolError::mismatch(self.kind(), call));
        };

        let regex = Regex::new(&args.pattern)
            .map_err(|e| ToolError::failed(format!("Invalid regex pattern: {}", e)))?;

        let include = args
            .include
            .as_deref()
            .map(Pattern::new)
            .transpose()
            .map_err(|e| ToolError::failed(format!("Invalid include pattern: {}", e)))?;

        let search_path = match &args.path {
            Some(p) => absolute(p)?,
            None => self.root.clone(),
        };

        let metadata = fs::metadata(&search_path).map_err(|e| {
            ToolError::failed(format!("Error accessing {}: {}", search_path.display(), e))
        })?;

        let mut files = Vec::new();
        if metadata.is_file() {
            files.push(search_path.clone());
        } else {
            self.collect_files(&search_path, &search_path, include.as_ref(), &mut files);
        }

        let mut matches = Vec::new();
        let mut total = 0usize;
        for file in &files {
            // Unreadable or non-UTF-8 files are skipped
            let Ok(content) = fs::read_to_string(file) else {
                continue;
            };
            for (idx, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    total += 1;
                    if matches.len() < MAX_RESULTS {
                        matches.push(Match {
                            path: file.clone(),
                            line_number: idx + 1,
                            line: truncate_chars(line.trim(), MAX_LINE_LENGTH),
                        });
                    }
                }
            }
        }

        if matches.is_empty() {
            return Ok(ToolResult::new(
                format!("No matches found for pattern: {}", args.pattern),
                "No matches found",
            ));
        }

        let output = matches
            .iter()
            .map(|m| format!("{}:{}: {}", m.path.display(), m.line_number, m.line))
            .collect::<Vec<_>>()
            .join("\n");

        let display = if total > MAX_RESULTS {
            format!("Found {} matches (showing first {})", total, MAX_RESULTS)
        } else {
            format!("Found {} match(es)", total)
        };

        Ok(ToolResult::new(output, display))
    }
}

impl GrepTool {
    /// Depth-first, name-sorted walk honoring the ignore rules
    fn collect_files(
        &self,
        base: &Path,
        dir: &Path,
        include: Option<&Pattern>,
        out: &mut Vec<PathBuf>,
    ) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", dir.display(), e);
                return;
            }
        };
        let mut entries: Vec<_> = entries.flatten().collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let relative = path
                .strip_prefix(&self.root)
                .or_else(|_| path.strip_prefix(base))
                .unwrap_or(path.as_path());
            if self.ignore.is_ignored(relative) {
                continue;
            }
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                self.collect_files(base, &path, include, out);
            } else if file_type.is_file() {
                let name = entry.file_name();
                let keep = include.is_none_or(|p| {
                    p.matches(&name.to_string_lossy()) || p.matches_path(relative)
                });
                if keep {
                    out.push(path);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tars_agent::GrepArgs;

    fn grep_call(pattern: &str, path: Option<&Path>, include: Option<&str>) -> ToolCall {
        ToolCall::Grep(GrepArgs {
            pattern: pattern.into(),
            path: path.map(|p| p.to_string_lossy().to_string()),
            include: include.map(str::to_string),
        })
    }

    fn fixture() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::create_dir_all(dir.join("src")).unwrap();
        std::fs::create_dir_all(dir.join("node_modules/pkg")).unwrap();
        std::fs::write(dir.join("src/main.rs"), "fn main() {\n    run();\n}\n").unwrap();
        std::fs::write(dir.join("src/lib.ts"), "export function run() {}\n").unwrap();
        std::fs::write(dir.join("node_modules/pkg/index.js"), "function run() {}\n").unwrap();
        tmp
    }

    #[tokio::test]
    async fn test_finds_matches_with_line_numbers() {
        let tmp = fixture();
        let root = tmp.path().to_path_buf();
        let tool = GrepTool::new(&root, Arc::new(IgnoreRules::default()));
        let result = tool.execute(&grep_call("run\\(", None, None)).await.unwrap();

        assert!(result.llm_result.contains("main.rs:2: run();"));
        assert!(result.llm_result.contains("lib.ts:1: export function run() {}"));
        assert!(!result.llm_result.contains("node_modules"));
        assert_eq!(result.display_result, "Found 2 match(es)");
    }

    #[tokio::test]
    async fn test_include_filters_by_filename() {
        let tmp = fixture();
        let root = tmp.path().to_path_buf();
        let tool = GrepTool::new(&root, Arc::new(IgnoreRules::default()));
        let result = tool
            .execute(&grep_call("run", None, Some("*.ts")))
            .await
            .unwrap();
        assert!(result.llm_result.contains("lib.ts"));
        assert!(!result.llm_result.contains("main.rs"));
    }

    #[tokio::test]
    async fn test_single_file_path() {
        let tmp = fixture();
        let root = tmp.path().to_path_buf();
        let tool = GrepTool::new(&root, Arc::new(IgnoreRules::default()));
        let file = root.join("src/main.rs");
        let result = tool
            .execute(&grep_call("fn", Some(&file), None))
            .await
            .unwrap();
        assert!(result.llm_result.contains("main.rs:1: fn main() {"));
    }

    #[tokio::test]
    async fn test_no_matches_is_not_an_error() {
        let tmp = fixture();
        let root = tmp.path().to_path_buf();
        let tool = GrepTool::new(&root, Arc::new(IgnoreRules::default()));
        let result = tool.execute(&grep_call("zzz_nothing", None, None)).await.unwrap();
        assert_eq!(result.display_result, "No matches found");
    }

    #[tokio::test]
    async fn test_invalid_regex_fails() {
        let tmp = fixture();
        let root = tmp.path().to_path_buf();
        let tool = GrepTool::new(&root, Arc::new(IgnoreRules::default()));
        let err = tool.execute(&grep_call("(unclosed", None, None)).await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid regex pattern"));
    }
}
