//! edit_file: exact-match text replacement

use async_trait::async_trait;
use similar::{ChangeTag, TextDiff};
use tars_agent::{Tool, ToolCall, ToolError, ToolKind, ToolResult};
use tokio::fs;

use super::absolute;

const MAX_DIFF_LINES: usize = 50;

/// Tool for editing files with find/replace
pub struct EditFileTool;

impl EditFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EditFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::EditFile
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let ToolCall::EditFile(args) = call else {
            return Err(ToolError::mismatch(self.kind(), call));
        };
        let path = absolute(&args.file_path)?;

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::failed(format!("Failed to read {}: {}", path.display(), e)))?;

        let occurrences = content.matches(args.old_string.as_str()).count();
        if occurrences == 0 {
            return Err(ToolError::failed(format!(
                "Could not find oldString in {}. It must match exactly, including whitespace and indentation. Read the file again before retrying.",
                path.display()
            )));
        }
        let expected = args.expected_replacements as usize;
        if occurrences != expected {
            return Err(ToolError::failed(format!(
                "Expected {} occurrence(s) of oldString in {} but found {}. Add more context to make it unique, or set expected_replacements to {}.",
                expected,
                path.display(),
                occurrences,
                occurrences
            )));
        }

        let new_content = content.replace(args.old_string.as_str(), &args.new_string);
        if new_content == content {
            return Err(ToolError::failed(format!(
                "No changes made to {}: oldString and newString are identical.",
                path.display()
            )));
        }

        fs::write(&path, &new_content).await?;

        let diff = generate_diff(&content, &new_content);
        Ok(ToolResult::new(
            format!(
                "Successfully replaced {} occurrence(s) in {}.",
                occurrences,
                path.display()
            ),
            format!("Edited {}\n{}", path.display(), diff),
        ))
    }
}

/// Line diff for the operator
fn generate_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut output: Vec<String> = diff
        .iter_all_changes()
        .filter(|change| change.tag() != ChangeTag::Equal)
        .map(|change| {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            format!("{}{}", sign, change)
        })
        .collect();

    if output.len() > MAX_DIFF_LINES {
        output.truncate(MAX_DIFF_LINES);
        output.push("... (diff truncated)\n".to_string());
    }

    output.join("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tars_agent::EditFileArgs;

    fn edit_call(path: &std::path::Path, old: &str, new: &str, n: u32) -> ToolCall {
        ToolCall::EditFile(EditFileArgs {
            file_path: path.to_string_lossy().to_string(),
            old_string: old.into(),
            new_string: new.into(),
            expected_replacements: n,
        })
    }

    #[tokio::test]
    async fn test_single_replacement() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let file = dir.join("lib.rs");
        std::fs::write(&file, "fn a() {}\nfn b() {}\n").unwrap();

        let result = EditFileTool::new()
            .execute(&edit_call(&file, "fn b() {}", "fn c() {}", 1))
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "fn a() {}\nfn c() {}\n");
        assert!(result.display_result.contains("-fn b() {}"));
        assert!(result.display_result.contains("+fn c() {}"));
        assert!(!result.llm_result.contains("+fn"));
    }

    #[tokio::test]
    async fn test_ambiguous_match_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let file = dir.join("lib.rs");
        std::fs::write(&file, "x = 1\nx = 1\n").unwrap();

        let err = EditFileTool::new()
            .execute(&edit_call(&file, "x = 1", "x = 2", 1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("found 2"));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "x = 1\nx = 1\n");
    }

    #[tokio::test]
    async fn test_expected_replacements_replaces_all() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let file = dir.join("lib.rs");
        std::fs::write(&file, "x = 1\nx = 1\n").unwrap();

        EditFileTool::new()
            .execute(&edit_call(&file, "x = 1", "x = 2", 2))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "x = 2\nx = 2\n");
    }

    #[tokio::test]
    async fn test_missing_text_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let file = dir.join("lib.rs");
        std::fs::write(&file, "hello\n").unwrap();

        let err = EditFileTool::new()
            .execute(&edit_call(&file, "goodbye", "x", 1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Could not find oldString"));
    }

    #[tokio::test]
    async fn test_identical_replacement_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let file = dir.join("lib.rs");
        std::fs::write(&file, "hello\n").unwrap();

        let err = EditFileTool::new()
            .execute(&edit_call(&file, "hello", "hello", 1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No changes made"));
    }
}
