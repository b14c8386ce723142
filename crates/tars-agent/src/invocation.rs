//! Typed tool invocations and the schema validator that produces them.
//!
//! The model hands us an untrusted `{tool, toolOptions}` object. The
//! [`CallValidator`] checks it against the tool's JSON schema (the same
//! schema advertised in the prompt), then deserializes it into the closed
//! [`ToolCall`] union. Nothing past this point sees an open map.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt;

use crate::protocol::RawInvocation;
use crate::tasks::TaskChecklist;

/// Name of the checklist tool intercepted before dispatch
pub const UPDATE_TASK_LIST: &str = "update_task_list";

/// The dispatchable tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    ReadFile,
    EditFile,
    NewFile,
    Grep,
    Glob,
    ShellCommand,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::ReadFile,
        ToolKind::EditFile,
        ToolKind::NewFile,
        ToolKind::Grep,
        ToolKind::Glob,
        ToolKind::ShellCommand,
    ];

    /// Wire name used in the protocol
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::ReadFile => "read_file",
            ToolKind::EditFile => "edit_file",
            ToolKind::NewFile => "new_file",
            ToolKind::Grep => "grep",
            ToolKind::Glob => "glob",
            ToolKind::ShellCommand => "shell_command",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Description advertised to the model
    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::ReadFile => {
                "Reads a file from the local filesystem. Pass startLine and endLine together to read a range of a large file."
            }
            ToolKind::EditFile => {
                "Replaces exact text in a file. Read the file first. oldString must match literally, including whitespace; \
                 include a few lines of context so the match is unique. Set expected_replacements to replace every occurrence."
            }
            ToolKind::NewFile => {
                "Creates a file with the given content, creating parent directories as needed. Overwrites existing files."
            }
            ToolKind::Grep => {
                "Searches file contents for a regex. Optionally restrict to a directory (path) and a filename pattern (include). \
                 Returns path:line: text for each match."
            }
            ToolKind::Glob => "Finds files under the project root matching a glob pattern such as **/*.rs.",
            ToolKind::ShellCommand => {
                "Runs a command with bash -c and returns stdout, stderr and the exit code. Use for builds, tests and git."
            }
        }
    }

    /// JSON schema for `toolOptions`
    pub fn schema(&self) -> Value {
        match self {
            ToolKind::ReadFile => json!({
                "type": "object",
                "properties": {
                    "absolutePath": { "type": "string", "minLength": 1, "description": "Absolute path to the file" },
                    "startLine": { "type": "integer", "minimum": 1, "description": "First line to read (1-based). Requires endLine" },
                    "endLine": { "type": "integer", "minimum": 1, "description": "Last line to read. Requires startLine" }
                },
                "required": ["absolutePath"]
            }),
            ToolKind::EditFile => json!({
                "type": "object",
                "properties": {
                    "filePath": { "type": "string", "minLength": 1, "description": "Absolute path to the file" },
                    "oldString": { "type": "string", "minLength": 1, "description": "Exact literal text to replace" },
                    "newString": { "type": "string", "description": "Replacement text" },
                    "expected_replacements": { "type": "integer", "minimum": 1, "description": "Number of occurrences to replace (default 1)" }
                },
                "required": ["filePath", "oldString", "newString"]
            }),
            ToolKind::NewFile => json!({
                "type": "object",
                "properties": {
                    "filePath": { "type": "string", "minLength": 1, "description": "Absolute path of the file to create" },
                    "content": { "type": "string", "description": "File content" }
                },
                "required": ["filePath", "content"]
            }),
            ToolKind::Grep => json!({
                "type": "object",
                "properties": {
                    "pattern": { "type": "string", "minLength": 1, "description": "Regex to search for" },
                    "path": { "type": "string", "description": "Absolute file or directory to search. Defaults to the project root" },
                    "include": { "type": "string", "description": "Filename pattern to filter files, e.g. *.ts" }
                },
                "required": ["pattern"]
            }),
            ToolKind::Glob => json!({
                "type": "object",
                "properties": {
                    "pattern": { "type": "string", "minLength": 1, "description": "Glob pattern, e.g. src/**/*.rs" }
                },
                "required": ["pattern"]
            }),
            ToolKind::ShellCommand => json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "minLength": 1, "description": "Exact bash command to run" },
                    "directory": { "type": "string", "description": "Absolute directory to run in. Defaults to the project root" },
                    "description": { "type": "string", "description": "One sentence shown to the operator" }
                },
                "required": ["command"]
            }),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Schema for the checklist tool
pub fn task_list_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "goal": { "type": "string", "description": "What the whole task is trying to achieve" },
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "title": { "type": "string" },
                        "status": { "type": "string", "enum": ["todo", "in-progress", "done", "failed"] }
                    },
                    "required": ["id", "title", "status"]
                }
            }
        },
        "required": ["goal", "items"]
    })
}

/// One entry of the tool catalog advertised to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "toolOptions")]
    pub schema: Value,
}

/// Every tool the model may call, including the checklist tool
pub fn catalog() -> Vec<ToolSpec> {
    let mut specs: Vec<ToolSpec> = ToolKind::ALL
        .into_iter()
        .map(|kind| ToolSpec {
            name: kind.name(),
            description: kind.description(),
            schema: kind.schema(),
        })
        .collect();
    specs.push(ToolSpec {
        name: UPDATE_TASK_LIST,
        description: "Replaces the task checklist shown to the operator. Send the full list every time; it is not merged.",
        schema: task_list_schema(),
    });
    specs
}

// --- Typed arguments ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileArgs {
    pub absolute_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditFileArgs {
    pub file_path: String,
    pub old_string: String,
    pub new_string: String,
    #[serde(rename = "expected_replacements", default = "default_replacements")]
    pub expected_replacements: u32,
}

fn default_replacements() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFileArgs {
    pub file_path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrepArgs {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobArgs {
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellCommandArgs {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A validated call to one of the known tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tool", content = "toolOptions", rename_all = "snake_case")]
pub enum ToolCall {
    ReadFile(ReadFileArgs),
    EditFile(EditFileArgs),
    NewFile(NewFileArgs),
    Grep(GrepArgs),
    Glob(GlobArgs),
    ShellCommand(ShellCommandArgs),
}

impl ToolCall {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::ReadFile(_) => ToolKind::ReadFile,
            ToolCall::EditFile(_) => ToolKind::EditFile,
            ToolCall::NewFile(_) => ToolKind::NewFile,
            ToolCall::Grep(_) => ToolKind::Grep,
            ToolCall::Glob(_) => ToolKind::Glob,
            ToolCall::ShellCommand(_) => ToolKind::ShellCommand,
        }
    }
}

/// A validated invocation with its optional human-readable label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInvocation {
    #[serde(flatten)]
    pub call: ToolCall,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ToolInvocation {
    pub fn new(call: ToolCall) -> Self {
        Self {
            call,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(&self) -> ToolKind {
        self.call.kind()
    }

    /// Serialize back to the wire shape, for history and audit
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// --- Validation ---

/// One offending field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    pub field: String,
    pub message: String,
}

impl FieldProblem {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Why an invocation was rejected before execution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown tool: \"{tool}\". Supported tools: {}", supported_tools())]
    UnknownTool { tool: String },

    #[error("Invalid {tool} options: {}", join_problems(.problems))]
    InvalidOptions {
        tool: String,
        problems: Vec<FieldProblem>,
    },
}

impl ValidationError {
    fn invalid(tool: &str, problems: Vec<FieldProblem>) -> Self {
        ValidationError::InvalidOptions {
            tool: tool.to_string(),
            problems,
        }
    }

    /// Name of the tool the model asked for
    pub fn tool(&self) -> &str {
        match self {
            ValidationError::UnknownTool { tool } => tool,
            ValidationError::InvalidOptions { tool, .. } => tool,
        }
    }

    /// Offending fields (empty for unknown tools)
    pub fn problems(&self) -> &[FieldProblem] {
        match self {
            ValidationError::UnknownTool { .. } => &[],
            ValidationError::InvalidOptions { problems, .. } => problems,
        }
    }
}

fn supported_tools() -> String {
    ToolKind::ALL
        .iter()
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_problems(problems: &[FieldProblem]) -> String {
    problems
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validates raw invocations against the catalog schemas.
///
/// Schemas are compiled once at construction.
pub struct CallValidator {
    validators: HashMap<&'static str, jsonschema::Validator>,
}

impl CallValidator {
    pub fn new() -> Self {
        let mut validators = HashMap::new();
        for spec in catalog() {
            match jsonschema::validator_for(&spec.schema) {
                Ok(validator) => {
                    validators.insert(spec.name, validator);
                }
                Err(e) => {
                    tracing::warn!(
                        "Invalid tool parameter schema for '{}', skipping validation: {}",
                        spec.name,
                        e
                    );
                }
            }
        }
        Self { validators }
    }

    /// Turn a raw invocation into a typed one
    pub fn validate(&self, raw: &RawInvocation) -> Result<ToolInvocation, ValidationError> {
        let kind = ToolKind::from_name(&raw.tool).ok_or_else(|| ValidationError::UnknownTool {
            tool: raw.tool.clone(),
        })?;

        self.check_schema(kind.name(), &raw.options)?;

        let options = raw.options.clone();
        let call = match kind {
            ToolKind::ReadFile => {
                let args: ReadFileArgs = decode(kind.name(), options)?;
                check_line_range(&args)?;
                ToolCall::ReadFile(args)
            }
            ToolKind::EditFile => ToolCall::EditFile(decode(kind.name(), options)?),
            ToolKind::NewFile => ToolCall::NewFile(decode(kind.name(), options)?),
            ToolKind::Grep => ToolCall::Grep(decode(kind.name(), options)?),
            ToolKind::Glob => ToolCall::Glob(decode(kind.name(), options)?),
            ToolKind::ShellCommand => ToolCall::ShellCommand(decode(kind.name(), options)?),
        };

        Ok(ToolInvocation {
            call,
            description: raw.description.clone(),
        })
    }

    /// Validate an `update_task_list` invocation into a checklist
    pub fn validate_task_list(&self, raw: &RawInvocation) -> Result<TaskChecklist, ValidationError> {
        self.check_schema(UPDATE_TASK_LIST, &raw.options)?;
        decode(UPDATE_TASK_LIST, raw.options.clone())
    }

    fn check_schema(&self, tool: &str, options: &Value) -> Result<(), ValidationError> {
        let Some(validator) = self.validators.get(tool) else {
            return Ok(());
        };

        let problems: Vec<FieldProblem> = validator
            .iter_errors(options)
            .map(|e| {
                let message = e.to_string();
                let field = field_name(&e.instance_path.to_string(), &message);
                FieldProblem::new(field, message)
            })
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::invalid(tool, problems))
        }
    }
}

impl Default for CallValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn decode<T: serde::de::DeserializeOwned>(tool: &str, options: Value) -> Result<T, ValidationError> {
    serde_json::from_value(options)
        .map_err(|e| ValidationError::invalid(tool, vec![FieldProblem::new("toolOptions", e.to_string())]))
}

fn check_line_range(args: &ReadFileArgs) -> Result<(), ValidationError> {
    match (args.start_line, args.end_line) {
        (Some(start), Some(end)) if start > end => Err(ValidationError::invalid(
            ToolKind::ReadFile.name(),
            vec![FieldProblem::new(
                "startLine",
                format!(
                    "startLine ({}) cannot be greater than endLine ({})",
                    start, end
                ),
            )],
        )),
        (Some(_), None) | (None, Some(_)) => Err(ValidationError::invalid(
            ToolKind::ReadFile.name(),
            vec![FieldProblem::new(
                "startLine/endLine",
                "Both startLine and endLine must be provided together, or neither",
            )],
        )),
        _ => Ok(()),
    }
}

/// Derive a dotted field name from a JSON pointer, falling back to the
/// property named in a "required" message.
fn field_name(pointer: &str, message: &str) -> String {
    let path = pointer.trim_start_matches('/').replace('/', ".");
    if !path.is_empty() {
        return path;
    }
    if message.ends_with("is a required property") {
        if let Some(name) = message.split('"').nth(1) {
            return name.to_string();
        }
    }
    "toolOptions".to_string()
}
