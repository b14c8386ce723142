//! Parsing of raw model replies into the tool-call protocol.
//!
//! A reply is either a final answer `{"text": ...}` or an ordered array of
//! `{"tool", "description"?, "toolOptions"}` objects. Shape checks on the
//! options happen later, in [`crate::invocation::CallValidator`].

use serde::Serialize;
use serde_json::{Map, Value};

/// Parse failures. Distinct from "no tools found", which is an empty list.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Model reply is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The model's closing message for a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalAnswer {
    pub text: String,
}

/// One proposed invocation, still untrusted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawInvocation {
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "toolOptions")]
    pub options: Value,
}

impl RawInvocation {
    /// Build from a decoded item; `None` when it is not an object with a string `tool`
    fn from_item(item: &Value) -> Option<Self> {
        let obj = item.as_object()?;
        let tool = obj.get("tool")?.as_str()?.to_string();
        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        let options = obj
            .get("toolOptions")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        Some(Self {
            tool,
            description,
            options,
        })
    }

    /// Serialize back to the wire shape
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Classified model reply
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Final(FinalAnswer),
    Invocations(Vec<RawInvocation>),
}

/// Parse raw model text.
pub fn parse_reply(raw: &str) -> Result<ModelReply, ParseError> {
    let mut value: Value = serde_json::from_str(strip_fences(raw))?;

    // Double-encoded replies: decode the inner string exactly once more
    if let Value::String(inner) = &value {
        value = serde_json::from_str(strip_fences(inner))?;
    }

    Ok(classify(value))
}

fn classify(value: Value) -> ModelReply {
    match value {
        Value::Array(items) => {
            let invocations: Vec<RawInvocation> =
                items.iter().filter_map(RawInvocation::from_item).collect();
            let skipped = items.len() - invocations.len();
            if skipped > 0 {
                tracing::debug!(skipped, "Skipped non-tool items in model reply");
            }
            ModelReply::Invocations(invocations)
        }
        Value::Object(ref obj) if obj.contains_key("text") => {
            let text = match &obj["text"] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            ModelReply::Final(FinalAnswer { text })
        }
        Value::Object(_) => {
            ModelReply::Invocations(RawInvocation::from_item(&value).into_iter().collect())
        }
        _ => ModelReply::Invocations(Vec::new()),
    }
}

/// Trim and drop a surrounding ``` / ```json fence if present
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Opening fence line may carry a language tag
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}
