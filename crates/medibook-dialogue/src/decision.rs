//! Best-effort parsing of the language model's structured decision.
//!
//! The model is asked to answer with `{"response": ..., "tool": {"name",
//! "arguments"}}`, but small local models wrap the object in prose, emit
//! `"tool": null`, or forget the format entirely. Anything that does not
//! decode cleanly becomes a plain reply with no tool call.

use serde_json::Value;

use crate::types::ToolCall;

/// The model's reply for one turn and the action it asked for, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub reply: String,
    pub tool: Option<ToolCall>,
    /// Whether a JSON object was decoded from the output.
    pub structured: bool,
}

impl Decision {
    fn plain(raw: &str) -> Self {
        Self {
            reply: raw.to_string(),
            tool: None,
            structured: false,
        }
    }
}

/// Parse raw model output into a [`Decision`].
///
/// The slice between the first `{` and the last `}` is decoded as JSON.
/// The reply is its `response` string, or the raw output when that is
/// missing.
pub fn parse_decision(raw: &str) -> Decision {
    let Some(object) = json_slice(raw) else {
        return Decision::plain(raw);
    };
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(object) else {
        tracing::debug!("Model output is not a JSON object; treating as plain reply");
        return Decision::plain(raw);
    };

    let reply = map
        .get("response")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| raw.to_string());

    let tool = map.get("tool").and_then(|tool| {
        let name = tool.get("name").and_then(Value::as_str)?;
        let arguments = tool.get("arguments").cloned().unwrap_or(Value::Null);
        match ToolCall::from_parts(name, arguments) {
            Ok(call) => Some(call),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Ignoring unusable tool call");
                None
            }
        }
    });

    Decision {
        reply,
        tool,
        structured: true,
    }
}

fn json_slice(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
