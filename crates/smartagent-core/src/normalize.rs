//! Response Normalization
//!
//! Reads the raw provider document into the two things the loop cares about:
//! the ordered function calls of the first candidate, and its text.
//!
//! Both REST-style (`functionCall`, `args`) and SDK-style (`function_call`,
//! `arguments`) keys are accepted, and arguments may arrive either as an
//! object or as a JSON-encoded string. Anything that does not fit is skipped
//! rather than reported.

use serde_json::{Map, Value};

use crate::provider::ProviderResponse;
use crate::tool::{Arguments, ToolCall};

/// Ordered function calls requested by the first candidate
pub fn extract_calls(response: &ProviderResponse) -> Vec<ToolCall> {
    first_candidate_parts(&response.0)
        .iter()
        .filter_map(|part| {
            let call = field(part, "functionCall", "function_call")?;
            let name = call.get("name")?.as_str()?;
            let args = field(call, "args", "arguments");
            Some(ToolCall::new(name, decode_arguments(args)))
        })
        .collect()
}

/// Newline-joined text parts of the first candidate, or `""`
pub fn extract_final_text(response: &ProviderResponse) -> String {
    let parts = first_candidate_parts(&response.0);
    if parts.is_empty() {
        return response
            .0
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
    }

    parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_candidate_parts(raw: &Value) -> &[Value] {
    raw.get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn field<'a>(value: &'a Value, camel: &str, snake: &str) -> Option<&'a Value> {
    value
        .get(camel)
        .or_else(|| value.get(snake))
        .filter(|v| !v.is_null())
}

fn decode_arguments(raw: Option<&Value>) -> Arguments {
    match raw {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::debug!(%encoded, "Discarding undecodable call arguments");
                Map::new()
            }
        },
        _ => Map::new(),
    }
}
