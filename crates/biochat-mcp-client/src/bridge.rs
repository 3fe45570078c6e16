// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Conversions between MCP wire objects and biochat's tool types.
//!
//! Both directions go through the JSON form of the MCP model (`tools/list`
//! entries and `tools/call` results), so these functions are pure and can be
//! tested without a server.

use serde_json::{Map, Value};

/// A remote tool descriptor as advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub input_schema: Value,
}

/// Read a tool descriptor from its MCP JSON form.
///
/// Returns `None` when the entry has no name.  A missing or non-object
/// schema is replaced by an empty object schema so the model still sees a
/// valid function definition.
pub fn tool_spec_from_value(v: &Value) -> Option<RemoteToolSpec> {
    let name = v.get("name").and_then(Value::as_str)?.to_string();
    let description = v
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let input_schema = match v.get("inputSchema") {
        Some(Value::Object(m)) => Value::Object(m.clone()),
        _ => empty_object_schema(),
    };
    Some(RemoteToolSpec { name, description, input_schema })
}

fn empty_object_schema() -> Value {
    let mut m = Map::new();
    m.insert("type".into(), Value::String("object".into()));
    m.insert("properties".into(), Value::Object(Map::new()));
    Value::Object(m)
}

/// Normalise model-supplied arguments into the object MCP expects.
///
/// `null` becomes no arguments; any non-object value is an error message
/// for the model.
pub fn arguments_object(args: &Value) -> Result<Option<Map<String, Value>>, String> {
    match args {
        Value::Null => Ok(None),
        Value::Object(m) => Ok(Some(m.clone())),
        other => Err(format!("tool arguments must be a JSON object, got: {other}")),
    }
}

/// Flatten a `tools/call` result to text for the model.
///
/// Text blocks are joined by newlines; other block kinds are summarised in
/// brackets.  When there are no content blocks the structured content is
/// used instead.  Returns the text and the server's `isError` flag.
pub fn flatten_call_result(v: &Value) -> (String, bool) {
    let is_error = v.get("isError").and_then(Value::as_bool).unwrap_or(false);

    let mut parts: Vec<String> = v
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| blocks.iter().filter_map(content_block_text).collect())
        .unwrap_or_default();

    if parts.is_empty() {
        if let Some(structured) = v.get("structuredContent").filter(|s| !s.is_null()) {
            parts.push(structured.to_string());
        }
    }

    (parts.join("\n"), is_error)
}

fn content_block_text(block: &Value) -> Option<String> {
    let str_field = |k: &str| block.get(k).and_then(Value::as_str).unwrap_or_default();
    match block.get("type").and_then(Value::as_str)? {
        "text" => Some(str_field("text").to_string()),
        "image" => Some(format!("[image] mime_type={}", str_field("mimeType"))),
        "audio" => Some(format!("[audio] mime_type={}", str_field("mimeType"))),
        "resource" => {
            let res = block.get("resource")?;
            match res.get("text").and_then(Value::as_str) {
                Some(text) => Some(text.to_string()),
                None => Some(format!(
                    "[resource] {}",
                    res.get("uri").and_then(Value::as_str).unwrap_or_default()
                )),
            }
        }
        "resource_link" => Some(format!("[resource_link] {}", str_field("uri"))),
        _ => None,
    }
}

// ─── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn crate_license_matches_workspace() {
        assert_eq!(env!("CARGO_PKG_LICENSE"), "MIT");
    }

    #[test]
    fn tool_spec_preserves_name_description_schema() {
        let v = json!({
            "name": "article_searcher",
            "description": "Search PubMed/PubTator3 for articles",
            "inputSchema": {"type": "object", "properties": {"genes": {"type": "array"}}}
        });
        let spec = tool_spec_from_value(&v).unwrap();
        assert_eq!(spec.name, "article_searcher");
        assert_eq!(spec.description, "Search PubMed/PubTator3 for articles");
        assert!(spec.input_schema["properties"].get("genes").is_some());
    }

    #[test]
    fn tool_spec_without_name_is_skipped() {
        assert!(tool_spec_from_value(&json!({"description": "x"})).is_none());
    }

    #[test]
    fn tool_spec_with_bad_schema_gets_empty_object_schema() {
        let spec = tool_spec_from_value(&json!({"name": "t", "inputSchema": "nope"})).unwrap();
        assert_eq!(spec.input_schema["type"], "object");
        assert_eq!(spec.description, "");
    }

    #[test]
    fn arguments_null_means_none() {
        assert_eq!(arguments_object(&Value::Null).unwrap(), None);
    }

    #[test]
    fn arguments_non_object_is_rejected() {
        let err = arguments_object(&json!([1, 2])).unwrap_err();
        assert!(err.contains("must be a JSON object"));
    }

    #[test]
    fn text_blocks_joined_by_newline() {
        let v = json!({
            "content": [
                {"type": "text", "text": "PMID 123"},
                {"type": "text", "text": "PMID 456"}
            ]
        });
        assert_eq!(flatten_call_result(&v), ("PMID 123\nPMID 456".to_string(), false));
    }

    #[test]
    fn non_text_blocks_are_summarised() {
        let v = json!({
            "content": [
                {"type": "image", "data": "AAAA", "mimeType": "image/png"},
                {"type": "resource", "resource": {"uri": "file:///x", "text": "inline"}},
                {"type": "resource_link", "uri": "https://clinicaltrials.gov/study/NCT1", "name": "trial"}
            ]
        });
        let (text, _) = flatten_call_result(&v);
        assert_eq!(
            text,
            "[image] mime_type=image/png\ninline\n[resource_link] https://clinicaltrials.gov/study/NCT1"
        );
    }

    #[test]
    fn structured_content_used_when_no_blocks() {
        let v = json!({"content": [], "structuredContent": {"count": 2}});
        assert_eq!(flatten_call_result(&v).0, r#"{"count":2}"#);
    }

    #[test]
    fn error_flag_is_reported() {
        let v = json!({"content": [{"type": "text", "text": "bad gene"}], "isError": true});
        assert_eq!(flatten_call_result(&v), ("bad gene".to_string(), true));
    }
}
