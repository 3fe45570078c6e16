// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Turning whatever the agent runtime returned into one clean answer.
//!
//! The shape of a runtime result is decided once, in
//! [`RawAgentResponse::from_value`]; [`normalize`] then matches on the
//! variant and never fails.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One entry of a message-list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub role: String,
    /// Usually a string; kept as JSON because runtimes also return parts arrays.
    pub content: Value,
}

impl RawMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: role.into(), content: Value::String(content.into()) }
    }
}

/// A response from the agent runtime, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAgentResponse {
    /// Bare text.  Passed through untouched.
    Text(String),
    /// An object carrying its answer in a `content` field.
    Structured { content: Value },
    /// A transcript of role-tagged messages.
    MessageList(Vec<RawMessage>),
    /// Anything else.
    Unknown(Value),
}

impl RawAgentResponse {
    /// Classify a JSON value.
    ///
    /// A string is `Text`.  An object with a non-empty `content` is
    /// `Structured`; otherwise an object with a `messages` array, or a bare
    /// array of objects that all carry a `role`, is `MessageList`.
    /// Everything else is `Unknown`.
    pub fn from_value(v: Value) -> Self {
        match v {
            Value::String(s) => Self::Text(s),
            Value::Object(ref map) => {
                if let Some(content) = map.get("content").filter(|c| has_content(c)) {
                    return Self::Structured { content: content.clone() };
                }
                if let Some(msgs) = map.get("messages").and_then(Value::as_array) {
                    if let Some(list) = message_list(msgs) {
                        return Self::MessageList(list);
                    }
                }
                Self::Unknown(v)
            }
            Value::Array(ref items) => match message_list(items) {
                Some(list) if !list.is_empty() => Self::MessageList(list),
                _ => Self::Unknown(v),
            },
            other => Self::Unknown(other),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Structured { content } => json!({ "content": content }),
            Self::MessageList(msgs) => serde_json::to_value(msgs).unwrap_or(Value::Null),
            Self::Unknown(v) => v.clone(),
        }
    }
}

/// Text is written as-is; every other shape as compact JSON.
impl fmt::Display for RawAgentResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

fn has_content(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

fn message_list(items: &[Value]) -> Option<Vec<RawMessage>> {
    items
        .iter()
        .map(|item| {
            let role = item.get("role").and_then(Value::as_str)?;
            let content = item.get("content").cloned().unwrap_or(Value::Null);
            Some(RawMessage { role: role.to_string(), content })
        })
        .collect()
}

fn reasoning_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("reasoning pattern is valid"))
}

/// Remove every `<think>…</think>` span (shortest match, across lines) and
/// trim the result.  Text outside the spans, citations included, is kept.
pub fn strip_reasoning(text: &str) -> String {
    reasoning_block().replace_all(text, "").trim().to_string()
}

fn clean(content: &Value) -> String {
    match content {
        Value::String(s) => strip_reasoning(s),
        other => other.to_string(),
    }
}

/// Latest assistant entry that is still non-empty after stripping.
pub fn last_assistant_text(msgs: &[RawMessage]) -> Option<String> {
    msgs.iter()
        .rev()
        .filter(|m| m.role == "assistant" && has_content(&m.content))
        .map(|m| clean(&m.content))
        .find(|text| !text.is_empty())
}

/// Extract one clean answer from a runtime response.
///
/// For message lists the latest assistant entry that is still non-empty
/// after stripping wins.  When no shape yields an answer the whole response
/// is stringified.
pub fn normalize(raw: &RawAgentResponse) -> String {
    match raw {
        RawAgentResponse::Text(s) => s.clone(),
        RawAgentResponse::Structured { content } => clean(content),
        RawAgentResponse::MessageList(msgs) => {
            last_assistant_text(msgs).unwrap_or_else(|| raw.to_string())
        }
        RawAgentResponse::Unknown(_) => raw.to_string(),
    }
}
