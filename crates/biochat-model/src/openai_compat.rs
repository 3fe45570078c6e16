// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Shared implementation for OpenAI-compatible chat completion APIs.
//!
//! Groq and OpenAI both speak the same `/chat/completions` wire format, so a
//! single `OpenAICompatProvider` is configured per driver with its own base
//! URL and credential.  Requests are sent without streaming; the whole
//! assistant turn is parsed from `choices[0].message`.

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    CompletionRequest, CompletionResponse, Message, MessageContent, ToolCallRequest, Usage,
};

/// OpenAI-compatible chat completion provider.
pub struct OpenAICompatProvider {
    /// Provider id returned by `ModelProvider::name()`.
    driver_name: &'static str,
    /// Model id forwarded to the API.
    model: String,
    /// API key (pre-resolved from config or env).
    api_key: Option<String>,
    /// Full chat completions URL, e.g. `https://api.groq.com/openai/v1/chat/completions`.
    chat_url: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    /// Construct a provider.
    ///
    /// `base_url` ends **before** `/chat/completions`, e.g.
    /// `https://api.groq.com/openai/v1`.  `max_tokens` defaults to 4096 and
    /// `temperature` to 0.2.
    pub fn new(
        driver_name: &'static str,
        model: String,
        api_key: Option<String>,
        base_url: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            driver_name,
            model,
            api_key,
            chat_url: format!("{base}/chat/completions"),
            max_tokens: max_tokens.unwrap_or(4096),
            temperature: temperature.unwrap_or(0.2),
            client: reqwest::Client::new(),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    fn request_body(&self, req: &CompletionRequest) -> Value {
        let messages = build_openai_messages(&req.messages);
        let tools: Vec<Value> = req
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }
        body
    }
}

#[async_trait]
impl crate::ModelProvider for OpenAICompatProvider {
    fn name(&self) -> &str {
        self.driver_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        let body = self.request_body(&req);

        debug!(
            driver = %self.driver_name,
            model = %self.model,
            tool_count = req.tools.len(),
            message_count = req.messages.len(),
            "sending completion request"
        );
        tracing::trace!(request_body = ?body, "full completion request");

        let mut http_req = self.client.post(&self.chat_url).json(&body);
        if let Some(key) = self.api_key.as_deref() {
            http_req = http_req.bearer_auth(key);
        }

        let resp = http_req
            .send()
            .await
            .with_context(|| format!("{} request failed", self.driver_name))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("{} error {status}: {text}", self.driver_name);
        }

        let v: Value = resp
            .json()
            .await
            .with_context(|| format!("{} returned a non-JSON body", self.driver_name))?;
        parse_completion(&v)
    }
}

/// Extract text, reasoning, tool calls and usage from a chat completion body.
pub(crate) fn parse_completion(v: &Value) -> anyhow::Result<CompletionResponse> {
    let message = v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .context("completion response has no choices[0].message")?;

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    // DeepSeek-style `reasoning_content` takes priority over Groq's `reasoning`.
    let reasoning = ["reasoning_content", "reasoning"]
        .iter()
        .filter_map(|k| message.get(*k).and_then(Value::as_str))
        .find(|r| !r.is_empty())
        .map(str::to_string);

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|tc| {
                    let function = tc.get("function")?;
                    Some(ToolCallRequest {
                        id: tc.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
                        name: function.get("name").and_then(Value::as_str)?.to_string(),
                        arguments: match function.get("arguments") {
                            Some(Value::String(s)) => s.clone(),
                            Some(Value::Null) | None => "{}".to_string(),
                            Some(other) => other.to_string(),
                        },
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let usage = v
        .get("usage")
        .filter(|u| !u.is_null())
        .map(|u| Usage {
            input_tokens: u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
            output_tokens: u.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
        })
        .unwrap_or_default();

    Ok(CompletionResponse { text, reasoning, tool_calls, usage })
}

/// Convert internal messages into the OpenAI wire format.
///
/// Consecutive `ToolCall` messages are merged into one assistant message with
/// a `tool_calls` array, which is how the API expects parallel calls from a
/// single turn.
pub(crate) fn build_openai_messages(messages: &[Message]) -> Vec<Value> {
    fn tool_call_to_json(tool_call_id: &str, function: &crate::FunctionCall) -> Value {
        json!({
            "id": tool_call_id,
            "type": "function",
            "function": {
                "name": function.name,
                "arguments": function.arguments,
            }
        })
    }

    let mut result: Vec<Value> = Vec::with_capacity(messages.len());
    let mut i = 0;

    while i < messages.len() {
        let m = &messages[i];
        i += 1;
        match &m.content {
            MessageContent::ToolCall { tool_call_id, function } => {
                let mut calls = vec![tool_call_to_json(tool_call_id, function)];
                while let Some(MessageContent::ToolCall { tool_call_id, function }) =
                    messages.get(i).map(|n| &n.content)
                {
                    calls.push(tool_call_to_json(tool_call_id, function));
                    i += 1;
                }
                result.push(json!({ "role": "assistant", "tool_calls": calls }));
            }
            MessageContent::Text(t) => {
                result.push(json!({ "role": m.role.as_str(), "content": t }));
            }
            MessageContent::ToolResult { tool_call_id, content } => {
                result.push(json!({
                    "role": "tool",
                    "tool_call_id": tool_call_id,
                    "content": content,
                }));
            }
        }
    }

    result
}
