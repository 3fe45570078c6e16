// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::{CompletionRequest, CompletionResponse, ToolCallRequest, Usage};

/// Deterministic mock provider.  Echoes the last user message back as the
/// assistant response.
#[derive(Default)]
pub struct MockProvider;

#[async_trait]
impl crate::ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        let reply = req
            .messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::Role::User))
            .and_then(|m| m.as_text())
            .unwrap_or("[no input]")
            .to_string();

        Ok(CompletionResponse {
            text: format!("MOCK: {reply}"),
            usage: Usage { input_tokens: 10, output_tokens: 10 },
            ..Default::default()
        })
    }
}

/// One scripted reply: either a response or a provider failure message.
pub type Script = Result<CompletionResponse, String>;

/// A pre-scripted mock provider.  Each call to `complete` pops the next
/// script from the front of the queue, so tests can specify exact replies,
/// including tool calls and failures, without network access.
pub struct ScriptedMockProvider {
    scripts: Arc<Mutex<Vec<Script>>>,
    delay: Option<Duration>,
    /// The last `CompletionRequest` seen by this provider.
    pub last_request: Arc<Mutex<Option<CompletionRequest>>>,
    /// Number of `complete` calls made so far.
    pub calls: Arc<Mutex<usize>>,
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedMockProvider {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts)),
            delay: None,
            last_request: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Sleep this long before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Convenience: provider that always returns a single text reply.
    pub fn always_text(reply: impl Into<String>) -> Self {
        Self::new(vec![Ok(CompletionResponse {
            text: reply.into(),
            usage: Usage { input_tokens: 5, output_tokens: 5 },
            ..Default::default()
        })])
    }

    /// Convenience: provider that returns a tool call followed by a text reply.
    pub fn tool_then_text(
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        args_json: impl Into<String>,
        final_text: impl Into<String>,
    ) -> Self {
        Self::new(vec![
            // Round 1 – model emits a tool call
            Ok(CompletionResponse {
                tool_calls: vec![ToolCallRequest {
                    id: tool_id.into(),
                    name: tool_name.into(),
                    arguments: args_json.into(),
                }],
                ..Default::default()
            }),
            // Round 2 – model responds after tool result
            Ok(CompletionResponse::text(final_text)),
        ])
    }

    /// Convenience: provider whose first request fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(vec![Err(message.into())])
    }

    pub fn call_count(&self) -> usize {
        *locked(&self.calls)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        locked(&self.last_request).clone()
    }
}

#[async_trait]
impl crate::ModelProvider for ScriptedMockProvider {
    fn name(&self) -> &str {
        "scripted-mock"
    }
    fn model_name(&self) -> &str {
        "scripted-mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        *locked(&self.last_request) = Some(req);
        *locked(&self.calls) += 1;
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let next = {
            let mut scripts = locked(&self.scripts);
            if scripts.is_empty() {
                // Default fallback when all scripts are consumed
                Ok(CompletionResponse::text("[no more scripts]"))
            } else {
                scripts.remove(0)
            }
        };
        next.map_err(anyhow::Error::msg)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
