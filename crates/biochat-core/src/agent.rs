// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use biochat_config::AgentConfig;
use biochat_model::{
    CompletionRequest, Message, MessageContent, ModelProvider, ToolSchema, Usage,
};
use biochat_tools::{ToolCall, ToolOutput, ToolRegistry};

use crate::{
    events::AgentEvent,
    normalize::{strip_reasoning, RawAgentResponse, RawMessage},
    prompts::system_prompt,
    AgentDispatchError,
};

/// One earlier question/answer pair replayed as context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub query: String,
    pub answer: String,
}

/// Result of one [`Agent::run`].
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Final assistant text exactly as the model produced it.
    pub content: String,
    /// Messages of this run, starting with the user query.
    pub messages: Vec<Message>,
    pub usage: Usage,
}

impl RunOutput {
    /// Hand the result to the normalizer: the final content when there is
    /// any, otherwise the transcript of this run.
    pub fn into_response(self) -> RawAgentResponse {
        if !self.content.is_empty() {
            return RawAgentResponse::Structured { content: Value::String(self.content) };
        }
        RawAgentResponse::MessageList(
            self.messages
                .into_iter()
                .map(|m| {
                    let content = match m.content {
                        MessageContent::Text(t) => Value::String(t),
                        MessageContent::ToolResult { content, .. } => Value::String(content),
                        MessageContent::ToolCall { .. } => Value::Null,
                    };
                    RawMessage { role: m.role.as_str().to_string(), content }
                })
                .collect(),
        )
    }
}

/// The core agent.  Owns the model and tool handles plus a rolling history,
/// and drives the model ↔ tool loop for one query at a time.
pub struct Agent {
    model: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    config: Arc<AgentConfig>,
    system_prompt: String,
    history: VecDeque<Exchange>,
}

impl Agent {
    pub fn new(
        model: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        config: Arc<AgentConfig>,
    ) -> Self {
        let system_prompt = system_prompt(&config);
        Self { model, tools, config, system_prompt, history: VecDeque::new() }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn history(&self) -> impl Iterator<Item = &Exchange> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn tool_schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .schemas()
            .into_iter()
            .map(|s| ToolSchema { name: s.name, description: s.description, parameters: s.parameters })
            .collect()
    }

    fn context_messages(&self, query: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2 + self.history.len() * 2);
        messages.push(Message::system(&self.system_prompt));
        for ex in &self.history {
            messages.push(Message::user(&ex.query));
            messages.push(Message::assistant(&ex.answer));
        }
        messages.push(Message::user(query));
        messages
    }

    fn remember(&mut self, query: &str, answer: &str) {
        let keep = self.config.history_turns;
        if keep == 0 {
            return;
        }
        let answer = strip_reasoning(answer);
        if answer.is_empty() {
            return;
        }
        self.history.push_back(Exchange { query: query.to_string(), answer });
        while self.history.len() > keep {
            self.history.pop_front();
        }
    }

    /// Answer `query`: model call → optional tool calls → repeat until the
    /// model replies without requesting tools.
    ///
    /// Progress is reported on `tx` when given.  History is only extended
    /// when the run succeeds.
    pub async fn run(
        &mut self,
        query: &str,
        tx: Option<&mpsc::Sender<AgentEvent>>,
    ) -> Result<RunOutput, AgentDispatchError> {
        let emit = move |ev: AgentEvent| async move {
            if let Some(tx) = tx {
                let _ = tx.send(ev).await;
            }
        };

        let mut messages = self.context_messages(query);
        let run_start = messages.len() - 1;
        let tools = self.tool_schemas();
        let max_rounds = self.config.max_tool_rounds;
        let mut usage = Usage::default();
        let mut tool_rounds = 0u32;

        loop {
            emit(AgentEvent::ModelRequest { round: tool_rounds + 1 }).await;
            let req = CompletionRequest { messages: messages.clone(), tools: tools.clone() };
            let resp = self.model.complete(req).await.map_err(|e| {
                warn!(error = %e, "model request failed");
                AgentDispatchError::Model(format!("{e:#}"))
            })?;

            usage += resp.usage;
            emit(AgentEvent::TokenUsage {
                input: resp.usage.input_tokens,
                output: resp.usage.output_tokens,
            })
            .await;
            if let Some(reasoning) = &resp.reasoning {
                debug!(chars = reasoning.len(), "model returned separate reasoning");
            }

            if resp.tool_calls.is_empty() {
                messages.push(Message::assistant(&resp.text));
                self.remember(query, &resp.text);
                emit(AgentEvent::TurnComplete).await;
                return Ok(RunOutput {
                    content: resp.text,
                    messages: messages.split_off(run_start),
                    usage,
                });
            }

            if tool_rounds >= max_rounds {
                warn!(max_rounds, "tool round limit reached");
                return Err(AgentDispatchError::ToolRoundLimit(max_rounds));
            }
            tool_rounds += 1;

            if !resp.text.trim().is_empty() {
                messages.push(Message::assistant(&resp.text));
            }

            // All tool-call messages must precede the tool results.
            let mut calls = Vec::with_capacity(resp.tool_calls.len());
            for tc in &resp.tool_calls {
                messages.push(Message::tool_call(&tc.id, &tc.name, &tc.arguments));
                let (args, parse_error) = match parse_arguments(&tc.arguments) {
                    Ok(args) => (args, None),
                    Err(e) => (Value::Null, Some(e)),
                };
                calls.push((ToolCall { id: tc.id.clone(), name: tc.name.clone(), args }, parse_error));
            }

            // Tools run in parallel; results are collected in request order.
            // Dropping the set (e.g. on dispatch timeout) aborts unfinished calls.
            let mut set = JoinSet::new();
            for (idx, (call, parse_error)) in calls.iter().enumerate() {
                emit(AgentEvent::ToolCallStarted(call.clone())).await;
                debug!(tool = %call.name, id = %call.id, "executing tool");
                let registry = Arc::clone(&self.tools);
                let call = call.clone();
                let parse_error = parse_error.clone();
                set.spawn(async move {
                    let output = match parse_error {
                        Some(e) => ToolOutput::err(&call.id, format!("invalid tool arguments: {e}")),
                        None => registry.execute(&call).await,
                    };
                    (idx, output)
                });
            }

            let mut outputs: Vec<Option<ToolOutput>> = vec![None; calls.len()];
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((idx, output)) => outputs[idx] = Some(output),
                    Err(e) => warn!(error = %e, "tool task failed"),
                }
            }

            for ((call, _), output) in calls.iter().zip(outputs) {
                let output = output.unwrap_or_else(|| {
                    ToolOutput::err(&call.id, "tool execution panicked")
                });
                if output.is_error {
                    debug!(tool = %call.name, "tool returned an error");
                }
                emit(AgentEvent::ToolCallFinished {
                    call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    output: output.content.clone(),
                    is_error: output.is_error,
                })
                .await;
                messages.push(Message::tool_result(&call.id, output.content));
            }
        }
    }
}

/// Parse model-produced arguments.  Empty input means no arguments.
fn parse_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| e.to_string())
}
