// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use biochat_tools::ToolCall;

/// Progress events emitted while a query is in flight.
/// The chat front-end subscribes to these to show what the agent is doing.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A completion request is about to be sent (round 1 is the first).
    ModelRequest { round: u32 },
    /// The model has requested a tool call
    ToolCallStarted(ToolCall),
    /// A tool call finished
    ToolCallFinished {
        call_id: String,
        tool_name: String,
        output: String,
        is_error: bool,
    },
    /// Token usage of one completion
    TokenUsage { input: u32, output: u32 },
    /// The agent has produced its final answer for the query
    TurnComplete,
}
