// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

use biochat_config::ConfigError;

/// The agent session could not be constructed.
///
/// Surfaced to the caller for display and never replaced by an empty session.
#[derive(Debug, Error)]
pub enum AgentInitError {
    /// Credential, endpoint or model driver configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The tool server did not complete the MCP handshake or tool listing.
    #[error("tool server at {url} is unavailable: {detail}")]
    ToolServer { url: String, detail: String },
}

/// A single query failed while talking to the model or its tools.
///
/// Recovered at the query boundary into an apology message; the session
/// stays usable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentDispatchError {
    #[error("model request failed: {0}")]
    Model(String),

    #[error("the model kept calling tools after {0} rounds")]
    ToolRoundLimit(u32),

    #[error("no answer within {0} seconds")]
    Timeout(u64),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}': expected 'patient' or 'physician'")]
pub struct InvalidRole(pub String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("message content must not be empty")]
    EmptyContent,
}
