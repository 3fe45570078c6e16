// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Configuration problems detected while building the agent session.
///
/// These are fatal to session construction and are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing API key for provider '{provider}': set {env} or model.api_key")]
    MissingCredential { provider: String, env: String },

    #[error("invalid tool endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("unknown model provider: {0}")]
    UnknownProvider(String),
}
