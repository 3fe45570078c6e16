// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Driver registry: static metadata for every supported model provider.
//!
//! Construction lives in [`crate::from_config`]; this table only records
//! which provider ids exist and what their defaults are.

/// Metadata describing a registered model driver.
#[derive(Debug, Clone)]
pub struct DriverMeta {
    /// Unique provider id used in the `model.provider` config field.
    pub id: &'static str,
    /// Human-readable display name.
    pub name: &'static str,
    pub description: &'static str,
    /// Environment variable consulted for the API key when neither
    /// `model.api_key` nor `model.api_key_env` is set.
    pub default_api_key_env: Option<&'static str>,
    /// Base URL used when `model.base_url` is unset.
    pub default_base_url: Option<&'static str>,
    pub requires_api_key: bool,
}

/// Complete registry of supported drivers.
pub static DRIVERS: &[DriverMeta] = &[
    DriverMeta {
        id: "groq",
        name: "Groq",
        description: "Groq-hosted open models (OpenAI-compatible API)",
        default_api_key_env: Some("GROQ_API_KEY"),
        default_base_url: Some("https://api.groq.com/openai/v1"),
        requires_api_key: true,
    },
    DriverMeta {
        id: "openai",
        name: "OpenAI",
        description: "OpenAI chat completion models",
        default_api_key_env: Some("OPENAI_API_KEY"),
        default_base_url: Some("https://api.openai.com/v1"),
        requires_api_key: true,
    },
    DriverMeta {
        id: "mock",
        name: "Mock",
        description: "Offline echo provider for demos and tests",
        default_api_key_env: None,
        default_base_url: None,
        requires_api_key: false,
    },
];

/// Look up a driver by its id.  Returns `None` for unknown ids.
pub fn get_driver(id: &str) -> Option<&'static DriverMeta> {
    DRIVERS.iter().find(|d| d.id == id)
}
