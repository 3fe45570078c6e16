// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Tool endpoint used when running in cloud mode without an explicit URL.
pub const DEFAULT_CLOUD_MCP_URL: &str = "https://biomcp-server-production.up.railway.app/mcp";
/// Tool endpoint used for local development without an explicit URL.
pub const DEFAULT_LOCAL_MCP_URL: &str = "http://localhost:8080/mcp";
/// Model id used when neither config nor environment name one.
pub const DEFAULT_MODEL: &str = "qwen/qwen3-32b";
/// Provider id used when the config does not name one.
pub const DEFAULT_PROVIDER: &str = "groq";

/// Serde default helper: returns `true`.
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    /// Copy of this config that is safe to print: the explicit API key, if
    /// any, is replaced by a placeholder.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.model.api_key.is_some() {
            cfg.model.api_key = Some("<redacted>".into());
        }
        cfg
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider identifier: "groq" | "openai" | "mock"
    pub provider: String,
    /// Model name forwarded to the provider API
    pub name: String,
    /// Environment variable that holds the API key (read at runtime).
    /// When unset the provider's registry default is used (`GROQ_API_KEY`).
    pub api_key_env: Option<String>,
    /// Explicit API key; prefer api_key_env in config files
    pub api_key: Option<String>,
    /// Base URL override for OpenAI-compatible endpoints
    pub base_url: Option<String>,
    /// Maximum tokens to request in a single completion
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0–2.0)
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.into(),
            name: DEFAULT_MODEL.into(),
            api_key_env: None,
            api_key: None,
            base_url: None,
            max_tokens: Some(4096),
            temperature: Some(0.2),
        }
    }
}

/// Remote biomedical tool server (BioMCP over streamable HTTP).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// Explicit endpoint; wins over both built-in defaults.
    pub url: Option<String>,
    /// Select the hosted endpoint instead of the local one when `url` is unset.
    pub cloud: bool,
    /// Timeout for a single MCP request (tools/list, tools/call).
    pub request_timeout_secs: u64,
    /// Limit for the initial MCP handshake.
    pub connect_timeout_secs: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            url: None,
            cloud: false,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

impl McpConfig {
    /// Resolve the tool endpoint: explicit URL, then the cloud default when
    /// `cloud` is set, then the local default.
    ///
    /// The result must be an absolute `http`/`https` URL.
    pub fn resolved_url(&self) -> Result<String, ConfigError> {
        let raw = match self.url.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ if self.cloud => DEFAULT_CLOUD_MCP_URL.to_string(),
            _ => DEFAULT_LOCAL_MCP_URL.to_string(),
        };
        let parsed = url::Url::parse(&raw).map_err(|e| ConfigError::InvalidEndpoint {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(raw),
            other => Err(ConfigError::InvalidEndpoint {
                url: raw.clone(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }
}

fn default_max_tool_rounds() -> u32 {
    12
}
fn default_dispatch_timeout_secs() -> u64 {
    120
}
fn default_history_turns() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of model ↔ tool rounds for one query
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Wall-clock limit for one query dispatch in seconds (0 = no limit)
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
    /// Number of previous question/answer exchanges replayed as context
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
    /// System prompt override; leave None to use the built-in prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Text appended to the system prompt (built-in or override)
    #[serde(default)]
    pub append_system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            history_turns: default_history_turns(),
            system_prompt: None,
            append_system_prompt: None,
        }
    }
}

fn default_role() -> String {
    "patient".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Role selected when the chat starts: "patient" or "physician"
    #[serde(default = "default_role")]
    pub default_role: String,
    /// Print the medical disclaimer under the header
    #[serde(default = "default_true")]
    pub show_disclaimer: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_role: default_role(),
            show_disclaimer: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let cfg = Config::default();
        assert_eq!(cfg.model.provider, "groq");
        assert_eq!(cfg.model.name, "qwen/qwen3-32b");
        assert!(!cfg.mcp.cloud);
        assert_eq!(cfg.chat.default_role, "patient");
    }

    #[test]
    fn local_endpoint_when_not_cloud() {
        let mcp = McpConfig::default();
        assert_eq!(mcp.resolved_url().unwrap(), DEFAULT_LOCAL_MCP_URL);
    }

    #[test]
    fn cloud_endpoint_when_cloud_flag_set() {
        let mcp = McpConfig { cloud: true, ..McpConfig::default() };
        assert_eq!(mcp.resolved_url().unwrap(), DEFAULT_CLOUD_MCP_URL);
    }

    #[test]
    fn explicit_endpoint_wins_in_both_modes() {
        for cloud in [false, true] {
            let mcp = McpConfig {
                url: Some("http://biomcp.internal:9000/mcp".into()),
                cloud,
                ..McpConfig::default()
            };
            assert_eq!(mcp.resolved_url().unwrap(), "http://biomcp.internal:9000/mcp");
        }
    }

    #[test]
    fn blank_explicit_endpoint_falls_back_to_default() {
        let mcp = McpConfig { url: Some("   ".into()), ..McpConfig::default() };
        assert_eq!(mcp.resolved_url().unwrap(), DEFAULT_LOCAL_MCP_URL);
    }

    #[test]
    fn malformed_endpoint_is_config_error() {
        let mcp = McpConfig { url: Some("not a url".into()), ..McpConfig::default() };
        assert!(matches!(mcp.resolved_url(), Err(ConfigError::InvalidEndpoint { .. })));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let mcp = McpConfig { url: Some("ftp://example.com/mcp".into()), ..McpConfig::default() };
        let err = mcp.resolved_url().unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn redacted_hides_explicit_key() {
        let mut cfg = Config::default();
        cfg.model.api_key = Some("gsk_secret".into());
        let shown = cfg.redacted();
        assert_eq!(shown.model.api_key.as_deref(), Some("<redacted>"));
        assert_eq!(cfg.model.api_key.as_deref(), Some("gsk_secret"));
    }

    #[test]
    fn partial_toml_keeps_field_defaults() {
        let cfg: Config = toml::from_str(
            r#"[model]
name = "llama-3.3-70b-versatile""#,
        )
        .unwrap();
        assert_eq!(cfg.model.name, "llama-3.3-70b-versatile");
        assert_eq!(cfg.model.provider, "groq");
        assert_eq!(cfg.agent.max_tool_rounds, 12);
    }
}
