// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod types;
mod provider;
mod openai_compat;
mod mock;
pub mod registry;

pub use types::*;
pub use provider::ModelProvider;
pub use openai_compat::OpenAICompatProvider;
pub use mock::{MockProvider, Script, ScriptedMockProvider};

use biochat_config::{ConfigError, ModelConfig};
use tracing::debug;

/// Construct a boxed [`ModelProvider`] from configuration, reading the API
/// key from the process environment.
///
/// Provider selection:
/// - `"groq"` / `"openai"` → [`OpenAICompatProvider`] with registry defaults
/// - `"mock"` → [`MockProvider`] (echo-back)
pub fn from_config(cfg: &ModelConfig) -> Result<Box<dyn ModelProvider>, ConfigError> {
    from_config_with_env(cfg, |k| std::env::var(k).ok())
}

/// Like [`from_config`] but resolves credential variables through `env`.
pub fn from_config_with_env(
    cfg: &ModelConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn ModelProvider>, ConfigError> {
    let driver = registry::get_driver(&cfg.provider)
        .ok_or_else(|| ConfigError::UnknownProvider(cfg.provider.clone()))?;

    if driver.id == "mock" {
        return Ok(Box::new(MockProvider));
    }

    let key = resolve_api_key(cfg, driver, &env);
    if driver.requires_api_key && key.is_none() {
        let env_name = cfg
            .api_key_env
            .as_deref()
            .or(driver.default_api_key_env)
            .unwrap_or("an API key variable");
        return Err(ConfigError::MissingCredential {
            provider: driver.id.to_string(),
            env: env_name.to_string(),
        });
    }

    let base_url = cfg
        .base_url
        .as_deref()
        .or(driver.default_base_url)
        .ok_or_else(|| ConfigError::InvalidEndpoint {
            url: String::new(),
            reason: format!("provider '{}' needs model.base_url", driver.id),
        })?;

    debug!(provider = driver.id, model = %cfg.name, %base_url, "constructing model provider");
    Ok(Box::new(OpenAICompatProvider::new(
        driver.id,
        cfg.name.clone(),
        key,
        base_url,
        cfg.max_tokens,
        cfg.temperature,
    )))
}

/// Explicit key, then the configured variable, then the driver's default variable.
/// Blank values count as unset.
fn resolve_api_key(
    cfg: &ModelConfig,
    driver: &registry::DriverMeta,
    env: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let non_blank = |s: String| (!s.trim().is_empty()).then_some(s);
    if let Some(k) = cfg.api_key.clone().and_then(non_blank) {
        return Some(k);
    }
    cfg.api_key_env
        .as_deref()
        .or(driver.default_api_key_env)
        .and_then(|var| env(var))
        .and_then(non_blank)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn groq_without_key_is_missing_credential() {
        let err = from_config_with_env(&ModelConfig::default(), no_env).err().unwrap();
        assert_eq!(
            err,
            ConfigError::MissingCredential { provider: "groq".into(), env: "GROQ_API_KEY".into() }
        );
    }

    #[test]
    fn groq_key_from_default_env_var() {
        let p = from_config_with_env(&ModelConfig::default(), |k| {
            (k == "GROQ_API_KEY").then(|| "gsk_x".to_string())
        })
        .unwrap();
        assert_eq!(p.name(), "groq");
        assert_eq!(p.model_name(), "qwen/qwen3-32b");
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let cfg = ModelConfig { api_key: Some("  ".into()), ..ModelConfig::default() };
        let result = from_config_with_env(&cfg, |_| Some(String::new()));
        assert!(matches!(result, Err(ConfigError::MissingCredential { .. })));
    }

    #[test]
    fn custom_key_env_is_reported_when_missing() {
        let cfg = ModelConfig { api_key_env: Some("MY_KEY".into()), ..ModelConfig::default() };
        match from_config_with_env(&cfg, no_env) {
            Err(ConfigError::MissingCredential { env, .. }) => assert_eq!(env, "MY_KEY"),
            other => panic!("unexpected: {:?}", other.map(|p| p.name().to_string())),
        }
    }

    #[test]
    fn explicit_key_wins() {
        let cfg = ModelConfig { api_key: Some("sk-explicit".into()), ..ModelConfig::default() };
        assert!(from_config_with_env(&cfg, no_env).is_ok());
    }

    #[test]
    fn mock_needs_no_key() {
        let cfg = ModelConfig { provider: "mock".into(), ..ModelConfig::default() };
        let p = from_config_with_env(&cfg, no_env).unwrap();
        assert_eq!(p.name(), "mock");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let cfg = ModelConfig { provider: "nope".into(), ..ModelConfig::default() };
        assert!(matches!(
            from_config_with_env(&cfg, no_env),
            Err(ConfigError::UnknownProvider(p)) if p == "nope"
        ));
    }
}
