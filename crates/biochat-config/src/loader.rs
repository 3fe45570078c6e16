// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::Config;

/// Cloud-mode flag.  Any value except empty, `0`, `false`, `no` or `off` enables it.
pub const ENV_CLOUD: &str = "BIOCHAT_CLOUD";
/// Explicit tool endpoint override.
pub const ENV_MCP_URL: &str = "BIOMCP_SERVER_URL";
/// Model id override.
pub const ENV_MODEL: &str = "LLM_MODEL";

/// Ordered list of config file locations searched from lowest to highest priority.
/// Later files override earlier ones.
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. System-wide default
    paths.push(PathBuf::from("/etc/biochat/config.toml"));

    // 2. XDG / home
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config/biochat/config.toml"));
    }
    if let Some(cfg) = dirs::config_dir() {
        paths.push(cfg.join("biochat/config.toml"));
    }

    // 3. Working-directory local
    paths.push(PathBuf::from(".biochat/config.toml"));
    paths.push(PathBuf::from("biochat.toml"));

    paths
}

/// Load configuration by merging all discovered TOML files, then applying
/// environment overrides from the process environment.
/// The `extra` argument may provide an explicit path (e.g. `--config` CLI flag).
pub fn load(extra: Option<&Path>) -> anyhow::Result<Config> {
    load_with_env(extra, |key| std::env::var(key).ok())
}

/// Like [`load`] but reads environment overrides through `env`.
pub fn load_with_env(
    extra: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Config> {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    for path in config_search_paths() {
        if path.is_file() {
            debug!(path = %path.display(), "loading config layer");
            merge_toml(&mut merged, read_layer(&path)?);
        }
    }

    if let Some(p) = extra {
        debug!(path = %p.display(), "loading explicit config");
        merge_toml(&mut merged, read_layer(p)?);
    }

    let mut config: Config = merged.try_into().context("invalid configuration")?;
    apply_env_overrides(&mut config, env);
    Ok(config)
}

fn read_layer(path: &Path) -> anyhow::Result<toml::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Apply deployment environment variables on top of file configuration.
///
/// The credential itself is not read here; the model driver resolves it from
/// `model.api_key` or the provider's key variable when the session is built.
pub fn apply_env_overrides(config: &mut Config, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env(ENV_CLOUD) {
        config.mcp.cloud = env_flag(&v);
        debug!(cloud = config.mcp.cloud, "cloud mode from environment");
    }
    if let Some(url) = env(ENV_MCP_URL).filter(|u| !u.trim().is_empty()) {
        debug!(%url, "tool endpoint from environment");
        config.mcp.url = Some(url);
    }
    if let Some(model) = env(ENV_MODEL).filter(|m| !m.trim().is_empty()) {
        debug!(%model, "model from environment");
        config.model.name = model;
    }
}

fn env_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

/// Deep-merge `src` into `dst`; src wins on scalar conflicts.
fn merge_toml(dst: &mut toml::Value, src: toml::Value) {
    match (dst, src) {
        (toml::Value::Table(d), toml::Value::Table(s)) => {
            for (k, v) in s {
                let entry = d.entry(k).or_insert(toml::Value::Table(toml::map::Map::new()));
                merge_toml(entry, v);
            }
        }
        (dst, src) => *dst = src,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{DEFAULT_CLOUD_MCP_URL, DEFAULT_LOCAL_MCP_URL};

    fn val(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn merge_scalar_src_wins() {
        let mut dst = val(r#"x = 1"#);
        merge_toml(&mut dst, val(r#"x = 2"#));
        assert_eq!(dst["x"].as_integer(), Some(2));
    }

    #[test]
    fn merge_nested_tables() {
        let mut dst = val(r#"[model]
provider = "groq"
name = "qwen/qwen3-32b""#);
        merge_toml(&mut dst, val(r#"[model]
name = "llama-3.3-70b-versatile""#));
        assert_eq!(dst["model"]["provider"].as_str(), Some("groq"));
        assert_eq!(dst["model"]["name"].as_str(), Some("llama-3.3-70b-versatile"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = load_with_env(
            Some(Path::new("/tmp/biochat_nonexistent_config_xyz.toml")),
            env_of(&[]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn explicit_file_overrides_defaults() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, r#"[mcp]
url = "http://10.0.0.5:8080/mcp"

[agent]
history_turns = 2"#).unwrap();
        let cfg = load_with_env(Some(f.path()), env_of(&[])).unwrap();
        assert_eq!(cfg.mcp.url.as_deref(), Some("http://10.0.0.5:8080/mcp"));
        assert_eq!(cfg.agent.history_turns, 2);
    }

    #[test]
    fn env_model_overrides_file() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, r#"[model]
name = "from-file""#).unwrap();
        let cfg = load_with_env(Some(f.path()), env_of(&[(ENV_MODEL, "from-env")])).unwrap();
        assert_eq!(cfg.model.name, "from-env");
    }

    #[test]
    fn cloud_flag_selects_cloud_endpoint() {
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg, env_of(&[(ENV_CLOUD, "1")]));
        assert_eq!(cfg.mcp.resolved_url().unwrap(), DEFAULT_CLOUD_MCP_URL);
    }

    #[test]
    fn falsy_cloud_flag_keeps_local_endpoint() {
        for v in ["", "0", "false", "No", "off"] {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg, env_of(&[(ENV_CLOUD, v)]));
            assert_eq!(cfg.mcp.resolved_url().unwrap(), DEFAULT_LOCAL_MCP_URL, "value {v:?}");
        }
    }

    #[test]
    fn env_endpoint_overrides_cloud_default() {
        let mut cfg = Config::default();
        apply_env_overrides(
            &mut cfg,
            env_of(&[(ENV_CLOUD, "true"), (ENV_MCP_URL, "https://biomcp.example.org/mcp")]),
        );
        assert_eq!(cfg.mcp.resolved_url().unwrap(), "https://biomcp.example.org/mcp");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg, env_of(&[(ENV_MODEL, " "), (ENV_MCP_URL, "")]));
        assert_eq!(cfg.model.name, crate::DEFAULT_MODEL);
        assert!(cfg.mcp.url.is_none());
    }
}
