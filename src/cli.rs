// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};

use biochat_config::Config;
use biochat_core::RoleTag;

/// Role accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Patient,
    Physician,
}

impl From<RoleArg> for RoleTag {
    fn from(r: RoleArg) -> Self {
        match r {
            RoleArg::Patient => RoleTag::Patient,
            RoleArg::Physician => RoleTag::Physician,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "biochat",
    about = "Rare disease query assistant backed by biomedical databases",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Ask a single question, print the answer and exit
    #[arg(value_name = "QUERY")]
    pub prompt: Option<String>,

    /// Answer style: patient (plain language) or physician (technical)
    #[arg(long, short = 'r', value_enum)]
    pub role: Option<RoleArg>,

    /// Model to use, e.g. "qwen/qwen3-32b"
    #[arg(long, short = 'M')]
    pub model: Option<String>,

    /// Biomedical tool server endpoint (MCP over streamable HTTP)
    #[arg(long, value_name = "URL")]
    pub mcp_url: Option<String>,

    /// Use the hosted tool server instead of the local one
    #[arg(long)]
    pub cloud: bool,

    /// Per-query timeout in seconds (0 = no limit). Overrides config.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to config file (added on top of auto-discovered layers)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Print the effective configuration and exit
    ShowConfig,
    /// Connect to the tool server and list the tools it offers
    ListTools,
}

impl Cli {
    /// Single-shot mode: a query was given, or stdin is piped.
    pub fn is_headless(&self) -> bool {
        self.prompt.is_some() || !std::io::stdin().is_terminal()
    }

    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model.name = model.clone();
        }
        if let Some(url) = &self.mcp_url {
            config.mcp.url = Some(url.clone());
        }
        if self.cloud {
            config.mcp.cloud = true;
        }
        if let Some(secs) = self.timeout {
            config.agent.dispatch_timeout_secs = secs;
        }
    }

    /// Role from `--role`, else the configured default.
    pub fn role(&self, config: &Config) -> anyhow::Result<RoleTag> {
        match self.role {
            Some(r) => Ok(r.into()),
            None => Ok(config.chat.default_role.parse()?),
        }
    }
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "biochat", &mut std::io::stdout());
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "biochat", "--model", "llama-3.3-70b-versatile", "--mcp-url", "http://10.0.0.2:8080/mcp",
            "--cloud", "--timeout", "30",
        ]);
        let mut cfg = Config::default();
        cli.apply_to(&mut cfg);
        assert_eq!(cfg.model.name, "llama-3.3-70b-versatile");
        assert_eq!(cfg.mcp.url.as_deref(), Some("http://10.0.0.2:8080/mcp"));
        assert!(cfg.mcp.cloud);
        assert_eq!(cfg.agent.dispatch_timeout_secs, 30);
    }

    #[test]
    fn role_flag_wins_over_config_default() {
        let mut cfg = Config::default();
        cfg.chat.default_role = "physician".into();

        let cli = Cli::parse_from(["biochat", "--role", "patient", "q"]);
        assert_eq!(cli.role(&cfg).unwrap(), RoleTag::Patient);

        let cli = Cli::parse_from(["biochat", "q"]);
        assert_eq!(cli.role(&cfg).unwrap(), RoleTag::Physician);
    }

    #[test]
    fn invalid_configured_role_is_an_error() {
        let mut cfg = Config::default();
        cfg.chat.default_role = "nurse".into();
        let cli = Cli::parse_from(["biochat"]);
        let err = cli.role(&cfg).unwrap_err();
        assert!(err.to_string().contains("nurse"));
    }

    #[test]
    fn unknown_role_flag_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["biochat", "--role", "nurse"]).is_err());
    }

    #[test]
    fn prompt_makes_run_headless() {
        let cli = Cli::parse_from(["biochat", "What is Dravet syndrome?"]);
        assert!(cli.is_headless());
    }
}
