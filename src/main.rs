// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod chat;
mod cli;
mod commands;
mod render;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use biochat_mcp_client::McpClient;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Some(Commands::Completions { shell }) = &cli.command {
        cli::print_completions(*shell);
        return Ok(());
    }

    let mut config = biochat_config::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);

    match &cli.command {
        Some(Commands::ShowConfig) => {
            println!("{}", serde_yaml::to_string(&config.redacted()).unwrap_or_default());
            return Ok(());
        }
        Some(Commands::ListTools) => return list_tools_cmd(&config).await,
        Some(Commands::Completions { .. }) | None => {}
    }

    let role = cli.role(&config)?;
    if cli.is_headless() {
        chat::run_headless(config, role, cli.prompt).await
    } else {
        chat::run_interactive(config, role).await
    }
}

/// Connect to the tool server and print what it offers.
async fn list_tools_cmd(config: &biochat_config::Config) -> anyhow::Result<()> {
    let url = config.mcp.resolved_url()?;
    let client = McpClient::connect(
        &url,
        Duration::from_secs(config.mcp.request_timeout_secs),
        Duration::from_secs(config.mcp.connect_timeout_secs),
    )
    .await
    .with_context(|| format!("connecting to tool server at {url}"))?;

    let mut tools = client.tools().to_vec();
    tools.sort_by(|a, b| a.name.cmp(&b.name));
    if tools.is_empty() {
        println!("No tools offered by {url}.");
        return Ok(());
    }

    let name_w = tools.iter().map(|t| t.name.len()).max().unwrap_or(10).max(10);
    println!("{:<name_w$}  DESCRIPTION", "TOOL");
    println!("{}", "-".repeat(name_w + 40));
    for t in &tools {
        let summary = t.description.lines().next().unwrap_or("").trim();
        println!("{:<name_w$}  {}", t.name, summary);
    }
    println!("\nTotal: {} tool(s) at {url}", tools.len());
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
