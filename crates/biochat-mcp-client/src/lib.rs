// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! MCP client for the BioMCP tool server.
//!
//! Connects over streamable HTTP, lists the remote tools and registers each
//! one in a [`biochat_tools::ToolRegistry`] so the agent can call it like a
//! local tool.

pub mod bridge;
mod client;

pub use client::{McpClient, RemoteTool};
