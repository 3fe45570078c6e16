// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use rmcp::service::RunningService;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::RoleClient;
use serde_json::{json, Value};
use tracing::{debug, info};

use biochat_tools::{Tool, ToolCall, ToolOutput, ToolRegistry};

use crate::bridge::{arguments_object, flatten_call_result, tool_spec_from_value, RemoteToolSpec};

/// Connected MCP session plus the tool list captured at connect time.
pub struct McpClient {
    url: String,
    request_timeout: Duration,
    service: RunningService<RoleClient, ()>,
    tools: Vec<RemoteToolSpec>,
}

impl McpClient {
    /// Perform the streamable-HTTP handshake with `url` and list its tools.
    ///
    /// The handshake is bounded by `connect_timeout`; `tools/list` and every
    /// later `tools/call` by `request_timeout`.
    pub async fn connect(
        url: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> anyhow::Result<Self> {
        debug!(%url, "connecting to MCP server");
        let transport = StreamableHttpClientTransport::from_uri(url.to_string());
        let service = tokio::time::timeout(connect_timeout, rmcp::serve_client((), transport))
            .await
            .map_err(|_| {
                anyhow!("timed out handshaking with MCP server after {connect_timeout:?}: {url}")
            })?
            .with_context(|| format!("MCP handshake with {url} failed"))?;

        if let Some(info) = service.peer().peer_info() {
            info!(server = %info.server_info.name, version = %info.server_info.version, "MCP server connected");
        }

        let listed = tokio::time::timeout(request_timeout, service.peer().list_all_tools())
            .await
            .map_err(|_| anyhow!("MCP tools/list timeout"))?
            .context("MCP tools/list failed")?;

        let mut tools = Vec::with_capacity(listed.len());
        for tool in &listed {
            let v = serde_json::to_value(tool).context("encoding MCP tool descriptor")?;
            match tool_spec_from_value(&v) {
                Some(spec) => tools.push(spec),
                None => debug!("skipping MCP tool without a name"),
            }
        }
        info!(count = tools.len(), "MCP tools listed");

        Ok(Self { url: url.to_string(), request_timeout, service, tools })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Tools advertised by the server at connect time.
    pub fn tools(&self) -> &[RemoteToolSpec] {
        &self.tools
    }

    /// Issue `tools/call` and flatten the result to text.
    ///
    /// Returns the text and the server's error flag.
    pub async fn call_tool(&self, name: &str, args: &Value) -> anyhow::Result<(String, bool)> {
        let arguments = arguments_object(args).map_err(anyhow::Error::msg)?;
        let params = serde_json::from_value(json!({ "name": name, "arguments": arguments }))
            .context("building tools/call request")?;

        debug!(tool = %name, "MCP tools/call");
        let result = tokio::time::timeout(self.request_timeout, self.service.peer().call_tool(params))
            .await
            .map_err(|_| anyhow!("MCP tools/call timeout after {:?}", self.request_timeout))?
            .with_context(|| format!("MCP tools/call {name} failed"))?;

        let v = serde_json::to_value(&result).context("decoding MCP tool result")?;
        Ok(flatten_call_result(&v))
    }

    /// Wrap every listed remote tool and register it.  Returns the number of
    /// tools registered.
    pub fn register_into(self: &Arc<Self>, registry: &mut ToolRegistry) -> usize {
        for spec in &self.tools {
            registry.register_arc(Arc::new(RemoteTool {
                spec: spec.clone(),
                client: Arc::clone(self),
            }));
        }
        self.tools.len()
    }
}

/// A remote MCP tool exposed through the local [`Tool`] trait.
pub struct RemoteTool {
    spec: RemoteToolSpec,
    client: Arc<McpClient>,
}

#[async_trait]
impl Tool for RemoteTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn parameters_schema(&self) -> Value {
        self.spec.input_schema.clone()
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        match self.client.call_tool(&self.spec.name, &call.args).await {
            Ok((text, false)) => ToolOutput::ok(&call.id, text),
            Ok((text, true)) => ToolOutput::err(&call.id, text),
            Err(e) => {
                debug!(tool = %self.spec.name, error = %e, "remote tool call failed");
                ToolOutput::err(&call.id, format!("{e:#}"))
            }
        }
    }
}
