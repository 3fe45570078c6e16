// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The process-wide agent session.
//!
//! One [`AgentSession`] is built lazily on first use and shared for the rest
//! of the process.  Its agent sits behind an async mutex, so concurrent
//! callers are served one query at a time and the shared handle is safe to
//! use from any task.  A failed build leaves the cell empty and the next
//! call tries again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex, OnceCell};
use tracing::{debug, info, warn};
use uuid::Uuid;

use biochat_config::Config;
use biochat_mcp_client::McpClient;
use biochat_model::ModelProvider;
use biochat_tools::ToolRegistry;

use crate::{
    agent::Agent,
    contextualize::{contextualize, RoleTag},
    events::AgentEvent,
    normalize::{last_assistant_text, normalize, RawAgentResponse},
    AgentDispatchError, AgentInitError,
};

/// Shown when the model produced no displayable answer.
pub const EMPTY_ANSWER: &str =
    "I could not find an answer to that question. Please try rephrasing it.";

/// Chat-visible text for a failed query.
pub fn apology(err: &impl std::fmt::Display) -> String {
    format!(
        "I apologize, but I encountered an error processing your query: {err}. \
         Please try rephrasing your question or contact support if the issue persists."
    )
}

/// Configured agent plus the handles it needs to answer queries.
pub struct AgentSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    endpoint: String,
    model_name: String,
    tool_names: Vec<String>,
    dispatch_timeout: Option<Duration>,
    agent: Mutex<Agent>,
}

impl AgentSession {
    /// Resolve the endpoint and credential, connect to the tool server and
    /// register its tools.
    pub async fn build(config: &Config) -> Result<Self, AgentInitError> {
        let endpoint = config.mcp.resolved_url()?;
        let model: Arc<dyn ModelProvider> = Arc::from(biochat_model::from_config(&config.model)?);

        let client = McpClient::connect(
            &endpoint,
            Duration::from_secs(config.mcp.request_timeout_secs),
            Duration::from_secs(config.mcp.connect_timeout_secs),
        )
        .await
        .map_err(|e| AgentInitError::ToolServer { url: endpoint.clone(), detail: format!("{e:#}") })?;

        let mut tools = ToolRegistry::new();
        let count = Arc::new(client).register_into(&mut tools);
        info!(%endpoint, tools = count, model = %config.model.name, "agent session ready");

        Ok(Self::from_parts(model, tools, config, endpoint))
    }

    /// Assemble a session from an existing model and tool registry.
    pub fn from_parts(
        model: Arc<dyn ModelProvider>,
        tools: ToolRegistry,
        config: &Config,
        endpoint: impl Into<String>,
    ) -> Self {
        let timeout_secs = config.agent.dispatch_timeout_secs;
        let model_name = model.model_name().to_string();
        let tool_names = tools.names();
        let agent = Agent::new(model, Arc::new(tools), Arc::new(config.agent.clone()));
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            endpoint: endpoint.into(),
            model_name,
            tool_names,
            dispatch_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            agent: Mutex::new(agent),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    /// Forget the exchanges replayed to the model as context.
    pub async fn clear_history(&self) {
        self.agent.lock().await.clear_history();
    }

    /// Number of remembered exchanges.
    pub async fn history_len(&self) -> usize {
        self.agent.lock().await.history().count()
    }

    /// Send an already contextualized query to the agent and return its raw
    /// result.  Bounded by the dispatch timeout when one is configured.
    pub async fn dispatch(
        &self,
        query: &str,
        tx: Option<&mpsc::Sender<AgentEvent>>,
    ) -> Result<RawAgentResponse, AgentDispatchError> {
        let mut agent = self.agent.lock().await;
        debug!(session = %self.id, chars = query.len(), "dispatching query");
        let run = agent.run(query, tx);
        let output = match self.dispatch_timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| AgentDispatchError::Timeout(limit.as_secs()))??,
            None => run.await?,
        };
        debug!(
            input_tokens = output.usage.input_tokens,
            output_tokens = output.usage.output_tokens,
            "query answered"
        );
        Ok(output.into_response())
    }

    /// Contextualize, dispatch and normalize.  Never fails: a dispatch error
    /// becomes an apology that names it.
    pub async fn process_query(&self, query: &str, role: RoleTag) -> String {
        self.process_query_observed(query, role, None).await
    }

    /// Like [`process_query`](Self::process_query) but reports progress on `tx`.
    pub async fn process_query_observed(
        &self,
        query: &str,
        role: RoleTag,
        tx: Option<&mpsc::Sender<AgentEvent>>,
    ) -> String {
        let contextualized = contextualize(query, role);
        match self.dispatch(&contextualized, tx).await {
            Ok(raw) => {
                // A transcript without an assistant answer holds only the
                // prompt and tool payloads, which are not for display.
                let answer = match &raw {
                    RawAgentResponse::MessageList(msgs) => last_assistant_text(msgs).unwrap_or_default(),
                    other => normalize(other),
                };
                if answer.trim().is_empty() {
                    EMPTY_ANSWER.to_string()
                } else {
                    answer
                }
            }
            Err(e) => {
                warn!(session = %self.id, %role, error = %e, "query failed");
                apology(&e)
            }
        }
    }
}

/// Lazily initialised, shared [`AgentSession`].
///
/// Initialisation runs at most once at a time; concurrent callers wait for
/// it.  An initialisation error is returned to the caller that triggered it
/// and leaves the cell empty.
pub struct SessionCell {
    cell: OnceCell<Arc<AgentSession>>,
}

impl SessionCell {
    pub const fn new() -> Self {
        Self { cell: OnceCell::const_new() }
    }

    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<AgentSession>, AgentInitError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AgentSession, AgentInitError>>,
    {
        self.cell
            .get_or_try_init(|| async { init().await.map(Arc::new) })
            .await
            .cloned()
    }

    pub fn get(&self) -> Option<Arc<AgentSession>> {
        self.cell.get().cloned()
    }
}

impl Default for SessionCell {
    fn default() -> Self {
        Self::new()
    }
}

static SESSION: SessionCell = SessionCell::new();

/// The process-wide session, built from `config` on first call.
///
/// Later calls return the same session and ignore `config`.
pub async fn get_session(config: &Config) -> Result<Arc<AgentSession>, AgentInitError> {
    SESSION
        .get_or_try_init(|| async {
            info!("building agent session");
            AgentSession::build(config).await
        })
        .await
}

/// The process-wide session if it has been built.
pub fn current_session() -> Option<Arc<AgentSession>> {
    SESSION.get()
}
