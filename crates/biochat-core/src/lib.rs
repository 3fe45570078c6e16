// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod error;
mod contextualize;
mod normalize;
mod conversation;
mod prompts;
mod events;
mod agent;
mod session;

pub use error::{AgentDispatchError, AgentInitError, ConversationError, InvalidRole};
pub use contextualize::{contextualize, RoleTag, PATIENT_FRAGMENT, PHYSICIAN_FRAGMENT};
pub use normalize::{last_assistant_text, normalize, strip_reasoning, RawAgentResponse, RawMessage};
pub use conversation::{ChatMessage, ConversationState, Speaker};
pub use prompts::{system_prompt, BIOCHAT_SYSTEM_PROMPT};
pub use events::AgentEvent;
pub use agent::{Agent, Exchange, RunOutput};
pub use session::{
    apology, current_session, get_session, AgentSession, SessionCell, EMPTY_ANSWER,
};
