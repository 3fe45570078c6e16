// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ConversationError, RoleTag};

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One visible chat message.  Never edited after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Transcript of one interactive session together with its active role.
///
/// The role lives here so that switching it and clearing the history are a
/// single operation.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    role: RoleTag,
    messages: Vec<ChatMessage>,
}

impl ConversationState {
    pub fn new(role: RoleTag) -> Self {
        Self { role, messages: Vec::new() }
    }

    pub fn role(&self) -> RoleTag {
        self.role
    }

    /// Switch the active role.  A different role discards the transcript;
    /// returns whether the role changed.
    pub fn set_role(&mut self, role: RoleTag) -> bool {
        if role == self.role {
            return false;
        }
        self.role = role;
        self.messages.clear();
        true
    }

    /// Append a message.  Content that is empty or only whitespace is rejected.
    pub fn append(
        &mut self,
        role: Speaker,
        content: impl Into<String>,
    ) -> Result<&ChatMessage, ConversationError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ConversationError::EmptyContent);
        }
        self.messages.push(ChatMessage { role, content, timestamp: Utc::now() });
        Ok(&self.messages[self.messages.len() - 1])
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Messages in the order they were appended.
    pub fn all(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
