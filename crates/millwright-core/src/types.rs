// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation types exchanged between the client and the orchestrator.
//!
//! The server keeps no session state: every [`ChatRequest`] carries the full
//! replay window, and [`validate_request`] bounds it before any model call.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::MillwrightError;

/// Maximum characters in a single message (user message or history entry).
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Maximum number of messages in a replayed history.
pub const MAX_HISTORY_MESSAGES: usize = 50;

/// Maximum cumulative characters across all history contents.
pub const MAX_HISTORY_CHARS: usize = 50_000;

/// Author of a conversation message. Only user and assistant turns are replayable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request body shared by the streaming and non-streaming chat endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The new user message.
    pub message: String,
    /// Prior conversation, oldest first.
    #[serde(default)]
    pub history: Vec<Message>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }
}

/// Response body of the non-streaming chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Final assistant answer.
    pub response: String,
    /// Input history with the user message and the answer appended.
    pub history: Vec<Message>,
}

/// Validate a chat request against the message and history bounds.
///
/// Lengths are counted in characters, not bytes.
pub fn validate_request(request: &ChatRequest) -> Result<(), MillwrightError> {
    check_content("message", &request.message)?;

    if request.history.len() > MAX_HISTORY_MESSAGES {
        return Err(MillwrightError::Validation(format!(
            "history has {} messages (max: {MAX_HISTORY_MESSAGES})",
            request.history.len()
        )));
    }

    let mut total = 0usize;
    for (i, msg) in request.history.iter().enumerate() {
        check_content(&format!("history[{i}].content"), &msg.content)?;
        total += msg.content.chars().count();
    }

    if total > MAX_HISTORY_CHARS {
        return Err(MillwrightError::Validation(format!(
            "total conversation history too large: {total} characters (max: {MAX_HISTORY_CHARS})"
        )));
    }

    Ok(())
}

fn check_content(field: &str, content: &str) -> Result<(), MillwrightError> {
    if content.trim().is_empty() {
        return Err(MillwrightError::Validation(format!(
            "{field} cannot be empty or whitespace-only"
        )));
    }
    let len = content.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(MillwrightError::Validation(format!(
            "{field} is {len} characters (max: {MAX_MESSAGE_CHARS})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn history_of(n: usize, content: &str) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(content)
                } else {
                    Message::assistant(content)
                }
            })
            .collect()
    }

    #[test]
    fn accepts_plain_message_without_history() {
        assert!(validate_request(&ChatRequest::new("What was OEE yesterday?")).is_ok());
    }

    #[test]
    fn rejects_empty_and_whitespace_messages() {
        assert!(validate_request(&ChatRequest::new("")).is_err());
        let err = validate_request(&ChatRequest::new("   \n\t ")).unwrap_err();
        assert!(matches!(err, MillwrightError::Validation(m) if m.contains("whitespace")));
    }

    #[test]
    fn message_length_is_counted_in_chars() {
        // 2000 multi-byte characters is exactly at the limit.
        let msg = "é".repeat(MAX_MESSAGE_CHARS);
        assert!(validate_request(&ChatRequest::new(msg)).is_ok());

        let too_long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(validate_request(&ChatRequest::new(too_long)).is_err());
    }

    #[test]
    fn rejects_fifty_one_history_messages() {
        let req = ChatRequest::new("hi").with_history(history_of(51, "x"));
        let err = validate_request(&req).unwrap_err();
        assert!(matches!(err, MillwrightError::Validation(m) if m.contains("51 messages")));
    }

    #[test]
    fn accepts_fifty_history_messages() {
        let req = ChatRequest::new("hi").with_history(history_of(50, "x"));
        assert!(validate_request(&req).is_ok());
    }

    #[test]
    fn rejects_history_over_total_char_budget() {
        // 26 messages of 2000 chars = 52,000 characters.
        let req = ChatRequest::new("hi").with_history(history_of(26, &"a".repeat(2000)));
        let err = validate_request(&req).unwrap_err();
        assert!(matches!(err, MillwrightError::Validation(m) if m.contains("too large")));
    }

    #[test]
    fn rejects_blank_history_entry() {
        let req = ChatRequest::new("hi").with_history(vec![Message::user("ok"), Message::assistant("  ")]);
        let err = validate_request(&req).unwrap_err();
        assert!(matches!(err, MillwrightError::Validation(m) if m.contains("history[1]")));
    }

    #[test]
    fn role_rejects_system_on_deserialize() {
        let json = r#"{"message":"hi","history":[{"role":"system","content":"x"}]}"#;
        assert!(serde_json::from_str::<ChatRequest>(json).is_err());
    }

    #[test]
    fn history_defaults_to_empty() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(req.history.is_empty());
    }

    #[test]
    fn role_display_is_lowercase() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    proptest! {
        #[test]
        fn history_longer_than_limit_always_rejected(extra in 1usize..20) {
            let req = ChatRequest::new("hi").with_history(history_of(MAX_HISTORY_MESSAGES + extra, "x"));
            prop_assert!(validate_request(&req).is_err());
        }

        #[test]
        fn history_within_bounds_always_accepted(n in 0usize..=MAX_HISTORY_MESSAGES, len in 1usize..=1000) {
            // 50 * 1000 = 50,000 characters, exactly at the cumulative bound.
            let req = ChatRequest::new("hi").with_history(history_of(n, &"b".repeat(len)));
            prop_assert!(validate_request(&req).is_ok());
        }
    }
}
