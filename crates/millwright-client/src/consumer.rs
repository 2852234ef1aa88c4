// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-stream chat session state.
//!
//! Deltas are a preview; the `done` content is the truth. The session keeps
//! one assistant placeholder per outstanding message and replaces its content
//! wholesale when the answer completes.

use millwright_core::types::{MAX_HISTORY_CHARS, MAX_HISTORY_MESSAGES, MAX_MESSAGE_CHARS};
use millwright_core::{ChatRequest, Message, MillwrightError, Role, StreamEvent};
use tracing::debug;

/// A message as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub role: Role,
    pub content: String,
}

/// Visible conversation plus the state of the one active stream.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<DisplayMessage>,
    status: Option<String>,
    streaming: bool,
    toasts: Vec<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new message: appends it with an empty assistant placeholder
    /// and returns the request to send.
    ///
    /// Rejected while a previous stream has not reached its terminal event.
    pub fn begin(&mut self, message: impl Into<String>) -> Result<ChatRequest, MillwrightError> {
        if self.streaming {
            return Err(MillwrightError::Validation(
                "a response is still streaming".into(),
            ));
        }
        let message = message.into();
        let request = ChatRequest::new(message.clone()).with_history(self.history());

        self.messages.push(DisplayMessage {
            role: Role::User,
            content: message,
        });
        self.messages.push(DisplayMessage {
            role: Role::Assistant,
            content: String::new(),
        });
        self.streaming = true;
        self.status = None;
        Ok(request)
    }

    /// Applies one event. Returns `true` once the stream is finished.
    pub fn apply(&mut self, event: &StreamEvent) -> bool {
        if !self.streaming {
            debug!(kind = event.kind(), "event after stream end ignored");
            return true;
        }
        match event {
            StreamEvent::Delta { content } => {
                if let Some(placeholder) = self.placeholder_mut() {
                    placeholder.content.push_str(content);
                }
            }
            StreamEvent::Status { content } => self.status = Some(content.clone()),
            StreamEvent::ToolCall { name } => self.status = Some(format!("Running {name}...")),
            StreamEvent::ToolResult { name } => self.status = Some(format!("Finished {name}")),
            StreamEvent::Done { content } => {
                if let Some(placeholder) = self.placeholder_mut() {
                    placeholder.content = content.clone();
                }
                self.finish();
            }
            StreamEvent::Error { content } => {
                self.fail(content.clone());
            }
        }
        !self.streaming
    }

    /// Ends the stream as a failure: an empty placeholder is dropped, partial
    /// content is kept and the message is raised as a toast.
    pub fn fail(&mut self, message: impl Into<String>) {
        if !self.drop_empty_placeholder() {
            self.toasts.push(message.into());
        }
        self.finish();
    }

    /// Ends the stream without a terminal event.
    pub fn cancel(&mut self) {
        if self.streaming {
            self.drop_empty_placeholder();
            self.finish();
        }
    }

    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    /// Current status line, if any. Latest event wins.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Drains pending toast notifications.
    pub fn take_toasts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.toasts)
    }

    /// Replayable history within the gateway's request bounds.
    ///
    /// Empty messages (including an active placeholder) are skipped, each
    /// message is clipped to the per-message limit, and the newest messages
    /// that fit the count and total-size limits are kept in order.
    pub fn history(&self) -> Vec<Message> {
        let mut kept = Vec::new();
        let mut total = 0usize;
        for m in self.messages.iter().rev() {
            let content = m.content.trim();
            if content.is_empty() {
                continue;
            }
            let content: String = content.chars().take(MAX_MESSAGE_CHARS).collect();
            let len = content.chars().count();
            if kept.len() == MAX_HISTORY_MESSAGES || total + len > MAX_HISTORY_CHARS {
                debug!(kept = kept.len(), total_chars = total, "older history dropped from replay");
                break;
            }
            total += len;
            kept.push(match m.role {
                Role::User => Message::user(content),
                Role::Assistant => Message::assistant(content),
            });
        }
        kept.reverse();
        kept
    }

    fn placeholder_mut(&mut self) -> Option<&mut DisplayMessage> {
        self.messages
            .last_mut()
            .filter(|m| m.role == Role::Assistant)
    }

    /// Removes the placeholder if nothing arrived. Returns whether it did.
    fn drop_empty_placeholder(&mut self) -> bool {
        let empty = self
            .messages
            .last()
            .is_some_and(|m| m.role == Role::Assistant && m.content.is_empty());
        if empty {
            self.messages.pop();
        }
        empty
    }

    fn finish(&mut self) {
        self.streaming = false;
        self.status = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streaming_session() -> ChatSession {
        let mut session = ChatSession::new();
        session.begin("What was OEE yesterday?").unwrap();
        session
    }

    #[test]
    fn begin_adds_user_message_and_placeholder() {
        let session = streaming_session();
        assert!(session.is_streaming());
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].role, Role::Assistant);
        assert!(session.messages()[1].content.is_empty());
    }

    #[test]
    fn second_begin_rejected_while_streaming() {
        let mut session = streaming_session();
        assert!(session.begin("another").is_err());
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn deltas_append_and_done_replaces() {
        let mut session = streaming_session();
        assert!(!session.apply(&StreamEvent::delta("OEE was ")));
        assert!(!session.apply(&StreamEvent::delta("72")));
        assert_eq!(session.messages()[1].content, "OEE was 72");

        assert!(session.apply(&StreamEvent::done("OEE was 72.4% yesterday.")));
        assert_eq!(session.messages()[1].content, "OEE was 72.4% yesterday.");
        assert!(!session.is_streaming());
        assert_eq!(session.status(), None);
    }

    #[test]
    fn status_is_latest_wins() {
        let mut session = streaming_session();
        session.apply(&StreamEvent::status("Thinking..."));
        session.apply(&StreamEvent::tool_call("get_oee_metrics"));
        assert_eq!(session.status(), Some("Running get_oee_metrics..."));
        session.apply(&StreamEvent::tool_result("get_oee_metrics"));
        session.apply(&StreamEvent::status("Analyzing results..."));
        assert_eq!(session.status(), Some("Analyzing results..."));
    }

    #[test]
    fn error_without_content_removes_placeholder() {
        let mut session = streaming_session();
        session.apply(&StreamEvent::status("Thinking..."));
        assert!(session.apply(&StreamEvent::error("model unavailable")));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::User);
        assert_eq!(session.status(), None);
        assert!(session.take_toasts().is_empty());
    }

    #[test]
    fn error_with_partial_content_keeps_it_and_toasts() {
        let mut session = streaming_session();
        session.apply(&StreamEvent::delta("OEE was"));
        session.apply(&StreamEvent::error("connection reset"));
        assert_eq!(session.messages()[1].content, "OEE was");
        assert_eq!(session.take_toasts(), vec!["connection reset".to_string()]);
        assert!(session.take_toasts().is_empty());
    }

    #[test]
    fn cancel_finalizes_without_terminal_event() {
        let mut session = streaming_session();
        session.apply(&StreamEvent::status("Thinking..."));
        session.cancel();
        assert!(!session.is_streaming());
        assert_eq!(session.status(), None);
        assert_eq!(session.messages().len(), 1);
        assert!(session.begin("retry").is_ok());
    }

    #[test]
    fn history_skips_active_placeholder() {
        let mut session = streaming_session();
        session.apply(&StreamEvent::done("72.4%"));
        let request = session.begin("And the day before?").unwrap();
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[1].content, "72.4%");
        assert_eq!(session.history().len(), 3);
    }

    #[test]
    fn long_conversation_stays_within_request_bounds() {
        let mut session = ChatSession::new();
        for i in 0..30 {
            session.begin(format!("question {i}")).unwrap();
            session.apply(&StreamEvent::done(format!("answer {i}")));
        }
        let request = session.begin("next").unwrap();

        assert_eq!(request.history.len(), MAX_HISTORY_MESSAGES);
        assert_eq!(request.history[0].content, "question 5");
        assert_eq!(request.history.last().unwrap().content, "answer 29");
        assert!(millwright_core::validate_request(&request).is_ok());
    }

    #[test]
    fn oversized_answers_are_clipped_and_total_is_capped() {
        let mut session = ChatSession::new();
        for _ in 0..30 {
            session.begin("report").unwrap();
            session.apply(&StreamEvent::done("x".repeat(MAX_MESSAGE_CHARS + 500)));
        }
        let request = session.begin("next").unwrap();

        assert!(request
            .history
            .iter()
            .all(|m| m.content.chars().count() <= MAX_MESSAGE_CHARS));
        let total: usize = request.history.iter().map(|m| m.content.chars().count()).sum();
        assert!(total <= MAX_HISTORY_CHARS);
        assert_eq!(request.history.last().unwrap().content.len(), MAX_MESSAGE_CHARS);
        assert!(millwright_core::validate_request(&request).is_ok());
    }

    #[test]
    fn events_after_terminal_are_ignored() {
        let mut session = streaming_session();
        session.apply(&StreamEvent::done("final"));
        assert!(session.apply(&StreamEvent::delta(" extra")));
        assert_eq!(session.messages()[1].content, "final");
    }
}
