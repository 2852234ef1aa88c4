// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `millwright ask` command: one question, streamed to the terminal.

use std::io::Write;

use colored::Colorize;
use millwright_client::{ChatClient, ChatSession, SendOutcome};
use millwright_config::model::MillwrightConfig;
use millwright_core::{MillwrightError, StreamEvent};

use crate::shutdown;

/// Streams the answer to `message` from a running gateway.
///
/// Deltas go to stdout as they arrive; status lines go to stderr.
pub async fn run_ask(
    config: &MillwrightConfig,
    message: String,
    url: Option<String>,
) -> Result<(), MillwrightError> {
    let base_url = url.unwrap_or_else(|| gateway_url(config));
    let client = ChatClient::new(base_url)?;
    let mut session = ChatSession::new();
    let cancel = shutdown::install_signal_handler();

    let mut printer = Printer::default();
    let outcome = client
        .send(&mut session, message, &cancel, |event, session| {
            printer.render(event, session.status());
        })
        .await?;

    for toast in session.take_toasts() {
        eprintln!("{} {toast}", "warning:".yellow().bold());
    }

    match outcome {
        SendOutcome::Completed(_) => Ok(()),
        SendOutcome::Cancelled => {
            eprintln!("{}", "cancelled".dimmed());
            Ok(())
        }
        SendOutcome::Failed(message) => Err(MillwrightError::Gateway {
            message,
            source: None,
        }),
    }
}

fn gateway_url(config: &MillwrightConfig) -> String {
    format!("http://{}:{}", config.gateway.host, config.gateway.port)
}

/// Terminal rendering state.
#[derive(Default)]
struct Printer {
    streamed: String,
    last_status: Option<String>,
}

impl Printer {
    fn render(&mut self, event: &StreamEvent, status: Option<&str>) {
        match event {
            StreamEvent::Delta { content } => {
                self.streamed.push_str(content);
                print!("{content}");
                let _ = std::io::stdout().flush();
            }
            StreamEvent::Done { content } => {
                if self.streamed.is_empty() {
                    println!("{content}");
                } else if self.streamed != *content {
                    println!();
                    println!("{content}");
                } else {
                    println!();
                }
            }
            StreamEvent::Error { content } => {
                if !self.streamed.is_empty() {
                    println!();
                }
                eprintln!("{} {content}", "error:".red().bold());
            }
            StreamEvent::Status { .. } | StreamEvent::ToolCall { .. } | StreamEvent::ToolResult { .. } => {
                if let Some(status) = status
                    && self.last_status.as_deref() != Some(status)
                {
                    eprintln!("{}", status.dimmed());
                    self.last_status = Some(status.to_string());
                }
            }
        }
    }
}
