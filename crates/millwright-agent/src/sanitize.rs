// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Neutralizes instruction-like markers in user input before it reaches the model.
//!
//! Detected markers are removed, never replaced with invented text. The
//! message is otherwise passed through after whitespace normalization.

use std::sync::LazyLock;

use millwright_core::MillwrightError;
use regex::Regex;
use tracing::warn;

/// Injection markers, matched case-insensitively.
const MARKERS: [(&str, &str); 11] = [
    ("ignore previous instructions", r"ignore\s+previous\s+instructions"),
    ("ignore all previous", r"ignore\s+all\s+previous"),
    ("disregard previous", r"disregard\s+previous"),
    ("forget previous", r"forget\s+previous"),
    ("system:", r"system\s*:"),
    ("assistant:", r"assistant\s*:"),
    ("[SYSTEM]", r"\[system\]"),
    ("[INST]", r"\[inst\]"),
    ("</s>", r"</s>"),
    ("<|im_start|>", r"<\|im_start\|>"),
    ("<|im_end|>", r"<\|im_end\|>"),
];

static MARKER_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    MARKERS
        .iter()
        .filter_map(|(label, pattern)| {
            Regex::new(&format!("(?i){pattern}"))
                .ok()
                .map(|re| (*label, re))
        })
        .collect()
});

static EXCESS_NEWLINES: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\n{4,}").ok());

/// Result of sanitizing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    /// Text forwarded to the model.
    pub text: String,
    /// Labels of the markers that were removed, in detection order.
    pub removed: Vec<&'static str>,
}

impl Sanitized {
    /// True when at least one marker was stripped.
    pub fn altered(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Sanitizes a user message.
///
/// Fails with [`MillwrightError::Validation`] when nothing is left after
/// markers and surrounding whitespace are removed.
pub fn sanitize(input: &str) -> Result<Sanitized, MillwrightError> {
    let mut text = input.trim().replace('\0', "");
    let mut removed = Vec::new();

    // Removing one marker can join the pieces of another, so sweep until a
    // full pass finds nothing. Every removal shortens the text.
    loop {
        let mut changed = false;
        for (label, pattern) in MARKER_PATTERNS.iter() {
            if pattern.is_match(&text) {
                let preview: String = input.chars().take(100).collect();
                warn!(pattern = %label, preview = %preview, "prompt injection marker detected in user input");
                text = pattern.replace_all(&text, "").into_owned();
                if !removed.contains(label) {
                    removed.push(*label);
                }
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    if let Some(newlines) = EXCESS_NEWLINES.as_ref() {
        text = newlines.replace_all(&text, "\n\n\n").into_owned();
    }
    let text = text.trim().to_string();

    if text.is_empty() {
        return Err(MillwrightError::Validation(
            "message is empty after removing instruction-like markers".into(),
        ));
    }
    Ok(Sanitized { text, removed })
}
