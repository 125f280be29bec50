// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! The chat transcript controller.
//!
//! A [`Transcript`] owns the conversation shown on the chat page and the
//! status line beneath it. It never performs I/O: [`Transcript::ask`] hands
//! back the request body to send, and the caller feeds the response body to
//! [`Transcript::receive`] once it arrives.
//!
//! Answer text is rendered through [`renderer::render`]. Metadata (mode
//! badge, confidence, source chips) is escaped and laid out directly, never
//! parsed as markdown.
//!
//! # Example
//!
//! ```
//! use faqmd::transcript::{Status, Transcript};
//!
//! let mut transcript = Transcript::new();
//! let request = transcript.ask("  What are your support hours?  ").unwrap();
//! assert_eq!(request.question, "What are your support hours?");
//! assert_eq!(transcript.status(), Status::Thinking);
//!
//! transcript.receive(r#"{"answer": "**Mon-Fri**", "confidence": 0.9}"#);
//! assert_eq!(transcript.status(), Status::Ready);
//! assert!(transcript.to_html().contains("<strong>Mon-Fri</strong>"));
//! ```

use crate::renderer::{self, escape_attr, escape_html};
use crate::response::{self, AnswerMeta, ChatRequest};
use std::fmt::{self, Write};

/// Answer shown when a `/chat` response cannot be interpreted.
pub const SERVER_ERROR_TEXT: &str = "Server error. Please try again.";

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The person asking questions.
    User,
    /// The assistant.
    Bot,
}

impl Role {
    /// Returns the CSS class for the message wrapper.
    #[must_use]
    pub const fn class(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

/// One entry in the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Author of the message.
    pub role: Role,
    /// Raw message text, rendered as markdown.
    pub text: String,
    /// Answer metadata, present on bot answers.
    pub meta: Option<AnswerMeta>,
}

/// The status line shown under the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Idle and waiting for a question.
    #[default]
    Ready,
    /// A question is in flight.
    Thinking,
    /// The last question failed.
    Error,
    /// A reindex is in flight.
    Reindexing,
    /// The last reindex succeeded.
    Reindexed,
    /// The last reindex failed.
    ReindexFailed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ready => "Ready",
            Self::Thinking => "Thinking…",
            Self::Error => "Error",
            Self::Reindexing => "Reindexing…",
            Self::Reindexed => "Reindexed",
            Self::ReindexFailed => "Reindex failed",
        })
    }
}

/// Conversation state for one chat view.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    status: Status,
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transcript opening with a bot greeting.
    #[must_use]
    pub fn with_greeting(text: &str) -> Self {
        let mut transcript = Self::new();
        transcript.messages.push(Message {
            role: Role::Bot,
            text: text.to_owned(),
            meta: Some(AnswerMeta {
                confidence: 1.0,
                ..AnswerMeta::default()
            }),
        });
        transcript
    }

    /// Messages in display order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current status line.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Records a question and returns the `/chat` body to send.
    ///
    /// Blank questions are ignored and return `None`.
    pub fn ask(&mut self, question: &str) -> Option<ChatRequest> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        self.messages.push(Message {
            role: Role::User,
            text: question.to_owned(),
            meta: None,
        });
        self.status = Status::Thinking;

        Some(ChatRequest {
            question: question.to_owned(),
        })
    }

    /// Records the `/chat` response body for the pending question.
    ///
    /// A body that cannot be parsed becomes a server-error answer.
    pub fn receive(&mut self, body: &str) {
        match response::parse_chat_response(body) {
            Ok(response) => {
                let meta = response.meta();
                self.messages.push(Message {
                    role: Role::Bot,
                    text: response.answer,
                    meta: Some(meta),
                });
                self.status = Status::Ready;
            }
            Err(err) => {
                tracing::debug!(error = %err, "unreadable chat response");
                self.fail();
            }
        }
    }

    /// Records a transport failure for the pending question.
    pub fn fail(&mut self) {
        self.messages.push(Message {
            role: Role::Bot,
            text: SERVER_ERROR_TEXT.to_owned(),
            meta: Some(AnswerMeta::error()),
        });
        self.status = Status::Error;
    }

    /// Marks a reindex as in flight.
    pub const fn begin_reindex(&mut self) {
        self.status = Status::Reindexing;
    }

    /// Records the `/reindex` response body.
    pub fn finish_reindex(&mut self, body: &str) {
        self.status = match response::parse_reindex_response(body) {
            Ok(response) if response.ok => {
                tracing::debug!(stats = ?response.stats, "reindex finished");
                Status::Reindexed
            }
            Ok(_) => Status::ReindexFailed,
            Err(err) => {
                tracing::debug!(error = %err, "unreadable reindex response");
                Status::ReindexFailed
            }
        };
    }

    /// Returns the status line to `Ready`, e.g. after a reindex notice.
    pub const fn settle(&mut self) {
        self.status = Status::Ready;
    }

    /// Renders every message in order.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.messages.iter().map(render_message).collect()
    }
}

/// Renders one message bubble.
#[must_use]
pub fn render_message(message: &Message) -> String {
    let mut out = String::new();
    write!(
        out,
        "<div class=\"msg {}\"><div class=\"bubble\">{}",
        message.role.class(),
        renderer::render(&message.text)
    )
    .unwrap();

    if let Some(meta) = &message.meta {
        render_meta(&mut out, meta);
    }

    out.push_str("</div></div>");
    out
}

fn render_meta(out: &mut String, meta: &AnswerMeta) {
    let label = meta.mode.label();
    write!(
        out,
        "<div class=\"meta\"><span class=\"badge {}\">{}</span><span>confidence={}</span>",
        escape_attr(label),
        escape_html(&label.to_uppercase()),
        format_confidence(meta.confidence)
    )
    .unwrap();

    if !meta.sources.is_empty() {
        out.push_str("<div class=\"sources\">");
        for source in &meta.sources {
            write!(out, "<span class=\"source\">{}</span>", escape_html(source)).unwrap();
        }
        out.push_str("</div>");
    }

    out.push_str("</div>");
}

/// Formats a confidence score with two decimals.
///
/// Exact ties round away from zero (`0.125` shows as `0.13`); `{:.2}` alone
/// would round them to even.
#[allow(clippy::float_cmp)]
fn format_confidence(score: f64) -> String {
    let magnitude = score.abs();
    let scaled = magnitude * 100.0;
    // `mul_add` yields the rounding error of the product, zero when exact.
    let exact = magnitude.mul_add(100.0, -scaled) == 0.0;

    if exact && scaled.fract() == 0.5 {
        let sign = if score < 0.0 { "-" } else { "" };
        return format!("{sign}{:.2}", scaled.ceil() / 100.0);
    }
    format!("{score:.2}")
}
