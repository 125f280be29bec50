// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Typed payloads for the knowledge-base backend.
//!
//! The chat page talks to two endpoints:
//!
//! - `POST /chat` with `{ "question": "..." }`, answered by a body carrying the
//!   answer text, its sources, a confidence score, and whether the backend
//!   fell back to a canned reply.
//! - `POST /reindex`, answered by `{ "ok": true, "stats": { ... } }`.
//!
//! Transport is the caller's business. This module only builds request
//! bodies and interprets response bodies.
//!
//! # Example
//!
//! ```
//! use faqmd::response::{parse_chat_response, Mode};
//!
//! let json = r#"{
//!     "answer": "We offer Fixed Price and Time & Materials.",
//!     "sources": ["pricing.md"],
//!     "confidence": 0.78,
//!     "is_fallback": false
//! }"#;
//!
//! let response = parse_chat_response(json).unwrap();
//! let meta = response.meta();
//!
//! assert_eq!(meta.mode, Mode::Grounded);
//! assert_eq!(meta.sources, ["pricing.md"]);
//! ```

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Error type for response body parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// The body is not valid JSON, or is JSON `null`.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// Body of a `POST /chat` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    /// The user's question, already trimmed.
    pub question: String,
}

impl ChatRequest {
    /// Serializes the request as a JSON body.
    #[must_use]
    pub fn to_json(&self) -> String {
        // A single string field always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// How the backend arrived at an answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// The answer is drawn from the knowledge base.
    #[default]
    Grounded,
    /// The knowledge base did not cover the question.
    Fallback,
    /// The request failed before an answer was produced.
    Error,
    /// A label this client does not know about, shown as-is.
    Other(String),
}

impl Mode {
    /// Returns the lowercase label, also used as the badge class.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Grounded => "grounded",
            Self::Fallback => "fallback",
            Self::Error => "error",
            Self::Other(label) => label.as_str(),
        }
    }
}

impl From<&str> for Mode {
    fn from(label: &str) -> Self {
        match label {
            "grounded" => Self::Grounded,
            "fallback" => Self::Fallback,
            "error" => Self::Error,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Metadata shown under a bot answer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnswerMeta {
    /// Grounded, fallback, or error.
    pub mode: Mode,
    /// Backend confidence, normally between 0 and 1.
    pub confidence: f64,
    /// Knowledge-base files the answer was drawn from.
    pub sources: Vec<String>,
}

impl AnswerMeta {
    /// Metadata for a request that never produced an answer.
    #[must_use]
    pub const fn error() -> Self {
        Self {
            mode: Mode::Error,
            confidence: 0.0,
            sources: Vec::new(),
        }
    }
}

/// Body of a `POST /chat` response.
///
/// Every field is optional on the wire; missing or mistyped fields fall back
/// to their defaults instead of failing the whole response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatResponse {
    /// Answer text in the markdown subset understood by
    /// [`renderer`](crate::renderer).
    pub answer: String,
    /// Source file names.
    pub sources: Vec<String>,
    /// Confidence score. Non-numeric values read as 0.
    pub confidence: f64,
    /// Whether the backend used its canned fallback reply.
    pub is_fallback: bool,
    /// Explicit mode label, when the backend sends one.
    pub mode: Option<String>,
}

impl ChatResponse {
    /// Resolves the display mode.
    ///
    /// A non-empty `mode` label wins; otherwise `is_fallback` decides between
    /// fallback and grounded.
    #[must_use]
    pub fn mode(&self) -> Mode {
        match self.mode.as_deref() {
            Some(label) if !label.is_empty() => Mode::from(label),
            _ if self.is_fallback => Mode::Fallback,
            _ => Mode::Grounded,
        }
    }

    /// Builds the metadata shown under the answer.
    #[must_use]
    pub fn meta(&self) -> AnswerMeta {
        AnswerMeta {
            mode: self.mode(),
            confidence: self.confidence,
            sources: self.sources.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for ChatResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        // Any other non-object body reads as an empty answer with defaults.
        if value.is_null() {
            return Err(serde::de::Error::custom("expected a response body, got null"));
        }

        let answer = value
            .get("answer")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_owned();

        let sources = value
            .get("sources")
            .and_then(serde_json::Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(serde_json::Value::as_str)
            .map(str::to_owned)
            .collect();

        let is_fallback = value
            .get("is_fallback")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        let mode = value
            .get("mode")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        Ok(Self {
            answer,
            sources,
            confidence: extract_confidence(value.get("confidence")),
            is_fallback,
            mode,
        })
    }
}

/// Reads a confidence score from a number or a numeric string.
fn extract_confidence(value: Option<&serde_json::Value>) -> f64 {
    let score = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    score.filter(|s: &f64| s.is_finite()).unwrap_or(0.0)
}

/// Index statistics reported by `/reindex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct IndexStats {
    /// Number of knowledge-base documents indexed.
    pub docs: u64,
    /// Number of chunks produced from those documents.
    pub chunks: u64,
    /// Embedding dimension.
    pub dim: u64,
}

/// Body of a `POST /reindex` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ReindexResponse {
    /// Whether the index was rebuilt.
    pub ok: bool,
    /// Statistics for the rebuilt index.
    pub stats: Option<IndexStats>,
}

/// Parses a `/chat` response body.
///
/// # Errors
///
/// Returns an error if the body is not valid JSON or is `null`.
pub fn parse_chat_response(json_str: &str) -> Result<ChatResponse, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

/// Parses a `/reindex` response body.
///
/// # Errors
///
/// Returns an error if the body is not valid JSON of the expected shape.
pub fn parse_reindex_response(json_str: &str) -> Result<ReindexResponse, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_response() {
        let response = parse_chat_response(
            r#"{
                "answer": "Mon-Fri, 09:00-17:00 CET.",
                "sources": ["support.md", "sla.md"],
                "confidence": 0.85,
                "is_fallback": false
            }"#,
        )
        .unwrap();

        assert_eq!(response.answer, "Mon-Fri, 09:00-17:00 CET.");
        assert_eq!(response.sources, ["support.md", "sla.md"]);
        assert!((response.confidence - 0.85).abs() < f64::EPSILON);
        assert_eq!(response.mode(), Mode::Grounded);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let response = parse_chat_response("{}").unwrap();

        assert_eq!(response, ChatResponse::default());
        assert_eq!(response.mode(), Mode::Grounded);
    }

    #[test]
    fn fallback_flag_sets_mode() {
        let response =
            parse_chat_response(r#"{"answer": "Sorry", "is_fallback": true}"#).unwrap();

        assert_eq!(response.mode(), Mode::Fallback);
    }

    #[test]
    fn explicit_mode_wins_over_fallback_flag() {
        let response =
            parse_chat_response(r#"{"mode": "clarify", "is_fallback": true}"#).unwrap();

        assert_eq!(response.mode(), Mode::Other("clarify".into()));
        assert_eq!(response.mode().label(), "clarify");
    }

    #[test]
    fn empty_mode_falls_through_to_flag() {
        let response = parse_chat_response(r#"{"mode": "", "is_fallback": true}"#).unwrap();

        assert_eq!(response.mode(), Mode::Fallback);
    }

    #[test]
    fn confidence_accepts_numeric_strings() {
        let response = parse_chat_response(r#"{"confidence": " 0.5 "}"#).unwrap();
        assert!((response.confidence - 0.5).abs() < f64::EPSILON);

        let response = parse_chat_response(r#"{"confidence": "high"}"#).unwrap();
        assert!(response.confidence.abs() < f64::EPSILON);

        let response = parse_chat_response(r#"{"confidence": null}"#).unwrap();
        assert!(response.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn skips_non_string_sources() {
        let response = parse_chat_response(r#"{"sources": ["a.md", 3, null, "b.md"]}"#).unwrap();

        assert_eq!(response.sources, ["a.md", "b.md"]);
    }

    #[test]
    fn meta_copies_sources_and_confidence() {
        let response = ChatResponse {
            answer: "x".into(),
            sources: vec!["faq.md".into()],
            confidence: 0.4,
            is_fallback: false,
            mode: None,
        };
        let meta = response.meta();

        assert_eq!(meta.mode, Mode::Grounded);
        assert_eq!(meta.sources, ["faq.md"]);
        assert!((meta.confidence - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn mode_round_trips_known_labels() {
        for label in ["grounded", "fallback", "error"] {
            assert_eq!(Mode::from(label).label(), label);
        }
        assert_eq!(Mode::from("fallback"), Mode::Fallback);
    }

    #[test]
    fn serializes_chat_request() {
        let request = ChatRequest {
            question: "Can we sign an \"NDA\"?".into(),
        };

        assert_eq!(request.to_json(), r#"{"question":"Can we sign an \"NDA\"?"}"#);
    }

    #[test]
    fn parses_reindex_response() {
        let response =
            parse_reindex_response(r#"{"ok": true, "stats": {"docs": 6, "chunks": 31, "dim": 384}}"#)
                .unwrap();

        assert!(response.ok);
        assert_eq!(
            response.stats,
            Some(IndexStats {
                docs: 6,
                chunks: 31,
                dim: 384
            })
        );
    }

    #[test]
    fn reindex_without_ok_is_failure() {
        let response = parse_reindex_response(r#"{"detail": "boom"}"#).unwrap();

        assert!(!response.ok);
        assert!(response.stats.is_none());
    }

    #[test]
    fn returns_error_for_invalid_json() {
        assert!(parse_chat_response("<html>502 Bad Gateway</html>").is_err());
        assert!(parse_reindex_response("not json").is_err());
    }

    #[test]
    fn non_object_body_reads_as_empty_answer() {
        assert_eq!(parse_chat_response("[1, 2]").unwrap(), ChatResponse::default());
        assert_eq!(
            parse_chat_response("\"answer\"").unwrap(),
            ChatResponse::default()
        );
    }

    #[test]
    fn null_or_invalid_body_is_an_error() {
        assert!(parse_chat_response("null").is_err());
        assert!(parse_chat_response("{ not json").is_err());
    }
}
