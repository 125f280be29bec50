// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Guided prompts and sample questions for the chat page.
//!
//! The guided menu is a topic selector feeding a prompt selector; the sample
//! questions are clickable chips above the input. Both are static data,
//! loaded once at startup either from the built-in table or from a JSON file:
//!
//! ```json
//! {
//!   "topics": [
//!     { "name": "Pricing", "prompts": ["What are your pricing models?"] }
//!   ],
//!   "samples": ["What services do you offer?"]
//! }
//! ```

use crate::renderer::{escape_attr, escape_html};
use serde::Deserialize;
use snafu::prelude::*;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Error type for loading a guide file.
#[derive(Debug, Snafu)]
pub enum GuideError {
    /// The guide file could not be read.
    #[snafu(display("failed to read guide {}: {source}", path.display()))]
    Read {
        /// Path of the guide file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The guide file is not valid guide JSON.
    #[snafu(display("failed to parse guide: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// A topic in the guided menu and the prompts offered under it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Topic {
    /// Display name, also used as the option value.
    pub name: String,
    /// Questions offered for this topic, in display order.
    #[serde(default)]
    pub prompts: Vec<String>,
}

/// Guided menu and sample questions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Guide {
    /// Topics in display order.
    #[serde(default)]
    pub topics: Vec<Topic>,
    /// Sample question chips in display order.
    #[serde(default)]
    pub samples: Vec<String>,
}

const BUILTIN_TOPICS: &[(&str, &[&str])] = &[
    (
        "Services",
        &[
            "What services do you offer?",
            "What is included in the Discovery session?",
            "What do you actually deliver in Discovery?",
            "What deliverables do you provide for an MVP build?",
            "What does Maintenance & Support include?",
        ],
    ),
    (
        "Pricing",
        &[
            "What are your pricing models?",
            "What are the payment terms for a Fixed Price project?",
            "How does Time & Materials billing work?",
            "When do you start work for Fixed Price projects?",
        ],
    ),
    (
        "Engagement process",
        &[
            "What is your engagement process from start to finish?",
            "Can we sign an NDA?",
            "What happens after the first call — what are the steps?",
            "Do you deliver work in sprints?",
        ],
    ),
    (
        "Support & SLA",
        &[
            "What are your support hours?",
            "What support channels do you offer?",
            "What is your SLA for a critical outage (Severity 1)?",
            "Do you offer 24/7 support?",
        ],
    ),
    (
        "Policies",
        &[
            "What is your privacy policy?",
            "What is your refund policy for Fixed Price work?",
            "Can meetings be rescheduled?",
            "If work started, how is refund calculated?",
        ],
    ),
];

const BUILTIN_SAMPLES: &[&str] = &[
    "What services do you offer?",
    "What is included in the Discovery session?",
    "Is the Discovery session free?",
    "How does Time & Materials billing work?",
    "When do you start work for Fixed Price projects?",
    "Do you deliver work in sprints?",
    "What are your support hours?",
    "What is your SLA for Severity 1?",
    "What is your refund policy for Fixed Price work?",
    "Can meetings be rescheduled?",
    "What is Bitcoin price today?",
    "Can you draft a legal contract for me?",
];

impl Default for Guide {
    fn default() -> Self {
        Self {
            topics: BUILTIN_TOPICS
                .iter()
                .map(|(name, prompts)| Topic {
                    name: (*name).to_owned(),
                    prompts: prompts.iter().map(|p| (*p).to_owned()).collect(),
                })
                .collect(),
            samples: BUILTIN_SAMPLES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl Guide {
    /// Parses a guide from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json_str: &str) -> Result<Self, GuideError> {
        serde_json::from_str(json_str).context(JsonSnafu)
    }

    /// Reads and parses a guide file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, GuideError> {
        let json = std::fs::read_to_string(path).context(ReadSnafu { path })?;
        let guide = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            topics = guide.topics.len(),
            samples = guide.samples.len(),
            "loaded guide"
        );
        Ok(guide)
    }

    /// Returns the prompts for a topic, or an empty slice for unknown topics.
    #[must_use]
    pub fn prompts(&self, topic: &str) -> &[String] {
        self.topics
            .iter()
            .find(|t| t.name == topic)
            .map(|t| t.prompts.as_slice())
            .unwrap_or_default()
    }

    /// Returns the selected prompt, trimmed, if it is non-empty.
    #[must_use]
    pub fn prompt(&self, topic: &str, index: usize) -> Option<&str> {
        self.prompts(topic)
            .get(index)
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
    }

    /// Renders the topic selector options.
    #[must_use]
    pub fn topic_options(&self) -> String {
        let mut out = String::new();
        for topic in &self.topics {
            push_option(&mut out, &topic.name);
        }
        out
    }

    /// Renders the prompt selector options for a topic.
    #[must_use]
    pub fn prompt_options(&self, topic: &str) -> String {
        let mut out = String::new();
        for prompt in self.prompts(topic) {
            push_option(&mut out, prompt);
        }
        out
    }

    /// Renders the sample question chips.
    #[must_use]
    pub fn sample_chips(&self) -> String {
        let mut out = String::new();
        for sample in &self.samples {
            write!(out, "<div class=\"chip\">{}</div>", escape_html(sample)).unwrap();
        }
        out
    }
}

fn push_option(out: &mut String, value: &str) {
    write!(
        out,
        "<option value=\"{}\">{}</option>",
        escape_attr(value),
        escape_html(value)
    )
    .unwrap();
}
