// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Safe markdown-subset rendering for a knowledge-base chat widget.
//!
//! Answers from a question-answering backend arrive as plain text using a
//! small markdown subset. This crate turns that text into HTML fragments for
//! the chat page without ever letting answer text inject markup of its own.
//!
//! # Overview
//!
//! 1. [`renderer`] escapes the answer and renders headings, flat lists,
//!    paragraphs, spacers, `Sources:` lines, `**bold**` and `` `code` ``
//! 2. [`response`] interprets `/chat` and `/reindex` bodies
//! 3. [`transcript`] keeps the conversation and renders message bubbles
//! 4. [`guide`] holds the guided-prompt menu and sample questions
//!
//! # Example
//!
//! ```
//! use faqmd::renderer;
//!
//! let html = renderer::render("Sources: <pricing.md>");
//! assert_eq!(html, "<div class=\"md-sources\">Sources: &lt;pricing.md&gt;</div>");
//! ```
//!
//! # Modules
//!
//! - [`renderer`]: the markdown-subset renderer
//! - [`response`]: request and response payloads for the backend
//! - [`transcript`]: the conversation controller
//! - [`guide`]: guided prompts and sample questions

#![deny(missing_docs)]

pub mod guide;
pub mod renderer;
pub mod response;
pub mod transcript;
