// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Markdown-subset rendering for assistant answers.
//!
//! Answer text coming back from the knowledge-base backend is untrusted. This
//! module turns it into a small, fixed vocabulary of HTML elements that the
//! chat page can insert directly into a message bubble.
//!
//! # Pipeline
//!
//! 1. The whole input is HTML-escaped once (`&` first, then `<` and `>`).
//! 2. The escaped text is split into lines and each trimmed line is
//!    classified as a heading, list item, blank line, sources annotation,
//!    or paragraph.
//! 3. Text-bearing lines get inline formatting: `` `code` `` spans first,
//!    then `**bold**` over the whole line, treating each code span as an
//!    opaque unit.
//!
//! # Output vocabulary
//!
//! | Input                | Output                                   |
//! |----------------------|------------------------------------------|
//! | `## Title`           | `<div class="md-h md-h2">Title</div>`    |
//! | `- item`             | `<ul class='md-ul'><li>item</li></ul>`   |
//! | blank line           | `<div class='md-spacer'></div>`          |
//! | `Sources: a.md`      | `<div class="md-sources">Sources: a.md</div>` |
//! | anything else        | `<div class="md-p">…</div>`              |
//!
//! # Example
//!
//! ```
//! use faqmd::renderer::render;
//!
//! let html = render("## Pricing\n- **Fixed** price\n- `T&M`");
//!
//! assert_eq!(
//!     html,
//!     "<div class=\"md-h md-h2\">Pricing</div>\
//!      <ul class='md-ul'><li><strong>Fixed</strong> price</li>\
//!      <li><code>T&amp;M</code></li></ul>"
//! );
//! ```

use regex::Regex;
use std::fmt::Write;
use std::ops::Range;
use std::sync::LazyLock;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("heading regex"));

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-+\s+(.*)$").expect("list item regex"));

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold regex"));

static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`.+?`").expect("code regex"));

const LIST_OPEN: &str = "<ul class='md-ul'>";
const LIST_CLOSE: &str = "</ul>";
const SPACER: &str = "<div class='md-spacer'></div>";

/// Block-level classification of one trimmed, escaped line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block<'a> {
    Heading { level: usize, text: &'a str },
    ListItem(&'a str),
    Blank,
    Sources(&'a str),
    Paragraph(&'a str),
}

impl<'a> Block<'a> {
    /// Classifies a trimmed line. The first matching rule wins.
    fn classify(line: &'a str) -> Self {
        if let Some(caps) = HEADING_RE.captures(line) {
            let (Some(hashes), Some(text)) = (caps.get(1), caps.get(2)) else {
                return Self::Paragraph(line);
            };
            return Self::Heading {
                level: hashes.len(),
                text: text.as_str(),
            };
        }

        if let Some(text) = LIST_ITEM_RE.captures(line).and_then(|caps| caps.get(1)) {
            return Self::ListItem(text.as_str());
        }

        if line.is_empty() {
            Self::Blank
        } else if line.to_lowercase().starts_with("sources:") {
            Self::Sources(line)
        } else {
            Self::Paragraph(line)
        }
    }
}

/// Renders answer text as safe chat markup.
///
/// Every input is valid, including the empty string, which renders as a
/// single spacer. An open list is always closed before the next non-item
/// line and at the end of the input.
#[must_use]
pub fn render(text: &str) -> String {
    let escaped = escape_html(text);
    let mut out = String::with_capacity(escaped.len() * 2);
    let mut in_list = false;

    for raw in escaped.split('\n') {
        let block = Block::classify(raw.trim());

        match block {
            Block::ListItem(_) if !in_list => {
                out.push_str(LIST_OPEN);
                in_list = true;
            }
            Block::ListItem(_) => {}
            _ if in_list => {
                out.push_str(LIST_CLOSE);
                in_list = false;
            }
            _ => {}
        }

        match block {
            Block::Heading { level, text } => {
                write!(out, "<div class=\"md-h md-h{level}\">{}</div>", inline(text)).unwrap();
            }
            Block::ListItem(text) => write!(out, "<li>{}</li>", inline(text)).unwrap(),
            Block::Blank => out.push_str(SPACER),
            Block::Sources(line) => {
                write!(out, "<div class=\"md-sources\">{}</div>", inline(line)).unwrap();
            }
            Block::Paragraph(line) => {
                write!(out, "<div class=\"md-p\">{}</div>", inline(line)).unwrap();
            }
        }
    }

    if in_list {
        out.push_str(LIST_CLOSE);
    }

    out
}

/// Like [`render`], treating absent text as the empty string.
#[must_use]
pub fn render_opt(text: Option<&str>) -> String {
    render(text.unwrap_or_default())
}

/// Escapes the characters that an HTML parser would treat as markup.
///
/// `&` is replaced before `<` and `>` so the entities introduced here are
/// never encoded a second time.
#[must_use]
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escapes text for use inside a double-quoted attribute value.
pub(crate) fn escape_attr(s: &str) -> String {
    escape_html(s).replace('"', "&quot;")
}

/// Applies inline formatting to an already-escaped fragment.
///
/// Code spans are resolved first and their contents are left untouched.
/// Bold then runs over the whole fragment with each code span masked out,
/// so a `**` pair may wrap a code span but never opens or closes inside one.
fn inline(s: &str) -> String {
    let spans: Vec<Range<usize>> = CODE_RE.find_iter(s).map(|m| m.range()).collect();

    // Same byte offsets as `s`, with every code span replaced by `x`s.
    let mut masked = String::with_capacity(s.len());
    let mut last = 0;
    for span in &spans {
        masked.push_str(&s[last..span.start]);
        masked.push_str(&"x".repeat(span.len()));
        last = span.end;
    }
    masked.push_str(&s[last..]);

    let mut out = String::with_capacity(s.len() + 32);
    let mut last = 0;
    for bold in BOLD_RE.find_iter(&masked) {
        push_code(&mut out, s, &spans, last..bold.start());
        out.push_str("<strong>");
        push_code(&mut out, s, &spans, bold.start() + 2..bold.end() - 2);
        out.push_str("</strong>");
        last = bold.end();
    }
    push_code(&mut out, s, &spans, last..s.len());

    out
}

/// Copies `s[range]` into `out`, rendering the code spans that lie inside it.
///
/// Bold boundaries never fall inside a code span, so every span is either
/// wholly inside `range` or wholly outside it.
fn push_code(out: &mut String, s: &str, spans: &[Range<usize>], range: Range<usize>) {
    let mut pos = range.start;
    for span in spans
        .iter()
        .filter(|span| span.start >= range.start && span.end <= range.end)
    {
        out.push_str(&s[pos..span.start]);
        write!(out, "<code>{}</code>", &s[span.start + 1..span.end - 1]).unwrap();
        pos = span.end;
    }
    out.push_str(&s[pos..range.end]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Every tag the renderer is allowed to emit.
    const VOCABULARY: &[&str] = &[
        "<div class=\"md-h md-h1\">",
        "<div class=\"md-h md-h2\">",
        "<div class=\"md-h md-h3\">",
        "<div class=\"md-h md-h4\">",
        "<div class=\"md-h md-h5\">",
        "<div class=\"md-h md-h6\">",
        "<div class=\"md-p\">",
        "<div class=\"md-sources\">",
        "<div class='md-spacer'>",
        "</div>",
        "<ul class='md-ul'>",
        "</ul>",
        "<li>",
        "</li>",
        "<strong>",
        "</strong>",
        "<code>",
        "</code>",
    ];

    fn strip_vocabulary(html: &str) -> String {
        VOCABULARY
            .iter()
            .fold(html.to_owned(), |acc, tag| acc.replace(tag, ""))
    }

    #[test]
    fn escapes_markup_significant_characters() {
        assert_eq!(
            render("5 < 6 & 7 > 3"),
            "<div class=\"md-p\">5 &lt; 6 &amp; 7 &gt; 3</div>"
        );
    }

    #[test]
    fn escapes_ampersand_exactly_once() {
        assert_eq!(escape_html("&amp;"), "&amp;amp;");
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
        assert_eq!(render("&amp;"), "<div class=\"md-p\">&amp;amp;</div>");
    }

    #[test]
    fn neutralizes_script_tags() {
        let html = render("<script>alert('x')</script>");

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert('x')&lt;/script&gt;"));
    }

    #[test]
    fn renders_heading_levels() {
        assert_eq!(render("## Pricing"), "<div class=\"md-h md-h2\">Pricing</div>");
        assert_eq!(render("# One"), "<div class=\"md-h md-h1\">One</div>");
        assert_eq!(render("###### Six"), "<div class=\"md-h md-h6\">Six</div>");
    }

    #[test]
    fn seven_hashes_is_a_paragraph() {
        assert_eq!(
            render("####### Seven"),
            "<div class=\"md-p\">####### Seven</div>"
        );
    }

    #[test]
    fn heading_requires_whitespace_after_hashes() {
        assert_eq!(render("#tag"), "<div class=\"md-p\">#tag</div>");
        assert_eq!(render("#\tTabbed"), "<div class=\"md-h md-h1\">Tabbed</div>");
    }

    #[test]
    fn lone_marker_is_a_paragraph() {
        // Trimming removes the space the marker would need.
        assert_eq!(render("# "), "<div class=\"md-p\">#</div>");
        assert_eq!(render("- "), "<div class=\"md-p\">-</div>");
    }

    #[test]
    fn closes_list_before_paragraph() {
        assert_eq!(
            render("- a\n- b\nc"),
            "<ul class='md-ul'><li>a</li><li>b</li></ul><div class=\"md-p\">c</div>"
        );
    }

    #[test]
    fn closes_list_at_end_of_input() {
        assert_eq!(
            render("- a\n- b"),
            "<ul class='md-ul'><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn closes_list_before_heading_and_blank() {
        assert_eq!(
            render("- a\n# H\n- b\n\nc"),
            "<ul class='md-ul'><li>a</li></ul>\
             <div class=\"md-h md-h1\">H</div>\
             <ul class='md-ul'><li>b</li></ul>\
             <div class='md-spacer'></div>\
             <div class=\"md-p\">c</div>"
        );
    }

    #[test]
    fn flattens_nested_dashes() {
        assert_eq!(
            render("- a\n-- b\n  --- c"),
            "<ul class='md-ul'><li>a</li><li>b</li><li>c</li></ul>"
        );
    }

    #[test]
    fn renders_bold_and_code() {
        assert_eq!(
            render("**hi** and `x=1`"),
            "<div class=\"md-p\"><strong>hi</strong> and <code>x=1</code></div>"
        );
    }

    #[test]
    fn bold_is_non_greedy() {
        assert_eq!(
            render("**a** b **c**"),
            "<div class=\"md-p\"><strong>a</strong> b <strong>c</strong></div>"
        );
    }

    #[test]
    fn leaves_unmatched_markers_literal() {
        assert_eq!(render("**open"), "<div class=\"md-p\">**open</div>");
        assert_eq!(render("a ` b"), "<div class=\"md-p\">a ` b</div>");
        assert_eq!(render("****"), "<div class=\"md-p\">****</div>");
    }

    #[test]
    fn code_span_contents_are_inert() {
        assert_eq!(
            render("`**not bold**`"),
            "<div class=\"md-p\"><code>**not bold**</code></div>"
        );
    }

    #[test]
    fn renders_bold_wrapping_code() {
        assert_eq!(
            render("**`x`**"),
            "<div class=\"md-p\"><strong><code>x</code></strong></div>"
        );
        assert_eq!(
            render("**Use `cargo` here**"),
            "<div class=\"md-p\"><strong>Use <code>cargo</code> here</strong></div>"
        );
        assert_eq!(
            render("**`pip install`** first"),
            "<div class=\"md-p\"><strong><code>pip install</code></strong> first</div>"
        );
    }

    #[test]
    fn bold_around_code_with_stars_inside() {
        assert_eq!(
            render("**see `a**b`** now"),
            "<div class=\"md-p\"><strong>see <code>a**b</code></strong> now</div>"
        );
    }

    #[test]
    fn code_span_wins_when_markers_straddle() {
        assert_eq!(
            render("**a`b**c`"),
            "<div class=\"md-p\">**a<code>b**c</code></div>"
        );
    }

    #[test]
    fn code_span_escapes_markup() {
        assert_eq!(
            render("`<b>`"),
            "<div class=\"md-p\"><code>&lt;b&gt;</code></div>"
        );
    }

    #[test]
    fn renders_sources_line_in_original_case() {
        assert_eq!(
            render("Sources: kb/pricing.md"),
            "<div class=\"md-sources\">Sources: kb/pricing.md</div>"
        );
        assert_eq!(
            render("SOURCES: a.md, b.md"),
            "<div class=\"md-sources\">SOURCES: a.md, b.md</div>"
        );
    }

    #[test]
    fn sources_line_closes_list() {
        assert_eq!(
            render("- a\nsources: x.md"),
            "<ul class='md-ul'><li>a</li></ul><div class=\"md-sources\">sources: x.md</div>"
        );
    }

    #[test]
    fn separates_paragraphs_with_spacer() {
        assert_eq!(
            render("a\n\nb"),
            "<div class=\"md-p\">a</div><div class='md-spacer'></div><div class=\"md-p\">b</div>"
        );
    }

    #[test]
    fn empty_input_is_single_spacer() {
        assert_eq!(render(""), SPACER);
        assert_eq!(render_opt(None), SPACER);
    }

    #[test]
    fn trims_surrounding_whitespace_and_carriage_returns() {
        assert_eq!(
            render("  hello  \r\n\t- item\r"),
            "<div class=\"md-p\">hello</div><ul class='md-ul'><li>item</li></ul>"
        );
    }

    #[test]
    fn escape_attr_quotes() {
        assert_eq!(escape_attr(r#"say "hi" & <go>"#), "say &quot;hi&quot; &amp; &lt;go&gt;");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn user_angle_brackets_never_survive(input in r"[a-zA-Z0-9 <>&*`#:/\n-]{0,80}") {
            let html = render(&input);
            let rest = strip_vocabulary(&html);
            prop_assert!(!rest.contains('<'), "stray '<' in {html:?}");
            prop_assert!(!rest.contains('>'), "stray '>' in {html:?}");
        }

        #[test]
        fn lists_are_balanced(input in r"(- [a-z]{1,5}\n|[a-z]{1,5}\n|\n){0,12}") {
            let html = render(&input);
            prop_assert_eq!(
                html.matches(LIST_OPEN).count(),
                html.matches(LIST_CLOSE).count()
            );
        }
    }
}
