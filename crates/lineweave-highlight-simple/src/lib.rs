//! `lineweave-highlight-simple` - Simple (regex-based) language modes for `lineweave`.
//!
//! This crate is intended for lightweight formats (JSON/INI/C-like sources) where a real
//! incremental parser is unnecessary. Highlighting is line-local: every line is matched on its
//! own, so an edit never changes the highlighting of other lines.

use std::sync::Arc;

use lineweave::{
    CancellationToken, DocumentContext, DocumentLine, HighlightError, HighlightSpan, LanguageMode,
    LineChangeSet, LinePosition, LineSyntaxHighlighter, TextChange, TextRange, utf16_prefix,
};
use lineweave_lang::{
    BracketPair, IndentLevelMeasurer, IndentStrategy, InsertLineBreakIndentStrategy,
};
use regex::Regex;
use thiserror::Error;
use tracing::trace;

/// A rule failed to compile.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The pattern is not a valid regex.
    #[error("invalid highlight pattern: {0}")]
    Regex(#[from] regex::Error),
    /// Spans need a capture name to be styled by.
    #[error("capture name must not be empty")]
    EmptyCapture,
}

/// A single regex highlighting rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    capture: String,
    capture_group: Option<usize>,
}

impl RegexRule {
    /// Compile `pattern`; every match is highlighted as `capture`.
    pub fn new(pattern: &str, capture: impl Into<String>) -> Result<Self, RuleError> {
        let capture = capture.into();
        if capture.is_empty() {
            return Err(RuleError::EmptyCapture);
        }
        Ok(Self {
            regex: Regex::new(pattern)?,
            capture,
            capture_group: None,
        })
    }

    /// Highlight only a capture group of each match.
    ///
    /// Example (INI key):
    /// - pattern: `^\\s*([^=\\s]+)\\s*=`
    /// - capture_group: `1` (the key)
    pub fn with_capture_group(mut self, group: usize) -> Self {
        self.capture_group = Some(group);
        self
    }

    /// Capture name given to the spans of this rule.
    pub fn capture(&self) -> &str {
        &self.capture
    }

    fn matches<'t>(&self, text: &'t str) -> Vec<regex::Match<'t>> {
        match self.capture_group {
            Some(group) => self
                .regex
                .captures_iter(text)
                .filter_map(|captures| captures.get(group))
                .collect(),
            None => self.regex.find_iter(text).collect(),
        }
    }
}

/// A simple regex-based line highlighter.
///
/// Designed for simple formats (JSON/INI/etc.). It is *not* intended to be a full parser.
/// Spans are returned sorted by location; where rules overlap, every span is kept and the
/// earlier rule comes first.
#[derive(Debug, Clone)]
pub struct RegexHighlighter {
    rules: Vec<RegexRule>,
}

impl RegexHighlighter {
    /// A highlighter applying `rules` in order.
    pub fn new(rules: Vec<RegexRule>) -> Self {
        Self { rules }
    }

    /// Rules in the order they are matched.
    pub fn rules(&self) -> &[RegexRule] {
        &self.rules
    }

    /// A small default JSON grammar (strings, numbers, booleans, null).
    pub fn json_default() -> Result<Self, RuleError> {
        Ok(Self::new(vec![
            // JSON string (single-line, handles escapes)
            RegexRule::new(r#""(?:\\.|[^"\\])*""#, "string")?,
            RegexRule::new(r#"-?\b(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?\b"#, "number")?,
            RegexRule::new(r#"\b(?:true|false)\b"#, "constant.builtin")?,
            RegexRule::new(r#"\bnull\b"#, "constant.builtin")?,
        ]))
    }

    /// A small default INI grammar (section, key, comment).
    pub fn ini_default() -> Result<Self, RuleError> {
        Ok(Self::new(vec![
            // Section header: [section]
            RegexRule::new(r#"^\s*\[([^\]]+)\]\s*$"#, "type")?.with_capture_group(1),
            // Key: key = value
            RegexRule::new(r#"^\s*([^=\s;#]+)\s*="#, "property")?.with_capture_group(1),
            // Comment: ;... or #...
            RegexRule::new(r#"^\s*[;#].*$"#, "comment")?,
        ]))
    }

    /// Keywords, strings, numbers and `//` comments of a brace language.
    pub fn c_like(keywords: &[&str]) -> Result<Self, RuleError> {
        let mut rules = Vec::new();
        if !keywords.is_empty() {
            let alternatives: Vec<String> =
                keywords.iter().map(|keyword| regex::escape(keyword)).collect();
            let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
            rules.push(RegexRule::new(&pattern, "keyword")?);
        }
        rules.push(RegexRule::new(r#""(?:\\.|[^"\\])*""#, "string")?);
        rules.push(RegexRule::new(r"\b\d+(?:\.\d+)?\b", "number")?);
        rules.push(RegexRule::new(r"//.*$", "comment")?);
        Ok(Self::new(rules))
    }
}

impl LineSyntaxHighlighter for RegexHighlighter {
    fn highlight(
        &self,
        text: &str,
        cancellation: &CancellationToken,
    ) -> Result<Vec<HighlightSpan>, HighlightError> {
        let mut spans = Vec::new();
        for rule in &self.rules {
            if cancellation.is_cancelled() {
                return Err(HighlightError::Cancelled);
            }
            spans.extend(
                rule.matches(text)
                    .into_iter()
                    .filter_map(|m| span_from_match(text, m.start(), m.end(), &rule.capture)),
            );
        }
        spans.sort_by_key(|span| span.range.location);
        Ok(spans)
    }
}

fn span_from_match(
    line_text: &str,
    start_byte: usize,
    end_byte: usize,
    capture: &str,
) -> Option<HighlightSpan> {
    if start_byte >= end_byte || end_byte > line_text.len() {
        return None;
    }
    let start = line_text[..start_byte].encode_utf16().count();
    let length = line_text[start_byte..end_byte].encode_utf16().count();
    Some(HighlightSpan::new(TextRange::new(start, length), capture))
}

/// A language mode built from a [`RegexHighlighter`] and bracket-based indentation.
///
/// A line break after an opening bracket indents one level deeper; typed between a matching
/// pair it also pushes the closing bracket onto its own line.
#[derive(Debug, Clone)]
pub struct SimpleLanguageMode {
    name: String,
    highlighter: Arc<RegexHighlighter>,
    bracket_pairs: Vec<BracketPair>,
}

impl SimpleLanguageMode {
    /// A mode named `name` that indents after the default bracket pairs.
    pub fn new(name: impl Into<String>, highlighter: RegexHighlighter) -> Self {
        Self {
            name: name.into(),
            highlighter: Arc::new(highlighter),
            bracket_pairs: BracketPair::defaults(),
        }
    }

    /// Replace the brackets that drive indentation.
    pub fn with_bracket_pairs(mut self, bracket_pairs: Vec<BracketPair>) -> Self {
        self.bracket_pairs = bracket_pairs;
        self
    }

    /// JSON with brace and bracket indentation.
    pub fn json() -> Result<Self, RuleError> {
        Ok(Self::new("json", RegexHighlighter::json_default()?))
    }

    /// INI, without bracket indentation.
    pub fn ini() -> Result<Self, RuleError> {
        Ok(Self::new("ini", RegexHighlighter::ini_default()?).with_bracket_pairs(Vec::new()))
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Brackets that indent a line break.
    pub fn bracket_pairs(&self) -> &[BracketPair] {
        &self.bracket_pairs
    }
}

impl LanguageMode for SimpleLanguageMode {
    fn parse(&mut self, document: DocumentContext<'_>) {
        trace!(mode = %self.name, lines = document.line_manager.line_count(), "parsed document");
    }

    fn text_did_change(
        &mut self,
        _change: &TextChange,
        _document: DocumentContext<'_>,
    ) -> LineChangeSet {
        LineChangeSet::new()
    }

    fn current_indent_level(
        &self,
        line: &DocumentLine,
        document: DocumentContext<'_>,
        strategy: IndentStrategy,
    ) -> usize {
        IndentLevelMeasurer::new(strategy.length_in_spaces())
            .indent_level(&document.line_text(line))
    }

    fn strategy_for_inserting_line_break(
        &self,
        start: LinePosition,
        end: LinePosition,
        document: DocumentContext<'_>,
        strategy: IndentStrategy,
    ) -> InsertLineBreakIndentStrategy {
        let start_text = document.line_text(&document.line_manager.line_at_row(start.row));
        let end_text = document.line_text(&document.line_manager.line_at_row(end.row));
        let before = utf16_prefix(&start_text, start.column);
        let after = &end_text[utf16_prefix(&end_text, end.column).len()..];
        let level = IndentLevelMeasurer::new(strategy.length_in_spaces()).indent_level(before);
        let Some(pair) = self.bracket_pairs.iter().find(|pair| pair.opens(before)) else {
            return InsertLineBreakIndentStrategy::new(level, false);
        };
        InsertLineBreakIndentStrategy::new(level + 1, pair.closes(after))
    }

    fn syntax_highlighter(&self) -> Arc<dyn LineSyntaxHighlighter> {
        self.highlighter.clone()
    }
}
