//! The pluggable language capability.
//!
//! The core never parses. A [`LanguageMode`] is told about every edit and answers indentation
//! queries; it also hands out the per-line highlighter used by line controllers.

use std::fmt;
use std::sync::Arc;

use lineweave_lang::{
    DetectedIndentStrategy, INDENT_DETECTION_MAX_LINES, IndentLevelMeasurer, IndentStrategy,
    InsertLineBreakIndentStrategy, detect_indent_strategy,
};

use crate::highlight::{LineSyntaxHighlighter, PlainTextSyntaxHighlighter};
use crate::line_change_set::LineChangeSet;
use crate::line_manager::{DocumentLine, LineManager, LinePosition};
use crate::string_view::{StringView, utf16_prefix};
use crate::text_range::{ByteRange, TextRange};

/// An applied edit, as reported to the language mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    /// Replaced range, in the document before the edit.
    pub range: TextRange,
    /// `range` in UTF-16 bytes.
    pub byte_range: ByteRange,
    /// UTF-16 bytes of the inserted text.
    pub bytes_added: usize,
    /// Position of the end of `range` before the edit.
    pub old_end_line_position: LinePosition,
    /// Position of the start of `range`.
    pub start_line_position: LinePosition,
    /// Position of the end of the inserted text after the edit.
    pub new_end_line_position: LinePosition,
    /// Inserted text.
    pub text: String,
}

/// Read access to the document for a language mode.
#[derive(Debug, Clone, Copy)]
pub struct DocumentContext<'a> {
    /// The buffer.
    pub string_view: &'a StringView,
    /// The line tree.
    pub line_manager: &'a LineManager,
}

impl DocumentContext<'_> {
    /// Content of `line` without its delimiter.
    pub fn line_text(&self, line: &DocumentLine) -> String {
        self.string_view.substring(line.range()).unwrap_or_default()
    }
}

/// Parse and indentation queries over the buffer.
pub trait LanguageMode: fmt::Debug {
    /// The document was replaced wholesale.
    fn parse(&mut self, document: DocumentContext<'_>);

    /// An edit was applied. Returns lines whose highlighting changed beyond the edited lines.
    fn text_did_change(
        &mut self,
        change: &TextChange,
        document: DocumentContext<'_>,
    ) -> LineChangeSet;

    /// Indent level of `line`.
    fn current_indent_level(
        &self,
        line: &DocumentLine,
        document: DocumentContext<'_>,
        strategy: IndentStrategy,
    ) -> usize;

    /// How to indent when a line break replaces the text between `start` and `end`.
    fn strategy_for_inserting_line_break(
        &self,
        start: LinePosition,
        end: LinePosition,
        document: DocumentContext<'_>,
        strategy: IndentStrategy,
    ) -> InsertLineBreakIndentStrategy;

    /// Guess the indentation style of the document.
    fn detect_indent_strategy(&self, document: DocumentContext<'_>) -> DetectedIndentStrategy {
        let lines: Vec<String> = document
            .line_manager
            .iter()
            .take(INDENT_DETECTION_MAX_LINES)
            .map(|line| document.line_text(&line))
            .collect();
        detect_indent_strategy(lines.iter().map(String::as_str))
    }

    /// Highlighter for individual lines.
    fn syntax_highlighter(&self) -> Arc<dyn LineSyntaxHighlighter>;
}

/// Language mode for plain text: no highlighting, indentation follows the current line.
#[derive(Debug, Default)]
pub struct PlainTextLanguageMode {
    highlighter: Arc<PlainTextSyntaxHighlighter>,
}

impl PlainTextLanguageMode {
    /// Create the plain text mode.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LanguageMode for PlainTextLanguageMode {
    fn parse(&mut self, _document: DocumentContext<'_>) {}

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
        _end: LinePosition,
        document: DocumentContext<'_>,
        strategy: IndentStrategy,
    ) -> InsertLineBreakIndentStrategy {
        let line = document.line_manager.line_at_row(start.row);
        let text = document.line_text(&line);
        let measurer = IndentLevelMeasurer::new(strategy.length_in_spaces());
        let level = measurer.indent_level(utf16_prefix(&text, start.column));
        InsertLineBreakIndentStrategy::new(level, false)
    }

    fn syntax_highlighter(&self) -> Arc<dyn LineSyntaxHighlighter> {
        self.highlighter.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(text: &str) -> (StringView, LineManager) {
        let view = StringView::new(text);
        let mut manager = LineManager::new();
        manager.rebuild(&view);
        (view, manager)
    }

    #[test]
    fn test_plain_text_indent_level() {
        let (view, manager) = document("fn main() {\n        x\n\ty");
        let context = DocumentContext {
            string_view: &view,
            line_manager: &manager,
        };
        let mode = PlainTextLanguageMode::new();
        let strategy = IndentStrategy::Space { length: 4 };
        assert_eq!(mode.current_indent_level(&manager.line_at_row(0), context, strategy), 0);
        assert_eq!(mode.current_indent_level(&manager.line_at_row(1), context, strategy), 2);
        assert_eq!(mode.current_indent_level(&manager.line_at_row(2), context, strategy), 1);
    }

    #[test]
    fn test_line_break_keeps_leading_indentation() {
        let (view, manager) = document("    let x = 1;");
        let context = DocumentContext {
            string_view: &view,
            line_manager: &manager,
        };
        let mode = PlainTextLanguageMode::new();
        let strategy = IndentStrategy::Space { length: 4 };
        let result = mode.strategy_for_inserting_line_break(
            LinePosition::new(0, 14),
            LinePosition::new(0, 14),
            context,
            strategy,
        );
        assert_eq!(result, InsertLineBreakIndentStrategy::new(1, false));
        // Breaking inside the indentation only keeps what is left of the caret.
        let position = LinePosition::new(0, 2);
        let result = mode.strategy_for_inserting_line_break(position, position, context, strategy);
        assert_eq!(result, InsertLineBreakIndentStrategy::new(0, false));
    }

    #[test]
    fn test_detects_indentation_of_document() {
        let (view, manager) = document("a\n  b\n  c\n    d\n");
        let context = DocumentContext {
            string_view: &view,
            line_manager: &manager,
        };
        assert_eq!(
            PlainTextLanguageMode::new().detect_indent_strategy(context),
            DetectedIndentStrategy::Space { length: 2 }
        );
    }
}
