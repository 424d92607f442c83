#![warn(missing_docs)]
//! `lineweave-lang` - data-driven language configuration helpers for `lineweave`.
//!
//! This crate intentionally stays lightweight and does **not** depend on any parsing or
//! highlighting system. It provides small value types that hosts and language modes use to
//! configure indentation in a language-aware way:
//!
//! - [`IndentStrategy`] - how one level of indentation is written (tabs or N spaces)
//! - [`DetectedIndentStrategy`] - the result of sniffing an existing document
//! - [`InsertLineBreakIndentStrategy`] - what a language mode wants when a line break is typed
//! - [`IndentLevelMeasurer`] - measures the indentation level of a line of text
//! - [`BracketPair`] - open/close tokens that introduce an indentation block

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How one level of indentation is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IndentStrategy {
    /// Indent using a tab character that is displayed `length` cells wide.
    Tab {
        /// Display width of a tab, in cells.
        length: usize,
    },
    /// Indent using `length` spaces per level.
    Space {
        /// Number of spaces per indentation level.
        length: usize,
    },
}

impl IndentStrategy {
    /// Display width of one indentation level, in cells.
    pub fn tab_length(&self) -> usize {
        match *self {
            Self::Tab { length } | Self::Space { length } => length.max(1),
        }
    }

    /// Width of one indentation level expressed in spaces.
    ///
    /// Used when measuring the indentation of existing text, where a tab counts as a full level.
    pub fn length_in_spaces(&self) -> usize {
        self.tab_length()
    }

    /// Length in UTF-16 code units of the text written for one indentation level.
    pub fn unit_length(&self) -> usize {
        match *self {
            Self::Tab { .. } => 1,
            Self::Space { length } => length.max(1),
        }
    }

    /// The text that produces `indent_level` levels of indentation.
    pub fn string(&self, indent_level: usize) -> String {
        match *self {
            Self::Tab { .. } => "\t".repeat(indent_level),
            Self::Space { length } => " ".repeat(length.max(1) * indent_level),
        }
    }
}

impl Default for IndentStrategy {
    fn default() -> Self {
        Self::Space { length: 4 }
    }
}

/// Indentation style found by scanning a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DetectedIndentStrategy {
    /// The document is indented with tabs.
    Tab,
    /// The document is indented with spaces, `length` per level.
    Space {
        /// Smallest indentation step seen.
        length: usize,
    },
    /// Not enough indented lines to decide.
    #[default]
    Unknown,
}

/// What a language mode wants to happen when a line break is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertLineBreakIndentStrategy {
    /// Indentation level of the new line.
    pub indent_level: usize,
    /// Whether to insert a second line break so the caret lands in a new, indented block
    /// (typing Enter between `{` and `}`).
    pub insert_extra_line_break: bool,
}

impl InsertLineBreakIndentStrategy {
    /// Create a strategy.
    pub fn new(indent_level: usize, insert_extra_line_break: bool) -> Self {
        Self {
            indent_level,
            insert_extra_line_break,
        }
    }
}

/// Measures the indentation level of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndentLevelMeasurer {
    indent_length_in_spaces: usize,
}

impl IndentLevelMeasurer {
    /// Create a measurer where one level is `indent_length_in_spaces` columns.
    pub fn new(indent_length_in_spaces: usize) -> Self {
        Self {
            indent_length_in_spaces: indent_length_in_spaces.max(1),
        }
    }

    /// Leading whitespace width of `line_text`, counting a tab as one full level.
    pub fn indent_width_in_spaces(&self, line_text: &str) -> usize {
        let mut width = 0usize;
        for ch in line_text.chars() {
            match ch {
                ' ' => width += 1,
                '\t' => width += self.indent_length_in_spaces,
                _ => break,
            }
        }
        width
    }

    /// Indentation level of `line_text`. Partial levels round down.
    pub fn indent_level(&self, line_text: &str) -> usize {
        self.indent_width_in_spaces(line_text) / self.indent_length_in_spaces
    }
}

/// Maximum number of lines inspected by [`detect_indent_strategy`].
pub const INDENT_DETECTION_MAX_LINES: usize = 100;

/// Number of indented lines after which [`detect_indent_strategy`] stops looking.
pub const INDENT_DETECTION_MAX_INDENTED_LINES: usize = 20;

/// Sniff the indentation style of a document from its lines.
///
/// Blank lines are skipped. Lines that start with a tab vote for tabs, lines that start with
/// spaces vote for spaces and contribute their leading space count; the smallest count
/// greater than one becomes the indent length. Lines whose leading whitespace mixes tabs and
/// spaces are ignored.
pub fn detect_indent_strategy<'a>(
    lines: impl IntoIterator<Item = &'a str>,
) -> DetectedIndentStrategy {
    let mut tab_lines = 0usize;
    let mut space_lines = 0usize;
    let mut lowest_space_count = usize::MAX;
    let mut indented = 0usize;

    for line in lines.into_iter().take(INDENT_DETECTION_MAX_LINES) {
        if indented >= INDENT_DETECTION_MAX_INDENTED_LINES {
            break;
        }
        let content = line.trim_end_matches(['\r', '\n']);
        if content.trim().is_empty() {
            continue;
        }
        let leading: Vec<char> = content.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
        if leading.is_empty() {
            continue;
        }
        if leading.iter().all(|c| *c == '\t') {
            tab_lines += 1;
            indented += 1;
        } else if leading.iter().all(|c| *c == ' ') {
            space_lines += 1;
            indented += 1;
            if leading.len() > 1 {
                lowest_space_count = lowest_space_count.min(leading.len());
            }
        }
    }

    if tab_lines == 0 && space_lines == 0 {
        DetectedIndentStrategy::Unknown
    } else if tab_lines >= space_lines {
        DetectedIndentStrategy::Tab
    } else if lowest_space_count == usize::MAX {
        DetectedIndentStrategy::Unknown
    } else {
        DetectedIndentStrategy::Space {
            length: lowest_space_count,
        }
    }
}

/// Open/close tokens that introduce an indentation block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketPair {
    /// Token that opens a block (e.g. `{`).
    pub open: String,
    /// Token that closes a block (e.g. `}`).
    pub close: String,
}

impl BracketPair {
    /// Create a bracket pair.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// `{}`, `[]` and `()`.
    pub fn defaults() -> Vec<Self> {
        vec![Self::new("{", "}"), Self::new("[", "]"), Self::new("(", ")")]
    }

    /// Returns `true` if `text` (ignoring trailing whitespace) ends with the open token.
    pub fn opens(&self, text: &str) -> bool {
        !self.open.is_empty() && text.trim_end().ends_with(self.open.as_str())
    }

    /// Returns `true` if `text` (ignoring leading whitespace) starts with the close token.
    pub fn closes(&self, text: &str) -> bool {
        !self.close.is_empty() && text.trim_start().starts_with(self.close.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_indent_strategy_strings() {
        assert_eq!(IndentStrategy::Tab { length: 4 }.string(2), "\t\t");
        assert_eq!(IndentStrategy::Space { length: 2 }.string(3), "      ");
        assert_eq!(IndentStrategy::Space { length: 2 }.unit_length(), 2);
        assert_eq!(IndentStrategy::Tab { length: 8 }.unit_length(), 1);
        assert_eq!(IndentStrategy::Tab { length: 8 }.tab_length(), 8);
    }

    #[test]
    fn test_indent_level_with_two_spaces() {
        let measurer = IndentLevelMeasurer::new(2);
        let text = "if (foo == \"bar\") {\n  if (hello == \"world\") {\n    console.log(\"Hi\")\n  }\n}";
        let levels: Vec<usize> = text.split('\n').map(|l| measurer.indent_level(l)).collect();
        assert_eq!(levels, vec![0, 1, 2, 1, 0]);
    }

    #[test]
    fn test_indent_level_counts_tabs_as_levels() {
        let measurer = IndentLevelMeasurer::new(4);
        assert_eq!(measurer.indent_level("\t\tfoo"), 2);
        assert_eq!(measurer.indent_level("\t  foo"), 1);
        assert_eq!(measurer.indent_level("      foo"), 1);
    }

    #[test]
    fn test_detect_spaces() {
        let text = "fn main() {\n    let a = 1;\n\n    if a {\n        b();\n    }\n}\n";
        assert_eq!(
            detect_indent_strategy(text.split('\n')),
            DetectedIndentStrategy::Space { length: 4 }
        );
    }

    #[test]
    fn test_detect_tabs() {
        let text = "a {\n\tb\n\tc {\n\t\td\n\t}\n}";
        assert_eq!(detect_indent_strategy(text.split('\n')), DetectedIndentStrategy::Tab);
    }

    #[test]
    fn test_detect_unknown_without_indentation() {
        assert_eq!(
            detect_indent_strategy("a\nb\nc".split('\n')),
            DetectedIndentStrategy::Unknown
        );
    }

    #[test]
    fn test_bracket_pair_matching() {
        let pair = BracketPair::new("{", "}");
        assert!(pair.opens("fn main() {  "));
        assert!(pair.closes("   }"));
        assert!(!pair.opens("foo"));
    }
}
