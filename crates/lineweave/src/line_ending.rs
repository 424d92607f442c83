//! Line ending helpers.
//!
//! `lineweave` keeps whatever delimiters the text contains (`\n`, `\r` and `\r\n` may be mixed).
//! The preferred line ending is what the editor writes when it inserts a line break itself.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::line_manager::LineManager;
use crate::string_view::StringView;
use crate::text_range::TextRange;

/// Maximum number of delimiters inspected by [`LineEnding::detect`].
pub const LINE_ENDING_DETECTION_LIMIT: usize = 20;

/// A line delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Classic Mac OS CR (`'\r'`).
    Cr,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
}

impl LineEnding {
    /// All line endings, in the order used to break detection ties.
    pub const ALL: [LineEnding; 3] = [Self::Lf, Self::Cr, Self::Crlf];

    /// The delimiter text.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Cr => "\r",
            Self::Crlf => "\r\n",
        }
    }

    /// Parse a delimiter.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ending| ending.symbol() == symbol)
    }

    /// Detect the dominant line ending of a document.
    ///
    /// Counts the delimiters of the first [`LINE_ENDING_DETECTION_LIMIT`] delimited lines and
    /// returns the most frequent one; ties resolve in [`LineEnding::ALL`] order. Returns `None`
    /// for a document without delimiters.
    pub fn detect(line_manager: &LineManager, string_view: &StringView) -> Option<Self> {
        let mut counts = [0usize; 3];
        let mut seen = 0usize;
        for line in line_manager.iter() {
            if seen >= LINE_ENDING_DETECTION_LIMIT {
                break;
            }
            if line.delimiter_length == 0 {
                continue;
            }
            let delimiter = string_view.substring(TextRange::new(
                line.location + line.length,
                line.delimiter_length,
            ));
            if let Some(ending) = delimiter.as_deref().and_then(Self::from_symbol) {
                counts[ending as usize] += 1;
                seen += 1;
            }
        }
        if seen == 0 {
            return None;
        }
        let mut best = Self::Lf;
        for ending in Self::ALL {
            if counts[ending as usize] > counts[best as usize] {
                best = ending;
            }
        }
        Some(best)
    }

    /// Detect the dominant line ending of a plain string, with the same policy as
    /// [`detect`](Self::detect).
    pub fn detect_in_text(text: &str) -> Option<Self> {
        let view = StringView::new(text);
        let mut manager = LineManager::new();
        manager.rebuild(&view);
        Self::detect(&manager, &view)
    }

    /// Convert every delimiter in `text` to this line ending.
    pub fn apply_to_text(self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    out.push_str(self.symbol());
                }
                '\n' => out.push_str(self.symbol()),
                _ => out.push(ch),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_dominant_line_ending() {
        assert_eq!(LineEnding::detect_in_text("a\r\nb\r\nc\nd"), Some(LineEnding::Crlf));
        assert_eq!(LineEnding::detect_in_text("a\rb\rc"), Some(LineEnding::Cr));
        assert_eq!(LineEnding::detect_in_text("abc"), None);
    }

    #[test]
    fn test_ties_prefer_earlier_endings() {
        assert_eq!(LineEnding::detect_in_text("a\r\nb\nc"), Some(LineEnding::Lf));
        assert_eq!(LineEnding::detect_in_text("a\r\nb\rc"), Some(LineEnding::Cr));
    }

    #[test]
    fn test_detection_stops_after_limit() {
        let mut text = "x\n".repeat(LINE_ENDING_DETECTION_LIMIT);
        text.push_str(&"y\r\n".repeat(LINE_ENDING_DETECTION_LIMIT * 2));
        assert_eq!(LineEnding::detect_in_text(&text), Some(LineEnding::Lf));
    }

    #[test]
    fn test_apply_to_text() {
        assert_eq!(LineEnding::Crlf.apply_to_text("a\nb\rc\r\nd"), "a\r\nb\r\nc\r\nd");
        assert_eq!(LineEnding::Lf.apply_to_text("a\r\nb"), "a\nb");
    }
}
