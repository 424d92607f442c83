//! Indentation edits.
//!
//! The controller only plans edits. [`TextEditor`](crate::text_editor::TextEditor) applies them
//! through `replace_text` so every change goes through the same consistency boundary.

use lineweave_lang::IndentStrategy;

use crate::language_mode::{DocumentContext, LanguageMode};
use crate::line_manager::DocumentLine;
use crate::text_range::TextRange;

/// A planned edit and the selection to restore once it is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentEdit {
    /// Range to replace.
    pub range: TextRange,
    /// Replacement text.
    pub text: String,
    /// Selection after the edit.
    pub selected_range: TextRange,
}

pub(crate) struct IndentController<'a> {
    document: DocumentContext<'a>,
    language_mode: &'a dyn LanguageMode,
    strategy: IndentStrategy,
}

impl<'a> IndentController<'a> {
    pub(crate) fn new(
        document: DocumentContext<'a>,
        language_mode: &'a dyn LanguageMode,
        strategy: IndentStrategy,
    ) -> Self {
        Self {
            document,
            language_mode,
            strategy,
        }
    }

    /// Remove one indentation level from every line touched by `selected_range`.
    ///
    /// Returns `None` when no line starts with a full level of indentation.
    pub(crate) fn shift_left(&self, selected_range: TextRange) -> Option<IndentEdit> {
        let lines = self.document.line_manager.lines_in(selected_range);
        let range = surrounding_range(&lines)?;
        let indent = self.strategy.string(1);
        let indent_length = indent.encode_utf16().count();
        let mut text = String::new();
        let mut selection = selected_range;
        let mut changed = false;
        for (index, line) in lines.iter().enumerate() {
            let line_text = self.total_text(line);
            let Some(rest) = line_text.strip_prefix(indent.as_str()) else {
                text.push_str(&line_text);
                continue;
            };
            changed = true;
            text.push_str(rest);
            if index == 0 {
                // The selection never moves onto the previous line.
                let preferred = selection.location as isize - indent_length as isize;
                let location = preferred.max(range.location as isize);
                if location > preferred {
                    let length = selection.length as isize - (location - preferred);
                    selection.length = length.max(0) as usize;
                }
                selection.location = location as usize;
            } else {
                selection.length = selection.length.saturating_sub(indent_length);
            }
        }
        changed.then_some(IndentEdit {
            range,
            text,
            selected_range: selection,
        })
    }

    /// Add one indentation level to every line touched by `selected_range`.
    pub(crate) fn shift_right(&self, selected_range: TextRange) -> Option<IndentEdit> {
        let lines = self.document.line_manager.lines_in(selected_range);
        let range = surrounding_range(&lines)?;
        let indent = self.strategy.string(1);
        let indent_length = indent.encode_utf16().count();
        let mut text = String::new();
        let mut selection = selected_range;
        for (index, line) in lines.iter().enumerate() {
            text.push_str(&indent);
            text.push_str(&self.total_text(line));
            if index == 0 {
                selection.location += indent_length;
            } else {
                selection.length += indent_length;
            }
        }
        Some(IndentEdit {
            range,
            text,
            selected_range: selection,
        })
    }

    /// Replace `range` with a line break indented the way the language mode asks for.
    ///
    /// When the language mode enters a new block the closing line is pushed down by an extra
    /// line break and the caret lands on the indented line in between.
    pub(crate) fn insert_line_break(&self, range: TextRange, symbol: &str) -> IndentEdit {
        let line_manager = self.document.line_manager;
        let positions = line_manager
            .line_position(range.location)
            .zip(line_manager.line_position(range.upper_bound()));
        let Some((start, end)) = positions else {
            return IndentEdit {
                range,
                text: symbol.to_string(),
                selected_range: TextRange::caret(range.location + symbol.encode_utf16().count()),
            };
        };
        let strategy = self
            .language_mode
            .strategy_for_inserting_line_break(start, end, self.document, self.strategy);
        let first_line = format!("{symbol}{}", self.strategy.string(strategy.indent_level));
        let caret = range.location + first_line.encode_utf16().count();
        let text = if strategy.insert_extra_line_break {
            let level = strategy.indent_level.saturating_sub(1);
            format!("{first_line}{symbol}{}", self.strategy.string(level))
        } else {
            first_line
        };
        IndentEdit {
            range,
            text,
            selected_range: TextRange::caret(caret),
        }
    }

    /// The indentation unit right before `location`, if the caret sits inside the line's
    /// leading indentation on a level boundary. Deleting backwards removes the whole unit.
    pub(crate) fn indent_range_in_front_of_location(&self, location: usize) -> Option<TextRange> {
        let line = self.document.line_manager.line_containing_location(location)?;
        let unit = self.strategy.unit_length();
        let local = location - line.location;
        if local < unit {
            return None;
        }
        let level = self
            .language_mode
            .current_indent_level(&line, self.document, self.strategy);
        let indent_length = self.strategy.string(level).encode_utf16().count();
        if local > indent_length || local % unit != 0 {
            return None;
        }
        Some(TextRange::new(location - unit, unit))
    }

    fn total_text(&self, line: &DocumentLine) -> String {
        self.document
            .string_view
            .substring(line.total_range())
            .unwrap_or_default()
    }
}

fn surrounding_range(lines: &[DocumentLine]) -> Option<TextRange> {
    let first = lines.first()?;
    let last = lines.last()?;
    Some(TextRange::from_bounds(first.location, last.location + last.total_length()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language_mode::PlainTextLanguageMode;
    use crate::line_manager::LineManager;
    use crate::string_view::StringView;
    use pretty_assertions::assert_eq;

    fn with_controller<R>(text: &str, f: impl FnOnce(&IndentController<'_>) -> R) -> R {
        let view = StringView::new(text);
        let mut manager = LineManager::new();
        manager.rebuild(&view);
        let mode = PlainTextLanguageMode::new();
        let document = DocumentContext {
            string_view: &view,
            line_manager: &manager,
        };
        f(&IndentController::new(document, &mode, IndentStrategy::Space { length: 2 }))
    }

    #[test]
    fn test_shift_right_indents_every_selected_line() {
        let edit = with_controller("a\nb\nc", |controller| {
            controller.shift_right(TextRange::new(1, 2))
        })
        .unwrap();
        assert_eq!(
            edit,
            IndentEdit {
                range: TextRange::new(0, 4),
                text: "  a\n  b\n".to_string(),
                selected_range: TextRange::new(3, 4),
            }
        );
    }

    #[test]
    fn test_shift_left_keeps_selection_on_first_line() {
        let edit = with_controller("  ab\n    c\nd", |controller| {
            controller.shift_left(TextRange::new(1, 8))
        })
        .unwrap();
        assert_eq!(edit.range, TextRange::new(0, 11));
        assert_eq!(edit.text, "ab\n  c\n");
        // The selection start cannot move before the line start, so the length shrinks too.
        assert_eq!(edit.selected_range, TextRange::new(0, 5));

        let unchanged =
            with_controller("ab\nc", |controller| controller.shift_left(TextRange::new(0, 3)));
        assert_eq!(unchanged, None);
    }

    #[test]
    fn test_insert_line_break_keeps_indentation() {
        let edit = with_controller("    ab", |controller| {
            controller.insert_line_break(TextRange::caret(6), "\n")
        });
        assert_eq!(edit.text, "\n    ");
        assert_eq!(edit.selected_range, TextRange::caret(11));
    }

    #[test]
    fn test_indent_range_in_front_of_location() {
        with_controller("    ab\nx", |controller| {
            assert_eq!(controller.indent_range_in_front_of_location(4), Some(TextRange::new(2, 2)));
            assert_eq!(controller.indent_range_in_front_of_location(2), Some(TextRange::new(0, 2)));
            assert_eq!(controller.indent_range_in_front_of_location(3), None);
            assert_eq!(controller.indent_range_in_front_of_location(5), None);
            assert_eq!(controller.indent_range_in_front_of_location(8), None);
        });
    }
}
