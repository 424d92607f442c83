//! Moving whole lines up or down.

use crate::line_manager::LineManager;
use crate::string_view::{StringView, utf16_prefix};
use crate::text_range::TextRange;

/// A line move expressed as a removal followed by an insertion.
///
/// `replacement_range` is relative to the buffer *after* `remove_range` was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveLinesOperation {
    /// Text to remove first.
    pub remove_range: TextRange,
    /// Empty range the moved text is inserted at.
    pub replacement_range: TextRange,
    /// The moved lines.
    pub replacement_string: String,
    /// Selection after both edits.
    pub selected_range: TextRange,
}

/// Plan moving the lines touched by `selected_range` by `line_offset` rows.
///
/// Returns `None` when the move would leave the document or `line_offset` is zero.
pub fn operation_for_moving_lines(
    string_view: &StringView,
    line_manager: &LineManager,
    line_ending_symbol: &str,
    selected_range: TextRange,
    line_offset: isize,
) -> Option<MoveLinesOperation> {
    if line_offset == 0 {
        return None;
    }
    let is_moving_down = line_offset > 0;
    let lines = line_manager.lines_in(selected_range);
    let first = lines.first()?;
    let last = lines.last()?;
    let mut target_row = first.row as isize + line_offset;
    if is_moving_down {
        target_row += lines.len() as isize - 1;
    }
    if target_row < 0 || target_row >= line_manager.line_count() as isize {
        return None;
    }
    let target = line_manager.line_at_row(target_row as usize);
    let remove_location = first.location;
    let remove_length = last.location + last.total_length() - remove_location;
    let insert_location = if is_moving_down {
        target.location + target.total_length() - remove_length
    } else {
        target.location
    };
    let mut remove_range = TextRange::new(remove_location, remove_length);
    let mut text = string_view.substring(remove_range).unwrap_or_default();
    let symbol_length = line_ending_symbol.encode_utf16().count();
    let mut selection_location = selected_range.location + insert_location - remove_location;
    if is_moving_down && target.delimiter_length == 0 {
        // The target is the last line: the moved block loses its trailing break and gains a
        // leading one.
        if last.delimiter_length > 0 {
            let keep = text.encode_utf16().count() - last.delimiter_length;
            text = utf16_prefix(&text, keep).to_string();
        }
        text.insert_str(0, line_ending_symbol);
        selection_location += symbol_length;
    } else if !is_moving_down && last.delimiter_length == 0 {
        // The last line of the document moves up: it needs a break, and the line directly
        // above it gives up its own.
        text.push_str(line_ending_symbol);
        let above = line_manager.line_at_row(first.row - 1);
        remove_range = TextRange::new(
            remove_range.location - above.delimiter_length,
            remove_range.length + above.delimiter_length,
        );
    }
    Some(MoveLinesOperation {
        remove_range,
        replacement_range: TextRange::caret(insert_location),
        replacement_string: text,
        selected_range: TextRange::new(selection_location, selected_range.length),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn apply(
        text: &str,
        selected_range: TextRange,
        line_offset: isize,
    ) -> Option<(String, TextRange)> {
        let mut view = StringView::new(text);
        let mut manager = LineManager::new();
        manager.rebuild(&view);
        let operation =
            operation_for_moving_lines(&view, &manager, "\n", selected_range, line_offset)?;
        manager.apply_edit(&mut view, operation.remove_range, "");
        manager.apply_edit(&mut view, operation.replacement_range, &operation.replacement_string);
        Some((view.string(), operation.selected_range))
    }

    #[test]
    fn test_move_line_down_and_up() {
        assert_eq!(
            apply("one\ntwo\nthree\n", TextRange::caret(1), 1),
            Some(("two\none\nthree\n".to_string(), TextRange::caret(5)))
        );
        assert_eq!(
            apply("one\ntwo\nthree\n", TextRange::caret(5), -1),
            Some(("two\none\nthree\n".to_string(), TextRange::caret(1)))
        );
    }

    #[test]
    fn test_move_onto_last_line_without_break() {
        assert_eq!(
            apply("one\ntwo", TextRange::caret(1), 1),
            Some(("two\none".to_string(), TextRange::caret(5)))
        );
        assert_eq!(
            apply("one\ntwo", TextRange::caret(5), -1),
            Some(("two\none".to_string(), TextRange::caret(1)))
        );
    }

    #[test]
    fn test_move_past_document_edges_is_rejected() {
        assert_eq!(apply("one\ntwo", TextRange::caret(1), -1), None);
        assert_eq!(apply("one\ntwo", TextRange::caret(5), 1), None);
        assert_eq!(apply("one\ntwo", TextRange::caret(5), 0), None);
    }

    #[test]
    fn test_last_line_moving_up_over_mixed_line_endings() {
        assert_eq!(
            apply("a\r\nb\nc", TextRange::caret(5), -2),
            Some(("c\na\r\nb".to_string(), TextRange::caret(0)))
        );
        assert_eq!(
            apply("a\nb\r\nc", TextRange::caret(5), -2),
            Some(("c\na\nb".to_string(), TextRange::caret(0)))
        );
    }

    #[test]
    fn test_move_multiple_lines() {
        assert_eq!(
            apply("a\nb\nc\nd\n", TextRange::new(0, 3), 1),
            Some(("c\na\nb\nd\n".to_string(), TextRange::new(2, 3)))
        );
    }
}
