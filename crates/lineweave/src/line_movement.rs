//! Caret movement by characters and visual lines.

use crate::layout_manager::LayoutContext;
use crate::line_manager::DocumentLine;
use crate::typesetter::TypesetAmount;

/// Direction of a caret movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementDirection {
    /// Towards the start of the document, by grapheme clusters.
    Left,
    /// Towards the end of the document, by grapheme clusters.
    Right,
    /// One line fragment up.
    Up,
    /// One line fragment down.
    Down,
}

/// Computes caret destinations. Lines are typeset as far as the movement needs.
pub(crate) struct LineMovementController<'c, 'a> {
    context: &'c mut LayoutContext<'a>,
    treat_end_of_line_fragment_as_previous_line_fragment: bool,
}

impl<'c, 'a> LineMovementController<'c, 'a> {
    pub(crate) fn new(context: &'c mut LayoutContext<'a>) -> Self {
        Self {
            context,
            treat_end_of_line_fragment_as_previous_line_fragment: false,
        }
    }

    /// Treat a location on a soft-wrap boundary as the end of the earlier fragment, which is
    /// where the caret is drawn by default.
    pub(crate) fn treating_end_of_line_fragment_as_previous_line_fragment(
        mut self,
        treat: bool,
    ) -> Self {
        self.treat_end_of_line_fragment_as_previous_line_fragment = treat;
        self
    }

    /// Destination of moving `offset` steps from `from`. `None` if `from` is out of bounds.
    pub(crate) fn location(
        &mut self,
        from: usize,
        direction: MovementDirection,
        offset: usize,
    ) -> Option<usize> {
        let len = self.context.string_view.len();
        if from > len {
            return None;
        }
        let location = match direction {
            MovementDirection::Left => (0..offset).fold(from, |location, _| {
                self.context.string_view.prev_grapheme_boundary(location)
            }),
            MovementDirection::Right => (0..offset).fold(from, |location, _| {
                self.context.string_view.next_grapheme_boundary(location)
            }),
            MovementDirection::Up => self.location_moving_lines(from, -(offset as isize)),
            MovementDirection::Down => self.location_moving_lines(from, offset as isize),
        };
        (location <= len).then_some(location)
    }

    /// Start of the line fragment containing `from`.
    pub(crate) fn location_for_going_to_beginning_of_line(&mut self, from: usize) -> Option<usize> {
        let (line, index) = self.reference_line_fragment(from)?;
        let fragment = self.context.controller(line.id)?.line_fragment_at(index)?;
        Some(line.location + fragment.range.location)
    }

    /// End of the line fragment containing `from`, never past the line's delimiter.
    pub(crate) fn location_for_going_to_end_of_line(&mut self, from: usize) -> Option<usize> {
        let (line, index) = self.reference_line_fragment(from)?;
        let fragment = self.context.controller(line.id)?.line_fragment_at(index)?;
        if fragment.range.upper_bound() >= line.total_length() {
            Some(line.location + line.length)
        } else {
            Some(line.location + fragment.range.upper_bound())
        }
    }

    /// The line containing `location` (typeset through `location`) and the index of the
    /// fragment movement starts from.
    fn reference_line_fragment(&mut self, location: usize) -> Option<(DocumentLine, usize)> {
        let line = self.context.line_manager.line_containing_location(location)?;
        let local = location - line.location;
        let line = self.context.typeset_line(&line, TypesetAmount::Location(local));
        let fragment = self.context.controller(line.id)?.line_fragment_containing(local)?;
        let index = if self.treat_end_of_line_fragment_as_previous_line_fragment
            && local == fragment.range.location
            && fragment.index > 0
        {
            fragment.index - 1
        } else {
            fragment.index
        };
        Some((line, index))
    }

    fn location_moving_lines(&mut self, location: usize, line_offset: isize) -> usize {
        let Some((line, index)) = self.reference_line_fragment(location) else {
            return location;
        };
        let Some(fragment) = self
            .context
            .controller(line.id)
            .and_then(|controller| controller.line_fragment_at(index))
        else {
            return location;
        };
        let local = (location - line.location).min(line.total_length());
        let column = local.saturating_sub(fragment.range.location);
        let destination = if line_offset < 0 {
            self.moving_up(line_offset.unsigned_abs(), column, index, line)
        } else if line_offset > 0 {
            self.moving_down(line_offset.unsigned_abs(), column, index, line)
        } else {
            self.location_in_fragment(column, index, &line)
        };
        self.snap_to_grapheme(destination)
    }

    fn moving_up(
        &mut self,
        mut remaining: usize,
        column: usize,
        mut index: usize,
        mut line: DocumentLine,
    ) -> usize {
        loop {
            let taken = index.min(remaining);
            remaining -= taken;
            if remaining == 0 {
                return self.location_in_fragment(column, index - taken, &line);
            }
            if line.row == 0 {
                return 0;
            }
            let previous = self.context.line_manager.line_at_row(line.row - 1);
            line = self.context.typeset_line_fully(&previous);
            index = self.number_of_line_fragments(&line).saturating_sub(1);
            remaining -= 1;
        }
    }

    fn moving_down(
        &mut self,
        mut remaining: usize,
        column: usize,
        mut index: usize,
        mut line: DocumentLine,
    ) -> usize {
        loop {
            line = self.context.typeset_line_fully(&line);
            let count = self.number_of_line_fragments(&line);
            let taken = count.saturating_sub(index + 1).min(remaining);
            remaining -= taken;
            if remaining == 0 {
                return self.location_in_fragment(column, index + taken, &line);
            }
            if line.row + 1 == self.context.line_manager.line_count() {
                return line.location + line.total_length();
            }
            line = self.context.line_manager.line_at_row(line.row + 1);
            index = 0;
            remaining -= 1;
        }
    }

    /// `column` within fragment `index` of `line`, capped to the fragment and the line content.
    fn location_in_fragment(&self, column: usize, index: usize, line: &DocumentLine) -> usize {
        let Some(fragment) = self
            .context
            .controller(line.id)
            .and_then(|controller| controller.line_fragment_at(index))
        else {
            return line.location;
        };
        let preferred = line.location + fragment.range.location + column;
        let fragment_end = line.location + fragment.range.upper_bound();
        let line_end = line.location + line.length;
        preferred.min(fragment_end.min(line_end))
    }

    /// Move a location that landed inside a grapheme cluster to the cluster's start.
    fn snap_to_grapheme(&self, location: usize) -> usize {
        let cluster = self.context.string_view.range_of_composed_character_sequence(location);
        if location > cluster.location && location < cluster.upper_bound() {
            cluster.location
        } else {
            location
        }
    }

    fn number_of_line_fragments(&self, line: &DocumentLine) -> usize {
        self.context
            .controller(line.id)
            .map_or(0, |controller| controller.number_of_line_fragments())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::content_size::ContentSizeTracker;
    use crate::highlight::{LineSyntaxHighlighter, PlainTextSyntaxHighlighter};
    use crate::line_controller_storage::LineControllerStorage;
    use crate::line_manager::LineManager;
    use crate::measure::MonospaceMeasurer;
    use crate::settings::{LayoutSettings, WrapMode};
    use crate::string_view::StringView;
    use crate::theme::{DefaultTheme, FontMetrics};
    use pretty_assertions::assert_eq;

    fn with_movement<R>(
        text: &str,
        width: f64,
        treat_end_of_line_fragment_as_previous_line_fragment: bool,
        f: impl FnOnce(&mut LineMovementController<'_, '_>) -> R,
    ) -> R {
        let metrics = FontMetrics {
            cell_width: 10.0,
            ascent: 12.0,
            descent: 4.0,
            leading: 0.0,
        };
        let settings = LayoutSettings {
            constraining_width: width,
            wrap_mode: WrapMode::Char,
            ..LayoutSettings::default()
        };
        let view = StringView::new(text);
        let mut manager = LineManager::new();
        manager.rebuild(&view);
        let mut storage = LineControllerStorage::new();
        let mut content_size = ContentSizeTracker::new();
        let measurer = MonospaceMeasurer::new(metrics, 4);
        let theme = DefaultTheme::with_font_metrics(metrics);
        let highlighter: Arc<dyn LineSyntaxHighlighter> = Arc::new(PlainTextSyntaxHighlighter);
        let mut context = LayoutContext {
            string_view: &view,
            line_manager: &mut manager,
            storage: &mut storage,
            content_size: &mut content_size,
            settings: &settings,
            measurer: &measurer,
            theme: &theme,
            highlighter: &highlighter,
            dispatcher: None,
        };
        let mut movement = LineMovementController::new(&mut context)
            .treating_end_of_line_fragment_as_previous_line_fragment(
                treat_end_of_line_fragment_as_previous_line_fragment,
            );
        f(&mut movement)
    }

    #[test]
    fn test_horizontal_movement_skips_whole_clusters() {
        // "a", family emoji (a ZWJ sequence of 8 code units), "b".
        let text = "a\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}b";
        with_movement(text, f64::INFINITY, false, |movement| {
            assert_eq!(movement.location(1, MovementDirection::Right, 1), Some(9));
            assert_eq!(movement.location(9, MovementDirection::Left, 1), Some(1));
            assert_eq!(movement.location(0, MovementDirection::Right, 3), Some(10));
            assert_eq!(movement.location(10, MovementDirection::Right, 1), Some(10));
            assert_eq!(movement.location(0, MovementDirection::Left, 1), Some(0));
            assert_eq!(movement.location(11, MovementDirection::Right, 1), None);
        });
    }

    #[test]
    fn test_vertical_movement_preserves_column() {
        with_movement("abcdef\nab\nabcdef", f64::INFINITY, false, |movement| {
            assert_eq!(movement.location(5, MovementDirection::Down, 1), Some(9));
            assert_eq!(movement.location(5, MovementDirection::Down, 2), Some(15));
            assert_eq!(movement.location(15, MovementDirection::Up, 2), Some(5));
            // Past the first or last line.
            assert_eq!(movement.location(3, MovementDirection::Up, 1), Some(0));
            assert_eq!(movement.location(12, MovementDirection::Down, 1), Some(16));
        });
    }

    #[test]
    fn test_vertical_movement_walks_line_fragments() {
        // Width 40 wraps every four characters.
        with_movement("aaaabbbbcc\ndddd", 40.0, false, |movement| {
            assert_eq!(movement.location(1, MovementDirection::Down, 1), Some(5));
            assert_eq!(movement.location(1, MovementDirection::Down, 2), Some(9));
            assert_eq!(movement.location(1, MovementDirection::Down, 3), Some(12));
            assert_eq!(movement.location(12, MovementDirection::Up, 1), Some(9));
            assert_eq!(movement.location(9, MovementDirection::Up, 2), Some(1));
        });
    }

    #[test]
    fn test_beginning_and_end_of_line_fragment() {
        with_movement("aaaabbbbcc\ndddd", 40.0, false, |movement| {
            assert_eq!(movement.location_for_going_to_beginning_of_line(6), Some(4));
            assert_eq!(movement.location_for_going_to_end_of_line(6), Some(8));
            assert_eq!(movement.location_for_going_to_end_of_line(9), Some(10));
            // A caret on the boundary belongs to the later fragment by default.
            assert_eq!(movement.location_for_going_to_beginning_of_line(8), Some(8));
        });
        with_movement("aaaabbbbcc\ndddd", 40.0, true, |movement| {
            assert_eq!(movement.location_for_going_to_beginning_of_line(8), Some(4));
            assert_eq!(movement.location_for_going_to_end_of_line(8), Some(8));
        });
    }
}
