//! Viewport layout and document-level geometry queries.
//!
//! The layout manager walks the lines intersecting the viewport, prepares their controllers
//! and reports what the host should draw. Every query here works in content coordinates: the
//! text container inset is applied on the way out and removed on the way in.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;

use crate::content_size::ContentSizeTracker;
use crate::geometry::{Point, Rect};
use crate::highlight::{HighlightDispatcher, LineSyntaxHighlighter};
use crate::line_controller::{LineContext, LineController};
use crate::line_controller_storage::LineControllerStorage;
use crate::line_manager::{DocumentLine, LineId, LineManager};
use crate::measure::TextMeasurer;
use crate::settings::{LayoutSettings, ScrollAdjustmentPolicy};
use crate::string_view::StringView;
use crate::text_range::TextRange;
use crate::theme::Theme;
use crate::typesetter::TypesetAmount;

/// Notifications for the host, collected by
/// [`TextEditor::take_events`](crate::text_editor::TextEditor::take_events).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutEvent {
    /// The height of the scrollable content changed.
    ContentHeightChanged {
        /// New content height, insets included.
        height: f64,
    },
    /// The width of the scrollable content changed.
    ContentWidthChanged {
        /// New content width, insets included.
        width: f64,
    },
    /// Lines above the viewport changed height; shift the content offset by `dy` to keep the
    /// visible text in place.
    ContentOffsetAdjustment {
        /// Vertical delta.
        dy: f64,
    },
    /// Highlighting of a line was applied and the line should be redrawn.
    LineHighlighted {
        /// The highlighted line.
        line_id: LineId,
    },
}

/// A line fragment to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleLineFragment {
    /// Line the fragment belongs to.
    pub line_id: LineId,
    /// Index of the fragment within its line.
    pub fragment_index: usize,
    /// Document range of the fragment.
    pub range: TextRange,
    /// Frame in content coordinates.
    pub frame: Rect,
}

/// Result of laying out the viewport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewportLayout {
    /// Lines intersecting the viewport, top to bottom.
    pub visible_lines: Vec<LineId>,
    /// Fragments intersecting the viewport, top to bottom.
    pub fragments: Vec<VisibleLineFragment>,
    /// Content offset adjustment for lines above the viewport that changed height.
    pub content_offset_adjustment: f64,
}

/// A document-level selection rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRect {
    /// Frame in content coordinates.
    pub rect: Rect,
    /// Document range covered by the rectangle.
    pub range: TextRange,
    /// The rectangle contains the start of the selection.
    pub contains_start: bool,
    /// The rectangle contains the end of the selection.
    pub contains_end: bool,
}

/// Mutable view over everything layout touches, borrowed from the editor for one operation.
pub(crate) struct LayoutContext<'a> {
    pub(crate) string_view: &'a StringView,
    pub(crate) line_manager: &'a mut LineManager,
    pub(crate) storage: &'a mut LineControllerStorage,
    pub(crate) content_size: &'a mut ContentSizeTracker,
    pub(crate) settings: &'a LayoutSettings,
    pub(crate) measurer: &'a dyn TextMeasurer,
    pub(crate) theme: &'a dyn Theme,
    pub(crate) highlighter: &'a Arc<dyn LineSyntaxHighlighter>,
    pub(crate) dispatcher: Option<&'a HighlightDispatcher>,
}

impl LayoutContext<'_> {
    /// Typeset and highlight `line` until `amount` is satisfied, then write the new width and
    /// height back. Returns the line as it is after the height change.
    pub(crate) fn prepare_line(
        &mut self,
        line: &DocumentLine,
        amount: TypesetAmount,
        syntax_highlight_asynchronously: bool,
    ) -> DocumentLine {
        self.update_line(line, |controller, context| {
            controller.prepare_to_display_string(amount, syntax_highlight_asynchronously, context);
        })
    }

    /// Typeset `line` until `amount` is satisfied without requesting highlighting.
    pub(crate) fn typeset_line(
        &mut self,
        line: &DocumentLine,
        amount: TypesetAmount,
    ) -> DocumentLine {
        self.update_line(line, |controller, context| controller.typeset(amount, context))
    }

    /// Typeset `line` completely.
    pub(crate) fn typeset_line_fully(&mut self, line: &DocumentLine) -> DocumentLine {
        self.typeset_line(line, TypesetAmount::YPosition(f64::INFINITY))
    }

    fn update_line(
        &mut self,
        line: &DocumentLine,
        update: impl FnOnce(&mut LineController, &LineContext<'_>),
    ) -> DocumentLine {
        let controller = self.storage.get_or_create(line.id, self.settings.estimated_line_height);
        let context = LineContext {
            string_view: self.string_view,
            line,
            settings: self.settings,
            measurer: self.measurer,
            theme: self.theme,
            highlighter: self.highlighter,
            dispatcher: self.dispatcher,
        };
        update(controller, &context);
        let width = controller.line_width();
        let height = controller.line_height();
        if controller.number_of_line_fragments() > 0 {
            self.content_size.set_width(line.id, width);
        }
        if self.line_manager.set_height(line.id, height) {
            trace!(line = %line.id, height, "line height changed");
        }
        self.line_manager.line(line.id).unwrap_or(*line)
    }

    /// The controller of `id`, if one was created.
    pub(crate) fn controller(&self, id: LineId) -> Option<&LineController> {
        self.storage.get(id)
    }

    /// The line containing `location`, with `location` clamped to the buffer.
    pub(crate) fn line_at_location(&self, location: usize) -> (DocumentLine, usize) {
        let location = location.min(self.string_view.len());
        match self.line_manager.line_containing_location(location) {
            Some(line) => (line, location),
            None => panic!("no line contains location {location} of {}", self.string_view.len()),
        }
    }
}

/// Lays out the lines intersecting the viewport.
#[derive(Debug, Default)]
pub struct LayoutManager {
    viewport: Rect,
    visible_lines: HashSet<LineId>,
}

impl LayoutManager {
    /// A layout manager with an empty viewport.
    pub fn new() -> Self {
        Self::default()
    }

    /// The viewport of the last layout pass, in content coordinates.
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Lines that intersected the viewport in the last layout pass.
    pub fn visible_line_ids(&self) -> impl Iterator<Item = LineId> + '_ {
        self.visible_lines.iter().copied()
    }

    /// Forget visible lines, for instance after the document was replaced.
    pub(crate) fn reset_visible_lines(&mut self) {
        self.visible_lines.clear();
    }

    /// Prepare every line intersecting `viewport` and report what to draw.
    ///
    /// Lines that left the viewport get their in-flight highlighting cancelled. Lines above the
    /// top edge that changed height produce a content offset adjustment, subject to the
    /// configured [`ScrollAdjustmentPolicy`].
    pub(crate) fn layout_lines_in_viewport(
        &mut self,
        viewport: Rect,
        context: &mut LayoutContext<'_>,
    ) -> ViewportLayout {
        self.viewport = viewport;
        let mut layout = ViewportLayout::default();
        let inset = context.settings.text_container_inset;
        let min_y = (viewport.y - inset.top).max(0.0);
        let max_y = viewport.max_y() - inset.top;
        let mut appeared = HashSet::new();
        let mut next_line = if viewport.height > 0.0 && max_y > min_y {
            context.line_manager.line_containing_y_offset(min_y)
        } else {
            None
        };
        let mut adjustment = 0.0;
        while let Some(line) = next_line {
            let old_height = line.height;
            let line_local = Rect::new(
                0.0,
                (min_y - line.y_position).max(0.0),
                viewport.width,
                max_y - line.y_position.max(min_y),
            );
            let amount = TypesetAmount::YPosition(line_local.max_y());
            let line = context.prepare_line(&line, amount, true);
            appeared.insert(line.id);
            layout.visible_lines.push(line.id);
            let Some(controller) = context.controller(line.id) else {
                break;
            };
            let fragments = controller.line_fragments_in_rect(line_local);
            for fragment in &fragments {
                layout.fragments.push(VisibleLineFragment {
                    line_id: line.id,
                    fragment_index: fragment.index,
                    range: fragment.range.offset_by(line.location),
                    frame: fragment
                        .rect()
                        .offset_by(inset.left, inset.top + line.y_position),
                });
            }
            if line.y_position < min_y && controller.is_finished_typesetting() {
                adjustment += line.height - old_height;
            }
            let reached = fragments
                .last()
                .map_or(line.max_y(), |fragment| line.y_position + fragment.max_y());
            next_line = if fragments.is_empty() || reached >= max_y {
                None
            } else {
                context.line_manager.line_after(&line)
            };
        }
        for id in self.visible_lines.difference(&appeared) {
            if let Some(controller) = context.storage.get_mut(*id) {
                controller.cancel_syntax_highlighting();
            }
        }
        self.visible_lines = appeared;
        if context.settings.scroll_adjustment == ScrollAdjustmentPolicy::PreserveVisibleContent {
            layout.content_offset_adjustment = adjustment;
        }
        trace!(
            lines = layout.visible_lines.len(),
            fragments = layout.fragments.len(),
            adjustment = layout.content_offset_adjustment,
            "laid out viewport"
        );
        layout
    }

    /// Typeset every line from the top of the document down to the one containing `location`,
    /// so its geometry is exact.
    pub(crate) fn layout_lines_to_location(
        &self,
        location: usize,
        context: &mut LayoutContext<'_>,
    ) {
        let (target, location) = context.line_at_location(location);
        let mut next_line = Some(context.line_manager.first_line());
        while let Some(line) = next_line {
            if line.id == target.id {
                context.typeset_line(&line, TypesetAmount::Location(location - line.location));
                break;
            }
            let line = context.typeset_line_fully(&line);
            next_line = context.line_manager.line_after(&line);
        }
    }

    /// Document location closest to `point` (content coordinates).
    ///
    /// Points above the document map into the first line, points below it to the end of the
    /// buffer. A point past the end of a line that is not the last one maps to the end of that
    /// line's content.
    pub(crate) fn closest_index(&self, point: Point, context: &mut LayoutContext<'_>) -> usize {
        let inset = context.settings.text_container_inset;
        let point = Point::new(point.x - inset.left, point.y - inset.top);
        let line = if point.y < 0.0 {
            Some(context.line_manager.first_line())
        } else {
            context.line_manager.line_containing_y_offset(point.y)
        };
        let Some(line) = line else {
            return context.string_view.len();
        };
        let local_y = point.y - line.y_position;
        let line = context.typeset_line(&line, TypesetAmount::YPosition(local_y));
        let Some(controller) = context.controller(line.id) else {
            return line.location;
        };
        let index = controller.closest_index(Point::new(point.x, local_y));
        let is_last_line = line.row + 1 == context.line_manager.line_count();
        if index >= line.length && !is_last_line {
            line.location + line.length
        } else {
            line.location + index.min(line.length)
        }
    }

    /// Rectangle of the first line fragment covering `range` (content coordinates).
    ///
    /// The range is cut at the end of the line containing its start.
    pub(crate) fn first_rect(&self, range: TextRange, context: &mut LayoutContext<'_>) -> Rect {
        let (line, location) = context.line_at_location(range.location);
        let line_end = line.location + line.length;
        let local = TextRange::new(
            location - line.location,
            range.length.min(line_end - location.min(line_end)),
        );
        let line = context.typeset_line(&line, TypesetAmount::Location(local.upper_bound()));
        let inset = context.settings.text_container_inset;
        let rect = context
            .controller(line.id)
            .map_or_else(Rect::default, |controller| controller.first_rect(local));
        rect.offset_by(inset.left, inset.top + line.y_position)
    }

    /// Selection rectangles for `range` across all lines it touches (content coordinates).
    pub(crate) fn selection_rects(
        &self,
        range: TextRange,
        context: &mut LayoutContext<'_>,
    ) -> Vec<SelectionRect> {
        let range = range.clamped(context.string_view.len());
        let inset = context.settings.text_container_inset;
        let lines = context.line_manager.lines_in(range);
        let mut rects = Vec::new();
        for line in lines {
            let local_start = range.location.saturating_sub(line.location).min(line.length);
            let local_end = range
                .upper_bound()
                .saturating_sub(line.location)
                .min(line.length);
            let local = TextRange::from_bounds(local_start, local_end);
            let line = context.typeset_line(&line, TypesetAmount::Location(local.upper_bound()));
            let Some(controller) = context.controller(line.id) else {
                continue;
            };
            let starts_here = line.location <= range.location;
            let ends_here = range.upper_bound() <= line.location + line.length;
            for selection in controller.selection_rects(local) {
                rects.push(SelectionRect {
                    rect: selection.rect.offset_by(inset.left, inset.top + line.y_position),
                    range: selection.range.offset_by(line.location),
                    contains_start: starts_here && selection.contains_start,
                    contains_end: ends_here && selection.contains_end,
                });
            }
        }
        rects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::EdgeInsets;
    use crate::highlight::PlainTextSyntaxHighlighter;
    use crate::measure::MonospaceMeasurer;
    use crate::settings::WrapMode;
    use crate::theme::{DefaultTheme, FontMetrics};
    use pretty_assertions::assert_eq;

    const METRICS: FontMetrics = FontMetrics {
        cell_width: 10.0,
        ascent: 12.0,
        descent: 4.0,
        leading: 0.0,
    };

    struct Fixture {
        view: StringView,
        manager: LineManager,
        storage: LineControllerStorage,
        content_size: ContentSizeTracker,
        settings: LayoutSettings,
        measurer: MonospaceMeasurer,
        theme: DefaultTheme,
        highlighter: Arc<dyn LineSyntaxHighlighter>,
        layout: LayoutManager,
    }

    impl Fixture {
        fn new(text: &str, settings: LayoutSettings) -> Self {
            let view = StringView::new(text);
            let mut manager =
                LineManager::with_estimated_line_height(settings.estimated_line_height);
            manager.rebuild(&view);
            Self {
                view,
                manager,
                storage: LineControllerStorage::new(),
                content_size: ContentSizeTracker::new(),
                settings,
                measurer: MonospaceMeasurer::new(METRICS, 4),
                theme: DefaultTheme::with_font_metrics(METRICS),
                highlighter: Arc::new(PlainTextSyntaxHighlighter),
                layout: LayoutManager::new(),
            }
        }

        fn closest_index(&mut self, point: Point) -> usize {
            self.with(|layout, context| layout.closest_index(point, context))
        }

        fn with<R>(
            &mut self,
            f: impl FnOnce(&mut LayoutManager, &mut LayoutContext<'_>) -> R,
        ) -> R {
            let mut context = LayoutContext {
                string_view: &self.view,
                line_manager: &mut self.manager,
                storage: &mut self.storage,
                content_size: &mut self.content_size,
                settings: &self.settings,
                measurer: &self.measurer,
                theme: &self.theme,
                highlighter: &self.highlighter,
                dispatcher: None,
            };
            f(&mut self.layout, &mut context)
        }
    }

    fn wrapping(width: f64) -> LayoutSettings {
        LayoutSettings {
            constraining_width: width,
            wrap_mode: WrapMode::Char,
            ..LayoutSettings::default()
        }
    }

    #[test]
    fn test_viewport_layout_stops_below_viewport() {
        let text = (0..50).map(|row| format!("line {row}")).collect::<Vec<_>>().join("\n");
        let mut fixture = Fixture::new(&text, wrapping(500.0));
        let layout = fixture.with(|layout, context| {
            layout.layout_lines_in_viewport(Rect::new(0.0, 0.0, 500.0, 40.0), context)
        });
        // Typeset lines are 16 high, so three lines reach past y = 40.
        assert_eq!(layout.visible_lines.len(), 3);
        assert_eq!(layout.fragments[2].frame, Rect::new(0.0, 32.0, 60.0, 16.0));
        assert_eq!(layout.content_offset_adjustment, 0.0);
        assert_eq!(fixture.storage.len(), 3);
        assert_eq!(fixture.manager.line_at_row(3).y_position, 48.0);
    }

    #[test]
    fn test_height_change_above_viewport_adjusts_offset() {
        let text = (0..50).map(|row| format!("line {row}")).collect::<Vec<_>>().join("\n");
        let mut fixture = Fixture::new(&text, wrapping(500.0));
        // Estimated lines are 20 high; y = 30 lies in the second line, whose top is above the
        // viewport. Typesetting it shrinks it to 16.
        let layout = fixture.with(|layout, context| {
            layout.layout_lines_in_viewport(Rect::new(0.0, 30.0, 500.0, 20.0), context)
        });
        assert_eq!(layout.visible_lines.first(), Some(&fixture.manager.line_at_row(1).id));
        assert_eq!(layout.content_offset_adjustment, -4.0);

        fixture.settings.scroll_adjustment = ScrollAdjustmentPolicy::None;
        fixture.storage.remove_all();
        fixture.manager.rebuild(&fixture.view);
        let layout = fixture.with(|layout, context| {
            layout.layout_lines_in_viewport(Rect::new(0.0, 30.0, 500.0, 20.0), context)
        });
        assert_eq!(layout.content_offset_adjustment, 0.0);
    }

    #[test]
    fn test_lines_leaving_viewport_are_tracked() {
        let text = (0..50).map(|row| format!("line {row}")).collect::<Vec<_>>().join("\n");
        let mut fixture = Fixture::new(&text, wrapping(500.0));
        fixture.with(|layout, context| {
            layout.layout_lines_in_viewport(Rect::new(0.0, 0.0, 500.0, 10.0), context);
        });
        let first = fixture.manager.line_at_row(0).id;
        assert_eq!(fixture.layout.visible_line_ids().collect::<Vec<_>>(), vec![first]);
        fixture.with(|layout, context| {
            layout.layout_lines_in_viewport(Rect::new(0.0, 400.0, 500.0, 10.0), context);
        });
        assert!(!fixture.layout.visible_line_ids().any(|id| id == first));
    }

    #[test]
    fn test_closest_index_below_document_is_buffer_length() {
        let mut fixture = Fixture::new("abc\ndefgh", wrapping(500.0));
        let len = fixture.view.len();
        assert_eq!(fixture.closest_index(Point::new(5.0, 500.0)), len);
        // Past the end of the first line.
        assert_eq!(fixture.closest_index(Point::new(500.0, 5.0)), 3);
        // Above the document.
        assert_eq!(fixture.closest_index(Point::new(14.0, -50.0)), 1);
        // Second line, which starts at y = 16 once the first line is typeset.
        assert_eq!(fixture.closest_index(Point::new(21.0, 18.0)), 6);
    }

    #[test]
    fn test_queries_apply_text_container_inset() {
        let settings = LayoutSettings {
            text_container_inset: EdgeInsets::uniform(5.0),
            ..wrapping(100.0)
        };
        let mut fixture = Fixture::new("aaaaaaaaaabbbbb", settings);
        let rect = fixture.with(|layout, context| layout.first_rect(TextRange::new(2, 3), context));
        assert_eq!(rect, Rect::new(25.0, 5.0, 30.0, 16.0));
        assert_eq!(fixture.closest_index(Point::new(36.0, 6.0)), 3);
    }

    #[test]
    fn test_selection_rects_span_lines() {
        let mut fixture = Fixture::new("abc\ndef\nghi", wrapping(500.0));
        let range = TextRange::new(1, 8);
        let rects = fixture.with(|layout, context| layout.selection_rects(range, context));
        let ranges: Vec<TextRange> = rects.iter().map(|rect| rect.range).collect();
        assert_eq!(
            ranges,
            vec![TextRange::new(1, 2), TextRange::new(4, 3), TextRange::new(8, 1)]
        );
        assert!(rects[0].contains_start && !rects[0].contains_end);
        assert!(!rects[1].contains_start && !rects[1].contains_end);
        assert!(!rects[2].contains_start && rects[2].contains_end);
        assert_eq!(rects[2].rect, Rect::new(0.0, 32.0, 10.0, 16.0));
    }

    #[test]
    fn test_layout_to_location_typesets_lines_above() {
        let mut fixture = Fixture::new("a\nb\nc\nd", wrapping(500.0));
        fixture.with(|layout, context| layout.layout_lines_to_location(4, context));
        assert_eq!(fixture.manager.line_at_row(2).y_position, 32.0);
        assert_eq!(fixture.manager.line_at_row(3).y_position, 48.0);
        assert_eq!(fixture.storage.len(), 3);
    }
}
