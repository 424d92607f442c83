//! Caret geometry in content coordinates.

use crate::geometry::Rect;
use crate::layout_manager::LayoutContext;
use crate::line_controller::LineController;
use crate::typesetter::TypesetAmount;

/// Caret rectangle at document `location`.
///
/// On a soft-wrap boundary the caret is drawn at the end of the earlier fragment. With
/// `allow_moving_caret_to_next_line_fragment` it is drawn at the start of the later one
/// instead, which is what a host wants right after the user moved to the beginning of a
/// wrapped visual line.
pub(crate) fn frame(
    context: &mut LayoutContext<'_>,
    location: usize,
    allow_moving_caret_to_next_line_fragment: bool,
) -> Rect {
    let (line, location) = context.line_at_location(location);
    let local = location - line.location;
    let line = context.typeset_line(&line, TypesetAmount::Location(local));
    let inset = context.settings.text_container_inset;
    let Some(controller) = context.controller(line.id) else {
        return Rect::default();
    };
    if allow_moving_caret_to_next_line_fragment && starts_later_fragment(controller, local) {
        let next = frame(context, location + 1, false);
        return Rect::new(inset.left, next.y, next.width, next.height);
    }
    controller
        .caret_rect(local)
        .offset_by(inset.left, inset.top + line.y_position)
}

fn starts_later_fragment(controller: &LineController, local: usize) -> bool {
    controller
        .line_fragment_containing(local)
        .is_some_and(|fragment| fragment.index > 0 && fragment.range.location == local)
}
