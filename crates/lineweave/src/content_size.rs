//! Content size bookkeeping.
//!
//! Line heights live in the line tree. Widths are only known for lines that have been typeset,
//! so the tracker remembers the width of every measured line and which line is the widest.

use std::collections::HashMap;

use crate::geometry::{EdgeInsets, Size};
use crate::line_manager::{LineId, LineManager};

/// Tracks the widest typeset line.
#[derive(Debug, Default)]
pub struct ContentSizeTracker {
    line_widths: HashMap<LineId, f64>,
    widest_line: Option<LineId>,
    longest_line_width: Option<f64>,
}

impl ContentSizeTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all widths (the document was replaced or every line must be measured again).
    pub fn reset(&mut self) {
        self.line_widths.clear();
        self.widest_line = None;
        self.longest_line_width = None;
    }

    /// Start tracking `id` as the widest line before any line has been typeset.
    pub fn seed_widest_line(&mut self, id: LineId, estimated_width: f64) {
        self.line_widths.insert(id, estimated_width);
        self.widest_line = Some(id);
        self.longest_line_width = None;
    }

    /// Record the typeset width of a line.
    pub fn set_width(&mut self, id: LineId, width: f64) {
        let previous = self.line_widths.insert(id, width);
        if previous == Some(width) {
            return;
        }
        match self.widest_line {
            Some(widest) if widest == id => {
                if previous.is_some_and(|previous| width < previous) {
                    self.widest_line = None;
                }
                self.longest_line_width = None;
            }
            Some(widest) => {
                let widest_width = self.line_widths.get(&widest).copied().unwrap_or(0.0);
                if width > widest_width {
                    self.widest_line = Some(id);
                    self.longest_line_width = None;
                }
            }
            None => self.longest_line_width = None,
        }
    }

    /// Drop the width of a removed line.
    pub fn remove_line(&mut self, id: LineId) {
        self.line_widths.remove(&id);
        if self.widest_line == Some(id) {
            self.widest_line = None;
            self.longest_line_width = None;
        }
    }

    /// Width of the widest measured line, if any line was measured.
    pub fn longest_line_width(&mut self) -> Option<f64> {
        if let Some(width) = self.longest_line_width {
            return Some(width);
        }
        let width = match self.widest_line.and_then(|id| self.line_widths.get(&id).copied()) {
            Some(width) => width,
            None => {
                let (id, width) = self
                    .line_widths
                    .iter()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(id, width)| (*id, *width))?;
                self.widest_line = Some(id);
                width
            }
        };
        self.longest_line_width = Some(width);
        Some(width)
    }

    /// Size of the scrollable content.
    ///
    /// With wrapping the content is as wide as the viewport; without it the widest line plus
    /// insets decides, but never less than the viewport.
    pub fn content_size(
        &mut self,
        line_manager: &LineManager,
        insets: EdgeInsets,
        viewport_width: f64,
        is_wrapping: bool,
    ) -> Size {
        let height = (line_manager.content_height() + insets.top + insets.bottom).ceil();
        let width = if is_wrapping {
            viewport_width
        } else {
            let text_width = self.longest_line_width().unwrap_or(viewport_width);
            (text_width + insets.left + insets.right).ceil().max(viewport_width)
        };
        Size::new(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_widest_line() {
        let mut tracker = ContentSizeTracker::new();
        let (a, b) = (LineId::from_raw(1), LineId::from_raw(2));
        tracker.set_width(a, 100.0);
        tracker.set_width(b, 50.0);
        assert_eq!(tracker.longest_line_width(), Some(100.0));
        tracker.set_width(b, 150.0);
        assert_eq!(tracker.longest_line_width(), Some(150.0));
        tracker.remove_line(b);
        assert_eq!(tracker.longest_line_width(), Some(100.0));
    }

    #[test]
    fn test_shrinking_widest_line_is_tracked() {
        let mut tracker = ContentSizeTracker::new();
        let (a, b) = (LineId::from_raw(1), LineId::from_raw(2));
        tracker.set_width(a, 100.0);
        tracker.set_width(b, 80.0);
        assert_eq!(tracker.longest_line_width(), Some(100.0));
        tracker.set_width(a, 90.0);
        assert_eq!(tracker.longest_line_width(), Some(90.0));
        tracker.set_width(a, 40.0);
        assert_eq!(tracker.longest_line_width(), Some(80.0));
    }

    #[test]
    fn test_content_size_respects_insets_and_viewport() {
        let mut tracker = ContentSizeTracker::new();
        let manager = LineManager::new();
        tracker.set_width(manager.first_line().id, 300.0);
        let insets = EdgeInsets::uniform(10.0);
        assert_eq!(
            tracker.content_size(&manager, insets, 200.0, false),
            Size::new(320.0, 40.0)
        );
        assert_eq!(tracker.content_size(&manager, insets, 500.0, false), Size::new(500.0, 40.0));
        assert_eq!(tracker.content_size(&manager, insets, 200.0, true), Size::new(200.0, 40.0));
    }
}
