//! Line fragments: the visual sub-lines a line is wrapped into.

use crate::geometry::{Rect, Size};
use crate::text_range::TextRange;
use crate::tree::RedBlackTree;

/// One typeset sub-line of a line.
///
/// Ranges and y-positions are local to the line. Fragments of a line are contiguous and
/// partition its total length; the delimiter belongs to the last fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineFragment {
    /// Zero-based index within the line.
    pub index: usize,
    /// Line-local range, including any hidden trailing whitespace.
    pub range: TextRange,
    /// Trailing whitespace that hangs past the constraining width.
    pub hidden_length: usize,
    /// Top of the fragment relative to the top of the line.
    pub y_position: f64,
    /// Natural size of the fragment.
    pub base_size: Size,
    /// Size after applying the line height multiplier.
    pub scaled_size: Size,
    /// Caret x-offset for every code unit position `0..=range.length`.
    pub(crate) caret_offsets: Vec<f64>,
    /// Fragment-local positions a caret may rest on (grapheme boundaries), ascending.
    pub(crate) caret_stops: Vec<usize>,
}

impl LineFragment {
    /// Bottom of the fragment relative to the top of the line.
    pub fn max_y(&self) -> f64 {
        self.y_position + self.scaled_size.height
    }

    /// Line-local rectangle of the fragment.
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, self.y_position, self.scaled_size.width, self.scaled_size.height)
    }

    /// Caret x-offset of line-local position `location`, clamped to the fragment.
    pub fn x_offset(&self, location: usize) -> f64 {
        let local = location.saturating_sub(self.range.location).min(self.range.length);
        self.caret_offsets.get(local).copied().unwrap_or(0.0)
    }

    /// Line-local caret position closest to `x`, never past `limit` (the end of the line's
    /// visible content).
    pub fn closest_location(&self, x: f64, limit: usize) -> usize {
        let mut best: Option<(usize, f64)> = None;
        for stop in &self.caret_stops {
            let location = self.range.location + stop;
            if location > limit {
                break;
            }
            let distance = (self.caret_offsets[*stop] - x).abs();
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((location, distance));
            }
        }
        best.map_or(self.range.location.min(limit), |(location, _)| location)
    }
}

/// Per-line tree of fragments, aggregated by length and height like the line tree.
#[derive(Debug, Default)]
pub(crate) struct LineFragmentTree {
    tree: RedBlackTree<LineFragment>,
}

impl LineFragmentTree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&mut self) {
        self.tree.clear();
    }

    pub(crate) fn push(&mut self, fragment: LineFragment) {
        let length = fragment.range.length;
        let height = fragment.scaled_size.height;
        self.tree.push_back(length, height, fragment);
    }

    pub(crate) fn len(&self) -> usize {
        self.tree.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub(crate) fn total_height(&self) -> f64 {
        self.tree.total_height()
    }

    pub(crate) fn last(&self) -> Option<&LineFragment> {
        self.tree.last().map(|node| self.tree.data(node))
    }

    pub(crate) fn containing_location(&self, location: usize) -> Option<&LineFragment> {
        self.tree
            .node_containing_location(location)
            .map(|node| self.tree.data(node))
    }

    pub(crate) fn containing_y(&self, y: f64) -> Option<&LineFragment> {
        self.tree.node_containing_y(y).map(|node| self.tree.data(node))
    }

    pub(crate) fn at(&self, index: usize) -> Option<&LineFragment> {
        self.tree.node_at_index(index).map(|node| self.tree.data(node))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &LineFragment> + '_ {
        self.tree.iter().map(|node| self.tree.data(node))
    }
}
