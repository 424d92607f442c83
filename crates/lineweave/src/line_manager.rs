//! Line tree: line boundaries, lengths, heights and y-positions of the document.
//!
//! [`LineManager`] keeps one node per line in an aggregate red-black tree, so the line
//! containing a location, a y-offset or a row is found in `O(log n)`. Lines are terminated by
//! `\n`, `\r` or `\r\n`; the last line is the only one without a delimiter (and may be empty).
//!
//! Edits re-scan only the lines they touch. Lines keep their [`LineId`] across edits, which is
//! what line controllers and the highlight worker use to refer to a line.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use crate::line_change_set::LineChangeSet;
use crate::string_view::StringView;
use crate::text_range::{ByteRange, TextRange};
use crate::tree::{NodeId, RedBlackTree};

/// Height given to lines that have not been typeset yet.
pub const DEFAULT_ESTIMATED_LINE_HEIGHT: f64 = 20.0;

/// Stable identity of a line.
///
/// Survives edits that leave the line in place and tree rebalancing. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LineId(u64);

impl LineId {
    /// Wrap a raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A row/column pair. The column is measured in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LinePosition {
    /// Zero-based line index.
    pub row: usize,
    /// Zero-based offset within the line.
    pub column: usize,
}

impl LinePosition {
    /// Create a position.
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

/// Snapshot of one line of the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentLine {
    /// Identity of the line.
    pub id: LineId,
    /// Zero-based line index.
    pub row: usize,
    /// Offset of the first code unit of the line.
    pub location: usize,
    /// Length without the delimiter.
    pub length: usize,
    /// Length of the delimiter (0, 1 or 2).
    pub delimiter_length: usize,
    /// Current height of the line.
    pub height: f64,
    /// Top of the line.
    pub y_position: f64,
}

impl DocumentLine {
    /// Length including the delimiter.
    pub fn total_length(&self) -> usize {
        self.length + self.delimiter_length
    }

    /// Range of the visible content.
    pub fn range(&self) -> TextRange {
        TextRange::new(self.location, self.length)
    }

    /// Range including the delimiter.
    pub fn total_range(&self) -> TextRange {
        TextRange::new(self.location, self.total_length())
    }

    /// Range including the delimiter, in UTF-16 bytes.
    pub fn byte_range(&self) -> ByteRange {
        self.total_range().to_byte_range()
    }

    /// Bottom of the line.
    pub fn max_y(&self) -> f64 {
        self.y_position + self.height
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct LineRecord {
    id: LineId,
    delimiter_length: usize,
}

/// The line tree.
#[derive(Debug)]
pub struct LineManager {
    tree: RedBlackTree<LineRecord>,
    nodes: HashMap<LineId, NodeId>,
    next_id: u64,
    estimated_line_height: f64,
    initial_longest_line: Option<LineId>,
}

impl LineManager {
    /// A line tree describing an empty document (one empty line).
    pub fn new() -> Self {
        Self::with_estimated_line_height(DEFAULT_ESTIMATED_LINE_HEIGHT)
    }

    /// Like [`new`](Self::new), with the height given to lines before they are typeset.
    pub fn with_estimated_line_height(estimated_line_height: f64) -> Self {
        let mut manager = Self {
            tree: RedBlackTree::new(),
            nodes: HashMap::new(),
            next_id: 0,
            estimated_line_height,
            initial_longest_line: None,
        };
        manager.rebuild_from_lines(vec![(0, 0)]);
        manager
    }

    /// Height given to lines before they are typeset.
    pub fn estimated_line_height(&self) -> f64 {
        self.estimated_line_height
    }

    /// Change the height used for lines inserted from now on.
    pub fn set_estimated_line_height(&mut self, height: f64) {
        self.estimated_line_height = height;
    }

    /// Rebuild the tree from the whole buffer.
    ///
    /// All previous line ids are dropped. Heights start at the estimated line height.
    pub fn rebuild(&mut self, string_view: &StringView) {
        let (mut lines, remainder) = scan_lines(string_view.rope().chars());
        lines.push((remainder, 0));
        self.rebuild_from_lines(lines);
        debug!(
            line_count = self.line_count(),
            length = self.tree.total_length(),
            "rebuilt line tree"
        );
    }

    fn rebuild_from_lines(&mut self, lines: Vec<(usize, usize)>) {
        let mut longest: Option<(usize, LineId)> = None;
        let mut records = Vec::with_capacity(lines.len());
        for (total_length, delimiter_length) in lines {
            let id = self.allocate_id();
            let length = total_length - delimiter_length;
            if longest.is_none_or(|(best, _)| length > best) {
                longest = Some((length, id));
            }
            records.push((
                total_length,
                self.estimated_line_height,
                LineRecord {
                    id,
                    delimiter_length,
                },
            ));
        }
        let ids: Vec<LineId> = records.iter().map(|(_, _, record)| record.id).collect();
        let nodes = self.tree.rebuild(records);
        self.nodes = ids.into_iter().zip(nodes).collect();
        self.initial_longest_line = longest.map(|(_, id)| id);
    }

    fn allocate_id(&mut self) -> LineId {
        let id = LineId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Number of lines. Always at least one.
    pub fn line_count(&self) -> usize {
        self.tree.len()
    }

    /// Sum of all line heights.
    pub fn content_height(&self) -> f64 {
        self.tree.total_height()
    }

    /// Sum of all line lengths; equals the length of the buffer.
    pub fn total_length(&self) -> usize {
        self.tree.total_length()
    }

    /// The longest line found by the last [`rebuild`](Self::rebuild), if it still exists.
    pub fn initial_longest_line(&self) -> Option<DocumentLine> {
        self.initial_longest_line.and_then(|id| self.line(id))
    }

    /// The first line.
    pub fn first_line(&self) -> DocumentLine {
        self.line_at_row(0)
    }

    /// The last line.
    pub fn last_line(&self) -> DocumentLine {
        self.line_at_row(self.line_count() - 1)
    }

    /// Snapshot of the line with `id`, if it still exists.
    pub fn line(&self, id: LineId) -> Option<DocumentLine> {
        self.nodes.get(&id).map(|node| self.snapshot(*node))
    }

    /// The line after `line`.
    pub fn line_after(&self, line: &DocumentLine) -> Option<DocumentLine> {
        let node = self.node(line.id);
        self.tree.next(node).map(|next| self.snapshot(next))
    }

    /// The line before `line`.
    pub fn line_before(&self, line: &DocumentLine) -> Option<DocumentLine> {
        let node = self.node(line.id);
        self.tree.previous(node).map(|previous| self.snapshot(previous))
    }

    /// The line whose range (including its delimiter) contains `location`.
    ///
    /// `location == total_length()` maps to the last line; locations past the end return `None`.
    pub fn line_containing_location(&self, location: usize) -> Option<DocumentLine> {
        self.tree
            .node_containing_location(location)
            .map(|node| self.snapshot(node))
    }

    /// The line containing UTF-16 byte offset `byte_offset`.
    pub fn line_containing_byte(&self, byte_offset: usize) -> Option<DocumentLine> {
        self.line_containing_location(byte_offset / 2)
    }

    /// The line whose vertical span contains `y`.
    ///
    /// `y == content_height()` maps to the last line; negative or larger offsets return `None`.
    pub fn line_containing_y_offset(&self, y: f64) -> Option<DocumentLine> {
        self.tree.node_containing_y(y).map(|node| self.snapshot(node))
    }

    /// The line at `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= line_count()`.
    pub fn line_at_row(&self, row: usize) -> DocumentLine {
        match self.tree.node_at_index(row) {
            Some(node) => self.snapshot(node),
            None => panic!(
                "row {row} is out of bounds for a document with {} lines",
                self.line_count()
            ),
        }
    }

    /// Row and column of `location`.
    pub fn line_position(&self, location: usize) -> Option<LinePosition> {
        let line = self.line_containing_location(location)?;
        Some(LinePosition::new(line.row, location - line.location))
    }

    /// The location of a row/column position, with the column clamped to the line's content.
    pub fn location(&self, position: LinePosition) -> Option<usize> {
        let node = self.tree.node_at_index(position.row)?;
        let line = self.snapshot(node);
        Some(line.location + position.column.min(line.length))
    }

    /// Lines overlapping `range`, in document order.
    ///
    /// Both ends are inclusive: the line containing `range.upper_bound()` is part of the result
    /// even if the range ends at its first code unit.
    pub fn lines_in(&self, range: TextRange) -> Vec<DocumentLine> {
        let Some(first) = self.tree.node_containing_location(range.location) else {
            return Vec::new();
        };
        let last = self
            .tree
            .node_containing_location(range.upper_bound())
            .or_else(|| self.tree.last());
        let mut lines = Vec::new();
        let mut node = Some(first);
        while let Some(current) = node {
            lines.push(self.snapshot(current));
            if Some(current) == last {
                break;
            }
            node = self.tree.next(current);
        }
        lines
    }

    /// Iterate all lines in document order.
    pub fn iter(&self) -> Lines<'_> {
        Lines {
            manager: self,
            node: self.tree.first(),
            row: 0,
            location: 0,
            y_position: 0.0,
        }
    }

    /// Set the height of a line. Returns `true` if the height actually changed.
    ///
    /// # Panics
    ///
    /// Panics if the line does not exist.
    pub fn set_height(&mut self, id: LineId, height: f64) -> bool {
        let node = self.node(id);
        if (self.tree.height(node) - height).abs() > f64::EPSILON {
            self.tree.set_height(node, height);
            true
        } else {
            false
        }
    }

    /// Replace the text in `range` with `replacement` and update the affected lines.
    ///
    /// The buffer is spliced first. Then the span from the start of the first line touching
    /// the range to the end of the last line touching it is scanned again. Existing lines are
    /// paired with the new ones in order: paired lines are *edited* and keep their ids,
    /// surplus old lines are *removed* and surplus new lines are *inserted*. When the edit
    /// makes a `\r` at the end of the previous line meet a `\n`, the previous line is part of
    /// the span so the two join into one `\r\n` delimiter.
    ///
    /// # Panics
    ///
    /// Panics if `range` extends past the end of the buffer.
    pub fn apply_edit(
        &mut self,
        string_view: &mut StringView,
        range: TextRange,
        replacement: &str,
    ) -> LineChangeSet {
        let old_length = string_view.len();
        assert!(
            range.upper_bound() <= old_length,
            "edit range {range} is out of bounds for a buffer of length {old_length}"
        );
        debug_assert_eq!(old_length, self.total_length(), "line tree out of sync with buffer");

        let (first_node, last_node) = match (
            self.tree.node_containing_location(range.location),
            self.tree.node_containing_location(range.upper_bound()),
        ) {
            (Some(first), Some(last)) => (first, last),
            _ => panic!("no line contains edit range {range}"),
        };
        let mut first_node = first_node;
        let mut span_start = self.tree.location(first_node);
        let old_span_end = self.tree.location(last_node) + self.tree.length(last_node);

        string_view.replace(range, replacement);
        let new_length = string_view.len();
        // The text after the range up to the end of the last line is unchanged.
        let new_span_end = old_span_end + new_length - old_length;

        if span_start > 0 && self.joins_previous_line(string_view, span_start, first_node) {
            if let Some(previous) = self.tree.previous(first_node) {
                first_node = previous;
                span_start = self.tree.location(previous);
            }
        }

        let mut old_nodes = vec![first_node];
        let mut node = first_node;
        while node != last_node {
            match self.tree.next(node) {
                Some(next) => {
                    old_nodes.push(next);
                    node = next;
                }
                None => break,
            }
        }

        let span = TextRange::new(span_start, new_span_end - span_start);
        let (mut new_lines, remainder) = scan_lines(string_view.chars(span));
        // Only the span holding the document's last line may end without a delimiter. A
        // trailing empty line after the span is kept as it is.
        if self.tree.next(last_node).is_none() {
            debug_assert_eq!(
                new_span_end, new_length,
                "last line must reach the end of the buffer"
            );
            new_lines.push((remainder, 0));
        } else {
            debug_assert_eq!(remainder, 0, "re-scanned span must end on a line boundary");
        }

        let mut change_set = LineChangeSet::new();
        let paired = old_nodes.len().min(new_lines.len());
        for (node, (total_length, delimiter_length)) in old_nodes.iter().zip(&new_lines) {
            self.tree.set_length(*node, *total_length);
            let record = self.tree.data_mut(*node);
            record.delimiter_length = *delimiter_length;
            change_set.mark_edited(record.id);
        }
        for node in old_nodes.iter().skip(paired) {
            let record = self.tree.remove(*node);
            self.nodes.remove(&record.id);
            if self.initial_longest_line == Some(record.id) {
                self.initial_longest_line = None;
            }
            change_set.mark_removed(record.id);
        }
        let mut anchor = old_nodes[paired - 1];
        for (total_length, delimiter_length) in new_lines.iter().skip(paired) {
            let id = self.allocate_id();
            anchor = self.tree.insert_after(
                anchor,
                *total_length,
                self.estimated_line_height,
                LineRecord {
                    id,
                    delimiter_length: *delimiter_length,
                },
            );
            self.nodes.insert(id, anchor);
            change_set.mark_inserted(id);
        }

        trace!(
            %range,
            replaced = old_nodes.len(),
            scanned = new_lines.len(),
            line_count = self.line_count(),
            "applied edit to line tree"
        );
        self.debug_assert_invariants(string_view);
        change_set
    }

    fn joins_previous_line(
        &self,
        string_view: &StringView,
        span_start: usize,
        first_node: NodeId,
    ) -> bool {
        let Some(previous) = self.tree.previous(first_node) else {
            return false;
        };
        self.tree.data(previous).delimiter_length == 1
            && string_view.utf16_unit(span_start - 1) == Some(u16::from(b'\r'))
            && string_view.utf16_unit(span_start) == Some(u16::from(b'\n'))
    }

    /// Check the structural invariants against the buffer. Does nothing in release builds.
    pub fn debug_assert_invariants(&self, string_view: &StringView) {
        if cfg!(debug_assertions) {
            assert_eq!(
                self.total_length(),
                string_view.len(),
                "sum of line lengths must equal the buffer length"
            );
            let last = self.tree.last();
            for node in self.tree.iter() {
                let record = self.tree.data(node);
                if Some(node) == last {
                    assert_eq!(record.delimiter_length, 0, "last line must not have a delimiter");
                } else {
                    assert!(
                        record.delimiter_length > 0,
                        "line {} lacks a delimiter but is not the last line",
                        record.id
                    );
                }
            }
        }
    }

    fn node(&self, id: LineId) -> NodeId {
        match self.nodes.get(&id) {
            Some(node) => *node,
            None => panic!("line {id} does not exist"),
        }
    }

    fn snapshot(&self, node: NodeId) -> DocumentLine {
        let record = self.tree.data(node);
        let total_length = self.tree.length(node);
        DocumentLine {
            id: record.id,
            row: self.tree.index(node),
            location: self.tree.location(node),
            length: total_length - record.delimiter_length,
            delimiter_length: record.delimiter_length,
            height: self.tree.height(node),
            y_position: self.tree.y_position(node),
        }
    }
}

impl Default for LineManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the lines of a [`LineManager`] in document order.
#[derive(Debug)]
pub struct Lines<'a> {
    manager: &'a LineManager,
    node: Option<NodeId>,
    row: usize,
    location: usize,
    y_position: f64,
}

impl Iterator for Lines<'_> {
    type Item = DocumentLine;

    fn next(&mut self) -> Option<DocumentLine> {
        let node = self.node?;
        let tree = &self.manager.tree;
        let record = tree.data(node);
        let total_length = tree.length(node);
        let line = DocumentLine {
            id: record.id,
            row: self.row,
            location: self.location,
            length: total_length - record.delimiter_length,
            delimiter_length: record.delimiter_length,
            height: tree.height(node),
            y_position: self.y_position,
        };
        self.row += 1;
        self.location += total_length;
        self.y_position += line.height;
        self.node = tree.next(node);
        Some(line)
    }
}

/// Split `chars` into delimiter-terminated lines.
///
/// Returns `(total_length, delimiter_length)` for each terminated line and the length of the
/// unterminated remainder. Lengths are in UTF-16 code units.
pub(crate) fn scan_lines(chars: impl Iterator<Item = char>) -> (Vec<(usize, usize)>, usize) {
    let mut lines = Vec::new();
    let mut current = 0usize;
    let mut pending_cr = false;
    for ch in chars {
        if pending_cr {
            pending_cr = false;
            if ch == '\n' {
                lines.push((current + 1, 2));
                current = 0;
                continue;
            }
            lines.push((current, 1));
            current = 0;
        }
        match ch {
            '\r' => {
                current += 1;
                pending_cr = true;
            }
            '\n' => {
                lines.push((current + 1, 1));
                current = 0;
            }
            _ => current += ch.len_utf16(),
        }
    }
    if pending_cr {
        lines.push((current, 1));
        current = 0;
    }
    (lines, current)
}
