//! Per-line layout state.
//!
//! A [`LineController`] is a cache derived from one [`DocumentLine`]. It typesets the line
//! lazily into [`LineFragment`]s, answers caret / selection / hit-testing queries in line-local
//! coordinates and tracks the highlight state of the line.
//!
//! Highlight state machine:
//!
//! ```text
//!            prepare (sync)                 result (current generation)
//! Invalid ------------------> Applied <------------------------------+
//!    |     prepare (async)                                            |
//!    +-------------------> InFlight { generation, token } -----------+
//!    ^                         |        failed / cancelled result
//!    |   cancel / invalidate   |  -----------------------------> Failed
//!    +-------------------------+
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::trace;

use crate::error::HighlightError;
use crate::geometry::{Point, Rect};
use crate::highlight::{
    CancellationToken, HighlightDispatcher, HighlightJob, HighlightSpan, LineSyntaxHighlighter,
    StyledRun, resolve_styled_runs,
};
use crate::line_fragment::{LineFragment, LineFragmentTree};
use crate::line_manager::{DocumentLine, LineId};
use crate::measure::TextMeasurer;
use crate::settings::LayoutSettings;
use crate::string_view::{StringView, utf16_prefix};
use crate::text_range::TextRange;
use crate::theme::Theme;
use crate::typesetter::{LineTypesetter, TypesetAmount};

/// Width of the caret rectangle.
pub const CARET_WIDTH: f64 = 2.0;

/// Everything a controller needs from its surroundings to typeset and highlight.
pub(crate) struct LineContext<'a> {
    pub(crate) string_view: &'a StringView,
    pub(crate) line: &'a DocumentLine,
    pub(crate) settings: &'a LayoutSettings,
    pub(crate) measurer: &'a dyn TextMeasurer,
    pub(crate) theme: &'a dyn Theme,
    pub(crate) highlighter: &'a Arc<dyn LineSyntaxHighlighter>,
    pub(crate) dispatcher: Option<&'a HighlightDispatcher>,
}

/// A selection rectangle of one line fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFragmentSelectionRect {
    /// Line-local rectangle.
    pub rect: Rect,
    /// Line-local range covered by the rectangle.
    pub range: TextRange,
    /// The fragment contains the start of the selection.
    pub contains_start: bool,
    /// The fragment contains the end of the selection.
    pub contains_end: bool,
}

#[derive(Debug, Clone)]
enum HighlightState {
    Invalid,
    InFlight { generation: u64, cancellation: CancellationToken },
    Applied,
    Failed,
}

/// Lazy typesetting and highlighting state of one line.
///
/// Controllers live on the owner thread only (they are `!Send`).
#[derive(Debug)]
pub struct LineController {
    line_id: LineId,
    string: Option<String>,
    content_length: usize,
    typesetter: LineTypesetter,
    fragments: LineFragmentTree,
    estimated_line_height: f64,
    highlight: HighlightState,
    styled_runs: Vec<StyledRun>,
    generation: u64,
    _owner_thread: PhantomData<*const ()>,
}

impl LineController {
    pub(crate) fn new(line_id: LineId, estimated_line_height: f64) -> Self {
        Self {
            line_id,
            string: None,
            content_length: 0,
            typesetter: LineTypesetter::new(),
            fragments: LineFragmentTree::new(),
            estimated_line_height,
            highlight: HighlightState::Invalid,
            styled_runs: Vec::new(),
            generation: 0,
            _owner_thread: PhantomData,
        }
    }

    /// Id of the line this controller belongs to.
    pub fn line_id(&self) -> LineId {
        self.line_id
    }

    /// Generation of the last asynchronous highlight request, or 0 if none was made.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_estimated_line_height(&mut self, height: f64) {
        self.estimated_line_height = height;
    }

    /// Typeset until `amount` is satisfied and request highlighting if needed.
    ///
    /// Repeating a request, or asking for less than what is already typeset, does nothing.
    pub(crate) fn prepare_to_display_string(
        &mut self,
        amount: TypesetAmount,
        syntax_highlight_asynchronously: bool,
        context: &LineContext<'_>,
    ) {
        self.typeset(amount, context);
        self.syntax_highlight(syntax_highlight_asynchronously, context);
    }

    /// Typeset until `amount` is satisfied without touching highlighting.
    pub(crate) fn typeset(&mut self, amount: TypesetAmount, context: &LineContext<'_>) {
        self.prepare_string(context);
        let fragments = self.typesetter.typeset(amount, context.measurer);
        if !fragments.is_empty() {
            trace!(
                line = %self.line_id,
                added = fragments.len(),
                typeset = self.typesetter.typeset_length(),
                "typeset line fragments"
            );
        }
        for fragment in fragments {
            self.fragments.push(fragment);
        }
    }

    /// Typeset the fragments intersecting the line-local vertical slice of `rect`.
    pub(crate) fn prepare_to_display_string_in_rect(
        &mut self,
        rect: Rect,
        syntax_highlight_asynchronously: bool,
        context: &LineContext<'_>,
    ) {
        self.prepare_to_display_string(
            TypesetAmount::YPosition(rect.max_y()),
            syntax_highlight_asynchronously,
            context,
        );
    }

    fn prepare_string(&mut self, context: &LineContext<'_>) {
        if self.string.is_some() && self.typesetter.is_prepared() {
            return;
        }
        let text = context
            .string_view
            .substring(context.line.total_range())
            .unwrap_or_default();
        self.content_length = context.line.length;
        self.typesetter.prepare(&text, context.settings);
        self.fragments.clear();
        self.string = Some(text);
    }

    fn syntax_highlight(&mut self, asynchronously: bool, context: &LineContext<'_>) {
        if !matches!(self.highlight, HighlightState::Invalid) {
            return;
        }
        let text = self.content_string();
        if asynchronously && let Some(dispatcher) = context.dispatcher {
            self.generation = dispatcher.next_generation();
            let cancellation = CancellationToken::new();
            let job = HighlightJob {
                line_id: self.line_id,
                generation: self.generation,
                text: text.clone(),
                highlighter: Arc::clone(context.highlighter),
                cancellation: cancellation.clone(),
            };
            if dispatcher.submit(job) {
                self.highlight = HighlightState::InFlight {
                    generation: self.generation,
                    cancellation,
                };
                return;
            }
            trace!(
                line = %self.line_id,
                "highlight worker unavailable, highlighting synchronously"
            );
        }
        let outcome = context.highlighter.highlight(&text, &CancellationToken::new());
        self.apply_outcome(outcome, context.theme);
    }

    /// Apply an asynchronous highlight result. Returns `false` (and changes nothing) when the
    /// result is stale.
    pub(crate) fn apply_highlight_result(
        &mut self,
        generation: u64,
        outcome: Result<Vec<HighlightSpan>, HighlightError>,
        theme: &dyn Theme,
    ) -> bool {
        match &self.highlight {
            HighlightState::InFlight { generation: expected, .. } if *expected == generation => {}
            _ => {
                trace!(line = %self.line_id, generation, "dropping stale highlight result");
                return false;
            }
        }
        self.apply_outcome(outcome, theme);
        true
    }

    fn apply_outcome(
        &mut self,
        outcome: Result<Vec<HighlightSpan>, HighlightError>,
        theme: &dyn Theme,
    ) {
        match outcome {
            Ok(spans) => {
                self.styled_runs = resolve_styled_runs(&spans, theme);
                self.highlight = HighlightState::Applied;
            }
            Err(HighlightError::Cancelled) => {
                trace!(line = %self.line_id, "highlighting cancelled");
                self.highlight = HighlightState::Invalid;
            }
            Err(error) => {
                trace!(line = %self.line_id, %error, "highlighting failed");
                self.highlight = HighlightState::Failed;
            }
        }
    }

    /// Cancel in-flight highlighting. Safe to call any number of times.
    pub fn cancel_syntax_highlighting(&mut self) {
        if let HighlightState::InFlight { cancellation, .. } = &self.highlight {
            trace!(line = %self.line_id, "cancelling highlight job");
            cancellation.cancel();
        }
        if !matches!(self.highlight, HighlightState::Applied) {
            self.highlight = HighlightState::Invalid;
        }
    }

    /// Re-request highlighting the next time the line is prepared. Geometry is kept.
    pub fn invalidate_syntax_highlighting(&mut self) {
        self.cancel_syntax_highlighting();
        self.highlight = HighlightState::Invalid;
    }

    /// Discard fragments but keep the string and highlighting (width, wrap or font changes).
    pub fn invalidate_typesetting(&mut self) {
        self.typesetter.reset();
        self.fragments.clear();
    }

    /// Discard everything derived from the line's text.
    pub fn invalidate_everything(&mut self) {
        self.string = None;
        self.invalidate_typesetting();
        self.invalidate_syntax_highlighting();
        self.styled_runs.clear();
    }

    /// Returns `true` while a highlight job for the current generation is outstanding.
    pub fn is_highlighting(&self) -> bool {
        matches!(self.highlight, HighlightState::InFlight { .. })
    }

    /// Returns `true` once highlighting for the current text was applied.
    pub fn is_highlighted(&self) -> bool {
        matches!(self.highlight, HighlightState::Applied)
    }

    /// Applied highlight attributes.
    pub fn styled_runs(&self) -> &[StyledRun] {
        &self.styled_runs
    }

    /// The line's text including its delimiter, if loaded.
    pub fn string(&self) -> Option<&str> {
        self.string.as_deref()
    }

    fn content_string(&self) -> String {
        let text = self.string.as_deref().unwrap_or_default();
        utf16_prefix(text, self.content_length).to_string()
    }

    /// Returns `true` once the whole line has been typeset.
    pub fn is_finished_typesetting(&self) -> bool {
        self.typesetter.is_finished()
    }

    /// Number of fragments typeset so far.
    pub fn number_of_line_fragments(&self) -> usize {
        self.fragments.len()
    }

    /// Widest fragment typeset so far.
    pub fn line_width(&self) -> f64 {
        self.typesetter.max_width()
    }

    /// Height of the typeset fragments plus an estimate for the rest of the line.
    pub fn line_height(&self) -> f64 {
        if self.fragments.is_empty() {
            return self.estimated_line_height;
        }
        let known = self.fragments.total_height();
        if self.typesetter.is_finished() {
            return known;
        }
        let fragment_height = self
            .fragments
            .last()
            .map_or(self.estimated_line_height, |fragment| fragment.scaled_size.height);
        let remaining = self
            .typesetter
            .best_guess_number_of_line_fragments()
            .saturating_sub(self.fragments.len());
        known + remaining as f64 * fragment_height
    }

    /// The fragment whose range contains line-local `location`. A location on a fragment
    /// boundary belongs to the later fragment.
    pub fn line_fragment_containing(&self, location: usize) -> Option<&LineFragment> {
        self.fragments.containing_location(location)
    }

    /// The fragment at `index`.
    pub fn line_fragment_at(&self, index: usize) -> Option<&LineFragment> {
        self.fragments.at(index)
    }

    /// All fragments typeset so far, in order.
    pub fn line_fragments(&self) -> impl Iterator<Item = &LineFragment> + '_ {
        self.fragments.iter()
    }

    /// Fragments whose line-local vertical span intersects `rect`.
    pub fn line_fragments_in_rect(&self, rect: Rect) -> Vec<&LineFragment> {
        self.fragments
            .iter()
            .filter(|fragment| fragment.rect().intersects_vertically(&rect))
            .collect()
    }

    /// The fragment a caret at `index` is drawn in. A caret on a fragment boundary stays at
    /// the end of the earlier fragment.
    fn fragment_for_caret(&self, index: usize) -> Option<&LineFragment> {
        let fragment = self.fragments.containing_location(index)?;
        if index == fragment.range.location && fragment.index > 0 {
            return self.fragments.at(fragment.index - 1);
        }
        Some(fragment)
    }

    /// Line-local caret rectangle at `index`.
    pub fn caret_rect(&self, index: usize) -> Rect {
        match self.fragment_for_caret(index) {
            Some(fragment) => {
                let height = fragment.base_size.height;
                let y = fragment.y_position + (fragment.scaled_size.height - height) / 2.0;
                Rect::new(fragment.x_offset(index), y, CARET_WIDTH, height)
            }
            None => Rect::new(0.0, 0.0, CARET_WIDTH, self.estimated_line_height),
        }
    }

    /// One rectangle per fragment intersecting the line-local `range`.
    pub fn selection_rects(&self, range: TextRange) -> Vec<LineFragmentSelectionRect> {
        let mut rects = Vec::new();
        for fragment in self.fragments.iter() {
            let start = fragment.range.location;
            let end = fragment.range.upper_bound();
            let is_last =
                fragment.index + 1 == self.fragments.len() && self.typesetter.is_finished();
            let intersects = if range.is_empty() {
                (start..end).contains(&range.location) || (is_last && range.location == end)
            } else {
                range.location < end && range.upper_bound() > start
            };
            if !intersects {
                continue;
            }
            let lower = range.location.max(start);
            let upper = range.upper_bound().min(end);
            let min_x = fragment.x_offset(lower);
            let max_x = fragment.x_offset(upper);
            let contains_start = range.location >= start
                && (range.location < end || (is_last && range.location == end));
            rects.push(LineFragmentSelectionRect {
                rect: Rect::new(
                    min_x,
                    fragment.y_position,
                    (max_x - min_x).max(0.0),
                    fragment.scaled_size.height,
                ),
                range: TextRange::from_bounds(lower, upper),
                contains_start,
                contains_end: (range.upper_bound() > start && range.upper_bound() <= end)
                    || (range.is_empty() && range.location == start),
            });
        }
        rects
    }

    /// Rectangle of the first fragment covering `range`, or the caret rect at its start.
    pub fn first_rect(&self, range: TextRange) -> Rect {
        self.selection_rects(range)
            .first()
            .map_or_else(|| self.caret_rect(range.location), |selection| selection.rect)
    }

    /// Line-local location closest to the line-local `point`.
    ///
    /// Never returns a location past the line's content (the delimiter is not addressable).
    /// A point below the typeset fragments maps to the end of the typeset content.
    pub fn closest_index(&self, point: Point) -> usize {
        let limit = self.content_length.min(self.typesetter.typeset_length());
        let Some(last) = self.fragments.last() else {
            return 0;
        };
        if point.y >= self.fragments.total_height() {
            return limit;
        }
        let fragment = if point.y < 0.0 {
            self.fragments.at(0)
        } else {
            self.fragments.containing_y(point.y)
        }
        .unwrap_or(last);
        fragment.closest_location(point.x, limit)
    }
}
