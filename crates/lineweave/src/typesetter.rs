//! Incremental line typesetting (soft wrapping).
//!
//! A [`LineTypesetter`] breaks one line into [`LineFragment`]s on demand. Fragments are produced
//! front to back and never revisited, so a long line only pays for the part that is shown.
//!
//! Break rules:
//! - `WrapMode::Char` breaks before the first grapheme that would overflow the constraining
//!   width. A grapheme wider than the whole width gets a fragment of its own.
//! - `WrapMode::Word` breaks after the last whitespace that fits; whitespace that overflows
//!   hangs past the width (counted as hidden) instead of starting a new fragment. Words longer
//!   than the width fall back to character wrapping.
//! - Delimiters take no space and always end the last fragment.

use unicode_segmentation::UnicodeSegmentation;

use crate::geometry::Size;
use crate::line_fragment::LineFragment;
use crate::measure::TextMeasurer;
use crate::settings::{LayoutSettings, WrapMode};
use crate::text_range::TextRange;

const WIDTH_EPSILON: f64 = 1e-9;

/// How far a line should be typeset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypesetAmount {
    /// Until the fragment containing this line-local location exists, plus one more, so the
    /// text following the location is ready too.
    Location(usize),
    /// Until a fragment extends below this line-local y-offset.
    YPosition(f64),
}

#[derive(Debug, Default)]
pub(crate) struct LineTypesetter {
    chars: Vec<char>,
    unit_offsets: Vec<usize>,
    grapheme_starts: Vec<bool>,
    settings: LayoutSettings,
    prepared: bool,
    next_char: usize,
    next_y: f64,
    fragment_count: usize,
    last_fragment_location: Option<usize>,
    max_width: f64,
}

impl LineTypesetter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Load the text of the line. Discards all typesetting progress.
    pub(crate) fn prepare(&mut self, text: &str, settings: &LayoutSettings) {
        self.reset();
        self.chars = text.chars().collect();
        self.unit_offsets = Vec::with_capacity(self.chars.len() + 1);
        let mut offset = 0usize;
        for ch in &self.chars {
            self.unit_offsets.push(offset);
            offset += ch.len_utf16();
        }
        self.unit_offsets.push(offset);

        self.grapheme_starts = vec![false; self.chars.len() + 1];
        let mut char_index = 0usize;
        for grapheme in text.graphemes(true) {
            self.grapheme_starts[char_index] = true;
            char_index += grapheme.chars().count();
        }
        self.grapheme_starts[self.chars.len()] = true;

        self.settings = *settings;
        self.prepared = true;
    }

    pub(crate) fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Length of the line in UTF-16 code units.
    pub(crate) fn string_length(&self) -> usize {
        self.unit_offsets.last().copied().unwrap_or(0)
    }

    /// Code units covered by the fragments produced so far.
    pub(crate) fn typeset_length(&self) -> usize {
        self.unit_offsets.get(self.next_char).copied().unwrap_or(0)
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.prepared && self.next_char >= self.chars.len() && self.fragment_count > 0
    }

    pub(crate) fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    pub(crate) fn max_width(&self) -> f64 {
        self.max_width
    }

    /// Fragments produced so far plus an extrapolation for the untypeset rest of the line.
    pub(crate) fn best_guess_number_of_line_fragments(&self) -> usize {
        if self.is_finished() {
            return self.fragment_count;
        }
        let typeset = self.typeset_length();
        if self.fragment_count == 0 || typeset == 0 {
            return self.fragment_count.max(1);
        }
        let per_fragment = typeset as f64 / self.fragment_count as f64;
        let remaining = (self.string_length() - typeset) as f64;
        self.fragment_count + (remaining / per_fragment).ceil() as usize
    }

    /// Produce fragments until `amount` is satisfied. Returns only the new fragments.
    pub(crate) fn typeset(
        &mut self,
        amount: TypesetAmount,
        measurer: &dyn TextMeasurer,
    ) -> Vec<LineFragment> {
        let mut fragments = Vec::new();
        if !self.prepared || self.settings.constraining_width <= 0.0 {
            return fragments;
        }
        while !self.is_finished() && !self.satisfies(amount) {
            fragments.push(self.typeset_next_fragment(measurer));
        }
        fragments
    }

    fn satisfies(&self, amount: TypesetAmount) -> bool {
        match amount {
            TypesetAmount::Location(location) => self
                .last_fragment_location
                .is_some_and(|start| start > location),
            TypesetAmount::YPosition(y) => self.fragment_count > 0 && self.next_y > y,
        }
    }

    fn typeset_next_fragment(&mut self, measurer: &dyn TextMeasurer) -> LineFragment {
        let start = self.next_char;
        let metrics = measurer.font_metrics();
        let base_height = metrics.line_height();
        let scaled_height = base_height * self.settings.line_height_multiplier;
        let width_limit = if self.settings.is_wrapping() {
            self.settings.constraining_width
        } else {
            f64::INFINITY
        };
        let word_mode = self.settings.wrap_mode == WrapMode::Word;

        let mut offsets = vec![0.0];
        let mut x = 0.0;
        let mut visible_width = 0.0;
        let mut hidden_length = 0usize;
        let mut last_break: Option<(usize, usize, f64)> = None;
        let mut end = start;

        while end < self.chars.len() {
            let ch = self.chars[end];
            let is_delimiter = ch == '\n' || ch == '\r';
            let advance = if is_delimiter { 0.0 } else { measurer.advance(ch, x) };

            let overflows = x + advance > width_limit + WIDTH_EPSILON;
            if !is_delimiter && end > start && advance > 0.0 && overflows {
                if word_mode && ch.is_whitespace() {
                    hidden_length += ch.len_utf16();
                    push_caret_offsets(&mut offsets, ch, x, x + advance);
                    x += advance;
                    end += 1;
                    last_break = Some((end, offsets.len(), visible_width));
                    continue;
                }
                if word_mode
                    && let Some((break_char, offsets_len, break_width)) = last_break
                    && break_char > start
                {
                    end = break_char;
                    offsets.truncate(offsets_len);
                    visible_width = break_width;
                    break;
                }
                let mut split = end;
                while split > start && !self.grapheme_starts[split] {
                    split -= 1;
                }
                if split > start {
                    offsets.truncate(self.unit_offsets[split] - self.unit_offsets[start] + 1);
                    let split_x = offsets.last().copied().unwrap_or(0.0);
                    visible_width = visible_width.min(split_x);
                    end = split;
                    break;
                }
            }

            push_caret_offsets(&mut offsets, ch, x, x + advance);
            x += advance;
            if !is_delimiter && hidden_length == 0 {
                visible_width = x;
            }
            end += 1;
            if word_mode && !is_delimiter && ch.is_whitespace() {
                last_break = Some((end, offsets.len(), visible_width));
            }
        }

        let location = self.unit_offsets[start];
        let length = self.unit_offsets[end] - location;
        let mut caret_stops: Vec<usize> = (start..=end)
            .filter(|index| self.grapheme_starts[*index])
            .map(|index| self.unit_offsets[index] - location)
            .collect();
        if caret_stops.last() != Some(&length) {
            caret_stops.push(length);
        }
        if caret_stops.first() != Some(&0) {
            caret_stops.insert(0, 0);
        }

        let fragment = LineFragment {
            index: self.fragment_count,
            range: TextRange::new(location, length),
            hidden_length: hidden_length.min(length),
            y_position: self.next_y,
            base_size: Size::new(visible_width, base_height),
            scaled_size: Size::new(visible_width, scaled_height),
            caret_offsets: offsets,
            caret_stops,
        };

        self.next_char = end;
        self.next_y += scaled_height;
        self.fragment_count += 1;
        self.last_fragment_location = Some(location);
        self.max_width = self.max_width.max(visible_width);
        fragment
    }
}

fn push_caret_offsets(offsets: &mut Vec<f64>, ch: char, x_before: f64, x_after: f64) {
    if ch.len_utf16() == 2 {
        offsets.push(x_before);
    }
    offsets.push(x_after);
}
