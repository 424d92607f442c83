//! Text measurement.
//!
//! Computes character widths based on UAX #11 and expands tabs to tab stops. Widths are cell
//! counts scaled by the font's cell width.

use std::fmt;

use unicode_width::UnicodeWidthChar;

use crate::settings::DEFAULT_TAB_WIDTH;
use crate::theme::FontMetrics;

/// Measures the advance of characters while typesetting a line fragment.
pub trait TextMeasurer: fmt::Debug {
    /// Advance of `ch` when it starts `x` points from the start of its line fragment.
    fn advance(&self, ch: char, x: f64) -> f64;

    /// Metrics used for fragment heights and caret geometry.
    fn font_metrics(&self) -> FontMetrics;
}

/// Calculate visual width of a character (based on UAX #11)
///
/// Return value:
/// - 1: Narrow character (ASCII, etc.)
/// - 2: Wide character (CJK, fullwidth, etc.)
/// - 0: Zero-width character (combining characters, etc.)
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(1)
}

/// Calculate visual width (in cells) for a character at a specific cell offset.
///
/// `'\t'` advances to the next tab stop; line delimiters take no space.
pub fn cell_width_at(ch: char, cell_offset: usize, tab_width: usize) -> usize {
    match ch {
        '\t' => {
            let tab_width = tab_width.max(1);
            tab_width - cell_offset % tab_width
        }
        '\n' | '\r' => 0,
        _ => char_width(ch),
    }
}

/// Calculate total visual width (in cells) of a string, interpreting `'\t'` using `tab_width`.
pub fn str_width_with_tab_width(s: &str, tab_width: usize) -> usize {
    let mut x = 0usize;
    for ch in s.chars() {
        x = x.saturating_add(cell_width_at(ch, x, tab_width));
    }
    x
}

/// Cell-grid measurer for monospace fonts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasurer {
    metrics: FontMetrics,
    tab_width: usize,
}

impl MonospaceMeasurer {
    /// Create a measurer.
    pub fn new(metrics: FontMetrics, tab_width: usize) -> Self {
        Self {
            metrics,
            tab_width: tab_width.max(1),
        }
    }

    /// Tab width, in cells.
    pub fn tab_width(&self) -> usize {
        self.tab_width
    }
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self::new(FontMetrics::default(), DEFAULT_TAB_WIDTH)
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn advance(&self, ch: char, x: f64) -> f64 {
        let cell_width = self.metrics.cell_width;
        if ch == '\t' && cell_width > 0.0 {
            // Round so accumulated float error cannot skip a tab stop.
            let cell_offset = (x / cell_width).round().max(0.0) as usize;
            return cell_width_at(ch, cell_offset, self.tab_width) as f64 * cell_width;
        }
        cell_width_at(ch, 0, self.tab_width) as f64 * cell_width
    }

    fn font_metrics(&self) -> FontMetrics {
        self.metrics
    }
}
