//! Theme capability: font metrics and capture styles.
//!
//! A theme is consumed as plain data. `lineweave` never loads fonts; the host measures its font
//! once and hands the metrics over through [`Theme::font_metrics`].

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Metrics of the (monospace) text font, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FontMetrics {
    /// Advance of one cell (one narrow character).
    pub cell_width: f64,
    /// Distance from the baseline to the top of the line.
    pub ascent: f64,
    /// Distance from the baseline to the bottom of the line.
    pub descent: f64,
    /// Extra spacing added below the line.
    pub leading: f64,
}

impl FontMetrics {
    /// Natural height of one line fragment.
    pub fn line_height(&self) -> f64 {
        self.ascent + self.descent + self.leading
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            cell_width: 8.0,
            ascent: 12.0,
            descent: 4.0,
            leading: 0.0,
        }
    }
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Visual attributes of a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextStyle {
    /// Text color.
    pub foreground: Option<Color>,
    /// Background color.
    pub background: Option<Color>,
    /// Bold text.
    pub bold: bool,
    /// Italic text.
    pub italic: bool,
    /// Underlined text.
    pub underline: bool,
}

impl TextStyle {
    /// A style that only sets the text color.
    pub const fn foreground(color: Color) -> Self {
        Self {
            foreground: Some(color),
            background: None,
            bold: false,
            italic: false,
            underline: false,
        }
    }
}

/// The theme capability.
pub trait Theme: fmt::Debug + Send + Sync {
    /// Metrics of the text font.
    fn font_metrics(&self) -> FontMetrics;

    /// Default text color.
    fn text_color(&self) -> Color;

    /// Style for a highlight capture such as `keyword` or `string.special`.
    fn style_for_capture(&self, capture: &str) -> Option<TextStyle>;
}

/// A small built-in theme.
///
/// Captures are matched by their longest dotted prefix, so `keyword.control` falls back to
/// `keyword`.
#[derive(Debug, Clone)]
pub struct DefaultTheme {
    metrics: FontMetrics,
    text_color: Color,
    styles: HashMap<String, TextStyle>,
}

impl DefaultTheme {
    /// The default theme with the given font metrics.
    pub fn with_font_metrics(metrics: FontMetrics) -> Self {
        let styles = [
            (
                "keyword",
                TextStyle {
                    bold: true,
                    ..TextStyle::foreground(Color::rgb(0xAD, 0x3D, 0xA4))
                },
            ),
            ("string", TextStyle::foreground(Color::rgb(0xC4, 0x1A, 0x16))),
            (
                "comment",
                TextStyle {
                    italic: true,
                    ..TextStyle::foreground(Color::rgb(0x70, 0x7F, 0x8C))
                },
            ),
            ("number", TextStyle::foreground(Color::rgb(0x1C, 0x00, 0xCF))),
            ("function", TextStyle::foreground(Color::rgb(0x32, 0x6D, 0x74))),
            ("type", TextStyle::foreground(Color::rgb(0x0B, 0x4F, 0x79))),
            ("operator", TextStyle::foreground(Color::rgb(0x26, 0x26, 0x26))),
        ]
        .into_iter()
        .map(|(name, style)| (name.to_string(), style))
        .collect();
        Self {
            metrics,
            text_color: Color::rgb(0x26, 0x26, 0x26),
            styles,
        }
    }

    /// Add or replace the style of a capture.
    pub fn set_style(&mut self, capture: impl Into<String>, style: TextStyle) {
        self.styles.insert(capture.into(), style);
    }
}

impl Default for DefaultTheme {
    fn default() -> Self {
        Self::with_font_metrics(FontMetrics::default())
    }
}

impl Theme for DefaultTheme {
    fn font_metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn text_color(&self) -> Color {
        self.text_color
    }

    fn style_for_capture(&self, capture: &str) -> Option<TextStyle> {
        let mut name = capture;
        loop {
            if let Some(style) = self.styles.get(name) {
                return Some(*style);
            }
            let (parent, _) = name.rsplit_once('.')?;
            name = parent;
        }
    }
}
