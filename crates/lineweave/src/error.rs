//! Error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
/// Invalid [`LayoutSettings`](crate::settings::LayoutSettings).
pub enum ConfigError {
    #[error("constraining width must be positive (or infinite), got {0}")]
    /// The constraining width is zero, negative or NaN.
    InvalidConstrainingWidth(f64),

    #[error("tab width must be at least one cell")]
    /// The tab width is zero.
    ZeroTabWidth,

    #[error("line height multiplier must be positive and finite, got {0}")]
    /// The line height multiplier is not a positive finite number.
    InvalidLineHeightMultiplier(f64),

    #[error("estimated line height must be positive and finite, got {0}")]
    /// The estimated line height is not a positive finite number.
    InvalidEstimatedLineHeight(f64),

    #[error("text container insets must be finite and non-negative")]
    /// An inset is negative or not finite.
    InvalidInsets,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors reported by a [`LineSyntaxHighlighter`](crate::highlight::LineSyntaxHighlighter).
pub enum HighlightError {
    #[error("highlighting was cancelled")]
    /// The cancellation token fired before the highlighter finished.
    Cancelled,

    #[error("highlighting failed: {0}")]
    /// The highlighter could not produce attributes for the line.
    Failed(String),
}
