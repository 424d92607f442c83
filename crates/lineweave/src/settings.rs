//! Layout configuration.
//!
//! [`LayoutSettings`] bundles everything that affects line geometry. Changing a setting through
//! [`TextEditor`](crate::text_editor::TextEditor) invalidates what depends on it and nothing else.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::EdgeInsets;
use crate::line_manager::DEFAULT_ESTIMATED_LINE_HEIGHT;

/// Default tab width (in cells) used when a caller does not specify a tab width.
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Soft wrapping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WrapMode {
    /// No soft wrapping (each line is a single line fragment).
    None,
    /// Wrap at character boundaries.
    #[default]
    Char,
    /// Prefer wrapping at word boundaries (whitespace), falling back to character wrap.
    Word,
}

/// What happens to the scroll position when lines above the viewport change height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScrollAdjustmentPolicy {
    /// Shift the content offset by the height delta so the visible text stays put.
    #[default]
    PreserveVisibleContent,
    /// Leave the content offset alone.
    None,
}

/// Settings that affect line geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayoutSettings {
    /// Width available to line fragments, excluding insets. `f64::INFINITY` disables wrapping.
    pub constraining_width: f64,
    /// Soft wrapping mode.
    pub wrap_mode: WrapMode,
    /// Tab width, in cells.
    pub tab_width: usize,
    /// Factor applied to the natural height of every line fragment.
    pub line_height_multiplier: f64,
    /// Height assumed for lines that have not been typeset yet.
    pub estimated_line_height: f64,
    /// Insets of the text container.
    pub text_container_inset: EdgeInsets,
    /// Scroll compensation when lines above the viewport change height.
    pub scroll_adjustment: ScrollAdjustmentPolicy,
}

impl LayoutSettings {
    /// Check the settings for values that would break layout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.constraining_width.is_nan() || self.constraining_width <= 0.0 {
            return Err(ConfigError::InvalidConstrainingWidth(self.constraining_width));
        }
        if self.tab_width == 0 {
            return Err(ConfigError::ZeroTabWidth);
        }
        if !self.line_height_multiplier.is_finite() || self.line_height_multiplier <= 0.0 {
            return Err(ConfigError::InvalidLineHeightMultiplier(self.line_height_multiplier));
        }
        if !self.estimated_line_height.is_finite() || self.estimated_line_height <= 0.0 {
            return Err(ConfigError::InvalidEstimatedLineHeight(self.estimated_line_height));
        }
        let inset = self.text_container_inset;
        if [inset.top, inset.left, inset.bottom, inset.right]
            .iter()
            .any(|value| !value.is_finite() || *value < 0.0)
        {
            return Err(ConfigError::InvalidInsets);
        }
        Ok(())
    }

    /// Returns `true` if lines can wrap with these settings.
    pub fn is_wrapping(&self) -> bool {
        self.wrap_mode != WrapMode::None && self.constraining_width.is_finite()
    }
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            constraining_width: f64::INFINITY,
            wrap_mode: WrapMode::Char,
            tab_width: DEFAULT_TAB_WIDTH,
            line_height_multiplier: 1.0,
            estimated_line_height: DEFAULT_ESTIMATED_LINE_HEIGHT,
            text_container_inset: EdgeInsets::default(),
            scroll_adjustment: ScrollAdjustmentPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert_eq!(LayoutSettings::default().validate(), Ok(()));
        assert!(!LayoutSettings::default().is_wrapping());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let settings = LayoutSettings {
            tab_width: 0,
            ..LayoutSettings::default()
        };
        assert_eq!(settings.validate(), Err(ConfigError::ZeroTabWidth));

        let settings = LayoutSettings {
            constraining_width: 0.0,
            ..LayoutSettings::default()
        };
        assert_eq!(settings.validate(), Err(ConfigError::InvalidConstrainingWidth(0.0)));

        let settings = LayoutSettings {
            line_height_multiplier: f64::NAN,
            ..LayoutSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidLineHeightMultiplier(_))
        ));

        let settings = LayoutSettings {
            text_container_inset: EdgeInsets::new(0.0, -1.0, 0.0, 0.0),
            ..LayoutSettings::default()
        };
        assert_eq!(settings.validate(), Err(ConfigError::InvalidInsets));
    }
}
