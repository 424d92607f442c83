//! Text boundaries for keyboard navigation and selection by unit.

use crate::layout_manager::LayoutContext;
use crate::typesetter::TypesetAmount;

/// Unit of text a boundary refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextGranularity {
    /// Extended grapheme clusters.
    Character,
    /// Runs of alphanumeric grapheme clusters.
    Word,
    /// Visual lines (line fragments) of a wrapped line.
    LineFragment,
    /// Document lines.
    Paragraph,
    /// The whole buffer.
    Document,
}

/// Direction in which a boundary is looked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    /// Towards the end of the buffer. Forward boundaries are the ends of units.
    Forward,
    /// Towards the start of the buffer. Backward boundaries are the starts of units.
    Backward,
}

pub(crate) struct StringTokenizer<'c, 'a> {
    context: &'c mut LayoutContext<'a>,
}

impl<'c, 'a> StringTokenizer<'c, 'a> {
    pub(crate) fn new(context: &'c mut LayoutContext<'a>) -> Self {
        Self { context }
    }

    /// Returns `true` if `location` is a boundary of `granularity` in `direction`.
    pub(crate) fn is_at_boundary(
        &mut self,
        location: usize,
        granularity: TextGranularity,
        direction: TextDirection,
    ) -> bool {
        let len = self.len();
        if location > len {
            return false;
        }
        match granularity {
            TextGranularity::Character => {
                location == len
                    || self
                        .context
                        .string_view
                        .range_of_composed_character_sequence(location)
                        .location
                        == location
            }
            TextGranularity::Word => self.is_at_word_boundary(location, direction),
            TextGranularity::LineFragment => {
                self.location_of_line_fragment_boundary(location, direction) == Some(location)
            }
            TextGranularity::Paragraph => {
                let Some(line) = self.context.line_manager.line_containing_location(location) else {
                    return false;
                };
                match direction {
                    TextDirection::Forward => location == line.location + line.length,
                    TextDirection::Backward => location == line.location,
                }
            }
            TextGranularity::Document => match direction {
                TextDirection::Forward => location == len,
                TextDirection::Backward => location == 0,
            },
        }
    }

    /// The next boundary of `granularity` from `location` in `direction`.
    ///
    /// `None` if `location` is out of bounds.
    pub(crate) fn location_of_boundary(
        &mut self,
        location: usize,
        granularity: TextGranularity,
        direction: TextDirection,
    ) -> Option<usize> {
        let len = self.len();
        if location > len {
            return None;
        }
        match granularity {
            TextGranularity::Character => Some(match direction {
                TextDirection::Forward => {
                    self.context.string_view.next_grapheme_boundary(location)
                }
                TextDirection::Backward => {
                    self.context.string_view.prev_grapheme_boundary(location)
                }
            }),
            TextGranularity::Word => Some(self.location_of_word_boundary(location, direction)),
            TextGranularity::LineFragment => {
                self.location_of_line_fragment_boundary(location, direction)
            }
            TextGranularity::Paragraph => {
                let line = self.context.line_manager.line_containing_location(location)?;
                Some(match direction {
                    TextDirection::Forward => location.max(line.location + line.length),
                    TextDirection::Backward => line.location,
                })
            }
            TextGranularity::Document => Some(match direction {
                TextDirection::Forward => len,
                TextDirection::Backward => 0,
            }),
        }
    }

    fn len(&self) -> usize {
        self.context.string_view.len()
    }

    /// Returns `true` if the grapheme cluster containing `location` is made of alphanumerics.
    fn is_word_cluster(&self, location: usize) -> bool {
        let cluster = self.context.string_view.range_of_composed_character_sequence(location);
        !cluster.is_empty()
            && self
                .context
                .string_view
                .chars(cluster)
                .all(char::is_alphanumeric)
    }

    fn is_at_word_boundary(&self, location: usize, direction: TextDirection) -> bool {
        let len = self.len();
        match direction {
            TextDirection::Forward => {
                location > 0
                    && self.is_word_cluster(location - 1)
                    && (location == len || !self.is_word_cluster(location))
            }
            TextDirection::Backward => {
                location < len
                    && self.is_word_cluster(location)
                    && (location == 0 || !self.is_word_cluster(location - 1))
            }
        }
    }

    fn location_of_word_boundary(&self, location: usize, direction: TextDirection) -> usize {
        let step = |index: usize| match direction {
            TextDirection::Forward => self.context.string_view.next_grapheme_boundary(index),
            TextDirection::Backward => self.context.string_view.prev_grapheme_boundary(index),
        };
        let end = match direction {
            TextDirection::Forward => self.len(),
            TextDirection::Backward => 0,
        };
        let mut index = location;
        if self.is_at_word_boundary(index, direction) {
            index = step(index);
        }
        while index != end && !self.is_at_word_boundary(index, direction) {
            index = step(index);
        }
        index
    }

    fn location_of_line_fragment_boundary(
        &mut self,
        location: usize,
        direction: TextDirection,
    ) -> Option<usize> {
        match direction {
            TextDirection::Forward if location == self.len() => return Some(location),
            TextDirection::Backward if location == 0 => return Some(0),
            _ => {}
        }
        let line = self.context.line_manager.line_containing_location(location)?;
        let local = location - line.location;
        let line = self.context.typeset_line(&line, TypesetAmount::Location(local));
        let fragment = self.context.controller(line.id)?.line_fragment_containing(local)?;
        let fragment_range = fragment.range;
        Some(match direction {
            TextDirection::Forward => {
                let upper = line.location + fragment_range.upper_bound();
                if fragment_range.upper_bound() >= line.total_length() {
                    line.location + line.length
                } else {
                    // Stop before the last cluster so the caret stays on this visual line.
                    self.context.string_view.prev_grapheme_boundary(upper)
                }
            }
            TextDirection::Backward => line.location + fragment_range.location,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use super::TextDirection::{Backward, Forward};
    use super::TextGranularity::{Character, Document, Word};
    use crate::content_size::ContentSizeTracker;
    use crate::highlight::{LineSyntaxHighlighter, PlainTextSyntaxHighlighter};
    use crate::line_controller_storage::LineControllerStorage;
    use crate::line_manager::LineManager;
    use crate::measure::MonospaceMeasurer;
    use crate::settings::{LayoutSettings, WrapMode};
    use crate::string_view::StringView;
    use crate::theme::{DefaultTheme, FontMetrics};
    use pretty_assertions::assert_eq;

    fn with_tokenizer<R>(
        text: &str,
        width: f64,
        f: impl FnOnce(&mut StringTokenizer<'_, '_>) -> R,
    ) -> R {
        let metrics = FontMetrics {
            cell_width: 10.0,
            ascent: 12.0,
            descent: 4.0,
            leading: 0.0,
        };
        let settings = LayoutSettings {
            constraining_width: width,
            wrap_mode: WrapMode::Char,
            ..LayoutSettings::default()
        };
        let view = StringView::new(text);
        let mut manager = LineManager::new();
        manager.rebuild(&view);
        let mut storage = LineControllerStorage::new();
        let mut content_size = ContentSizeTracker::new();
        let measurer = MonospaceMeasurer::new(metrics, 4);
        let theme = DefaultTheme::with_font_metrics(metrics);
        let highlighter: Arc<dyn LineSyntaxHighlighter> = Arc::new(PlainTextSyntaxHighlighter);
        let mut context = LayoutContext {
            string_view: &view,
            line_manager: &mut manager,
            storage: &mut storage,
            content_size: &mut content_size,
            settings: &settings,
            measurer: &measurer,
            theme: &theme,
            highlighter: &highlighter,
            dispatcher: None,
        };
        f(&mut StringTokenizer::new(&mut context))
    }

    #[test]
    fn test_word_boundaries() {
        with_tokenizer("let foo_bar = 42;", f64::INFINITY, |tokenizer| {
            let forward = |tokenizer: &mut StringTokenizer<'_, '_>, location| {
                tokenizer.location_of_boundary(location, Word, Forward)
            };
            assert_eq!(forward(tokenizer, 0), Some(3));
            assert_eq!(forward(tokenizer, 3), Some(7));
            assert_eq!(forward(tokenizer, 8), Some(11));
            assert_eq!(forward(tokenizer, 11), Some(16));
            assert_eq!(forward(tokenizer, 16), Some(17));
            assert_eq!(tokenizer.location_of_boundary(16, Word, Backward), Some(14));
            assert_eq!(tokenizer.location_of_boundary(14, Word, Backward), Some(8));
            assert!(tokenizer.is_at_boundary(3, Word, Forward));
            assert!(tokenizer.is_at_boundary(4, Word, Backward));
            assert!(!tokenizer.is_at_boundary(5, Word, Forward));
        });
    }

    #[test]
    fn test_character_boundaries_respect_clusters() {
        with_tokenizer("a\u{1F44D}\u{1F3FD}b", f64::INFINITY, |tokenizer| {
            assert_eq!(tokenizer.location_of_boundary(1, Character, Forward), Some(5));
            assert!(!tokenizer.is_at_boundary(2, Character, Forward));
            assert!(tokenizer.is_at_boundary(5, Character, Backward));
        });
    }

    #[test]
    fn test_line_fragment_boundaries() {
        with_tokenizer("aaaabbbbcc\ndddd", 40.0, |tokenizer| {
            let fragment = TextGranularity::LineFragment;
            assert_eq!(tokenizer.location_of_boundary(1, fragment, Forward), Some(3));
            assert_eq!(tokenizer.location_of_boundary(9, fragment, Forward), Some(10));
            assert_eq!(tokenizer.location_of_boundary(6, fragment, Backward), Some(4));
            assert_eq!(tokenizer.location_of_boundary(15, fragment, Forward), Some(15));
            assert!(tokenizer.is_at_boundary(10, fragment, Forward));
            assert!(tokenizer.is_at_boundary(4, fragment, Backward));
        });
    }

    #[test]
    fn test_paragraph_and_document_boundaries() {
        with_tokenizer("one\ntwo\r\nthree", f64::INFINITY, |tokenizer| {
            let paragraph = TextGranularity::Paragraph;
            assert_eq!(tokenizer.location_of_boundary(5, paragraph, Forward), Some(7));
            assert_eq!(tokenizer.location_of_boundary(5, paragraph, Backward), Some(4));
            assert_eq!(tokenizer.location_of_boundary(4, paragraph, Backward), Some(4));
            assert!(tokenizer.is_at_boundary(7, paragraph, Forward));
            assert!(tokenizer.is_at_boundary(9, paragraph, Backward));
            assert_eq!(tokenizer.location_of_boundary(5, Document, Forward), Some(14));
            assert!(tokenizer.is_at_boundary(0, Document, Backward));
        });
    }
}
