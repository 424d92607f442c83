//! The owner of the document and its layout state.
//!
//! [`TextEditor`] is the single entry point for mutating the buffer. Every edit goes through
//! [`TextEditor::replace_text`], which keeps the string, the line tree, the language mode and
//! the line controllers consistent with each other.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use lineweave_lang::{BracketPair, DetectedIndentStrategy, IndentStrategy};
use tracing::{debug, instrument, trace};

use crate::caret;
use crate::content_size::ContentSizeTracker;
use crate::error::ConfigError;
use crate::geometry::{EdgeInsets, Point, Rect, Size};
use crate::highlight::{HighlightResult, HighlightWorker, LineSyntaxHighlighter};
use crate::indent::{IndentController, IndentEdit};
use crate::language_mode::{DocumentContext, LanguageMode, PlainTextLanguageMode, TextChange};
use crate::layout_manager::{
    LayoutContext, LayoutEvent, LayoutManager, SelectionRect, ViewportLayout,
};
use crate::line_change_set::LineChangeSet;
use crate::line_controller::LineController;
use crate::line_controller_storage::LineControllerStorage;
use crate::line_ending::LineEnding;
use crate::line_manager::{DocumentLine, LineId, LineManager};
use crate::line_movement::{LineMovementController, MovementDirection};
use crate::measure::{MonospaceMeasurer, TextMeasurer, str_width_with_tab_width};
use crate::move_lines::operation_for_moving_lines;
use crate::settings::{LayoutSettings, ScrollAdjustmentPolicy, WrapMode};
use crate::string_tokenizer::{StringTokenizer, TextDirection, TextGranularity};
use crate::string_view::StringView;
use crate::text_range::TextRange;
use crate::theme::{DefaultTheme, Theme};
use crate::typesetter::TypesetAmount;

/// What a call to [`TextEditor::replace_text`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEditResult {
    /// The edit as reported to the language mode.
    pub text_change: TextChange,
    /// Lines inserted, removed and edited, including the lines the language mode reported.
    pub line_change_set: LineChangeSet,
    /// Where the selection goes after the edit.
    pub selected_range_after_edit: TextRange,
}

/// A document with lazily computed layout.
///
/// `TextEditor` is not `Send`: the line tree and the line controllers belong to the thread
/// that created them. Only highlighting runs elsewhere, see
/// [`start_highlight_worker`](Self::start_highlight_worker).
#[derive(Debug)]
pub struct TextEditor {
    string_view: StringView,
    line_manager: LineManager,
    storage: LineControllerStorage,
    content_size: ContentSizeTracker,
    layout_manager: LayoutManager,
    settings: LayoutSettings,
    theme: Arc<dyn Theme>,
    measurer: Box<dyn TextMeasurer>,
    has_custom_measurer: bool,
    language_mode: Box<dyn LanguageMode>,
    highlighter: Arc<dyn LineSyntaxHighlighter>,
    highlight_worker: Option<HighlightWorker>,
    indent_strategy: IndentStrategy,
    line_ending: LineEnding,
    character_pairs: Vec<BracketPair>,
    events: Vec<LayoutEvent>,
    reported_content_size: Size,
}

impl TextEditor {
    /// An editor over `text` with default settings, theme and the plain text language mode.
    pub fn new(text: &str) -> Self {
        Self::build(text, LayoutSettings::default())
    }

    /// Like [`new`](Self::new), with custom layout settings.
    pub fn with_settings(text: &str, settings: LayoutSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self::build(text, settings))
    }

    fn build(text: &str, settings: LayoutSettings) -> Self {
        let theme: Arc<dyn Theme> = Arc::new(DefaultTheme::default());
        let language_mode: Box<dyn LanguageMode> = Box::new(PlainTextLanguageMode::new());
        let highlighter = language_mode.syntax_highlighter();
        let mut editor = Self {
            string_view: StringView::new(""),
            line_manager: LineManager::with_estimated_line_height(settings.estimated_line_height),
            storage: LineControllerStorage::new(),
            content_size: ContentSizeTracker::new(),
            layout_manager: LayoutManager::new(),
            measurer: Box::new(MonospaceMeasurer::new(theme.font_metrics(), settings.tab_width)),
            has_custom_measurer: false,
            settings,
            theme,
            language_mode,
            highlighter,
            highlight_worker: None,
            indent_strategy: IndentStrategy::default(),
            line_ending: LineEnding::default(),
            character_pairs: Vec::new(),
            events: Vec::new(),
            reported_content_size: Size::default(),
        };
        editor.set_text(text);
        editor
    }

    // --- Document -----------------------------------------------------------------------

    /// The whole buffer.
    pub fn text(&self) -> String {
        self.string_view.string()
    }

    /// The buffer.
    pub fn string_view(&self) -> &StringView {
        &self.string_view
    }

    /// The line tree.
    pub fn line_manager(&self) -> &LineManager {
        &self.line_manager
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.line_manager.line_count()
    }

    /// The cached line controllers.
    pub fn line_controller_storage(&self) -> &LineControllerStorage {
        &self.storage
    }

    /// The controller of `id`, if the line has been prepared since its last eviction.
    pub fn line_controller(&self, id: LineId) -> Option<&LineController> {
        self.storage.get(id)
    }

    /// Replace the whole document.
    ///
    /// Line ids, controllers and measured widths are dropped. The preferred line ending is
    /// re-detected when the new text contains delimiters.
    pub fn set_text(&mut self, text: &str) {
        self.string_view.set_string(text);
        self.line_manager.rebuild(&self.string_view);
        self.storage.remove_all();
        self.content_size.reset();
        self.layout_manager.reset_visible_lines();
        if let Some(line) = self.line_manager.initial_longest_line() {
            let width = self.estimated_line_width(&line);
            self.content_size.seed_widest_line(line.id, width);
        }
        if let Some(line_ending) = LineEnding::detect(&self.line_manager, &self.string_view) {
            self.line_ending = line_ending;
        }
        let document = DocumentContext {
            string_view: &self.string_view,
            line_manager: &self.line_manager,
        };
        self.language_mode.parse(document);
        debug!(
            length = self.string_view.len(),
            lines = self.line_manager.line_count(),
            line_ending = ?self.line_ending,
            "replaced document"
        );
        self.update_content_size();
    }

    fn estimated_line_width(&self, line: &DocumentLine) -> f64 {
        let text = self.string_view.substring(line.range()).unwrap_or_default();
        str_width_with_tab_width(&text, self.settings.tab_width) as f64
            * self.theme.font_metrics().cell_width
    }

    /// Replace `range` with `text`.
    ///
    /// The range is clamped to the buffer and widened to character boundaries. Removed lines
    /// lose their controllers; edited lines are re-typeset and re-highlighted when next
    /// prepared.
    #[instrument(skip_all, fields(location = range.location, length = range.length))]
    pub fn replace_text(&mut self, range: TextRange, text: &str) -> TextEditResult {
        let range = self.string_view.snapped_to_characters(range);
        let start_line_position = self
            .line_manager
            .line_position(range.location)
            .unwrap_or_default();
        let old_end_line_position = self
            .line_manager
            .line_position(range.upper_bound())
            .unwrap_or_default();
        let line_change_set = self.line_manager.apply_edit(&mut self.string_view, range, text);
        let inserted_length = text.encode_utf16().count();
        let new_end_line_position = self
            .line_manager
            .line_position(range.location + inserted_length)
            .unwrap_or_default();
        let text_change = TextChange {
            range,
            byte_range: range.to_byte_range(),
            bytes_added: inserted_length * 2,
            old_end_line_position,
            start_line_position,
            new_end_line_position,
            text: text.to_string(),
        };
        let document = DocumentContext {
            string_view: &self.string_view,
            line_manager: &self.line_manager,
        };
        let language_changes = self.language_mode.text_did_change(&text_change, document);
        self.apply_line_change_set(&line_change_set, &language_changes);
        let line_change_set = line_change_set.union(&language_changes);
        if line_change_set.did_add_or_remove_lines() {
            debug!(
                inserted = line_change_set.inserted().len(),
                removed = line_change_set.removed().len(),
                lines = self.line_manager.line_count(),
                "edit changed the line structure"
            );
        } else {
            trace!(edited = line_change_set.edited().len(), "edit applied");
        }
        self.update_content_size();
        TextEditResult {
            text_change,
            line_change_set,
            selected_range_after_edit: TextRange::caret(range.location + inserted_length),
        }
    }

    /// Replace `range` with `text` after converting its line breaks to the preferred line
    /// ending.
    pub fn insert_text(&mut self, range: TextRange, text: &str) -> TextEditResult {
        let text = self.line_ending.apply_to_text(text);
        self.replace_text(range, &text)
    }

    /// Apply several replacements at once.
    ///
    /// Ranges refer to the document before any of the replacements and are applied back to
    /// front so earlier ranges stay valid. Results are returned in that order too.
    ///
    /// # Panics
    ///
    /// Panics if two ranges overlap.
    pub fn replace_text_in_ranges(
        &mut self,
        replacements: &[(TextRange, String)],
    ) -> Vec<TextEditResult> {
        let mut sorted: Vec<&(TextRange, String)> = replacements.iter().collect();
        sorted.sort_by_key(|(range, _)| (range.location, range.length));
        for pair in sorted.windows(2) {
            let (first, second) = (pair[0].0, pair[1].0);
            assert!(
                first.upper_bound() <= second.location,
                "replacement ranges {first} and {second} overlap"
            );
        }
        sorted
            .into_iter()
            .rev()
            .map(|(range, text)| self.replace_text(*range, text))
            .collect()
    }

    /// Lines whose text changed are typeset again. Lines the language mode reports only need
    /// new highlighting.
    fn apply_line_change_set(
        &mut self,
        line_change_set: &LineChangeSet,
        language_changes: &LineChangeSet,
    ) {
        for id in line_change_set.removed() {
            self.storage.remove(*id);
            self.content_size.remove_line(*id);
        }
        for id in line_change_set.edited() {
            if let Some(controller) = self.storage.get_mut(*id) {
                controller.invalidate_everything();
            }
        }
        for id in language_changes.edited().iter().chain(language_changes.inserted()) {
            if line_change_set.edited().contains(id) {
                continue;
            }
            if let Some(controller) = self.storage.get_mut(*id) {
                controller.invalidate_syntax_highlighting();
            }
        }
    }

    /// The range a backward delete of `range` should remove: a whole indentation unit when a
    /// single unit in front of the caret sits in the leading indentation, otherwise `range`
    /// widened to whole grapheme clusters.
    pub fn range_for_deleting_text(&self, range: TextRange) -> TextRange {
        let range = range.clamped(self.string_view.len());
        if range.length == 1
            && let Some(indent_range) = self
                .indent_controller()
                .indent_range_in_front_of_location(range.upper_bound())
        {
            return indent_range;
        }
        let start = self
            .string_view
            .range_of_composed_character_sequence(range.location)
            .location;
        let end = if range.is_empty() {
            start
        } else {
            self.string_view
                .range_of_composed_character_sequence(range.upper_bound() - 1)
                .upper_bound()
        };
        TextRange::from_bounds(start, end)
    }

    // --- Indentation and line moves -----------------------------------------------------

    fn indent_controller(&self) -> IndentController<'_> {
        let document = DocumentContext {
            string_view: &self.string_view,
            line_manager: &self.line_manager,
        };
        IndentController::new(document, self.language_mode.as_ref(), self.indent_strategy)
    }

    fn apply_indent_edit(&mut self, edit: IndentEdit) -> TextEditResult {
        let mut result = self.replace_text(edit.range, &edit.text);
        result.selected_range_after_edit = edit.selected_range;
        result
    }

    /// Replace `range` with a line break in the preferred line ending, indented as the
    /// language mode suggests.
    pub fn insert_line_break(&mut self, range: TextRange) -> TextEditResult {
        let range = range.clamped(self.string_view.len());
        let edit = self
            .indent_controller()
            .insert_line_break(range, self.line_ending.symbol());
        self.apply_indent_edit(edit)
    }

    /// Remove one level of indentation from the lines touched by `selected_range`.
    pub fn shift_left(&mut self, selected_range: TextRange) -> Option<TextEditResult> {
        let edit = self
            .indent_controller()
            .shift_left(selected_range.clamped(self.string_view.len()))?;
        Some(self.apply_indent_edit(edit))
    }

    /// Add one level of indentation to the lines touched by `selected_range`.
    pub fn shift_right(&mut self, selected_range: TextRange) -> Option<TextEditResult> {
        let edit = self
            .indent_controller()
            .shift_right(selected_range.clamped(self.string_view.len()))?;
        Some(self.apply_indent_edit(edit))
    }

    /// Move the lines touched by `selected_range` by `line_offset` rows. Returns the new
    /// selection, or `None` if the lines cannot move that far.
    pub fn move_lines(
        &mut self,
        selected_range: TextRange,
        line_offset: isize,
    ) -> Option<TextRange> {
        let operation = operation_for_moving_lines(
            &self.string_view,
            &self.line_manager,
            self.line_ending.symbol(),
            selected_range.clamped(self.string_view.len()),
            line_offset,
        )?;
        self.replace_text(operation.remove_range, "");
        self.replace_text(operation.replacement_range, &operation.replacement_string);
        Some(operation.selected_range)
    }

    /// Replace `selected_range` with typed `text`, completing character pairs.
    ///
    /// Typing the opening token of a pair inserts its closing token too and wraps a non-empty
    /// selection in the pair. Typing a closing token right in front of the same token moves the
    /// caret over it instead of inserting it. Returns the selection after the edit.
    pub fn insert_typed_text(&mut self, selected_range: TextRange, text: &str) -> TextRange {
        let range = self
            .string_view
            .snapped_to_characters(selected_range.clamped(self.string_view.len()));
        let close_pair = self
            .character_pairs
            .iter()
            .find(|pair| !pair.close.is_empty() && pair.close == text);
        if let Some(pair) = close_pair {
            let close_length = pair.close.encode_utf16().count();
            let following = TextRange::new(range.location, close_length);
            if range.length == 0
                && following.upper_bound() <= self.string_view.len()
                && self.string_view.substring(following).as_deref() == Some(pair.close.as_str())
            {
                trace!(close = %pair.close, "skipped closing token");
                return TextRange::caret(range.location + close_length);
            }
        }
        let open_pair = self
            .character_pairs
            .iter()
            .find(|pair| !pair.open.is_empty() && pair.open == text)
            .cloned();
        let Some(pair) = open_pair else {
            return self.insert_text(range, text).selected_range_after_edit;
        };
        let selected_text = self.string_view.substring(range).unwrap_or_default();
        let wrapped = format!("{}{}{}", pair.open, selected_text, pair.close);
        trace!(open = %pair.open, wrapped = range.length > 0, "inserted character pair");
        self.insert_text(range, &wrapped);
        let selected_length = self
            .line_ending
            .apply_to_text(&selected_text)
            .encode_utf16()
            .count();
        TextRange::new(range.location + pair.open.encode_utf16().count(), selected_length)
    }

    /// Pairs completed by [`insert_typed_text`](Self::insert_typed_text). Empty by default.
    pub fn character_pairs(&self) -> &[BracketPair] {
        &self.character_pairs
    }

    /// Change the pairs completed by [`insert_typed_text`](Self::insert_typed_text).
    pub fn set_character_pairs(&mut self, character_pairs: Vec<BracketPair>) {
        self.character_pairs = character_pairs;
    }

    /// The indentation written by indent operations.
    pub fn indent_strategy(&self) -> IndentStrategy {
        self.indent_strategy
    }

    /// Change the indentation written by indent operations.
    pub fn set_indent_strategy(&mut self, strategy: IndentStrategy) {
        self.indent_strategy = strategy;
    }

    /// Ask the language mode how the document is indented.
    pub fn detect_indent_strategy(&self) -> DetectedIndentStrategy {
        let document = DocumentContext {
            string_view: &self.string_view,
            line_manager: &self.line_manager,
        };
        self.language_mode.detect_indent_strategy(document)
    }

    /// The line ending written by the editor.
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Change the line ending written by the editor. Existing text is left alone.
    pub fn set_line_ending(&mut self, line_ending: LineEnding) {
        self.line_ending = line_ending;
    }

    // --- Configuration ------------------------------------------------------------------

    /// Current layout settings.
    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    /// Replace all layout settings, invalidating only what the changed values affect.
    pub fn set_settings(&mut self, settings: LayoutSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        let previous = self.settings;
        self.settings = settings;
        if previous.estimated_line_height != settings.estimated_line_height {
            self.line_manager
                .set_estimated_line_height(settings.estimated_line_height);
            for controller in self.storage.controllers_mut() {
                controller.set_estimated_line_height(settings.estimated_line_height);
            }
        }
        if previous.tab_width != settings.tab_width && !self.has_custom_measurer {
            self.measurer = Box::new(MonospaceMeasurer::new(
                self.theme.font_metrics(),
                settings.tab_width,
            ));
        }
        let affects_typesetting = previous.constraining_width != settings.constraining_width
            || previous.wrap_mode != settings.wrap_mode
            || previous.tab_width != settings.tab_width
            || previous.line_height_multiplier != settings.line_height_multiplier;
        if affects_typesetting {
            self.invalidate_typesetting();
        }
        self.update_content_size();
        Ok(())
    }

    /// Width available to line fragments.
    pub fn set_constraining_width(&mut self, width: f64) -> Result<(), ConfigError> {
        self.set_settings(LayoutSettings {
            constraining_width: width,
            ..self.settings
        })
    }

    /// Soft wrapping mode.
    pub fn set_wrap_mode(&mut self, wrap_mode: WrapMode) -> Result<(), ConfigError> {
        self.set_settings(LayoutSettings {
            wrap_mode,
            ..self.settings
        })
    }

    /// Tab width, in cells.
    pub fn set_tab_width(&mut self, tab_width: usize) -> Result<(), ConfigError> {
        self.set_settings(LayoutSettings {
            tab_width,
            ..self.settings
        })
    }

    /// Factor applied to the natural height of line fragments.
    pub fn set_line_height_multiplier(&mut self, multiplier: f64) -> Result<(), ConfigError> {
        self.set_settings(LayoutSettings {
            line_height_multiplier: multiplier,
            ..self.settings
        })
    }

    /// Insets of the text container.
    pub fn set_text_container_inset(&mut self, inset: EdgeInsets) -> Result<(), ConfigError> {
        self.set_settings(LayoutSettings {
            text_container_inset: inset,
            ..self.settings
        })
    }

    /// Scroll compensation for height changes above the viewport.
    pub fn set_scroll_adjustment_policy(&mut self, policy: ScrollAdjustmentPolicy) {
        self.settings.scroll_adjustment = policy;
    }

    /// The theme.
    pub fn theme(&self) -> &dyn Theme {
        self.theme.as_ref()
    }

    /// Replace the theme.
    ///
    /// Styles are re-resolved by highlighting every line again; new font metrics also force a
    /// re-typeset.
    pub fn set_theme(&mut self, theme: Arc<dyn Theme>) {
        let metrics_changed = theme.font_metrics() != self.theme.font_metrics();
        self.theme = theme;
        if metrics_changed {
            if !self.has_custom_measurer {
                self.measurer = Box::new(MonospaceMeasurer::new(
                    self.theme.font_metrics(),
                    self.settings.tab_width,
                ));
            }
            self.invalidate_typesetting();
        }
        for controller in self.storage.controllers_mut() {
            controller.invalidate_syntax_highlighting();
        }
        self.update_content_size();
    }

    /// Use `measurer` instead of the monospace cell measurer derived from the theme.
    pub fn set_text_measurer(&mut self, measurer: Box<dyn TextMeasurer>) {
        self.measurer = measurer;
        self.has_custom_measurer = true;
        self.invalidate_typesetting();
        self.update_content_size();
    }

    /// The language mode.
    pub fn language_mode(&self) -> &dyn LanguageMode {
        self.language_mode.as_ref()
    }

    /// Replace the language mode. The document is parsed again and every line re-highlighted.
    pub fn set_language_mode(&mut self, language_mode: Box<dyn LanguageMode>) {
        self.language_mode = language_mode;
        self.highlighter = self.language_mode.syntax_highlighter();
        let document = DocumentContext {
            string_view: &self.string_view,
            line_manager: &self.line_manager,
        };
        self.language_mode.parse(document);
        for controller in self.storage.controllers_mut() {
            controller.invalidate_syntax_highlighting();
        }
        debug!(language_mode = ?self.language_mode, "changed language mode");
    }

    fn invalidate_typesetting(&mut self) {
        for controller in self.storage.controllers_mut() {
            controller.invalidate_typesetting();
        }
        self.content_size.reset();
        trace!(controllers = self.storage.len(), "invalidated typesetting");
    }

    // --- Highlighting -------------------------------------------------------------------

    /// Highlight lines on a background thread from now on.
    pub fn start_highlight_worker(&mut self) -> io::Result<()> {
        if self.highlight_worker.is_none() {
            self.highlight_worker = Some(HighlightWorker::spawn()?);
            debug!("started highlight worker");
        }
        Ok(())
    }

    /// Returns `true` if highlighting runs in the background.
    pub fn has_highlight_worker(&self) -> bool {
        self.highlight_worker.is_some()
    }

    /// Apply the highlight results that arrived so far. Returns the number of lines updated.
    ///
    /// Each updated line produces a [`LayoutEvent::LineHighlighted`].
    pub fn process_highlight_results(&mut self) -> usize {
        let results = self
            .highlight_worker
            .as_ref()
            .map(HighlightWorker::drain_results)
            .unwrap_or_default();
        results
            .into_iter()
            .map(|result| self.apply_highlight_result(result))
            .filter(|applied| *applied)
            .count()
    }

    /// Wait up to `timeout` for one highlight result, then apply it and everything else that
    /// arrived. Returns the number of lines updated.
    pub fn wait_for_highlight_results(&mut self, timeout: Duration) -> usize {
        let Some(first) = self
            .highlight_worker
            .as_ref()
            .and_then(|worker| worker.wait_for_result(timeout))
        else {
            return 0;
        };
        usize::from(self.apply_highlight_result(first)) + self.process_highlight_results()
    }

    fn apply_highlight_result(&mut self, result: HighlightResult) -> bool {
        let Some(controller) = self.storage.get_mut(result.line_id) else {
            trace!(line = %result.line_id, "dropping highlight result for evicted line");
            return false;
        };
        let applied = controller.apply_highlight_result(
            result.generation,
            result.outcome,
            self.theme.as_ref(),
        );
        if applied {
            self.events.push(LayoutEvent::LineHighlighted {
                line_id: result.line_id,
            });
        }
        applied
    }

    // --- Layout -------------------------------------------------------------------------

    fn with_layout<R>(
        &mut self,
        f: impl FnOnce(&mut LayoutManager, &mut LayoutContext<'_>) -> R,
    ) -> R {
        let result = {
            let mut context = LayoutContext {
                string_view: &self.string_view,
                line_manager: &mut self.line_manager,
                storage: &mut self.storage,
                content_size: &mut self.content_size,
                settings: &self.settings,
                measurer: self.measurer.as_ref(),
                theme: self.theme.as_ref(),
                highlighter: &self.highlighter,
                dispatcher: self.highlight_worker.as_ref().map(HighlightWorker::dispatcher),
            };
            f(&mut self.layout_manager, &mut context)
        };
        self.update_content_size();
        result
    }

    /// Typeset line `id` until `amount` is satisfied and request its highlighting. Returns the
    /// line after its height was updated, or `None` if the line no longer exists.
    pub fn prepare_line(
        &mut self,
        id: LineId,
        amount: TypesetAmount,
        syntax_highlight_asynchronously: bool,
    ) -> Option<DocumentLine> {
        let line = self.line_manager.line(id)?;
        Some(self.with_layout(|_, context| {
            context.prepare_line(&line, amount, syntax_highlight_asynchronously)
        }))
    }

    /// Lay out the lines intersecting `viewport` (content coordinates).
    ///
    /// A non-zero content offset adjustment is also queued as
    /// [`LayoutEvent::ContentOffsetAdjustment`].
    pub fn layout_viewport(&mut self, viewport: Rect) -> ViewportLayout {
        let layout = self.with_layout(|layout_manager, context| {
            layout_manager.layout_lines_in_viewport(viewport, context)
        });
        if layout.content_offset_adjustment != 0.0 {
            self.events.push(LayoutEvent::ContentOffsetAdjustment {
                dy: layout.content_offset_adjustment,
            });
        }
        layout
    }

    /// Typeset every line above `location` so the geometry there is exact (before scrolling a
    /// location into view).
    pub fn layout_lines_to_location(&mut self, location: usize) {
        self.with_layout(|layout_manager, context| {
            layout_manager.layout_lines_to_location(location, context)
        });
    }

    /// Evict the controllers of lines outside the viewport.
    pub fn free_memory(&mut self) {
        let visible: Vec<LineId> = self.layout_manager.visible_line_ids().collect();
        self.storage.remove_all_except(visible);
    }

    /// Caret rectangle at `location` (content coordinates).
    pub fn caret_rect(
        &mut self,
        location: usize,
        allow_moving_caret_to_next_line_fragment: bool,
    ) -> Rect {
        self.with_layout(|_, context| {
            caret::frame(context, location, allow_moving_caret_to_next_line_fragment)
        })
    }

    /// Selection rectangles of `range` (content coordinates).
    pub fn selection_rects(&mut self, range: TextRange) -> Vec<SelectionRect> {
        self.with_layout(|layout_manager, context| layout_manager.selection_rects(range, context))
    }

    /// Rectangle of the first line fragment covering `range` (content coordinates).
    pub fn first_rect(&mut self, range: TextRange) -> Rect {
        self.with_layout(|layout_manager, context| layout_manager.first_rect(range, context))
    }

    /// Location closest to `point` (content coordinates).
    pub fn closest_index(&mut self, point: Point) -> usize {
        self.with_layout(|layout_manager, context| layout_manager.closest_index(point, context))
    }

    /// Size of the scrollable content, insets included.
    pub fn content_size(&mut self) -> Size {
        self.content_size.content_size(
            &self.line_manager,
            self.settings.text_container_inset,
            self.layout_manager.viewport().width,
            self.settings.is_wrapping(),
        )
    }

    fn update_content_size(&mut self) {
        let size = self.content_size();
        if size.height != self.reported_content_size.height {
            self.events
                .push(LayoutEvent::ContentHeightChanged { height: size.height });
        }
        if size.width != self.reported_content_size.width {
            self.events
                .push(LayoutEvent::ContentWidthChanged { width: size.width });
        }
        self.reported_content_size = size;
    }

    /// Drain the queued layout events.
    pub fn take_events(&mut self) -> Vec<LayoutEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Navigation ---------------------------------------------------------------------

    /// Destination of moving the caret `offset` steps in `direction` from `from`.
    pub fn location_moving(
        &mut self,
        from: usize,
        direction: MovementDirection,
        offset: usize,
    ) -> Option<usize> {
        self.with_layout(|_, context| {
            LineMovementController::new(context).location(from, direction, offset)
        })
    }

    /// Like [`location_moving`](Self::location_moving), treating a caret on a soft-wrap
    /// boundary as being at the end of the earlier fragment.
    pub fn location_moving_from_end_of_line_fragment(
        &mut self,
        from: usize,
        direction: MovementDirection,
        offset: usize,
    ) -> Option<usize> {
        self.with_layout(|_, context| {
            LineMovementController::new(context)
                .treating_end_of_line_fragment_as_previous_line_fragment(true)
                .location(from, direction, offset)
        })
    }

    /// Start of the visual line containing `from`.
    pub fn location_for_going_to_beginning_of_line(
        &mut self,
        from: usize,
        treat_end_of_line_fragment_as_previous_line_fragment: bool,
    ) -> Option<usize> {
        self.with_layout(|_, context| {
            LineMovementController::new(context)
                .treating_end_of_line_fragment_as_previous_line_fragment(
                    treat_end_of_line_fragment_as_previous_line_fragment,
                )
                .location_for_going_to_beginning_of_line(from)
        })
    }

    /// End of the visual line containing `from`, before the line's delimiter.
    pub fn location_for_going_to_end_of_line(
        &mut self,
        from: usize,
        treat_end_of_line_fragment_as_previous_line_fragment: bool,
    ) -> Option<usize> {
        self.with_layout(|_, context| {
            LineMovementController::new(context)
                .treating_end_of_line_fragment_as_previous_line_fragment(
                    treat_end_of_line_fragment_as_previous_line_fragment,
                )
                .location_for_going_to_end_of_line(from)
        })
    }

    /// Returns `true` if `location` is a `granularity` boundary in `direction`.
    pub fn is_at_boundary(
        &mut self,
        location: usize,
        granularity: TextGranularity,
        direction: TextDirection,
    ) -> bool {
        self.with_layout(|_, context| {
            StringTokenizer::new(context).is_at_boundary(location, granularity, direction)
        })
    }

    /// The next `granularity` boundary from `location` in `direction`.
    pub fn location_of_boundary(
        &mut self,
        location: usize,
        granularity: TextGranularity,
        direction: TextDirection,
    ) -> Option<usize> {
        self.with_layout(|_, context| {
            StringTokenizer::new(context).location_of_boundary(location, granularity, direction)
        })
    }
}
