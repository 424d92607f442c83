use std::sync::Arc;
use std::time::{Duration, Instant};

use lineweave::{
    CancellationToken, DocumentContext, DocumentLine, HighlightError, HighlightSpan, IndentStrategy,
    InsertLineBreakIndentStrategy, LanguageMode, LayoutEvent, LineChangeSet, LineId, LinePosition,
    LineSyntaxHighlighter, Rect, TextChange, TextEditor, TextRange, TypesetAmount,
};
use pretty_assertions::assert_eq;

#[derive(Debug)]
struct DigitHighlighter;

impl LineSyntaxHighlighter for DigitHighlighter {
    fn highlight(
        &self,
        text: &str,
        cancellation: &CancellationToken,
    ) -> Result<Vec<HighlightSpan>, HighlightError> {
        if cancellation.is_cancelled() {
            return Err(HighlightError::Cancelled);
        }
        Ok(text
            .encode_utf16()
            .enumerate()
            .filter(|(_, unit)| (u16::from(b'0')..=u16::from(b'9')).contains(unit))
            .map(|(index, _)| HighlightSpan::new(TextRange::new(index, 1), "number"))
            .collect())
    }
}

#[derive(Debug)]
struct DigitMode;

impl LanguageMode for DigitMode {
    fn parse(&mut self, _document: DocumentContext<'_>) {}

    fn text_did_change(
        &mut self,
        _change: &TextChange,
        _document: DocumentContext<'_>,
    ) -> LineChangeSet {
        LineChangeSet::new()
    }

    fn current_indent_level(
        &self,
        _line: &DocumentLine,
        _document: DocumentContext<'_>,
        _: IndentStrategy,
    ) -> usize {
        0
    }

    fn strategy_for_inserting_line_break(
        &self,
        _start: LinePosition,
        _end: LinePosition,
        _document: DocumentContext<'_>,
        _strategy: IndentStrategy,
    ) -> InsertLineBreakIndentStrategy {
        InsertLineBreakIndentStrategy::new(0, false)
    }

    fn syntax_highlighter(&self) -> Arc<dyn LineSyntaxHighlighter> {
        Arc::new(DigitHighlighter)
    }
}

/// Reports every line after each edit, like a mode that reparses the whole document.
#[derive(Debug)]
struct ReparseMode;

impl LanguageMode for ReparseMode {
    fn parse(&mut self, _document: DocumentContext<'_>) {}

    fn text_did_change(
        &mut self,
        _change: &TextChange,
        document: DocumentContext<'_>,
    ) -> LineChangeSet {
        let mut changes = LineChangeSet::new();
        for line in document.line_manager.iter() {
            changes.mark_edited(line.id);
        }
        changes
    }

    fn current_indent_level(
        &self,
        _line: &DocumentLine,
        _document: DocumentContext<'_>,
        _: IndentStrategy,
    ) -> usize {
        0
    }

    fn strategy_for_inserting_line_break(
        &self,
        _start: LinePosition,
        _end: LinePosition,
        _document: DocumentContext<'_>,
        _strategy: IndentStrategy,
    ) -> InsertLineBreakIndentStrategy {
        InsertLineBreakIndentStrategy::new(0, false)
    }

    fn syntax_highlighter(&self) -> Arc<dyn LineSyntaxHighlighter> {
        Arc::new(DigitHighlighter)
    }
}

fn is_highlighted(editor: &TextEditor, id: LineId) -> bool {
    editor
        .line_controller(id)
        .is_some_and(|controller| controller.is_highlighted())
}

fn wait_until(editor: &mut TextEditor, mut done: impl FnMut(&TextEditor) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done(editor) {
        assert!(Instant::now() < deadline, "timed out waiting for highlight results");
        editor.wait_for_highlight_results(Duration::from_millis(50));
    }
}

#[test]
fn test_synchronous_highlighting_without_a_worker() {
    let mut editor = TextEditor::new("a1");
    editor.set_language_mode(Box::new(DigitMode));
    editor.layout_viewport(Rect::new(0.0, 0.0, 400.0, 400.0));

    let id = editor.line_manager().first_line().id;
    let controller = editor.line_controller(id).unwrap();
    assert!(controller.is_highlighted());
    let runs: Vec<_> = controller.styled_runs().iter().map(|run| run.range).collect();
    assert_eq!(runs, vec![TextRange::new(1, 1)]);
}

#[test]
fn test_worker_results_are_applied_and_reported() {
    let mut editor = TextEditor::new("a1\nb22");
    editor.set_language_mode(Box::new(DigitMode));
    editor.start_highlight_worker().unwrap();
    editor.layout_viewport(Rect::new(0.0, 0.0, 400.0, 400.0));
    editor.take_events();

    let ids: Vec<LineId> = editor.line_manager().iter().map(|line| line.id).collect();
    wait_until(&mut editor, |editor| ids.iter().all(|id| is_highlighted(editor, *id)));

    let runs: Vec<_> = editor
        .line_controller(ids[1])
        .unwrap()
        .styled_runs()
        .iter()
        .map(|run| run.range)
        .collect();
    assert_eq!(runs, vec![TextRange::new(1, 1), TextRange::new(2, 1)]);

    let highlighted: Vec<LineId> = editor
        .take_events()
        .into_iter()
        .filter_map(|event| match event {
            LayoutEvent::LineHighlighted { line_id } => Some(line_id),
            _ => None,
        })
        .collect();
    assert_eq!(highlighted.len(), 2);
    assert!(ids.iter().all(|id| highlighted.contains(id)));
}

#[test]
fn test_results_for_edited_lines_are_dropped() {
    let mut editor = TextEditor::new("a1\nb2");
    editor.set_language_mode(Box::new(DigitMode));
    editor.start_highlight_worker().unwrap();
    editor.layout_viewport(Rect::new(0.0, 0.0, 400.0, 400.0));

    let first = editor.line_manager().line_at_row(0).id;
    let second = editor.line_manager().line_at_row(1).id;
    // The first line changes while its job is in flight.
    editor.replace_text(TextRange::caret(0), "9");

    wait_until(&mut editor, |editor| is_highlighted(editor, second));
    // Give a late result for the first line a chance to arrive.
    editor.wait_for_highlight_results(Duration::from_millis(100));
    assert!(!is_highlighted(&editor, first));
    assert!(editor.line_controller(first).unwrap().styled_runs().is_empty());

    // Preparing the line again highlights the new text.
    editor.layout_viewport(Rect::new(0.0, 0.0, 400.0, 400.0));
    wait_until(&mut editor, |editor| is_highlighted(editor, first));
    let runs: Vec<_> = editor
        .line_controller(first)
        .unwrap()
        .styled_runs()
        .iter()
        .map(|run| run.range)
        .collect();
    assert_eq!(runs, vec![TextRange::new(0, 1), TextRange::new(2, 1)]);
}

#[test]
fn test_removed_lines_drop_their_results() {
    let mut editor = TextEditor::new("1\n2\n3");
    editor.set_language_mode(Box::new(DigitMode));
    editor.start_highlight_worker().unwrap();
    editor.layout_viewport(Rect::new(0.0, 0.0, 400.0, 400.0));

    let last = editor.line_manager().line_at_row(2).id;
    editor.replace_text(TextRange::new(3, 2), "");
    assert!(editor.line_controller(last).is_none());

    let first = editor.line_manager().line_at_row(0).id;
    wait_until(&mut editor, |editor| is_highlighted(editor, first));
    assert!(editor.line_controller(last).is_none());
}

#[test]
fn test_recreated_controllers_ignore_results_for_evicted_ones() {
    let mut editor = TextEditor::new("1");
    editor.set_language_mode(Box::new(DigitMode));
    editor.start_highlight_worker().unwrap();
    let id = editor.line_manager().first_line().id;

    editor.prepare_line(id, TypesetAmount::Location(0), true);
    // Let the result for "1" reach the channel before its controller goes away.
    std::thread::sleep(Duration::from_millis(200));
    editor.free_memory();
    assert!(editor.line_controller(id).is_none());

    editor.replace_text(TextRange::new(0, 1), "abc");
    editor.prepare_line(id, TypesetAmount::Location(0), true);
    wait_until(&mut editor, |editor| is_highlighted(editor, id));
    editor.wait_for_highlight_results(Duration::from_millis(100));

    let controller = editor.line_controller(id).unwrap();
    assert_eq!(controller.string(), Some("abc"));
    assert!(controller.styled_runs().is_empty());
}

#[test]
fn test_language_mode_changes_only_refresh_highlighting() {
    let mut editor = TextEditor::new("a1\nb2\nc3");
    editor.set_language_mode(Box::new(ReparseMode));
    editor.layout_viewport(Rect::new(0.0, 0.0, 400.0, 400.0));
    let ids: Vec<LineId> = editor.line_manager().iter().map(|line| line.id).collect();
    assert!(ids.iter().all(|id| is_highlighted(&editor, *id)));

    let result = editor.replace_text(TextRange::caret(0), "x");
    assert_eq!(result.line_change_set.edited().len(), 3);

    let edited = editor.line_controller(ids[0]).unwrap();
    assert!(!edited.is_finished_typesetting());
    for id in &ids[1..] {
        let controller = editor.line_controller(*id).unwrap();
        assert!(controller.is_finished_typesetting());
        assert_eq!(controller.number_of_line_fragments(), 1);
        assert!(!controller.is_highlighted());
    }
}
