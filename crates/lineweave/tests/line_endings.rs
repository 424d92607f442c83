use lineweave::{LineEnding, TextEditor, TextRange};
use pretty_assertions::assert_eq;

fn delimiters(editor: &TextEditor) -> Vec<(usize, usize)> {
    editor
        .line_manager()
        .iter()
        .map(|line| (line.length, line.delimiter_length))
        .collect()
}

#[test]
fn test_mixed_delimiters() {
    let editor = TextEditor::new("a\r\nb\rc\nd");
    assert_eq!(delimiters(&editor), vec![(1, 2), (1, 1), (1, 1), (1, 0)]);
    assert_eq!(editor.line_manager().line_at_row(3).location, 7);
}

#[test]
fn test_trailing_carriage_return_ends_a_line() {
    let editor = TextEditor::new("ab\r");
    assert_eq!(delimiters(&editor), vec![(2, 1), (0, 0)]);
}

#[test]
fn test_line_feed_after_carriage_return_joins_the_delimiter() {
    let mut editor = TextEditor::new("a\rb");
    let first = editor.line_manager().first_line().id;
    let result = editor.replace_text(TextRange::caret(2), "\n");

    assert_eq!(editor.text(), "a\r\nb");
    assert_eq!(delimiters(&editor), vec![(1, 2), (1, 0)]);
    assert_eq!(editor.line_manager().first_line().id, first);
    assert!(result.line_change_set.edited().contains(&first));
}

#[test]
fn test_splitting_and_removing_crlf() {
    let mut editor = TextEditor::new("a\r\nb");
    editor.replace_text(TextRange::caret(2), "x");
    assert_eq!(editor.text(), "a\rx\nb");
    assert_eq!(delimiters(&editor), vec![(1, 1), (1, 1), (1, 0)]);

    let mut editor = TextEditor::new("a\r\nb");
    editor.replace_text(TextRange::new(2, 1), "");
    assert_eq!(editor.text(), "a\rb");
    assert_eq!(delimiters(&editor), vec![(1, 1), (1, 0)]);
}

#[test]
fn test_preferred_line_ending_is_detected_and_used() {
    let mut editor = TextEditor::new("one\r\ntwo\r\nthree\nfour");
    assert_eq!(editor.line_ending(), LineEnding::Crlf);

    editor.insert_line_break(TextRange::caret(3));
    assert_eq!(editor.text(), "one\r\n\r\ntwo\r\nthree\nfour");

    editor.set_line_ending(LineEnding::Lf);
    editor.insert_text(TextRange::caret(0), "x\r\ny\r");
    assert_eq!(editor.text(), "x\ny\none\r\n\r\ntwo\r\nthree\nfour");
}

#[test]
fn test_documents_without_delimiters_keep_the_line_ending() {
    let mut editor = TextEditor::new("a\rb");
    assert_eq!(editor.line_ending(), LineEnding::Cr);
    editor.set_text("single line");
    assert_eq!(editor.line_ending(), LineEnding::Cr);
    editor.set_text("x\ny");
    assert_eq!(editor.line_ending(), LineEnding::Lf);
}
