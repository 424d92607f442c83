use lineweave::{LineManager, StringView, TextEditor, TextRange, TypesetAmount};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PIECES: &[&str] = &["a", "bc", " ", "\n", "\r", "\r\n", "é", "😀", "漢字", "\t"];

fn random_text(rng: &mut StdRng, max_pieces: usize) -> String {
    let count = rng.gen_range(0..=max_pieces);
    (0..count).map(|_| PIECES[rng.gen_range(0..PIECES.len())]).collect()
}

fn line_structure(manager: &LineManager) -> Vec<(usize, usize, usize)> {
    manager
        .iter()
        .map(|line| (line.location, line.length, line.delimiter_length))
        .collect()
}

fn rebuilt_structure(text: &str) -> Vec<(usize, usize, usize)> {
    let view = StringView::new(text);
    let mut manager = LineManager::new();
    manager.rebuild(&view);
    line_structure(&manager)
}

#[test]
fn test_random_edits_match_a_rebuild() {
    let mut rng = StdRng::seed_from_u64(0x11e_5eed);
    let mut editor = TextEditor::new("fn main() {\r\n    let x = 1;\n}\r\n");

    for step in 0..400 {
        let len = editor.string_view().len();
        let location = rng.gen_range(0..=len);
        let length = rng.gen_range(0..=(len - location).min(6));
        let text = random_text(&mut rng, 4);
        editor.replace_text(TextRange::new(location, length), &text);

        let text = editor.text();
        assert_eq!(
            line_structure(editor.line_manager()),
            rebuilt_structure(&text),
            "line structure diverged after step {step} on {text:?}"
        );
        assert_eq!(editor.line_manager().total_length(), editor.string_view().len());
    }
}

#[test]
fn test_heights_survive_unrelated_edits() {
    let mut rng = StdRng::seed_from_u64(7);
    let text: String = (0..50).map(|row| format!("line {row}\n")).collect();
    let mut editor = TextEditor::new(&text);

    for _ in 0..100 {
        let row = rng.gen_range(0..editor.line_count());
        let id = editor.line_manager().line_at_row(row).id;
        editor.prepare_line(id, TypesetAmount::YPosition(f64::INFINITY), false);

        let len = editor.string_view().len();
        let location = rng.gen_range(0..=len);
        editor.replace_text(TextRange::caret(location), if rng.gen_bool(0.3) { "\n" } else { "x" });

        let mut y = 0.0;
        for line in editor.line_manager().iter() {
            assert_eq!(line.y_position, y);
            let found = editor
                .line_manager()
                .line_containing_y_offset(y + line.height / 2.0)
                .map(|line| line.row);
            assert_eq!(found, Some(line.row));
            y += line.height;
        }
        assert_eq!(editor.line_manager().content_height(), y);
    }
}
