use lineweave::{LayoutSettings, Rect, TextEditor, TextRange, WrapMode};
use std::time::Instant;

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 64);
    for i in 0..line_count {
        out.push_str(&format!(
            "{i:06} the quick brown fox jumps over the lazy dog (lineweave example)\n"
        ));
    }
    out.pop();
    out
}

fn main() {
    let text = large_text(50_000);
    let settings = LayoutSettings {
        constraining_width: 480.0,
        wrap_mode: WrapMode::Word,
        ..LayoutSettings::default()
    };

    let start = Instant::now();
    let mut editor = TextEditor::with_settings(&text, settings).expect("valid settings");
    let open_time = start.elapsed();

    let mut location = editor.string_view().len() / 2;
    let start = Instant::now();
    for _ in 0..100 {
        editor.replace_text(TextRange::caret(location), "x");
        location += 1;
    }
    let typing_time = start.elapsed();

    let y = editor.line_manager().line_at_row(25_000).y_position;
    let start = Instant::now();
    let layout = editor.layout_viewport(Rect::new(0.0, y, 480.0, 960.0));
    let viewport_time = start.elapsed();

    println!("lineweave performance milestones (local observation only)");
    println!("  open 50k lines: {open_time:?}");
    println!("  100 inserts in the middle: {typing_time:?}");
    println!(
        "  viewport at row 25k: {viewport_time:?} ({} lines, {} fragments)",
        layout.visible_lines.len(),
        layout.fragments.len()
    );
}
