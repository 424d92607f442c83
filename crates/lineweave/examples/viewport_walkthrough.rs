//! Lays out a wrapped document, moves the caret around and prints what a host would draw.
//!
//! Run with `RUST_LOG=lineweave=trace` to watch typesetting and highlight dispatch.

use std::time::Duration;

use lineweave::{
    LayoutEvent, LayoutSettings, MovementDirection, Rect, TextEditor, TextRange, WrapMode,
};
use tracing_subscriber::EnvFilter;

const TEXT: &str = "fn main() {\n    let greeting = \"hello, wrapped world\";\n    println!(\"{greeting}\");\n}\n";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = LayoutSettings {
        constraining_width: 160.0,
        wrap_mode: WrapMode::Word,
        ..LayoutSettings::default()
    };
    let mut editor = TextEditor::with_settings(TEXT, settings).expect("valid settings");
    editor
        .start_highlight_worker()
        .expect("spawn highlight worker");

    let layout = editor.layout_viewport(Rect::new(0.0, 0.0, 160.0, 200.0));
    for fragment in &layout.fragments {
        let text = editor.string_view().substring(fragment.range).unwrap_or_default();
        println!(
            "{} #{} y={:>5.1} {:?}",
            fragment.line_id,
            fragment.fragment_index,
            fragment.frame.y,
            text.trim_end_matches(['\r', '\n'])
        );
    }

    let mut caret = 16;
    for direction in [MovementDirection::Down, MovementDirection::Down, MovementDirection::Right] {
        caret = editor.location_moving(caret, direction, 1).unwrap_or(caret);
        let rect = editor.caret_rect(caret, false);
        println!("caret {direction:?} -> {caret} at ({:.1}, {:.1})", rect.x, rect.y);
    }

    let result = editor.insert_line_break(TextRange::caret(11));
    println!(
        "line break: {} lines, caret at {}",
        editor.line_count(),
        result.selected_range_after_edit.location
    );

    editor.wait_for_highlight_results(Duration::from_millis(200));
    for event in editor.take_events() {
        match event {
            LayoutEvent::ContentHeightChanged { height } => println!("content height {height:.1}"),
            LayoutEvent::ContentWidthChanged { width } => println!("content width {width:.1}"),
            LayoutEvent::ContentOffsetAdjustment { dy } => println!("scroll by {dy:.1}"),
            LayoutEvent::LineHighlighted { line_id } => println!("{line_id} highlighted"),
        }
    }
}
