use std::sync::Arc;

use lineweave::{
    DefaultTheme, FontMetrics, LayoutSettings, MovementDirection, TextDirection, TextEditor,
    TextGranularity, TextRange, WrapMode,
};
use pretty_assertions::assert_eq;

// "a", a family ZWJ sequence (8 units), a flag (4 units), "e" with a combining acute, "b".
const CLUSTERS: &str = "a\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}\u{1F1EF}\u{1F1F5}e\u{301}b";

fn editor(text: &str, width: f64) -> TextEditor {
    let mut editor = TextEditor::with_settings(
        text,
        LayoutSettings {
            constraining_width: width,
            wrap_mode: WrapMode::Char,
            ..LayoutSettings::default()
        },
    )
    .unwrap();
    editor.set_theme(Arc::new(DefaultTheme::with_font_metrics(FontMetrics {
        cell_width: 10.0,
        ascent: 12.0,
        descent: 4.0,
        leading: 0.0,
    })));
    editor
}

#[test]
fn test_right_and_left_walk_grapheme_clusters() {
    let mut editor = editor(CLUSTERS, f64::INFINITY);
    let mut forward = vec![0];
    let mut location = 0;
    while let Some(next) = editor.location_moving(location, MovementDirection::Right, 1) {
        if next == location {
            break;
        }
        forward.push(next);
        location = next;
    }
    assert_eq!(forward, vec![0, 1, 9, 13, 15, 16]);

    let mut backward = vec![16];
    let mut location = 16;
    while location > 0 {
        location = editor
            .location_moving(location, MovementDirection::Left, 1)
            .unwrap();
        backward.push(location);
    }
    assert_eq!(backward, vec![16, 15, 13, 9, 1, 0]);
}

#[test]
fn test_vertical_movement_never_lands_inside_a_cluster() {
    let mut editor = editor("abcdefgh\na\u{1F600}\u{1F600}", f64::INFINITY);
    // Column 2 on the second line is inside the first emoji: the caret snaps to its start.
    assert_eq!(editor.location_moving(2, MovementDirection::Down, 1), Some(10));
    assert_eq!(editor.location_moving(3, MovementDirection::Down, 1), Some(12));
    assert_eq!(editor.location_moving(12, MovementDirection::Up, 1), Some(3));
}

#[test]
fn test_movement_out_of_bounds() {
    let mut editor = editor("ab", f64::INFINITY);
    assert_eq!(editor.location_moving(3, MovementDirection::Right, 1), None);
    assert_eq!(editor.location_moving(1, MovementDirection::Up, 1), Some(0));
    assert_eq!(editor.location_moving(1, MovementDirection::Down, 1), Some(2));
}

#[test]
fn test_home_and_end_on_wrapped_lines() {
    let mut editor = editor("aaaabbbbcc\ndddd", 40.0);
    assert_eq!(editor.location_for_going_to_beginning_of_line(6, false), Some(4));
    assert_eq!(editor.location_for_going_to_end_of_line(6, false), Some(8));
    assert_eq!(editor.location_for_going_to_end_of_line(9, false), Some(10));
    assert_eq!(editor.location_for_going_to_beginning_of_line(8, true), Some(4));
    assert_eq!(editor.location_for_going_to_end_of_line(13, false), Some(15));
}

#[test]
fn test_boundaries_through_the_editor() {
    let mut editor = editor("hello world\nsecond", f64::INFINITY);
    assert_eq!(
        editor.location_of_boundary(0, TextGranularity::Word, TextDirection::Forward),
        Some(5)
    );
    assert_eq!(
        editor.location_of_boundary(5, TextGranularity::Word, TextDirection::Forward),
        Some(11)
    );
    assert_eq!(
        editor.location_of_boundary(14, TextGranularity::Paragraph, TextDirection::Backward),
        Some(12)
    );
    assert_eq!(
        editor.location_of_boundary(3, TextGranularity::Paragraph, TextDirection::Forward),
        Some(11)
    );
    assert!(editor.is_at_boundary(18, TextGranularity::Document, TextDirection::Forward));
    assert!(!editor.is_at_boundary(19, TextGranularity::Character, TextDirection::Forward));
}
