#![warn(missing_docs)]
//! Lineweave - headless text component core
//!
//! # Overview
//!
//! `lineweave` keeps the state a code editor view needs below the rendering layer: the buffer,
//! the line structure, lazily typeset line fragments, caret and selection geometry, and keyboard
//! navigation. Drawing, input handling and scrolling are left to the host.
//!
//! Every location is measured in UTF-16 code units, the unit platform text APIs and incremental
//! parsers agree on.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  TextEditor (edits, settings, events)       │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Navigation (movement, boundaries, indent)  │  ← Caret logic
//! ├─────────────────────────────────────────────┤
//! │  LayoutManager (viewport, caret, selection) │  ← Geometry
//! ├─────────────────────────────────────────────┤
//! │  LineController (typesetting, highlighting) │  ← Per-line state
//! ├─────────────────────────────────────────────┤
//! │  LineManager (height-augmented line tree)   │  ← Line access
//! ├─────────────────────────────────────────────┤
//! │  StringView (rope, UTF-16 addressed)        │  ← Text storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use lineweave::{MovementDirection, Rect, TextEditor, TextRange};
//!
//! let mut editor = TextEditor::new("fn main() {\n}\n");
//! editor.insert_text(TextRange::caret(11), "\n    println!();");
//! assert_eq!(editor.line_count(), 4);
//!
//! let layout = editor.layout_viewport(Rect::new(0.0, 0.0, 400.0, 300.0));
//! assert!(!layout.fragments.is_empty());
//!
//! // From the end of the first line straight down.
//! assert_eq!(editor.location_moving(11, MovementDirection::Down, 1), Some(23));
//! ```
//!
//! # Module Description
//!
//! - [`string_view`] - UTF-16 addressed rope buffer
//! - [`line_manager`] - Line tree with per-line heights and stable line ids
//! - [`line_controller`] - Typesetting and highlighting state of one line
//! - [`layout_manager`] - Viewport layout, caret and selection geometry
//! - [`text_editor`] - The facade every edit goes through
//! - [`language_mode`] - Parse and indentation hooks
//! - [`highlight`] - Line highlighting and the background worker
//!
//! # Unicode Support
//!
//! - UTF-16 code unit addressing on top of a UTF-8 rope
//! - Caret movement by extended grapheme clusters (emoji ZWJ sequences, flags, combining marks)
//! - `\n`, `\r` and `\r\n` line delimiters

mod caret;
pub mod content_size;
pub mod error;
pub mod geometry;
pub mod highlight;
pub mod indent;
pub mod language_mode;
pub mod layout_manager;
pub mod line_change_set;
pub mod line_controller;
pub mod line_controller_storage;
pub mod line_ending;
mod line_fragment;
pub mod line_manager;
pub mod line_movement;
pub mod measure;
pub mod move_lines;
pub mod settings;
pub mod string_tokenizer;
pub mod string_view;
pub mod text_editor;
pub mod text_range;
pub mod theme;
mod tree;
pub mod typesetter;

pub use content_size::ContentSizeTracker;
pub use error::{ConfigError, HighlightError};
pub use geometry::{EdgeInsets, Point, Rect, Size};
pub use highlight::{
    CancellationToken, HighlightResult, HighlightSpan, HighlightWorker, LineSyntaxHighlighter,
    PlainTextSyntaxHighlighter, StyledRun, resolve_styled_runs,
};
pub use indent::IndentEdit;
pub use language_mode::{DocumentContext, LanguageMode, PlainTextLanguageMode, TextChange};
pub use layout_manager::{
    LayoutEvent, LayoutManager, SelectionRect, ViewportLayout, VisibleLineFragment,
};
pub use line_change_set::LineChangeSet;
pub use line_controller::{CARET_WIDTH, LineController, LineFragmentSelectionRect};
pub use line_controller_storage::LineControllerStorage;
pub use line_ending::LineEnding;
pub use line_fragment::LineFragment;
pub use line_manager::{
    DEFAULT_ESTIMATED_LINE_HEIGHT, DocumentLine, LineId, LineManager, LinePosition,
};
pub use line_movement::MovementDirection;
pub use measure::{MonospaceMeasurer, TextMeasurer};
pub use move_lines::{MoveLinesOperation, operation_for_moving_lines};
pub use settings::{DEFAULT_TAB_WIDTH, LayoutSettings, ScrollAdjustmentPolicy, WrapMode};
pub use string_tokenizer::{TextDirection, TextGranularity};
pub use string_view::{StringView, utf16_prefix};
pub use text_editor::{TextEditResult, TextEditor};
pub use text_range::{ByteRange, TextRange};
pub use theme::{Color, DefaultTheme, FontMetrics, TextStyle, Theme};
pub use typesetter::TypesetAmount;

pub use lineweave_lang::{
    BracketPair, DetectedIndentStrategy, IndentLevelMeasurer, IndentStrategy,
    InsertLineBreakIndentStrategy,
};
