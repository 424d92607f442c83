//! The canonical text buffer.
//!
//! Text is stored in a [`ropey::Rope`] and addressed in UTF-16 code units. Every mutation bumps
//! a generation counter; offsets computed against an older generation are not valid anymore.

use ropey::{Rope, RopeSlice};
use unicode_segmentation::{GraphemeCursor, GraphemeIncomplete};

use crate::text_range::{ByteRange, TextRange};

/// Mutable text buffer with UTF-16 addressing.
#[derive(Debug, Clone, Default)]
pub struct StringView {
    rope: Rope,
    generation: u64,
}

impl StringView {
    /// Create a buffer holding `text`.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            generation: 0,
        }
    }

    /// Length in UTF-16 code units.
    pub fn len(&self) -> usize {
        self.rope.len_utf16_cu()
    }

    /// Returns `true` if the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Mutation counter. Incremented by every change to the buffer.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The underlying rope.
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// The whole buffer as a `String`.
    pub fn string(&self) -> String {
        self.rope.to_string()
    }

    /// Replace the whole buffer.
    pub(crate) fn set_string(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.generation += 1;
    }

    /// Text in `range`, or `None` if the range extends past the end of the buffer.
    pub fn substring(&self, range: TextRange) -> Option<String> {
        if range.upper_bound() > self.len() {
            return None;
        }
        Some(self.slice(range).to_string())
    }

    /// Iterate the characters touched by `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range extends past the end of the buffer.
    pub fn chars(&self, range: TextRange) -> ropey::iter::Chars<'_> {
        self.slice(range).chars()
    }

    /// The character whose encoding contains the code unit at `location`.
    pub fn character(&self, location: usize) -> Option<char> {
        if location >= self.len() {
            return None;
        }
        Some(self.rope.char(self.rope.utf16_cu_to_char(location)))
    }

    /// The UTF-16 code unit at `location`.
    pub fn utf16_unit(&self, location: usize) -> Option<u16> {
        if location >= self.len() {
            return None;
        }
        let char_index = self.rope.utf16_cu_to_char(location);
        let start = self.rope.char_to_utf16_cu(char_index);
        let mut buffer = [0u16; 2];
        let encoded = self.rope.char(char_index).encode_utf16(&mut buffer);
        encoded.get(location - start).copied()
    }

    /// UTF-16LE bytes in `range`, or `None` if the range extends past the end of the buffer.
    pub fn bytes(&self, range: ByteRange) -> Option<Vec<u8>> {
        let text = self.substring(range.to_text_range())?;
        Some(text.encode_utf16().flat_map(u16::to_le_bytes).collect())
    }

    /// Widen `range` so both ends sit on character boundaries.
    pub fn snapped_to_characters(&self, range: TextRange) -> TextRange {
        let range = range.clamped(self.len());
        let start = self.char_boundary_at_or_before(range.location);
        let mut end = self.char_boundary_at_or_before(range.upper_bound());
        if end < range.upper_bound() {
            end = self.rope.char_to_utf16_cu(self.rope.utf16_cu_to_char(end) + 1);
        }
        TextRange::new(start, end - start)
    }

    /// Replace the text in `range` with `text`.
    ///
    /// `range` must lie within the buffer and on character boundaries; see
    /// [`snapped_to_characters`](Self::snapped_to_characters).
    pub(crate) fn replace(&mut self, range: TextRange, text: &str) {
        assert!(
            range.upper_bound() <= self.len(),
            "replacement range {range} is out of bounds for a buffer of length {}",
            self.len()
        );
        let start = self.rope.utf16_cu_to_char(range.location);
        let end = self.rope.utf16_cu_to_char(range.upper_bound());
        if end > start {
            self.rope.remove(start..end);
        }
        if !text.is_empty() {
            self.rope.insert(start, text);
        }
        self.generation += 1;
    }

    /// Range of the extended grapheme cluster containing `location`.
    ///
    /// `"\r\n"` is a single cluster. At the end of the buffer the result is empty.
    pub fn range_of_composed_character_sequence(&self, location: usize) -> TextRange {
        let len = self.len();
        if location >= len {
            return TextRange::caret(len);
        }
        let slice = self.rope.slice(..);
        let byte = self.rope.char_to_byte(self.rope.utf16_cu_to_char(location));
        let start = if is_grapheme_boundary(&slice, byte) {
            byte
        } else {
            prev_grapheme_boundary(&slice, byte)
        };
        let end = next_grapheme_boundary(&slice, start);
        let start = self.utf16_from_byte(start);
        TextRange::new(start, self.utf16_from_byte(end) - start)
    }

    /// First grapheme boundary after `location`, or the buffer length.
    pub fn next_grapheme_boundary(&self, location: usize) -> usize {
        let len = self.len();
        if location >= len {
            return len;
        }
        self.range_of_composed_character_sequence(location)
            .upper_bound()
    }

    /// Last grapheme boundary before `location`, or `0`.
    pub fn prev_grapheme_boundary(&self, location: usize) -> usize {
        if location == 0 {
            return 0;
        }
        let location = location.min(self.len());
        self.range_of_composed_character_sequence(location - 1).location
    }

    fn slice(&self, range: TextRange) -> RopeSlice<'_> {
        let start = self.rope.utf16_cu_to_char(range.location);
        let end = self.rope.utf16_cu_to_char(range.upper_bound());
        self.rope.slice(start..end)
    }

    fn char_boundary_at_or_before(&self, location: usize) -> usize {
        self.rope.char_to_utf16_cu(self.rope.utf16_cu_to_char(location))
    }

    fn utf16_from_byte(&self, byte: usize) -> usize {
        self.rope.char_to_utf16_cu(self.rope.byte_to_char(byte))
    }
}

/// The longest prefix of `text` that is at most `units` UTF-16 code units long.
pub fn utf16_prefix(text: &str, units: usize) -> &str {
    let mut seen = 0usize;
    for (byte, ch) in text.char_indices() {
        if seen + ch.len_utf16() > units {
            return &text[..byte];
        }
        seen += ch.len_utf16();
    }
    text
}

impl From<&str> for StringView {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

fn prev_grapheme_boundary(slice: &RopeSlice<'_>, byte_idx: usize) -> usize {
    let (mut chunk, mut chunk_byte_idx, _, _) = slice.chunk_at_byte(byte_idx);
    let mut cursor = GraphemeCursor::new(byte_idx, slice.len_bytes(), true);
    loop {
        match cursor.prev_boundary(chunk, chunk_byte_idx) {
            Ok(None) => return 0,
            Ok(Some(n)) => return n,
            Err(GraphemeIncomplete::PrevChunk) => {
                let (prev, prev_idx, _, _) = slice.chunk_at_byte(chunk_byte_idx - 1);
                chunk = prev;
                chunk_byte_idx = prev_idx;
            }
            Err(GraphemeIncomplete::PreContext(n)) => {
                let (context, context_idx, _, _) = slice.chunk_at_byte(n - 1);
                cursor.provide_context(context, context_idx);
            }
            Err(_) => return byte_idx,
        }
    }
}

fn next_grapheme_boundary(slice: &RopeSlice<'_>, byte_idx: usize) -> usize {
    let (mut chunk, mut chunk_byte_idx, _, _) = slice.chunk_at_byte(byte_idx);
    let mut cursor = GraphemeCursor::new(byte_idx, slice.len_bytes(), true);
    loop {
        match cursor.next_boundary(chunk, chunk_byte_idx) {
            Ok(None) => return slice.len_bytes(),
            Ok(Some(n)) => return n,
            Err(GraphemeIncomplete::NextChunk) => {
                chunk_byte_idx += chunk.len();
                let (next, _, _, _) = slice.chunk_at_byte(chunk_byte_idx);
                chunk = next;
            }
            Err(GraphemeIncomplete::PreContext(n)) => {
                let (context, context_idx, _, _) = slice.chunk_at_byte(n - 1);
                cursor.provide_context(context, context_idx);
            }
            Err(_) => return slice.len_bytes(),
        }
    }
}

fn is_grapheme_boundary(slice: &RopeSlice<'_>, byte_idx: usize) -> bool {
    let (chunk, chunk_byte_idx, _, _) = slice.chunk_at_byte(byte_idx);
    let mut cursor = GraphemeCursor::new(byte_idx, slice.len_bytes(), true);
    loop {
        match cursor.is_boundary(chunk, chunk_byte_idx) {
            Ok(n) => return n,
            Err(GraphemeIncomplete::PreContext(n)) => {
                let (context, context_idx, _, _) = slice.chunk_at_byte(n - 1);
                cursor.provide_context(context, context_idx);
            }
            Err(_) => return true,
        }
    }
}
