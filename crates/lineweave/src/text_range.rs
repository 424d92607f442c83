//! UTF-16 ranges.
//!
//! Every location in `lineweave` is measured in UTF-16 code units, the unit text input systems
//! and incremental parsers agree on. [`ByteRange`] is the same range measured in UTF-16 *bytes*
//! (two per code unit).

use std::fmt;

/// A half-open range `[location, location + length)` in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TextRange {
    /// Start of the range.
    pub location: usize,
    /// Number of code units in the range.
    pub length: usize,
}

impl TextRange {
    /// Create a range.
    pub const fn new(location: usize, length: usize) -> Self {
        Self { location, length }
    }

    /// An empty range at `location`.
    pub const fn caret(location: usize) -> Self {
        Self {
            location,
            length: 0,
        }
    }

    /// Create a range from two bounds, in either order.
    pub fn from_bounds(a: usize, b: usize) -> Self {
        let (lower, upper) = if a <= b { (a, b) } else { (b, a) };
        Self::new(lower, upper - lower)
    }

    /// One past the last code unit.
    pub const fn upper_bound(&self) -> usize {
        self.location + self.length
    }

    /// Returns `true` if the range is empty.
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns `true` if `location` lies in `[location, upper_bound)`.
    pub fn contains(&self, location: usize) -> bool {
        location >= self.location && location < self.upper_bound()
    }

    /// Returns `true` if the ranges share at least one code unit, or if an empty range sits
    /// inside (or on the boundary of) the other.
    pub fn overlaps(&self, other: &TextRange) -> bool {
        if self.is_empty() || other.is_empty() {
            return self.location <= other.upper_bound() && other.location <= self.upper_bound();
        }
        self.location < other.upper_bound() && other.location < self.upper_bound()
    }

    /// The common part of both ranges, if they touch.
    pub fn intersection(&self, other: &TextRange) -> Option<TextRange> {
        let lower = self.location.max(other.location);
        let upper = self.upper_bound().min(other.upper_bound());
        (lower <= upper).then(|| TextRange::new(lower, upper - lower))
    }

    /// Clamp the range so it lies within `[0, length]`.
    pub fn clamped(&self, length: usize) -> TextRange {
        let location = self.location.min(length);
        let upper = self.upper_bound().min(length);
        TextRange::new(location, upper - location)
    }

    /// Shift the range by `delta` code units.
    pub fn offset_by(&self, delta: usize) -> TextRange {
        TextRange::new(self.location + delta, self.length)
    }

    /// Interpret the range as UTF-16 bytes.
    pub const fn to_byte_range(&self) -> ByteRange {
        ByteRange::new(self.location * 2, self.length * 2)
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.location, self.length)
    }
}

/// A half-open range in UTF-16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ByteRange {
    /// Start offset in bytes.
    pub location: usize,
    /// Length in bytes.
    pub length: usize,
}

impl ByteRange {
    /// Create a byte range.
    pub const fn new(location: usize, length: usize) -> Self {
        Self { location, length }
    }

    /// One past the last byte.
    pub const fn upper_bound(&self) -> usize {
        self.location + self.length
    }

    /// Convert back to code units. Odd byte offsets round down.
    pub const fn to_text_range(&self) -> TextRange {
        let location = self.location / 2;
        TextRange::new(location, self.upper_bound() / 2 - location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_half_open() {
        let range = TextRange::new(2, 3);
        assert!(!range.contains(1));
        assert!(range.contains(2));
        assert!(range.contains(4));
        assert!(!range.contains(5));
    }

    #[test]
    fn test_intersection() {
        let a = TextRange::new(0, 5);
        assert_eq!(a.intersection(&TextRange::new(3, 10)), Some(TextRange::new(3, 2)));
        assert_eq!(a.intersection(&TextRange::new(5, 2)), Some(TextRange::new(5, 0)));
        assert_eq!(a.intersection(&TextRange::new(6, 2)), None);
    }

    #[test]
    fn test_overlaps_with_empty_ranges() {
        let a = TextRange::new(2, 3);
        assert!(a.overlaps(&TextRange::caret(5)));
        assert!(a.overlaps(&TextRange::caret(2)));
        assert!(!a.overlaps(&TextRange::new(5, 1)));
    }

    #[test]
    fn test_clamped() {
        assert_eq!(TextRange::new(3, 10).clamped(5), TextRange::new(3, 2));
        assert_eq!(TextRange::new(8, 1).clamped(5), TextRange::new(5, 0));
    }

    #[test]
    fn test_byte_range_conversion() {
        let range = TextRange::new(3, 4);
        assert_eq!(range.to_byte_range(), ByteRange::new(6, 8));
        assert_eq!(range.to_byte_range().to_text_range(), range);
    }
}
