//! Character-offset span handling for user utterances.
//!
//! Span labels and span predictions for non-categorical slots are indices
//! into the user utterance, counted in characters with an exclusive end.
//! Rust strings are indexed by byte, so every span crosses a conversion
//! before the substring can be taken:
//!
//! ```text
//! Text:  "Table at Café Zoë"
//!
//!   CHAR   T a b l e _ a t _ C  a  f  é  _  Z  o  ë
//!          0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16
//!
//!   "Zoë" = chars 14..17, bytes 15..19
//! ```
//!
//! Predicted spans come straight from an argmax and are not guaranteed to be
//! well formed. [`TextSpan::clamped`] folds any out-of-range or inverted span
//! into a valid (possibly empty) one instead of failing.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A text span with both byte and character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    /// Byte offset (start, inclusive)
    pub byte_start: usize,
    /// Byte offset (end, exclusive)
    pub byte_end: usize,
    /// Character offset (start, inclusive)
    pub char_start: usize,
    /// Character offset (end, exclusive)
    pub char_end: usize,
}

impl TextSpan {
    /// Create a span from character offsets, computing byte offsets from text.
    ///
    /// Offsets past the end of `text` resolve to `text.len()`.
    #[must_use]
    pub fn from_chars(text: &str, char_start: usize, char_end: usize) -> Self {
        let (byte_start, byte_end) = chars_to_bytes(text, char_start, char_end);
        Self {
            byte_start,
            byte_end,
            char_start,
            char_end,
        }
    }

    /// Create a span from raw (possibly negative, inverted, or out of range)
    /// character offsets.
    ///
    /// Negative offsets become 0, offsets past the end become the character
    /// count, and an end before the start collapses to an empty span at the
    /// start.
    ///
    /// # Example
    /// ```
    /// use sgd_eval::offset::TextSpan;
    ///
    /// let text = "book a table";
    /// assert_eq!(TextSpan::clamped(text, 7, 12).extract(text), "table");
    /// assert_eq!(TextSpan::clamped(text, 7, 99).extract(text), "table");
    /// assert_eq!(TextSpan::clamped(text, 9, 3).extract(text), "");
    /// assert_eq!(TextSpan::clamped(text, -4, 4).extract(text), "book");
    /// ```
    #[must_use]
    pub fn clamped(text: &str, char_start: i64, char_end: i64) -> Self {
        let char_count = text.chars().count();
        let clamp = |offset: i64| usize::try_from(offset.max(0)).unwrap_or(usize::MAX).min(char_count);

        let start = clamp(char_start);
        let end = clamp(char_end).max(start);
        Self::from_chars(text, start, end)
    }

    /// Get character range.
    #[must_use]
    pub const fn char_range(&self) -> Range<usize> {
        self.char_start..self.char_end
    }

    /// Character length.
    #[must_use]
    pub const fn char_len(&self) -> usize {
        self.char_end.saturating_sub(self.char_start)
    }

    /// Check if this span is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.byte_start >= self.byte_end
    }

    /// Extract the text for this span.
    #[must_use]
    pub fn extract<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.byte_start..self.byte_end).unwrap_or("")
    }
}

/// Convert character offsets to byte offsets.
#[must_use]
pub fn chars_to_bytes(text: &str, char_start: usize, char_end: usize) -> (usize, usize) {
    let mut byte_start = 0;
    let mut byte_end = text.len();
    let mut found_start = false;

    for (char_idx, (byte_idx, _ch)) in text.char_indices().enumerate() {
        if char_idx == char_start {
            byte_start = byte_idx;
            found_start = true;
        }
        if char_idx == char_end {
            byte_end = byte_idx;
            return (byte_start, byte_end);
        }
    }

    if !found_start {
        byte_start = text.len();
    }

    (byte_start, byte_end)
}
