//! # Derived Fields
//!
//! Pure functions that compute display fields from their source data.
//! Nothing here holds state; the catalog calls these whenever a source
//! field is created or a sequence grows.

use crate::primitives::ELLIPSIS;

/// Cut `text` to at most `max_chars` characters, marking the cut with `…`.
///
/// Counts Unicode scalar values, so multi-byte text is never split
/// inside a character. Text that already fits is returned unchanged.
#[must_use]
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + ELLIPSIS.len_utf8());
            out.push_str(&text[..cut]);
            out.push(ELLIPSIS);
            out
        }
        None => text.to_string(),
    }
}

/// Up to the last `n` elements of an append-ordered sequence, newest first.
#[must_use]
pub fn last_n<T: Clone>(sequence: &[T], n: usize) -> Vec<T> {
    sequence.iter().rev().take(n).cloned().collect()
}

// =============================================================================
// TESTS
// =============================================================================
