//! Fixed-size text chunker.
//!
//! Splits file text into slices bounded by `max_bytes` so each upload to the
//! retrieval index stays under the file-store size limit. Split points are
//! floored to UTF-8 char boundaries; for ASCII input every chunk except
//! possibly the last is exactly `max_bytes` long. Concatenating the chunks
//! in order reproduces the input. Pure, deterministic, no I/O.

/// Split `text` into successive slices of at most `max_bytes` bytes.
///
/// Returns a lazy, restartable iterator. Empty input yields no chunks.
/// A chunk exceeds `max_bytes` only in the degenerate case where a single
/// character is wider than the bound.
///
/// # Panics
///
/// Panics if `max_bytes` is zero; the configured chunk size is validated at
/// config load.
pub fn chunk_text(text: &str, max_bytes: usize) -> Chunks<'_> {
    assert!(max_bytes > 0, "max_bytes must be > 0");
    Chunks {
        remaining: text,
        max_bytes,
    }
}

/// Iterator over bounded slices of a text, produced by [`chunk_text`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    remaining: &'a str,
    max_bytes: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.remaining.is_empty() {
            return None;
        }

        if self.remaining.len() <= self.max_bytes {
            let last = self.remaining;
            self.remaining = "";
            return Some(last);
        }

        // Floor the split point to a char boundary. If the first char alone
        // is wider than max_bytes, take it whole rather than not advancing.
        let mut split = self.max_bytes;
        while !self.remaining.is_char_boundary(split) {
            split -= 1;
        }
        if split == 0 {
            split = self
                .remaining
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(self.remaining.len());
        }

        let (chunk, rest) = self.remaining.split_at(split);
        self.remaining = rest;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_chunk() {
        let chunks: Vec<&str> = chunk_text("Hello, world!", 700).collect();
        assert_eq!(chunks, vec!["Hello, world!"]);
    }

    #[test]
    fn test_empty_text_zero_chunks() {
        assert_eq!(chunk_text("", 700).count(), 0);
    }

    #[test]
    fn test_exact_sizes_ascii() {
        let text = "abcdefghij";
        let chunks: Vec<&str> = chunk_text(text, 4).collect();
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
        for c in &chunks[..chunks.len() - 1] {
            assert_eq!(c.len(), 4);
        }
        assert!(chunks.last().unwrap().len() <= 4);
    }

    #[test]
    fn test_concatenation_reproduces_input() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(100);
        for size in [1, 3, 7, 80, 1000, 100_000] {
            let rejoined: String = chunk_text(&text, size).collect();
            assert_eq!(rejoined, text, "size {}", size);
        }
    }

    #[test]
    fn test_multibyte_boundaries_respected() {
        let text = "héllo wörld ünïcode çhünks";
        for size in 1..=text.len() {
            let chunks: Vec<&str> = chunk_text(text, size).collect();
            for c in &chunks {
                // A chunk exceeds the bound only when one char is wider
                // than the bound itself.
                assert!(c.len() <= size || c.chars().count() == 1);
                assert!(!c.is_empty());
            }
            let rejoined: String = chunks.concat();
            assert_eq!(rejoined, text);
        }
    }

    #[test]
    fn test_restartable() {
        let text = "alpha beta gamma delta epsilon";
        let iter = chunk_text(text, 7);
        let first: Vec<&str> = iter.clone().collect();
        let second: Vec<&str> = iter.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_input_exactly_max() {
        let chunks: Vec<&str> = chunk_text("abcd", 4).collect();
        assert_eq!(chunks, vec!["abcd"]);
    }
}
