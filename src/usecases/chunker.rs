//! Splits oversized contract text into bounded chunks for the remote model.
//!
//! Sizes are counted in chars; a slice never cuts through a UTF-8 sequence.

use crate::domain::{Chunk, ChunkError};

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 20_000;

/// Texts longer than this (in chars) are chunked; shorter ones go out whole.
pub const DEFAULT_CHUNK_THRESHOLD: usize = 50_000;

/// True when `text` is too long to submit as a single prompt.
pub fn needs_chunking(text: &str, threshold: usize) -> bool {
    text.chars().count() > threshold
}

/// Partition `text` into sequential, non-overlapping chunks of at most
/// `max_chars` characters. Only the last chunk may be shorter.
///
/// Concatenating the chunk contents in index order yields `text` again.
/// Empty text yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Result<Vec<Chunk>, ChunkError> {
    if max_chars == 0 {
        return Err(ChunkError::InvalidSize);
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (byte_idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(Chunk {
                index: chunks.len(),
                content: text[start..byte_idx].to_string(),
                size_bound: max_chars,
            });
            start = byte_idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(Chunk {
            index: chunks.len(),
            content: text[start..].to_string(),
            size_bound: max_chars,
        });
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(chunks: &[Chunk]) -> String {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn test_round_trip_and_count() {
        let text: String = (0..12_345).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        for size in [1, 7, 1_000, 4_096, 12_345, 20_000] {
            let chunks = chunk_text(&text, size).unwrap();
            assert_eq!(reassemble(&chunks), text);
            assert_eq!(chunks.len(), text.len().div_ceil(size));
            for (i, chunk) in chunks.iter().enumerate() {
                assert_eq!(chunk.index, i);
                assert!(chunk.content.chars().count() <= size);
                assert_eq!(chunk.size_bound, size);
            }
        }
    }

    #[test]
    fn test_only_last_chunk_is_short() {
        let text = "x".repeat(45_000);
        let chunks = chunk_text(&text, DEFAULT_CHUNK_SIZE).unwrap();
        let sizes: Vec<usize> = chunks.iter().map(|c| c.content.len()).collect();
        assert_eq!(sizes, vec![20_000, 20_000, 5_000]);
    }

    #[test]
    fn test_multibyte_chars_are_not_split() {
        let text = "Договор § 1 — условия оплаты. ".repeat(50);
        let chunks = chunk_text(&text, 13).unwrap();
        assert_eq!(reassemble(&chunks), text);
        assert_eq!(chunks.len(), text.chars().count().div_ceil(13));
    }

    #[test]
    fn test_zero_size_is_rejected() {
        assert_eq!(chunk_text("abc", 0), Err(ChunkError::InvalidSize));
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", 10).unwrap().is_empty());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert!(!needs_chunking(&"a".repeat(DEFAULT_CHUNK_THRESHOLD), DEFAULT_CHUNK_THRESHOLD));
        assert!(needs_chunking(
            &"a".repeat(DEFAULT_CHUNK_THRESHOLD + 1),
            DEFAULT_CHUNK_THRESHOLD
        ));
    }
}
