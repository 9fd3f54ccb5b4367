//! Paragraph-aligned chunking for the translation pipeline.
//!
//! Documents are flattened to a sequence of paragraphs (blank-line
//! separated), then packed greedily into chunks that stay under a character
//! budget. The budget exists because the translation backend has a bounded
//! useful input size; paragraph alignment exists because translating half a
//! paragraph produces visibly worse output than translating a whole one.
//!
//! # Example
//!
//! ```rust,ignore
//! use glossa_core::chunking::{ChunkerConfig, ParagraphChunker};
//!
//! let chunker = ParagraphChunker::new(ChunkerConfig::default());
//! let chunks = chunker.chunk("First paragraph.\n\nSecond paragraph.");
//! assert_eq!(chunks.len(), 1);
//! ```

use regex::Regex;

use crate::defaults;

/// Separator used to join paragraphs inside a chunk and to reassemble
/// translated chunks into a document.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Configuration for the paragraph chunker.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum characters per chunk, counted in Unicode scalar values.
    /// Join separators are not counted against the budget.
    pub max_chunk_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: defaults::MAX_CHUNK_CHARS,
        }
    }
}

/// Packs paragraphs into bounded-size chunks without ever splitting one.
///
/// A single paragraph longer than the budget becomes its own oversized
/// chunk; everything else stays under `max_chunk_chars`.
#[derive(Debug, Clone)]
pub struct ParagraphChunker {
    config: ChunkerConfig,
}

impl ParagraphChunker {
    /// Create a new ParagraphChunker with the given configuration.
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Convenience constructor for an explicit character budget.
    pub fn with_max_chars(max_chunk_chars: usize) -> Self {
        Self {
            config: ChunkerConfig { max_chunk_chars },
        }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split text into trimmed, non-empty paragraphs.
    pub fn split_paragraphs(text: &str) -> Vec<&str> {
        let para_regex = Regex::new(r"\n\s*\n|\r\n\s*\r\n").unwrap();
        let mut paragraphs = Vec::new();
        let mut last_end = 0;

        for mat in para_regex.find_iter(text) {
            let para_text = text[last_end..mat.start()].trim();
            if !para_text.is_empty() {
                paragraphs.push(para_text);
            }
            last_end = mat.end();
        }

        // Add final paragraph
        if last_end < text.len() {
            let para_text = text[last_end..].trim();
            if !para_text.is_empty() {
                paragraphs.push(para_text);
            }
        }

        paragraphs
    }

    /// Chunk raw text: split into paragraphs, then pack.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.chunk_paragraphs(&Self::split_paragraphs(text))
    }

    /// Pack an ordered paragraph sequence into chunks.
    ///
    /// Before adding a paragraph, a non-empty accumulator is flushed if the
    /// paragraph would push it over the budget. The paragraph then starts
    /// the next chunk, even when it alone exceeds the budget.
    pub fn chunk_paragraphs(&self, paragraphs: &[&str]) -> Vec<String> {
        let max = self.config.max_chunk_chars;
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0;

        for &para in paragraphs {
            let para_len = para.chars().count();
            if !current.is_empty() && current_len + para_len > max {
                chunks.push(current.join(PARAGRAPH_SEPARATOR));
                current.clear();
                current_len = 0;
            }
            current.push(para);
            current_len += para_len;
        }

        if !current.is_empty() {
            chunks.push(current.join(PARAGRAPH_SEPARATOR));
        }

        chunks
    }
}

impl Default for ParagraphChunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunker_empty_text() {
        let chunker = ParagraphChunker::default();
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn test_chunker_whitespace_only_text() {
        let chunker = ParagraphChunker::default();
        assert!(chunker.chunk("  \n\n  \n \n").is_empty());
    }

    #[test]
    fn test_chunker_single_paragraph() {
        let chunker = ParagraphChunker::default();
        let chunks = chunker.chunk("One paragraph, no blank lines.");
        assert_eq!(chunks, vec!["One paragraph, no blank lines."]);
    }

    #[test]
    fn test_split_handles_windows_line_endings() {
        let paras = ParagraphChunker::split_paragraphs("First.\r\n\r\nSecond.");
        assert_eq!(paras, vec!["First.", "Second."]);
    }

    #[test]
    fn test_split_collapses_extra_blank_lines() {
        let paras = ParagraphChunker::split_paragraphs("First.\n\n\n\nSecond.\n\n");
        assert_eq!(paras, vec!["First.", "Second."]);
    }

    #[test]
    fn test_small_paragraphs_pack_into_one_chunk() {
        let chunker = ParagraphChunker::with_max_chars(100);
        let chunks = chunker.chunk("First.\n\nSecond.\n\nThird.");
        assert_eq!(chunks, vec!["First.\n\nSecond.\n\nThird."]);
    }

    #[test]
    fn test_flushes_before_exceeding_budget() {
        // 6 + 7 = 13 > 12, so "Second." starts a new chunk.
        let chunker = ParagraphChunker::with_max_chars(12);
        let chunks = chunker.chunk("First.\n\nSecond.\n\nThird.");
        assert_eq!(chunks, vec!["First.", "Second.\n\nThird."]);
    }

    #[test]
    fn test_exact_fit_does_not_flush() {
        // 6 + 6 = 12 == budget: fits, no flush.
        let chunker = ParagraphChunker::with_max_chars(12);
        let chunks = chunker.chunk("Alpha.\n\nBravo.");
        assert_eq!(chunks, vec!["Alpha.\n\nBravo."]);
    }

    #[test]
    fn test_oversized_paragraph_becomes_own_chunk() {
        let long = "x".repeat(50);
        let chunker = ParagraphChunker::with_max_chars(10);
        let text = format!("Short.\n\n{}\n\nTail.", long);
        let chunks = chunker.chunk(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "Short.");
        assert_eq!(chunks[1], long, "Oversized paragraph must stay whole");
        assert_eq!(chunks[2], "Tail.");
    }

    #[test]
    fn test_budget_ignores_join_separators() {
        // Three 4-char paragraphs fit a 12-char budget exactly because the
        // two joining separators are not counted.
        let chunker = ParagraphChunker::with_max_chars(12);
        let chunks = chunker.chunk("aaaa\n\nbbbb\n\ncccc");
        assert_eq!(chunks, vec!["aaaa\n\nbbbb\n\ncccc"]);
    }

    #[test]
    fn test_budget_counts_chars_not_bytes() {
        // Each paragraph is 4 chars but 12 UTF-8 bytes; both fit an 8-char
        // budget together.
        let chunker = ParagraphChunker::with_max_chars(8);
        let chunks = chunker.chunk("한국어로\n\n번역한다");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_concatenation_reproduces_paragraph_sequence() {
        let text = "Alpha one.\n\nBravo two two.\n\nCharlie three.\n\nDelta.\n\nEcho five five.";
        let original: Vec<&str> = ParagraphChunker::split_paragraphs(text);

        for budget in [1usize, 10, 25, 40, 10_000] {
            let chunker = ParagraphChunker::with_max_chars(budget);
            let chunks = chunker.chunk(text);
            let rejoined = chunks.join(PARAGRAPH_SEPARATOR);
            assert_eq!(
                ParagraphChunker::split_paragraphs(&rejoined),
                original,
                "budget {} must preserve the paragraph sequence",
                budget
            );
        }
    }

    #[test]
    fn test_chunks_respect_budget_unless_single_oversized_paragraph() {
        let text = "Short one.\n\nA somewhat longer second paragraph here.\n\nTail.";
        for budget in [5usize, 20, 30] {
            let chunker = ParagraphChunker::with_max_chars(budget);
            for chunk in chunker.chunk(text) {
                let within = chunk.chars().count() <= budget;
                let single_para = !chunk.contains(PARAGRAPH_SEPARATOR);
                assert!(
                    within || single_para,
                    "chunk {:?} exceeds budget {} and is not a lone paragraph",
                    chunk,
                    budget
                );
            }
        }
    }

    #[test]
    fn test_greedy_packing_fills_each_chunk() {
        // Budget 13: 6 + 7 fits exactly, the third paragraph overflows.
        let chunker = ParagraphChunker::with_max_chars(13);
        let chunks = chunker.chunk("First.\n\nSecond.\n\nThird.");
        assert_eq!(chunks, vec!["First.\n\nSecond.", "Third."]);
    }
}
