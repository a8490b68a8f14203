//! Recursive character text splitter.
//!
//! Splits a document's extracted text into overlapping [`Chunk`]s bounded by
//! `max_chars` characters. Boundaries are chosen from an ordered separator
//! list, coarsest first (paragraph, line, sentence, clause, word), falling
//! back to a hard cut when nothing finer is left.
//!
//! # Algorithm
//!
//! 1. Empty text yields no chunks; text within `max_chars` yields one chunk.
//! 2. Split on the first separator present in the text. Separators stay
//!    attached to the piece they terminate, so pieces concatenate back to the
//!    input exactly.
//! 3. Pieces longer than the piece budget (`max_chars - overlap`) are
//!    re-split with the remaining finer separators, or hard-cut every
//!    `budget` characters once none remain.
//! 4. Pieces are merged greedily. Every chunk after the first begins with the
//!    last `overlap` characters of its predecessor.
//!
//! All lengths are counted in `char`s, so a cut never lands inside a
//! multi-byte character.
//!
//! # Example
//!
//! ```rust
//! use grounded_chat::chunk::TextSplitter;
//!
//! let splitter = TextSplitter::default();
//! let chunks = splitter.split("Hello world.\n\nSecond paragraph.");
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].index, 0);
//! ```

use crate::config::ChunkingConfig;
use crate::error::{RagError, Result};
use crate::models::Chunk;

pub const DEFAULT_MAX_CHARS: usize = 1000;
pub const DEFAULT_OVERLAP_CHARS: usize = 200;

/// Paragraph, line, Japanese full stop, Japanese comma, space, anywhere.
pub const DEFAULT_SEPARATORS: [&str; 6] = ["\n\n", "\n", "。", "、", " ", ""];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    max_chars: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter, rejecting parameters that cannot make progress.
    pub fn new(max_chars: usize, overlap: usize, separators: Vec<String>) -> Result<Self> {
        if max_chars == 0 {
            return Err(RagError::Configuration(
                "chunking.max_chars must be > 0".to_string(),
            ));
        }
        if overlap >= max_chars {
            return Err(RagError::Configuration(format!(
                "chunking.overlap_chars ({}) must be smaller than chunking.max_chars ({})",
                overlap, max_chars
            )));
        }
        Ok(Self {
            max_chars,
            overlap,
            separators,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(
            config.max_chars,
            config.overlap_chars,
            config.separators.clone(),
        )
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunks with contiguous indices starting at 0.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.max_chars {
            return vec![Chunk {
                index: 0,
                text: text.to_string(),
            }];
        }

        let budget = self.max_chars - self.overlap;
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        let mut pieces = Vec::new();
        split_pieces(text, &separators, budget, &mut pieces);
        self.merge(&pieces)
    }

    fn merge(&self, pieces: &[&str]) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;
        // Characters of `current` carried over from the previous chunk.
        let mut carried = 0usize;

        for piece in pieces {
            let piece_len = char_len(piece);
            if current_len > carried && current_len + piece_len > self.max_chars {
                let next = tail_chars(&current, self.overlap).to_string();
                let next_len = char_len(&next);
                chunks.push(Chunk {
                    index: chunks.len(),
                    text: std::mem::replace(&mut current, next),
                });
                current_len = next_len;
                carried = next_len;
            }
            current.push_str(piece);
            current_len += piece_len;
        }

        if current_len > carried {
            chunks.push(Chunk {
                index: chunks.len(),
                text: current,
            });
        }

        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            overlap: DEFAULT_OVERLAP_CHARS,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Break `text` into pieces of at most `budget` chars, preferring the
/// earliest separator in `separators` that occurs in it.
fn split_pieces<'a>(text: &'a str, separators: &[&str], budget: usize, out: &mut Vec<&'a str>) {
    if char_len(text) <= budget {
        out.push(text);
        return;
    }

    let chosen = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep));
    let pos = match chosen {
        Some(pos) if !separators[pos].is_empty() => pos,
        _ => {
            hard_cut(text, budget, out);
            return;
        }
    };

    let finer = &separators[pos + 1..];
    for piece in text.split_inclusive(separators[pos]) {
        if char_len(piece) <= budget {
            out.push(piece);
        } else {
            split_pieces(piece, finer, budget, out);
        }
    }
}

fn hard_cut<'a>(text: &'a str, budget: usize, out: &mut Vec<&'a str>) {
    let mut rest = text;
    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(budget)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        out.push(&rest[..end]);
        rest = &rest[end..];
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The last `n` characters of `s` (all of `s` if it is shorter).
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((i, _)) => &s[i..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(max_chars: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(
            max_chars,
            overlap,
            DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    /// Concatenate chunks, dropping the prefix each one shares with its predecessor.
    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&c.text);
            } else {
                let shared = overlap.min(char_len(&chunks[i - 1].text));
                out.extend(c.text.chars().skip(shared));
            }
        }
        out
    }

    fn assert_invariants(text: &str, chunks: &[Chunk], max_chars: usize, overlap: usize) {
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i, "index mismatch at position {}", i);
            assert!(
                char_len(&c.text) <= max_chars,
                "chunk {} has {} chars, max is {}",
                i,
                char_len(&c.text),
                max_chars
            );
        }
        for pair in chunks.windows(2) {
            let shared = overlap.min(char_len(&pair[0].text));
            let prefix: String = pair[1].text.chars().take(shared).collect();
            assert_eq!(tail_chars(&pair[0].text, shared), prefix);
        }
        assert_eq!(reconstruct(chunks, overlap), text);
    }

    #[test]
    fn test_empty_text() {
        assert!(TextSplitter::default().split("").is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = TextSplitter::default().split("Hello, world!");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_text_exactly_max_is_single_chunk() {
        let text = "a".repeat(50);
        let chunks = splitter(50, 10).split(&text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let text = format!("{}\n\n{}\n\n{}", "a".repeat(30), "b".repeat(30), "c".repeat(30));
        let chunks = splitter(40, 0).split(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, format!("{}\n\n", "a".repeat(30)));
        assert_eq!(chunks[1].text, format!("{}\n\n", "b".repeat(30)));
        assert_eq!(chunks[2].text, "c".repeat(30));
    }

    #[test]
    fn test_word_split_with_overlap() {
        let text: String = (0..40).map(|i| format!("w{:02} ", i)).collect();
        let chunks = splitter(50, 10).split(&text);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].text.chars().count(), 48);
        assert_invariants(&text, &chunks, 50, 10);
        for pair in chunks.windows(2) {
            assert_eq!(
                tail_chars(&pair[0].text, 10),
                pair[1].text.chars().take(10).collect::<String>()
            );
        }
    }

    #[test]
    fn test_japanese_sentences() {
        let text = "有給は年10日です。申請は前日までに行ってください。".repeat(30);
        let chunks = splitter(100, 20).split(&text);
        assert!(chunks.len() > 1);
        assert_invariants(&text, &chunks, 100, 20);
        for c in &chunks {
            assert!(c.text.ends_with('。'), "chunk should end on a sentence: {}", c.text);
        }
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let text = "x".repeat(2500);
        let chunks = TextSplitter::default().split(&text);
        let lens: Vec<usize> = chunks.iter().map(|c| c.text.len()).collect();
        assert_eq!(lens, vec![800, 1000, 1000, 300]);
        assert_invariants(&text, &chunks, 1000, 200);
    }

    #[test]
    fn test_hard_cut_when_separator_list_exhausted() {
        let text = format!("{}\n{}", "y".repeat(120), "z".repeat(10));
        let s = TextSplitter::new(50, 5, vec!["\n".to_string()]).unwrap();
        let chunks = s.split(&text);
        assert_invariants(&text, &chunks, 50, 5);
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘".repeat(5);
        let chunks = splitter(15, 4).split(&text);
        assert!(!chunks.is_empty());
        assert_invariants(&text, &chunks, 15, 4);
    }

    #[test]
    fn test_mixed_document() {
        let text = "# 就業規則\n\n第1条 この規則は、従業員の労働条件を定める。\n第2条 有給休暇は年10日とする。申請は前日までに行う。\n\nSection two has plain English words that keep going for a while so that splitting has to fall back to spaces between words.";
        for (max, overlap) in [(20, 0), (20, 5), (35, 12), (60, 30)] {
            let chunks = splitter(max, overlap).split(text);
            assert_invariants(text, &chunks, max, overlap);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta gamma.\n\nDelta epsilon.\nZeta eta theta iota kappa lambda.".repeat(10);
        let s = splitter(40, 8);
        assert_eq!(s.split(&text), s.split(&text));
    }

    #[test]
    fn test_rejects_overlap_not_below_max() {
        let err = TextSplitter::new(100, 100, vec![]).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        let err = TextSplitter::new(0, 0, vec![]).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[test]
    fn test_tail_chars() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("ab", 5), "ab");
        assert_eq!(tail_chars("日本語です", 2), "です");
        assert_eq!(tail_chars("abc", 0), "");
    }
}
