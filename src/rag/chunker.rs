//! Character-based text splitting.
//!
//! All sizes are counted in `char`s, never bytes, so a chunk boundary can not
//! fall inside a multi-byte character.

use std::collections::VecDeque;

use crate::core::config::{ChunkStrategy, IngestSettings};

use super::document::{Chunk, Document};

/// Separators tried in order by the recursive strategy; the empty separator
/// falls back to single characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    strategy: ChunkStrategy,
}

impl TextChunker {
    /// `chunk_overlap` is clamped below `chunk_size` so the window always
    /// advances.
    pub fn new(chunk_size: usize, chunk_overlap: usize, strategy: ChunkStrategy) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            strategy,
        }
    }

    pub fn from_settings(settings: &IngestSettings) -> Self {
        Self::new(settings.chunk_size, settings.chunk_overlap, settings.strategy)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| self.split_document(doc))
            .collect()
    }

    pub fn split_document(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start_offset, text))| Chunk {
                text,
                source: document.source.clone(),
                chunk_index,
                start_offset,
                metadata: document.metadata.clone(),
            })
            .collect()
    }

    /// Splits `text` into `(start_char_offset, chunk_text)` pairs.
    pub fn split_text(&self, text: &str) -> Vec<(usize, String)> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        match self.strategy {
            ChunkStrategy::Fixed => self.split_fixed(text),
            ChunkStrategy::Recursive => {
                let pieces = self.split_recursive(text, &SEPARATORS);
                with_offsets(text, pieces)
            }
        }
    }

    /// Sliding window: every window is `chunk_size` long except possibly the
    /// last, and consecutive windows share exactly `chunk_overlap` chars.
    fn split_fixed(&self, text: &str) -> Vec<(usize, String)> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let step = self.chunk_size - self.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(total);
            chunks.push((start, chars[start..end].iter().collect()));
            if end == total {
                break;
            }
            start += step;
        }
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = "";
        let mut remaining: &[&str] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                break;
            }
            if text.contains(candidate) {
                separator = *candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if remaining.is_empty() {
                // Only a single char can get here, and only with chunk_size 1.
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Packs small pieces into chunks of at most `chunk_size` chars, carrying
    /// up to `chunk_overlap` chars of the previous chunk forward.
    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !current.is_empty() {
                push_joined(&current, &mut merged);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    let Some(first) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(first);
                }
            }
            current.push_back(piece);
            total += len;
        }
        push_joined(&current, &mut merged);
        merged
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn push_joined(current: &VecDeque<&str>, out: &mut Vec<String>) {
    let joined: String = current.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Splits on `separator`, attaching each separator to the piece that follows.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > last {
            pieces.push(text[last..idx].to_string());
        }
        last = idx;
    }
    if last < text.len() {
        pieces.push(text[last..].to_string());
    }
    pieces
}

/// Recovers character offsets for chunks produced by the recursive strategy
/// by locating each chunk in the source, moving forward only.
fn with_offsets(text: &str, pieces: Vec<String>) -> Vec<(usize, String)> {
    let mut search_from = 0usize;
    let mut char_offset = 0usize;
    let mut byte_offset = 0usize;

    pieces
        .into_iter()
        .map(|piece| {
            let found = text
                .get(search_from..)
                .and_then(|rest| rest.find(piece.as_str()))
                .map(|pos| pos + search_from);

            if let Some(byte) = found {
                char_offset += text[byte_offset..byte].chars().count();
                byte_offset = byte;
                search_from = byte
                    + text[byte..]
                        .chars()
                        .next()
                        .map(char::len_utf8)
                        .unwrap_or(1);
            }
            (char_offset, piece)
        })
        .collect()
}
