//! Separator-priority text chunker.
//!
//! Splits page text into windows of at most `chunk_size` characters using a
//! prioritized separator list: paragraph break, line break, word break, then
//! raw character break. The largest separator that occurs in the text is
//! preferred; oversized fragments recurse into the smaller separators.
//! Neighbouring small fragments are merged greedily back up to `chunk_size`,
//! and consecutive chunks overlap by `chunk_overlap` characters.

use std::collections::VecDeque;

use crate::error::IngestError;

/// Separator priority order. Must be preserved exactly: paragraph breaks win
/// over line breaks, line breaks over word breaks, and word breaks over raw
/// character slicing.
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2_000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk_overlap {} must be smaller than chunk_size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Splits `text` into chunks of at most `chunk_size` characters.
pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<String>, IngestError> {
    config.validate()?;
    let chunks = split_recursive(text, SEPARATORS, config)
        .into_iter()
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect();
    Ok(chunks)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn split_recursive(text: &str, separators: &[&str], config: ChunkingConfig) -> Vec<String> {
    let (separator, remaining) = pick_separator(text, separators);

    if separator.is_empty() {
        return window_split(text, config);
    }

    let mut final_chunks = Vec::new();
    let mut mergeable: Vec<String> = Vec::new();

    for fragment in text.split(separator).filter(|fragment| !fragment.is_empty()) {
        if char_len(fragment) <= config.chunk_size {
            mergeable.push(fragment.to_string());
        } else {
            if !mergeable.is_empty() {
                final_chunks.extend(merge_fragments(&mergeable, separator, config));
                mergeable.clear();
            }
            final_chunks.extend(split_recursive(fragment, remaining, config));
        }
    }

    if !mergeable.is_empty() {
        final_chunks.extend(merge_fragments(&mergeable, separator, config));
    }

    final_chunks
}

fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (position, separator) in separators.iter().enumerate() {
        if separator.is_empty() || text.contains(separator) {
            return (separator, &separators[position + 1..]);
        }
    }
    ("", &[])
}

/// Greedily merges small fragments back together: fill the current window up
/// to `chunk_size`, emit it, then keep a tail of up to `chunk_overlap`
/// characters of fragments as the start of the next window.
fn merge_fragments(fragments: &[String], separator: &str, config: ChunkingConfig) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<&String> = VecDeque::new();
    let mut total = 0usize;

    for fragment in fragments {
        let fragment_len = char_len(fragment);
        let joined_len = total + fragment_len + if window.is_empty() { 0 } else { separator_len };

        if joined_len > config.chunk_size && !window.is_empty() {
            chunks.push(join_window(&window, separator));

            // Shrink the window until the carried-over tail fits the overlap
            // budget and leaves room for the incoming fragment.
            while total > config.chunk_overlap
                || (total + fragment_len + if window.is_empty() { 0 } else { separator_len }
                    > config.chunk_size
                    && total > 0)
            {
                let dropped = match window.pop_front() {
                    Some(front) => char_len(front),
                    None => break,
                };
                total -= dropped + if window.is_empty() { 0 } else { separator_len };
            }
        }

        total += fragment_len + if window.is_empty() { 0 } else { separator_len };
        window.push_back(fragment);
    }

    if !window.is_empty() {
        chunks.push(join_window(&window, separator));
    }

    chunks
}

fn join_window(window: &VecDeque<&String>, separator: &str) -> String {
    window
        .iter()
        .map(|fragment| fragment.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Character-level fallback when no separator applies: fixed windows of
/// `chunk_size` stepping by `chunk_size - chunk_overlap`, so consecutive
/// windows share exactly `chunk_overlap` characters.
fn window_split(text: &str, config: ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = config.chunk_size.saturating_sub(config.chunk_overlap).max(1);
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        pieces.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    pieces
}
