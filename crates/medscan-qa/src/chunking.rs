//! Overlapping text chunker.
//!
//! Chunks are at most `chunk_size` characters. A chunk ends at the last
//! paragraph break in its window, else the last line break, else the last
//! space, else mid-word. The next chunk restarts up to `chunk_overlap`
//! characters earlier, on a word boundary.

use serde::Serialize;

use crate::{QaError, QaResult};

pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Preferred break points, strongest first.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// A piece of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub text: String,
    /// Character offset of `text` in the source
    pub start_index: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> QaResult<Self> {
        if chunk_size == 0 {
            return Err(QaError::Config("chunk size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(QaError::Config(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunks in document order. Blank chunks are dropped.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            while start < chars.len() && chars[start].is_whitespace() {
                start += 1;
            }
            if start >= chars.len() {
                break;
            }

            let window_end = (start + self.chunk_size).min(chars.len());
            let end = if window_end == chars.len() {
                window_end
            } else {
                self.break_point(&chars, start, window_end)
            };

            push_trimmed(&chars, start, end, &mut chunks);
            if end >= chars.len() {
                break;
            }

            let mut next = end.saturating_sub(self.chunk_overlap).max(start + 1);
            while next < end && !chars[next - 1].is_whitespace() {
                next += 1;
            }
            start = next;
        }

        chunks
    }

    /// End of the chunk starting at `start`, just past the best separator.
    fn break_point(&self, chars: &[char], start: usize, window_end: usize) -> usize {
        // Breaks in the first half would make tiny chunks.
        let earliest = start + self.chunk_size / 2;

        for sep in SEPARATORS {
            let sep: Vec<char> = sep.chars().collect();
            let found = (earliest..=window_end.saturating_sub(sep.len()))
                .rev()
                .find(|&i| chars[i..i + sep.len()] == sep[..]);
            if let Some(i) = found {
                return i + sep.len();
            }
        }
        window_end
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn push_trimmed(chars: &[char], start: usize, end: usize, out: &mut Vec<Chunk>) {
    let slice = &chars[start..end];
    let leading = slice.iter().take_while(|c| c.is_whitespace()).count();
    let text: String = slice[leading..].iter().collect();
    let text = text.trim_end().to_string();
    if !text.is_empty() {
        out.push(Chunk {
            text,
            start_index: start + leading,
        });
    }
}
