/*!
 * Paragraph-aware transcript segmentation.
 *
 * The transcript is cut into paragraphs first: a paragraph is a run of lines
 * that ends at a blank line or at a line closing a sentence. Paragraphs are
 * then packed greedily into chunks under a soft line budget. A chunk is never
 * cut inside a paragraph, so a paragraph longer than the budget becomes a
 * chunk of its own.
 *
 * Segmentation is lossless: joining the chunk sources in index order gives
 * back the input byte for byte.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::chunk::Chunk;
use super::formatting;

/// Sentence terminator, optionally followed by closing quotes or brackets
static SENTENCE_END_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[.!?…。！？]["'”’»)\]]*$"#).unwrap()
});

/// A run of transcript lines ending at a paragraph boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Paragraph<'a> {
    text: &'a str,
    lines: usize,
}

/// Splits transcripts into ordered chunks
#[derive(Debug, Clone)]
pub struct Segmenter {
    chunk_lines: usize,
}

impl Segmenter {
    /// Create a segmenter with a line budget per chunk (at least one line)
    pub fn new(chunk_lines: usize) -> Self {
        Self {
            chunk_lines: chunk_lines.max(1),
        }
    }

    pub fn chunk_lines(&self) -> usize {
        self.chunk_lines
    }

    /// Split a transcript into chunks with dense indices starting at 0
    pub fn segment(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_lines = 0;

        for paragraph in split_paragraphs(text) {
            if current_lines > 0 && current_lines + paragraph.lines > self.chunk_lines {
                chunks.push(Chunk::new(chunks.len(), std::mem::take(&mut current)));
                current_lines = 0;
            }
            current.push_str(paragraph.text);
            current_lines += paragraph.lines;
        }

        if !current.is_empty() {
            chunks.push(Chunk::new(chunks.len(), current));
        }

        debug!(
            "Segmented {} lines into {} chunks (budget {} lines)",
            text.lines().count(),
            chunks.len(),
            self.chunk_lines
        );

        chunks
    }
}

/// Whether a line closes the paragraph it belongs to
pub fn is_paragraph_boundary(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || SENTENCE_END_REGEX.is_match(trimmed)
}

/// Paragraphs as segmentation sees them, each with its lines joined by single spaces
pub fn paragraph_texts(text: &str) -> Vec<String> {
    split_paragraphs(text)
        .into_iter()
        .flat_map(|paragraph| formatting::split_paragraphs(paragraph.text))
        .collect()
}

fn split_paragraphs(text: &str) -> Vec<Paragraph<'_>> {
    let mut paragraphs = Vec::new();
    let mut start = 0;
    let mut end = 0;
    let mut lines = 0;

    for line in text.split_inclusive('\n') {
        end += line.len();
        lines += 1;
        if is_paragraph_boundary(line) {
            paragraphs.push(Paragraph { text: &text[start..end], lines });
            start = end;
            lines = 0;
        }
    }

    if start < text.len() {
        paragraphs.push(Paragraph { text: &text[start..], lines });
    }

    paragraphs
}
