//! Chunk derivation: split page text into paragraphs, merge short ones,
//! split long ones.
//!
//! Chunks never cross a page boundary, so every chunk carries exactly one
//! `page_num`. Output order is document order.

use serde::{Deserialize, Serialize};

use crate::references::model::{Chunk, ChunkMetadata};

/// Configuration for chunk normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Minimum words per chunk (short paragraphs get merged).
    #[serde(default = "default_min_words")]
    pub min_words: usize,
    /// Target words per chunk.
    #[serde(default = "default_target_words")]
    pub target_words: usize,
    /// Maximum words per chunk (long paragraphs get split).
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

fn default_min_words() -> usize {
    50
}
fn default_target_words() -> usize {
    300
}
fn default_max_words() -> usize {
    500
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            min_words: default_min_words(),
            target_words: default_target_words(),
            max_words: default_max_words(),
        }
    }
}

/// Extracted text of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub page_num: u32,
    pub text: String,
}

impl PageText {
    pub fn new(page_num: u32, text: impl Into<String>) -> Self {
        Self {
            page_num,
            text: text.into(),
        }
    }
}

/// Join page texts into the document's full `contents`.
pub fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|p| p.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Split page text into paragraphs on blank lines, collapsing the hard line
/// breaks PDF extraction leaves inside a paragraph.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|para| {
            para.lines()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|p| !p.is_empty())
        .collect()
}

struct Paragraph {
    text: String,
    word_count: usize,
    page_num: u32,
}

/// Derive normalized chunks for `source_filename` from its pages.
///
/// - Paragraphs below `min_words` are merged with the next one on the same page.
/// - The buffer is flushed when it reaches `target_words` or the page changes.
/// - Buffers above `max_words` are split at sentence boundaries.
pub fn chunk_pages(pages: &[PageText], source_filename: &str, config: &ChunkConfig) -> Vec<Chunk> {
    let paragraphs: Vec<Paragraph> = pages
        .iter()
        .flat_map(|page| {
            split_paragraphs(&page.text)
                .into_iter()
                .map(move |text| Paragraph {
                    word_count: text.split_whitespace().count(),
                    text,
                    page_num: page.page_num,
                })
        })
        .collect();

    let Some(first) = paragraphs.first() else {
        return Vec::new();
    };

    let mut result = Vec::new();
    let mut buffer = String::new();
    let mut buffer_words = 0usize;
    let mut buffer_page = first.page_num;

    for para in &paragraphs {
        if para.page_num != buffer_page && !buffer.is_empty() {
            emit_chunk(&mut result, &buffer, buffer_page, source_filename, config);
            buffer.clear();
            buffer_words = 0;
        }
        buffer_page = para.page_num;

        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(&para.text);
        buffer_words += para.word_count;

        if buffer_words >= config.target_words {
            emit_chunk(&mut result, &buffer, buffer_page, source_filename, config);
            buffer.clear();
            buffer_words = 0;
        }
    }

    if !buffer.is_empty() {
        // A short tail joins the previous chunk when both sit on the same page.
        let merge = buffer_words < config.min_words
            && result
                .last()
                .is_some_and(|last| last.metadata.page_num == buffer_page);
        if merge {
            if let Some(last) = result.last_mut() {
                last.text.push(' ');
                last.text.push_str(&buffer);
            }
        } else {
            emit_chunk(&mut result, &buffer, buffer_page, source_filename, config);
        }
    }

    result
}

/// Emit one or more chunks from a text buffer, splitting at sentence
/// boundaries if the buffer exceeds `max_words`.
fn emit_chunk(
    result: &mut Vec<Chunk>,
    text: &str,
    page_num: u32,
    source_filename: &str,
    config: &ChunkConfig,
) {
    let make = |text: String| Chunk {
        text,
        metadata: ChunkMetadata {
            source_filename: source_filename.to_string(),
            page_num,
        },
    };

    if text.split_whitespace().count() <= config.max_words {
        result.push(make(text.to_string()));
        return;
    }

    let mut current = String::new();
    let mut current_words = 0usize;

    for sentence in split_at_sentences(text) {
        let sw = sentence.split_whitespace().count();
        if current_words + sw > config.max_words && !current.is_empty() {
            result.push(make(current.trim().to_string()));
            current.clear();
            current_words = 0;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&sentence);
        current_words += sw;
    }

    if !current.is_empty() {
        result.push(make(current.trim().to_string()));
    }
}

/// Split text at sentence boundaries (`.`, `!`, `?` followed by whitespace).
fn split_at_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') && chars.peek().is_some_and(|c| c.is_whitespace()) {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}
