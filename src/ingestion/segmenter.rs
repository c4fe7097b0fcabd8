//! Splits raw extracted paper text into section-labelled token windows.

use crate::types::{Chunk, Paper};

/// Fixed vocabulary of academic section names recognised as headers.
const SECTION_HEADERS: &[&str] = &[
    "abstract",
    "introduction",
    "background",
    "related work",
    "method",
    "methods",
    "methodology",
    "approach",
    "model",
    "models",
    "algorithm",
    "experiments",
    "experimental setup",
    "results",
    "evaluation",
    "discussion",
    "conclusion",
    "conclusions",
];

/// Sections dropped before chunking as low-signal boilerplate.
const DISCARDED_SECTIONS: &[&str] = &["references", "acknowledgements", "acknowledgments"];

/// Hard cutoff rejecting body lines that merely start with a keyword.
const MAX_HEADER_CHARS: usize = 50;

/// Word-count bounds for the greedy chunking window.
#[derive(Clone, Copy, Debug)]
pub struct ChunkingLimits {
    /// Minimum words for a trailing buffer to be emitted as a final chunk.
    pub min_tokens: usize,
    /// Buffer size at which a chunk is emitted and the buffer reset.
    pub max_tokens: usize,
}

impl Default for ChunkingLimits {
    fn default() -> Self {
        Self {
            min_tokens: 300,
            max_tokens: 800,
        }
    }
}

/// Returns `true` when a trimmed, case-folded line opens a new section.
///
/// Discarded names participate in detection so their text is isolated and
/// dropped instead of bleeding into the preceding section.
fn is_section_header(line_clean: &str) -> bool {
    line_clean.chars().count() < MAX_HEADER_CHARS
        && SECTION_HEADERS
            .iter()
            .chain(DISCARDED_SECTIONS)
            .any(|header| line_clean.starts_with(header))
}

/// Collapses all whitespace runs (including newlines) to single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits text into `(label, normalized_text)` sections in document order.
///
/// Lines before the first detected header accumulate under `"unknown"`. A
/// repeated header opens a new segment under the same label rather than
/// overwriting the earlier one.
pub fn split_into_sections(text: &str) -> Vec<(String, String)> {
    let mut sections: Vec<(String, Vec<&str>)> = vec![("unknown".to_string(), Vec::new())];

    for line in text.lines() {
        let line_clean = line.trim().to_lowercase();
        if is_section_header(&line_clean) {
            sections.push((line_clean, Vec::new()));
        } else {
            sections
                .last_mut()
                .expect("sections always holds at least the preamble")
                .1
                .push(line);
        }
    }

    sections
        .into_iter()
        .map(|(label, lines)| (label, normalize_whitespace(&lines.join(" "))))
        .collect()
}

/// Greedy whitespace-token windowing.
///
/// Emits a chunk each time the buffer reaches `max_tokens`; a trailing
/// buffer shorter than `min_tokens` is dropped outright, so a section that
/// never reaches the minimum yields no chunks at all.
pub fn chunk_words(text: &str, limits: ChunkingLimits) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        buffer.push(word);
        if buffer.len() >= limits.max_tokens {
            chunks.push(buffer.join(" "));
            buffer.clear();
        }
    }

    if buffer.len() >= limits.min_tokens {
        chunks.push(buffer.join(" "));
    }

    chunks
}

/// Turns one paper's raw extracted text into its emitted chunks.
///
/// `chunk_index` increments per paper across all surviving sections, in
/// emission order.
pub fn segment_paper(raw_text: &str, paper: &Paper, limits: ChunkingLimits) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut chunk_index = 0usize;

    for (section, text) in split_into_sections(raw_text) {
        if DISCARDED_SECTIONS.contains(&section.as_str()) {
            continue;
        }

        for piece in chunk_words(&text, limits) {
            chunks.push(Chunk {
                text: piece,
                paper_id: paper.arxiv_id.clone(),
                paper_title: paper.title.clone(),
                authors: paper.authors.clone(),
                section: section.clone(),
                chunk_index,
            });
            chunk_index += 1;
        }
    }

    chunks
}
