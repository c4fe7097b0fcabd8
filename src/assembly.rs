//! Orders and deduplicates retrieved chunks for prompt construction.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::types::RetrievedChunk;

/// Visible marker appended when the fallback budget truncates evidence.
const TRUNCATION_MARKER: &str = "...";

fn relevance(chunk: &RetrievedChunk) -> f32 {
    chunk.metadata.similarity_score.unwrap_or(0.0)
}

/// Deduplicates by exact (trimmed) text, then sorts by relevance.
///
/// Two chunks with identical text collapse to one even when they come from
/// different papers; the first occurrence wins. The sort is stable and
/// descending, with missing scores ranking as zero.
pub fn assemble(chunks: Vec<RetrievedChunk>) -> Vec<RetrievedChunk> {
    let mut seen = HashSet::new();
    let mut deduped: Vec<RetrievedChunk> = chunks
        .into_iter()
        .filter(|chunk| seen.insert(chunk.text.trim().to_string()))
        .collect();

    deduped.sort_by(|a, b| {
        relevance(b)
            .partial_cmp(&relevance(a))
            .unwrap_or(Ordering::Equal)
    });
    deduped
}

/// Joins chunk texts with single spaces, unbounded.
///
/// The primary generation path assumes the model accepts effectively
/// unbounded context; only the fallback enforces a budget.
pub fn combined_text(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Concatenates chunk texts up to a character budget.
///
/// Chunks are consumed in their given (relevance) order; the chunk that
/// overflows the budget is cut at the remaining length and marked with a
/// visible ellipsis.
pub fn extractive_answer(chunks: &[RetrievedChunk], max_chars: usize) -> String {
    let mut pieces: Vec<String> = Vec::new();
    let mut total = 0usize;

    for chunk in chunks {
        let len = chunk.text.chars().count();
        if total + len > max_chars {
            let remaining = max_chars.saturating_sub(total);
            let mut cut: String = chunk.text.chars().take(remaining).collect();
            cut.push_str(TRUNCATION_MARKER);
            pieces.push(cut);
            break;
        }
        pieces.push(chunk.text.clone());
        total += len;
    }

    pieces.join(" ")
}
