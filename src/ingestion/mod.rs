//! Corpus artifacts and batch processing of extracted paper text.
//!
//! Acquisition (arxiv download) and PDF text extraction are external
//! collaborators; this module consumes their outputs: a `metadata.json`
//! describing each paper and a black-box extractor yielding plain text per
//! page. It produces the flat chunk corpus the indexer consumes.

pub mod segmenter;

use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use crate::types::{Chunk, Paper, ScholarError};
pub use segmenter::{ChunkingLimits, chunk_words, normalize_whitespace, segment_paper, split_into_sections};

/// Black-box page-level text extraction for one PDF.
///
/// Implementations return the plain text of each page in order; pages are
/// concatenated with line breaks preserved before segmentation.
pub trait PdfTextExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ScholarError>;
}

/// Counters for one corpus processing run.
#[derive(Clone, Copy, Debug, Default)]
pub struct IngestReport {
    pub papers_processed: usize,
    pub papers_skipped: usize,
    pub chunks_emitted: usize,
}

/// Loads the per-paper metadata records.
pub async fn load_papers(path: impl AsRef<Path>) -> Result<Vec<Paper>, ScholarError> {
    let data = fs::read_to_string(path.as_ref()).await?;
    let papers: Vec<Paper> = serde_json::from_str(&data)?;
    Ok(papers)
}

/// Loads the flat chunk corpus written by a previous processing run.
pub async fn load_chunks(path: impl AsRef<Path>) -> Result<Vec<Chunk>, ScholarError> {
    let data = fs::read_to_string(path.as_ref()).await?;
    let chunks: Vec<Chunk> = serde_json::from_str(&data)?;
    Ok(chunks)
}

/// Writes the chunk corpus, creating parent directories as needed.
pub async fn write_chunks(path: impl AsRef<Path>, chunks: &[Chunk]) -> Result<(), ScholarError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let serialized = serde_json::to_string_pretty(chunks)?;
    fs::write(path, serialized).await?;
    Ok(())
}

/// Segments every paper in the corpus into chunks.
///
/// Missing or unreadable PDFs skip the paper and continue the batch; a
/// failed extraction is never fatal to the run.
pub fn process_papers(
    papers: &[Paper],
    extractor: &dyn PdfTextExtractor,
    limits: ChunkingLimits,
) -> (Vec<Chunk>, IngestReport) {
    let mut all_chunks = Vec::new();
    let mut report = IngestReport::default();

    for paper in papers {
        if !paper.pdf_path.exists() {
            warn!(paper = %paper.arxiv_id, path = %paper.pdf_path.display(), "pdf missing, skipping paper");
            report.papers_skipped += 1;
            continue;
        }

        let pages = match extractor.extract_pages(&paper.pdf_path) {
            Ok(pages) => pages,
            Err(err) => {
                warn!(paper = %paper.arxiv_id, error = %err, "extraction failed, skipping paper");
                report.papers_skipped += 1;
                continue;
            }
        };

        let raw_text = pages.join("\n");
        let chunks = segment_paper(&raw_text, paper, limits);
        report.papers_processed += 1;
        report.chunks_emitted += chunks.len();
        all_chunks.extend(chunks);
    }

    info!(
        processed = report.papers_processed,
        skipped = report.papers_skipped,
        chunks = report.chunks_emitted,
        "corpus processing complete"
    );
    (all_chunks, report)
}

/// Full processing pass: metadata in, chunk corpus out.
pub async fn process_corpus(
    metadata_path: impl AsRef<Path>,
    chunks_path: impl AsRef<Path>,
    extractor: &dyn PdfTextExtractor,
    limits: ChunkingLimits,
) -> Result<IngestReport, ScholarError> {
    let papers = load_papers(metadata_path).await?;
    let (chunks, report) = process_papers(&papers, extractor, limits);
    write_chunks(chunks_path, &chunks).await?;
    Ok(report)
}
