//! Retrieval and answer-quality evaluation over labelled questions.

use serde::{Deserialize, Serialize};

use crate::retrieval::Retriever;
use crate::types::ScholarError;

/// A test question with ground-truth paper ids and expected concepts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LabeledQuestion {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub relevant_papers: Vec<String>,
    #[serde(default)]
    pub expected_concepts: Vec<String>,
}

/// Rank-based metrics for a single query at a fixed `k`.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrievalMetrics {
    pub recall: f64,
    pub precision: f64,
    /// Reciprocal rank of the first relevant paper, 0 when none appears.
    pub mrr: f64,
    pub retrieved_papers: Vec<String>,
}

/// Scores a ranked list of retrieved paper ids against the ground truth.
pub fn score_retrieval(
    retrieved_papers: Vec<String>,
    relevant_papers: &[String],
    k: usize,
) -> RetrievalMetrics {
    let unique: std::collections::HashSet<&String> = retrieved_papers.iter().collect();
    let relevant_retrieved = unique
        .into_iter()
        .filter(|paper| relevant_papers.contains(*paper))
        .count();

    let recall = if relevant_papers.is_empty() {
        0.0
    } else {
        relevant_retrieved as f64 / relevant_papers.len() as f64
    };
    let precision = if k == 0 {
        0.0
    } else {
        relevant_retrieved as f64 / k as f64
    };

    let mrr = retrieved_papers
        .iter()
        .position(|paper| relevant_papers.contains(paper))
        .map(|rank| 1.0 / (rank + 1) as f64)
        .unwrap_or(0.0);

    RetrievalMetrics {
        recall,
        precision,
        mrr,
        retrieved_papers,
    }
}

/// Averaged metrics across every question with ground truth.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricsSummary {
    pub avg_recall: f64,
    pub avg_precision: f64,
    pub avg_mrr: f64,
    pub num_queries: usize,
}

/// Runs retrieval for each labelled question and averages the metrics.
///
/// Questions without ground-truth papers are skipped.
pub async fn evaluate_retrieval(
    retriever: &Retriever,
    questions: &[LabeledQuestion],
    k: usize,
) -> Result<MetricsSummary, ScholarError> {
    let mut totals = MetricsSummary::default();

    for question in questions {
        if question.relevant_papers.is_empty() {
            continue;
        }
        let retrieved = retriever.retrieve(&question.question, k).await?;
        let paper_ids = retrieved
            .into_iter()
            .map(|chunk| chunk.metadata.paper_id)
            .collect();
        let metrics = score_retrieval(paper_ids, &question.relevant_papers, k);

        totals.avg_recall += metrics.recall;
        totals.avg_precision += metrics.precision;
        totals.avg_mrr += metrics.mrr;
        totals.num_queries += 1;
    }

    if totals.num_queries > 0 {
        let n = totals.num_queries as f64;
        totals.avg_recall /= n;
        totals.avg_precision /= n;
        totals.avg_mrr /= n;
    }
    Ok(totals)
}

/// Heuristic checklist for one generated answer.
#[derive(Clone, Debug)]
pub struct AnswerReview {
    pub concept_coverage: f64,
    pub concepts_found: Vec<String>,
    pub concepts_missing: Vec<String>,
    pub has_citations: bool,
    pub word_count: usize,
    pub is_substantial: bool,
}

/// Checks concept coverage, citation markers, and answer length.
pub fn review_answer(answer: &str, expected_concepts: &[String]) -> AnswerReview {
    let answer_lower = answer.to_lowercase();

    let (concepts_found, concepts_missing): (Vec<String>, Vec<String>) = expected_concepts
        .iter()
        .cloned()
        .partition(|concept| answer_lower.contains(&concept.to_lowercase()));

    let concept_coverage = if expected_concepts.is_empty() {
        0.0
    } else {
        concepts_found.len() as f64 / expected_concepts.len() as f64
    };

    let word_count = answer.split_whitespace().count();

    AnswerReview {
        concept_coverage,
        concepts_found,
        concepts_missing,
        has_citations: answer.contains("[1]") || answer.contains("[2]"),
        word_count,
        is_substantial: word_count > 100,
    }
}
