//! Relevance reranking of search results on top of a [`RerankBackend`].

use crate::{Error, RerankBackend, RerankScore, Result, SearchResult};
use std::sync::Arc;

pub const DEFAULT_RERANK_MODEL_ID: &str = "cohere.rerank-v3-5:0";

/// Score assigned to every result when the rerank backend is unavailable.
pub const FALLBACK_RELEVANCE: f64 = 1.0;

pub fn document_for(result: &SearchResult) -> String {
    format!("Title: {}\nContent: {}", result.title, result.content)
}

fn sort_by_relevance_desc(results: &mut [SearchResult]) {
    // Stable: equal scores keep their incoming order.
    results.sort_by(|a, b| {
        let a = a.relevance_score.unwrap_or(FALLBACK_RELEVANCE);
        let b = b.relevance_score.unwrap_or(FALLBACK_RELEVANCE);
        b.total_cmp(&a)
    });
}

/// Every index must point into the submitted documents.
fn check_indices(scores: Vec<RerankScore>, submitted: usize) -> Result<Vec<RerankScore>> {
    match scores.iter().find(|s| s.index >= submitted) {
        Some(bad) => Err(Error::malformed(
            "rerank",
            format!("index {} is out of range for {submitted} documents", bad.index),
        )),
        None => Ok(scores),
    }
}

#[derive(Clone)]
pub struct Reranker {
    backend: Arc<dyn RerankBackend>,
    model_id: String,
}

impl Reranker {
    pub fn new(backend: Arc<dyn RerankBackend>, model_id: impl Into<String>) -> Self {
        Self {
            backend,
            model_id: model_id.into(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Reorder `results` by relevance to `query`, highest first.
    ///
    /// Every returned result has `relevance_score` set. The backend may score fewer
    /// documents than were submitted; unscored results are dropped and repeated
    /// indices count once. If the backend fails, or answers with an index outside the
    /// submitted documents, all results are kept and scored [`FALLBACK_RELEVANCE`]
    /// unless they already carry a score.
    pub async fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Vec<SearchResult> {
        if results.is_empty() {
            return Vec::new();
        }

        let documents: Vec<String> = results.iter().map(document_for).collect();

        let scored = self
            .backend
            .rerank(&self.model_id, query, &documents)
            .await
            .and_then(|scores| check_indices(scores, results.len()));
        match scored {
            Ok(scores) => {
                let mut out = Vec::with_capacity(scores.len());
                let mut seen = vec![false; results.len()];
                for s in scores {
                    if std::mem::replace(&mut seen[s.index], true) {
                        continue;
                    }
                    let mut r = results[s.index].clone();
                    r.relevance_score = Some(s.relevance_score);
                    out.push(r);
                }
                sort_by_relevance_desc(&mut out);
                out
            }
            Err(e) => {
                tracing::warn!(model_id = %self.model_id, error = %e, "rerank failed; keeping original order");
                let mut out = results;
                for r in &mut out {
                    r.relevance_score = Some(r.relevance_score.unwrap_or(FALLBACK_RELEVANCE));
                }
                sort_by_relevance_desc(&mut out);
                out
            }
        }
    }
}
