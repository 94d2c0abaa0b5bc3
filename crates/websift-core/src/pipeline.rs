//! The two tool flows: simple search and query-focused URL extraction.

use crate::{
    format_results, ExtractionBackend, Reranker, Result, SearchProvider, SearchQuery, Summarizer,
};
use std::sync::Arc;
use std::time::Instant;

pub const NO_EXTRACTION_MESSAGE: &str = "No data can be extracted from provided URL.";

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Request-independent service object: construct once, share behind an `Arc`.
///
/// Holds no per-request state, so concurrent tool calls can use it freely.
#[derive(Clone)]
pub struct WebSearch {
    searcher: Arc<dyn SearchProvider>,
    extractor: Arc<dyn ExtractionBackend>,
    summarizer: Summarizer,
    reranker: Option<Reranker>,
    limit: usize,
}

impl WebSearch {
    pub fn new(
        searcher: Arc<dyn SearchProvider>,
        extractor: Arc<dyn ExtractionBackend>,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            searcher,
            extractor,
            summarizer,
            reranker: None,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    /// Rerank simple-search results before formatting.
    pub fn with_reranker(mut self, reranker: Reranker) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn search_provider(&self) -> &'static str {
        self.searcher.name()
    }

    pub fn reranks_search(&self) -> bool {
        self.reranker.is_some()
    }

    /// Search and render the results as text.
    ///
    /// Backend failures are returned as errors rather than an empty result block.
    pub async fn perform_simple_search(&self, query: &str, lang: &str) -> Result<String> {
        let t0 = Instant::now();
        tracing::info!(query, lang, provider = self.searcher.name(), "search started");

        let q = SearchQuery {
            text: query.to_string(),
            language: lang.to_string(),
            limit: self.limit,
        };
        let mut results = match self.searcher.search(&q).await {
            Ok(rs) => rs,
            Err(e) => {
                tracing::error!(query, error = %e, "search failed");
                return Err(e);
            }
        };
        results.truncate(self.limit);

        if let Some(reranker) = &self.reranker {
            results = reranker.rerank(query, results).await;
        }

        tracing::info!(
            query,
            results = results.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "search finished"
        );
        Ok(format_results(&results))
    }

    /// Extract `url` and return only the content relevant to `query`.
    ///
    /// Always yields text: [`NO_EXTRACTION_MESSAGE`] when the page cannot be read.
    pub async fn extract_url(&self, url: &str, query: &str) -> String {
        let t0 = Instant::now();
        tracing::info!(url, "extraction started");

        let extraction = match self.extractor.extract(url).await {
            Ok(x) => x,
            Err(e) => {
                tracing::warn!(url, error = %e, "extraction backend failed");
                return NO_EXTRACTION_MESSAGE.to_string();
            }
        };

        let Some(content) = extraction.into_content() else {
            tracing::info!(url, "no content extracted");
            return NO_EXTRACTION_MESSAGE.to_string();
        };

        let out = self.summarizer.summarize(&content, query).await;
        tracing::info!(
            url,
            chars = out.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "extraction finished"
        );
        out
    }
}
