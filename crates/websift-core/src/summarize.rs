//! Query-focused extractive summarization on top of a [`GenerationBackend`].

use crate::{GenerationBackend, GenerationParams};
use std::sync::Arc;

pub const DEFAULT_SUMMARIZER_MODEL_ID: &str = "anthropic.claude-3-5-haiku-20241022-v1:0";

const EXTRACTION_INSTRUCTIONS: &str = "You are a content extraction assistant. Your task is to analyze webpage content and return only the portions that are directly relevant to a given query. \
INSTRUCTIONS: \
1. You will receive extracted webpage content and a specific query. \
2. Identify all sections, paragraphs, or passages that contain information relevant to the query. \
3. Return the relevant content EXACTLY as it appears in the original text - do not summarize, paraphrase, or modify the wording in any way. \
4. Include complete sentences and paragraphs to maintain context. \
5. If multiple sections are relevant, return all of them. \
6. If very little content is relevant, return only the small relevant portion. \
7. If substantial content is relevant, return the larger relevant portions. \
8. Do not add your own commentary, explanations, or any introductory text. ";

/// Build the full prompt sent to the generation backend.
pub fn build_prompt(text: &str, query: &str) -> String {
    format!("{EXTRACTION_INSTRUCTIONS}Query: {query}, Content: {text}.")
}

#[derive(Clone)]
pub struct Summarizer {
    backend: Arc<dyn GenerationBackend>,
    model_id: String,
    params: GenerationParams,
}

impl Summarizer {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        model_id: impl Into<String>,
        params: GenerationParams,
    ) -> Self {
        Self {
            backend,
            model_id: model_id.into(),
            params,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Return the spans of `text` relevant to `query`.
    ///
    /// Never fails: if the backend errors, `text` comes back unchanged.
    pub async fn summarize(&self, text: &str, query: &str) -> String {
        let prompt = build_prompt(text, query);
        match self
            .backend
            .generate(&self.model_id, &prompt, self.params)
            .await
        {
            Ok(summary) => {
                tracing::debug!(
                    model_id = %self.model_id,
                    input_chars = text.len(),
                    output_chars = summary.len(),
                    "summarized content"
                );
                summary
            }
            Err(e) => {
                tracing::warn!(model_id = %self.model_id, error = %e, "summarization failed; returning original text");
                text.to_string()
            }
        }
    }
}
