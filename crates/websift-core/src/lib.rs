use serde::{Deserialize, Serialize};
use std::fmt;

pub mod format;
pub mod pipeline;
pub mod rerank;
pub mod summarize;

pub use format::format_results;
pub use pipeline::{WebSearch, NO_EXTRACTION_MESSAGE};
pub use rerank::Reranker;
pub use summarize::Summarizer;

/// What went wrong on a single backend request.
///
/// Distinct from [`Error::NotConfigured`]: these are per-request and recoverable
/// at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    InvalidKey,
    QuotaExceeded,
    Network,
    Timeout,
    Http(u16),
}

impl BackendErrorKind {
    /// Map an HTTP status to the closest kind. Credential and quota statuses get their
    /// own kinds so callers never have to parse messages.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::InvalidKey,
            429 | 432 | 433 => Self::QuotaExceeded,
            other => Self::Http(other),
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey => f.write_str("invalid api key"),
            Self::QuotaExceeded => f.write_str("usage limit exceeded"),
            Self::Network => f.write_str("network error"),
            Self::Timeout => f.write_str("timed out"),
            Self::Http(status) => write!(f, "HTTP {status}"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("{backend} request failed ({kind}): {message}")]
    Backend {
        backend: &'static str,
        kind: BackendErrorKind,
        message: String,
    },
    #[error("{backend} returned a malformed response: {message}")]
    MalformedResponse {
        backend: &'static str,
        message: String,
    },
    #[error("unsupported model family for model id {0:?}")]
    UnsupportedModelFamily(String),
}

impl Error {
    pub fn backend(backend: &'static str, kind: BackendErrorKind, message: impl ToString) -> Self {
        Self::Backend {
            backend,
            kind,
            message: message.to_string(),
        }
    }

    pub fn malformed(backend: &'static str, message: impl ToString) -> Self {
        Self::MalformedResponse {
            backend,
            message: message.to_string(),
        }
    }

    /// Kind of a per-request backend failure, if this is one.
    pub fn backend_kind(&self) -> Option<BackendErrorKind> {
        match self {
            Self::Backend { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    /// Passed through verbatim; the backend decides whether it is valid.
    pub language: String,
    pub limit: usize,
}

/// One search hit as returned by a search backend.
///
/// `relevance_score` is only set once the result has been through a [`Reranker`];
/// a result with `Some(relevance_score)` is what the pipeline calls a reranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    /// Snippet text.
    pub content: String,
    /// Engine-provided relevance.
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

/// Outcome of extracting one URL. `content` is present iff `success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    success: bool,
    content: Option<String>,
}

impl Extraction {
    pub fn found(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: Some(content.into()),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            content: None,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn into_content(self) -> Option<String> {
        self.content
    }
}

/// Sampling knobs for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 8000,
            temperature: 0.5,
        }
    }
}

/// One entry of a rerank response. `index` points into the submitted document list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankScore {
    pub index: usize,
    pub relevance_score: f64,
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, q: &SearchQuery) -> Result<Vec<SearchResult>>;
}

#[async_trait::async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// `Ok(Extraction::failed())` means the backend answered but could not read the page.
    async fn extract(&self, url: &str) -> Result<Extraction>;
}

#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, model_id: &str, prompt: &str, params: GenerationParams)
        -> Result<String>;
}

#[async_trait::async_trait]
pub trait RerankBackend: Send + Sync {
    async fn rerank(
        &self,
        model_id: &str,
        query: &str,
        documents: &[String],
    ) -> Result<Vec<RerankScore>>;
}
