use std::sync::Arc;
use websift_core::{
    BackendErrorKind, Error, ExtractionBackend, Reranker, Result, SearchProvider, Summarizer,
    WebSearch,
};

pub mod bedrock;
pub mod config;
pub mod searxng;
pub mod tavily;

pub use bedrock::BedrockClient;
pub use config::{SearchBackendKind, Settings};
pub use searxng::SearxngSearchProvider;
pub use tavily::TavilyClient;

/// Shared HTTP client: one connection pool for every backend.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("websift/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::NotConfigured(format!("http client: {e}")))
}

pub(crate) fn request_error(backend: &'static str, e: reqwest::Error) -> Error {
    let kind = if e.is_timeout() {
        BackendErrorKind::Timeout
    } else if let Some(status) = e.status() {
        BackendErrorKind::from_status(status.as_u16())
    } else {
        BackendErrorKind::Network
    };
    Error::backend(backend, kind, e)
}

/// Turn a non-2xx response into a tagged backend error, keeping a short body excerpt.
pub(crate) async fn check_status(
    backend: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(200).collect();
    Err(Error::backend(
        backend,
        BackendErrorKind::from_status(status.as_u16()),
        format!("{backend} HTTP {status}: {excerpt}"),
    ))
}

/// Build the search backend selected by `settings.search_provider`.
pub fn search_provider(
    settings: &Settings,
    client: reqwest::Client,
) -> Result<Arc<dyn SearchProvider>> {
    Ok(match settings.search_provider {
        SearchBackendKind::Searxng => {
            Arc::new(SearxngSearchProvider::from_settings(settings, client)?)
        }
        SearchBackendKind::Tavily => Arc::new(TavilyClient::from_settings(settings, client)?),
    })
}

/// Wire the full pipeline from settings. Any missing configuration fails here, at startup.
pub fn web_search_from_settings(settings: &Settings) -> Result<WebSearch> {
    bedrock::ModelFamily::from_model_id(&settings.summarizer_model_id)?;

    let client = http_client()?;

    let searcher = search_provider(settings, client.clone())?;
    let extractor: Arc<dyn ExtractionBackend> =
        Arc::new(TavilyClient::from_settings(settings, client.clone())?);
    let bedrock = Arc::new(BedrockClient::from_settings(settings, client)?);

    let summarizer = Summarizer::new(
        bedrock.clone(),
        settings.summarizer_model_id.clone(),
        settings.generation,
    );

    let mut svc =
        WebSearch::new(searcher, extractor, summarizer).with_limit(settings.search_limit);
    if settings.rerank_search {
        svc = svc.with_reranker(Reranker::new(bedrock, settings.rerank_model_id.clone()));
    }
    Ok(svc)
}
