use serde::Deserialize;
use std::time::{Duration, Instant};
use websift_core::{
    Error, Extraction, ExtractionBackend, Result, SearchProvider, SearchQuery, SearchResult,
};

use crate::{check_status, request_error, Settings};

const BACKEND: &str = "tavily";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Tavily client: page extraction, and search when selected as the search backend.
#[derive(Debug, Clone)]
pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl TavilyClient {
    pub fn from_settings(settings: &Settings, client: reqwest::Client) -> Result<Self> {
        let api_key = settings.tavily_api_key.clone().ok_or_else(|| {
            Error::NotConfigured("missing WEBSIFT_TAVILY_API_KEY (or TAVILY_API_KEY)".to_string())
        })?;
        Ok(Self {
            client,
            api_key,
            endpoint: settings.tavily_endpoint.trim_end_matches('/').to_string(),
            timeout: settings.timeout_or(DEFAULT_TIMEOUT_MS),
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let resp = self
            .client
            .post(format!("{}/{path}", self.endpoint))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error(BACKEND, e))?;
        let resp = check_status(BACKEND, resp).await?;
        let text = resp.text().await.map_err(|e| request_error(BACKEND, e))?;
        serde_json::from_str(&text).map_err(|e| Error::malformed(BACKEND, e))
    }
}

#[derive(Debug, Deserialize)]
struct TavilyExtractResponse {
    #[serde(default)]
    results: Vec<TavilyExtracted>,
    #[serde(default)]
    failed_results: Vec<TavilyFailed>,
}

#[derive(Debug, Deserialize)]
struct TavilyExtracted {
    raw_content: String,
}

#[derive(Debug, Deserialize)]
struct TavilyFailed {
    url: Option<String>,
    error: Option<String>,
}

fn extraction_from(resp: TavilyExtractResponse) -> Extraction {
    for f in &resp.failed_results {
        tracing::info!(
            url = f.url.as_deref().unwrap_or(""),
            error = f.error.as_deref().unwrap_or(""),
            "tavily could not extract url"
        );
    }
    // One URL in, exactly one result expected.
    let mut results = resp.results;
    if results.len() == 1 {
        if let Some(r) = results.pop() {
            return Extraction::found(r.raw_content);
        }
    }
    Extraction::failed()
}

#[async_trait::async_trait]
impl ExtractionBackend for TavilyClient {
    async fn extract(&self, url: &str) -> Result<Extraction> {
        let t0 = Instant::now();
        let body = serde_json::json!({
            "urls": [url],
            "extract_depth": "advanced",
            "include_images": false,
        });
        let parsed: TavilyExtractResponse = self.post("extract", &body).await?;
        let out = extraction_from(parsed);
        tracing::debug!(
            url,
            success = out.success(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "tavily extract"
        );
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    title: String,
    content: String,
    score: f64,
}

#[async_trait::async_trait]
impl SearchProvider for TavilyClient {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn search(&self, q: &SearchQuery) -> Result<Vec<SearchResult>> {
        // Tavily has no language knob; the query text carries it.
        let body = serde_json::json!({
            "query": q.text,
            "max_results": q.limit,
            "include_answer": false,
            "include_raw_content": false,
        });
        let parsed: TavilySearchResponse = self.post("search", &body).await?;
        Ok(parsed
            .results
            .into_iter()
            .take(q.limit)
            .map(|r| SearchResult {
                url: r.url,
                title: r.title,
                content: r.content,
                score: r.score,
                relevance_score: None,
            })
            .collect())
    }
}
