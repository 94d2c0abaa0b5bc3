use serde::Deserialize;
use std::time::{Duration, Instant};
use websift_core::{Error, Result, SearchProvider, SearchQuery, SearchResult};

use crate::{check_status, request_error, Settings};

const BACKEND: &str = "searxng";
const DEFAULT_TIMEOUT_MS: u64 = 20_000;

#[derive(Debug, Clone)]
pub struct SearxngSearchProvider {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl SearxngSearchProvider {
    pub fn from_settings(settings: &Settings, client: reqwest::Client) -> Result<Self> {
        let instance = settings.searxng_instance.as_deref().ok_or_else(|| {
            Error::NotConfigured(
                "missing WEBSIFT_SEARXNG_INSTANCE (or SEARXNG_INSTANCE)".to_string(),
            )
        })?;
        let endpoint = Self::endpoint_search_for(instance)?;
        Ok(Self {
            client,
            endpoint,
            timeout: settings.timeout_or(DEFAULT_TIMEOUT_MS),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn endpoint_search_for(instance: &str) -> Result<String> {
        // Accept either a base URL (…/), or a full /search endpoint. Any query string
        // on the instance URL is kept as-is.
        let mut u = url::Url::parse(instance.trim()).map_err(|e| {
            Error::NotConfigured(format!("SEARXNG_INSTANCE is not a valid url: {e}"))
        })?;
        let not_a_base =
            || Error::NotConfigured("SEARXNG_INSTANCE cannot be a base url".to_string());
        u.path_segments_mut().map_err(|_| not_a_base())?.pop_if_empty();
        let is_search = u.path_segments().and_then(|mut s| s.next_back()) == Some("search");
        if !is_search {
            u.path_segments_mut().map_err(|_| not_a_base())?.push("search");
        }
        Ok(u.into())
    }
}

#[derive(Debug, Deserialize)]
struct SearxngSearchResponse {
    results: Vec<SearxngResult>,
}

// Every field is required: a record without one is a backend contract violation.
#[derive(Debug, Deserialize)]
struct SearxngResult {
    url: String,
    title: String,
    // SearXNG uses `content` for snippets in JSON format.
    content: String,
    score: f64,
}

fn parse_results(body: &str, limit: usize) -> Result<Vec<SearchResult>> {
    let parsed: SearxngSearchResponse =
        serde_json::from_str(body).map_err(|e| Error::malformed(BACKEND, e))?;
    Ok(parsed
        .results
        .into_iter()
        .take(limit)
        .map(|r| SearchResult {
            url: r.url,
            title: r.title,
            content: r.content,
            score: r.score,
            relevance_score: None,
        })
        .collect())
}

#[async_trait::async_trait]
impl SearchProvider for SearxngSearchProvider {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn search(&self, q: &SearchQuery) -> Result<Vec<SearchResult>> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", q.text.as_str()),
                ("language", q.language.as_str()),
                ("format", "json"),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error(BACKEND, e))?;
        let resp = check_status(BACKEND, resp).await?;
        let body = resp.text().await.map_err(|e| request_error(BACKEND, e))?;

        let out = parse_results(&body, q.limit)?;
        tracing::debug!(
            results = out.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "searxng search"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Json, Router};
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use websift_core::BackendErrorKind;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn provider(instance: &str) -> SearxngSearchProvider {
        let settings = Settings {
            searxng_instance: Some(instance.to_string()),
            ..Settings::default()
        };
        SearxngSearchProvider::from_settings(&settings, reqwest::Client::new()).unwrap()
    }

    fn query(text: &str, limit: usize) -> SearchQuery {
        SearchQuery {
            text: text.to_string(),
            language: "cs".to_string(),
            limit,
        }
    }

    #[test]
    fn missing_instance_is_a_configuration_error() {
        let err =
            SearxngSearchProvider::from_settings(&Settings::default(), reqwest::Client::new())
                .unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));

        let bad = Settings {
            searxng_instance: Some("not a url".to_string()),
            ..Settings::default()
        };
        assert!(matches!(
            SearxngSearchProvider::from_settings(&bad, reqwest::Client::new()),
            Err(Error::NotConfigured(_))
        ));
    }

    #[test]
    fn endpoint_accepts_base_or_search_url() {
        assert_eq!(provider("http://searx.local").endpoint(), "http://searx.local/search");
        assert_eq!(provider("http://searx.local/").endpoint(), "http://searx.local/search");
        assert_eq!(
            provider("http://searx.local/search").endpoint(),
            "http://searx.local/search"
        );
        assert_eq!(
            provider("http://searx.local/search/").endpoint(),
            "http://searx.local/search"
        );
        assert_eq!(
            provider("http://searx.local/proxy/").endpoint(),
            "http://searx.local/proxy/search"
        );
    }

    #[test]
    fn endpoint_keeps_instance_query_string() {
        assert_eq!(
            provider("http://searx.local/search?safesearch=1").endpoint(),
            "http://searx.local/search?safesearch=1"
        );
        assert_eq!(
            provider("http://searx.local?safesearch=1").endpoint(),
            "http://searx.local/search?safesearch=1"
        );
    }

    #[tokio::test]
    async fn instance_query_string_is_sent_with_search_params() {
        let seen: Arc<Mutex<Vec<HashMap<String, String>>>> = Arc::default();
        let seen2 = seen.clone();
        let app = Router::new().route(
            "/search",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let seen = seen2.clone();
                async move {
                    seen.lock().unwrap().push(q);
                    Json(serde_json::json!({"results": []}))
                }
            }),
        );
        let addr = serve(app).await;

        provider(&format!("http://{addr}/search?safesearch=1"))
            .search(&query("x", 10))
            .await
            .unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].get("safesearch").map(String::as_str), Some("1"));
        assert_eq!(seen[0].get("format").map(String::as_str), Some("json"));
    }

    #[test]
    fn parses_searxng_shape_and_truncates() {
        let js = r#"
        {
          "query": "hello",
          "results": [
            {"url":"https://a.example","title":"A","content":"alpha","score":2.5,"engine":"ddg"},
            {"url":"https://b.example","title":"B","content":"beta","score":1.0},
            {"url":"https://c.example","title":"C","content":"gamma","score":0.5}
          ]
        }
        "#;
        let rs = parse_results(js, 2).unwrap();
        assert_eq!(rs.len(), 2);
        assert_eq!(rs[0].url, "https://a.example");
        assert_eq!(rs[0].content, "alpha");
        assert_eq!(rs[0].score, 2.5);
        assert!(rs[0].relevance_score.is_none());
    }

    #[test]
    fn missing_field_is_a_shape_error() {
        let js = r#"{"results":[{"url":"https://a.example","title":"A","content":"alpha"}]}"#;
        let err = parse_results(js, 10).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { backend: "searxng", .. }));
    }

    #[tokio::test]
    async fn sends_query_language_and_json_format() {
        let seen: Arc<Mutex<Vec<HashMap<String, String>>>> = Arc::default();
        let seen2 = seen.clone();
        let app = Router::new().route(
            "/search",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let seen = seen2.clone();
                async move {
                    seen.lock().unwrap().push(q);
                    Json(serde_json::json!({
                        "results": [
                            {"url": "https://example.com/a", "title": "A", "content": "alpha", "score": 1.0}
                        ]
                    }))
                }
            }),
        );
        let addr = serve(app).await;

        let rs = provider(&format!("http://{addr}"))
            .search(&query("hello world", 10))
            .await
            .unwrap();
        assert_eq!(rs.len(), 1);
        assert_eq!(rs[0].title, "A");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].get("q").map(String::as_str), Some("hello world"));
        assert_eq!(seen[0].get("language").map(String::as_str), Some("cs"));
        assert_eq!(seen[0].get("format").map(String::as_str), Some("json"));
    }

    #[tokio::test]
    async fn http_error_is_tagged() {
        let app = Router::new().route(
            "/search",
            get(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream engines down") }),
        );
        let addr = serve(app).await;
        let err = provider(&format!("http://{addr}/search"))
            .search(&query("x", 10))
            .await
            .unwrap_err();
        assert_eq!(err.backend_kind(), Some(BackendErrorKind::Http(502)));
    }
}
