//! Environment-driven settings.
//!
//! Every `WEBSIFT_*` variable falls back to the conventional provider name
//! (`TAVILY_API_KEY`, `AWS_REGION`, ...). Empty values count as unset.

use std::str::FromStr;
use std::time::Duration;
use websift_core::pipeline::DEFAULT_SEARCH_LIMIT;
use websift_core::rerank::DEFAULT_RERANK_MODEL_ID;
use websift_core::summarize::DEFAULT_SUMMARIZER_MODEL_ID;
use websift_core::{Error, GenerationParams, Result};

pub(crate) fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_any(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| env(k))
}

fn env_flag(key: &str) -> bool {
    matches!(
        env(key).unwrap_or_default().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env(key) {
        None => Ok(None),
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::NotConfigured(format!("{key} has an invalid value: {v:?}"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackendKind {
    Searxng,
    Tavily,
}

impl FromStr for SearchBackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "searxng" => Ok(Self::Searxng),
            "tavily" => Ok(Self::Tavily),
            other => Err(Error::NotConfigured(format!(
                "WEBSIFT_SEARCH_PROVIDER must be searxng or tavily (got {other:?})"
            ))),
        }
    }
}

/// Everything the backends and pipeline read from the environment, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub search_provider: SearchBackendKind,
    pub searxng_instance: Option<String>,
    pub tavily_api_key: Option<String>,
    pub tavily_endpoint: String,
    pub aws_region: Option<String>,
    pub bedrock_api_key: Option<String>,
    /// IAM access keys; used for SigV4 when no Bedrock API key is set.
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub bedrock_endpoint: Option<String>,
    pub summarizer_model_id: String,
    pub rerank_model_id: String,
    pub rerank_search: bool,
    pub search_limit: usize,
    pub generation: GenerationParams,
    /// Overrides every backend's default request timeout when set.
    pub timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_provider: SearchBackendKind::Searxng,
            searxng_instance: None,
            tavily_api_key: None,
            tavily_endpoint: "https://api.tavily.com".to_string(),
            aws_region: None,
            bedrock_api_key: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_session_token: None,
            bedrock_endpoint: None,
            summarizer_model_id: DEFAULT_SUMMARIZER_MODEL_ID.to_string(),
            rerank_model_id: DEFAULT_RERANK_MODEL_ID.to_string(),
            rerank_search: false,
            search_limit: DEFAULT_SEARCH_LIMIT,
            generation: GenerationParams::default(),
            timeout: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();

        let search_provider = match env("WEBSIFT_SEARCH_PROVIDER") {
            Some(v) => v.parse()?,
            None => d.search_provider,
        };

        let search_limit = env_parse::<usize>("WEBSIFT_SEARCH_LIMIT")?.unwrap_or(d.search_limit);
        if search_limit == 0 {
            return Err(Error::NotConfigured(
                "WEBSIFT_SEARCH_LIMIT must be at least 1".to_string(),
            ));
        }

        let generation = GenerationParams {
            max_tokens: env_parse("WEBSIFT_SUMMARIZER_MAX_TOKENS")?
                .unwrap_or(d.generation.max_tokens),
            temperature: env_parse("WEBSIFT_SUMMARIZER_TEMPERATURE")?
                .unwrap_or(d.generation.temperature),
        };

        Ok(Self {
            search_provider,
            searxng_instance: env_any(&["WEBSIFT_SEARXNG_INSTANCE", "SEARXNG_INSTANCE"]),
            tavily_api_key: env_any(&["WEBSIFT_TAVILY_API_KEY", "TAVILY_API_KEY"]),
            tavily_endpoint: env("WEBSIFT_TAVILY_ENDPOINT").unwrap_or(d.tavily_endpoint),
            aws_region: env_any(&["WEBSIFT_AWS_REGION", "AWS_REGION"]),
            bedrock_api_key: env_any(&["WEBSIFT_BEDROCK_API_KEY", "AWS_BEARER_TOKEN_BEDROCK"]),
            aws_access_key_id: env_any(&["WEBSIFT_AWS_ACCESS_KEY_ID", "AWS_ACCESS_KEY_ID"]),
            aws_secret_access_key: env_any(&[
                "WEBSIFT_AWS_SECRET_ACCESS_KEY",
                "AWS_SECRET_ACCESS_KEY",
            ]),
            aws_session_token: env_any(&["WEBSIFT_AWS_SESSION_TOKEN", "AWS_SESSION_TOKEN"]),
            bedrock_endpoint: env("WEBSIFT_BEDROCK_ENDPOINT"),
            summarizer_model_id: env_any(&["WEBSIFT_SUMMARIZER_MODEL_ID", "SUMMARIZER_MODEL_ID"])
                .unwrap_or(d.summarizer_model_id),
            rerank_model_id: env_any(&["WEBSIFT_RERANK_MODEL_ID", "RERANK_MODEL_ID"])
                .unwrap_or(d.rerank_model_id),
            rerank_search: env_flag("WEBSIFT_RERANK_SEARCH"),
            search_limit,
            generation,
            timeout: env_parse::<u64>("WEBSIFT_TIMEOUT_MS")?.map(Duration::from_millis),
        })
    }

    pub(crate) fn timeout_or(&self, default_ms: u64) -> Duration {
        self.timeout
            .unwrap_or_else(|| Duration::from_millis(default_ms))
    }
}

/// Load `KEY=VALUE` lines from `WEBSIFT_ENV_FILE` without overriding the process env.
///
/// Returns the number of variables set. Missing or unreadable files are ignored.
pub fn load_env_file_from_env() -> usize {
    let Some(path) = env("WEBSIFT_ENV_FILE") else {
        return 0;
    };
    let Ok(txt) = std::fs::read_to_string(&path) else {
        return 0;
    };
    let mut n = 0;
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        let v = v.trim().trim_matches('"');
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
            n += 1;
        }
    }
    n
}
