//! Amazon Bedrock runtime `InvokeModel` client.
//!
//! One client serves both text generation and reranking; the model id picks the
//! request/response shape. Requests authenticate with a Bedrock API key (bearer token)
//! when one is configured, otherwise they are SigV4-signed with IAM access keys.

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant, SystemTime};
use websift_core::{
    Error, GenerationBackend, GenerationParams, RerankBackend, RerankScore, Result,
};

use crate::{check_status, request_error, Settings};

const BACKEND: &str = "bedrock";
const GENERATE_TIMEOUT_MS: u64 = 30_000;
const RERANK_TIMEOUT_MS: u64 = 20_000;
const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
/// SigV4 signing name of the runtime endpoint.
const SIGNING_NAME: &str = "bedrock";

/// Cross-region inference profile prefixes, e.g. `us.anthropic.claude-…`.
const REGION_PREFIXES: &[&str] = &["us", "us-gov", "eu", "apac", "jp", "au", "ca", "global"];

/// Provider family of a Bedrock model. Each family has its own request body
/// and its own location of the generated text in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Anthropic,
    Amazon,
    Meta,
}

impl ModelFamily {
    pub fn from_model_id(model_id: &str) -> Result<Self> {
        let mut parts = model_id.trim().split('.');
        let mut provider = parts.next().unwrap_or_default();
        if REGION_PREFIXES.contains(&provider) {
            provider = parts.next().unwrap_or_default();
        }
        match provider {
            "anthropic" => Ok(Self::Anthropic),
            "amazon" => Ok(Self::Amazon),
            "meta" => Ok(Self::Meta),
            _ => Err(Error::UnsupportedModelFamily(model_id.to_string())),
        }
    }

    pub fn request_body(self, prompt: &str, params: GenerationParams) -> Value {
        match self {
            Self::Anthropic => serde_json::json!({
                "anthropic_version": ANTHROPIC_VERSION,
                "max_tokens": params.max_tokens,
                "temperature": params.temperature,
                "messages": [
                    {"role": "user", "content": [{"type": "text", "text": prompt}]}
                ]
            }),
            Self::Amazon => serde_json::json!({
                "inferenceConfig": {
                    "maxTokens": params.max_tokens,
                    "temperature": params.temperature
                },
                "messages": [
                    {"role": "user", "content": [{"text": prompt}]}
                ]
            }),
            Self::Meta => serde_json::json!({
                "prompt": prompt,
                "max_gen_len": params.max_tokens,
                "temperature": params.temperature
            }),
        }
    }

    /// JSON pointer to the generated text.
    pub fn output_pointer(self) -> &'static str {
        match self {
            Self::Anthropic => "/content/0/text",
            Self::Amazon => "/output/message/content/0/text",
            Self::Meta => "/generation",
        }
    }

    pub fn parse_output(self, body: &Value) -> Result<String> {
        body.pointer(self.output_pointer())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::malformed(
                    BACKEND,
                    format!("{self:?} response has no text at {}", self.output_pointer()),
                )
            })
    }
}

#[derive(Clone)]
enum Auth {
    Bearer(String),
    SigV4 {
        region: String,
        credentials: Credentials,
    },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(..)"),
            Self::SigV4 { region, .. } => f
                .debug_struct("SigV4")
                .field("region", region)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BedrockClient {
    client: reqwest::Client,
    endpoint: url::Url,
    auth: Auth,
    generate_timeout: Duration,
    rerank_timeout: Duration,
}

impl BedrockClient {
    pub fn from_settings(settings: &Settings, client: reqwest::Client) -> Result<Self> {
        let region = settings.aws_region.as_deref().ok_or_else(|| {
            Error::NotConfigured("missing WEBSIFT_AWS_REGION (or AWS_REGION)".to_string())
        })?;
        let auth = match (
            &settings.bedrock_api_key,
            &settings.aws_access_key_id,
            &settings.aws_secret_access_key,
        ) {
            (Some(token), _, _) => Auth::Bearer(token.clone()),
            (None, Some(key_id), Some(secret)) => Auth::SigV4 {
                region: region.to_string(),
                credentials: Credentials::new(
                    key_id,
                    secret,
                    settings.aws_session_token.clone(),
                    None,
                    "websift-env",
                ),
            },
            _ => {
                return Err(Error::NotConfigured(
                    "missing Bedrock credentials: set WEBSIFT_BEDROCK_API_KEY (or AWS_BEARER_TOKEN_BEDROCK), \
                     or AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY"
                        .to_string(),
                ))
            }
        };
        let raw = settings
            .bedrock_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{region}.amazonaws.com"));
        let endpoint = url::Url::parse(&raw).map_err(|e| {
            Error::NotConfigured(format!("WEBSIFT_BEDROCK_ENDPOINT is not a valid url: {e}"))
        })?;
        Ok(Self {
            client,
            endpoint,
            auth,
            generate_timeout: settings.timeout_or(GENERATE_TIMEOUT_MS),
            rerank_timeout: settings.timeout_or(RERANK_TIMEOUT_MS),
        })
    }

    /// `"bearer"` or `"sigv4"`.
    pub fn auth_mode(&self) -> &'static str {
        match self.auth {
            Auth::Bearer(_) => "bearer",
            Auth::SigV4 { .. } => "sigv4",
        }
    }

    fn invoke_url(&self, model_id: &str) -> Result<url::Url> {
        let mut u = self.endpoint.clone();
        u.path_segments_mut()
            .map_err(|_| Error::NotConfigured("bedrock endpoint cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["model", model_id, "invoke"]);
        Ok(u)
    }

    /// POST a body to `InvokeModel` and return the decoded JSON response.
    pub async fn invoke(&self, model_id: &str, body: &Value, timeout: Duration) -> Result<Value> {
        let t0 = Instant::now();
        let url = self.invoke_url(model_id)?;
        let payload = body.to_string();

        let mut req = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json");
        req = match &self.auth {
            Auth::Bearer(token) => req.bearer_auth(token),
            Auth::SigV4 {
                region,
                credentials,
            } => {
                let signed = sigv4_headers(
                    credentials,
                    region,
                    url.as_str(),
                    payload.as_bytes(),
                    SystemTime::now(),
                )?;
                signed
                    .into_iter()
                    .fold(req, |req, (name, value)| req.header(name, value))
            }
        };

        let resp = req
            .body(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(BACKEND, e))?;
        let resp = check_status(BACKEND, resp).await?;
        let text = resp.text().await.map_err(|e| request_error(BACKEND, e))?;
        tracing::debug!(
            model_id,
            auth = self.auth_mode(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "bedrock invoke"
        );
        serde_json::from_str(&text).map_err(|e| Error::malformed(BACKEND, e))
    }
}

fn signing_error(e: impl fmt::Display) -> Error {
    Error::NotConfigured(format!("bedrock request signing: {e}"))
}

/// SigV4 headers (`authorization`, `x-amz-date`, and the session token when present)
/// for a JSON POST to `url`. The signed headers match the ones [`BedrockClient::invoke`] sends.
fn sigv4_headers(
    credentials: &Credentials,
    region: &str,
    url: &str,
    payload: &[u8],
    time: SystemTime,
) -> Result<Vec<(String, String)>> {
    let identity = credentials.clone().into();
    let params = v4::SigningParams::builder()
        .identity(&identity)
        .region(region)
        .name(SIGNING_NAME)
        .time(time)
        .settings(SigningSettings::default())
        .build()
        .map_err(signing_error)?
        .into();
    let request = SignableRequest::new(
        "POST",
        url,
        [
            ("content-type", "application/json"),
            ("accept", "application/json"),
        ]
        .into_iter(),
        SignableBody::Bytes(payload),
    )
    .map_err(signing_error)?;
    let (instructions, _signature) = sign(request, &params)
        .map_err(signing_error)?
        .into_parts();
    Ok(instructions
        .headers()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect())
}

#[async_trait::async_trait]
impl GenerationBackend for BedrockClient {
    async fn generate(
        &self,
        model_id: &str,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String> {
        let family = ModelFamily::from_model_id(model_id)?;
        let body = self
            .invoke(
                model_id,
                &family.request_body(prompt, params),
                self.generate_timeout,
            )
            .await?;
        family.parse_output(&body)
    }
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankScore>,
}

pub fn rerank_body(query: &str, documents: &[String]) -> Value {
    serde_json::json!({
        "query": query,
        "documents": documents,
        "top_n": documents.len(),
        "api_version": 2
    })
}

#[async_trait::async_trait]
impl RerankBackend for BedrockClient {
    async fn rerank(
        &self,
        model_id: &str,
        query: &str,
        documents: &[String],
    ) -> Result<Vec<RerankScore>> {
        let body = self
            .invoke(model_id, &rerank_body(query, documents), self.rerank_timeout)
            .await?;
        let parsed: RerankResponse =
            serde_json::from_value(body).map_err(|e| Error::malformed(BACKEND, e))?;
        Ok(parsed.results)
    }
}
