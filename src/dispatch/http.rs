use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use crate::dispatch::ByteStream;
use crate::error::GenerationError;
use crate::request::{Credential, ProviderId};

/// Inline base64 images can be several MB; anything past this is refused.
pub const MAX_RESPONSE_BYTES: usize = 32 * 1024 * 1024;

/// Longest upstream error text kept in an error message.
const MAX_ERROR_MESSAGE_CHARS: usize = 200;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Applies to non-streaming calls. Synchronous image generation is slow.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// How a provider expects the credential to be presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-goog-api-key: <key>`
    GoogApiKey,
}

impl AuthScheme {
    pub fn header(&self, credential: &Credential) -> (String, String) {
        match self {
            Self::Bearer => (
                "Authorization".to_string(),
                format!("Bearer {}", credential.expose()),
            ),
            Self::GoogApiKey => ("x-goog-api-key".to_string(), credential.expose().to_string()),
        }
    }
}

pub fn build_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(4)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("failed to build tuned HTTP client, using defaults: {e}");
            Client::new()
        })
}

fn with_headers(mut req: RequestBuilder, headers: &[(String, String)]) -> RequestBuilder {
    for (k, v) in headers {
        req = req.header(k, v);
    }
    req
}

/// POST a JSON body and return the raw success body.
pub async fn post_json(
    client: &Client,
    provider: ProviderId,
    url: &str,
    headers: &[(String, String)],
    body: &serde_json::Value,
) -> Result<Bytes, GenerationError> {
    let req = with_headers(client.post(url), headers)
        .timeout(REQUEST_TIMEOUT)
        .json(body);
    send(provider, req).await
}

/// GET and return the raw success body.
pub async fn get(
    client: &Client,
    provider: ProviderId,
    url: &str,
    headers: &[(String, String)],
) -> Result<Bytes, GenerationError> {
    let req = with_headers(client.get(url), headers).timeout(REQUEST_TIMEOUT);
    send(provider, req).await
}

/// POST a JSON body and hand back the response body as a chunk stream.
/// No overall timeout: chat streams end when the provider closes them.
pub async fn post_stream(
    client: &Client,
    provider: ProviderId,
    url: &str,
    headers: &[(String, String)],
    body: &serde_json::Value,
) -> Result<ByteStream, GenerationError> {
    let response = with_headers(client.post(url), headers)
        .header("Accept", "text/event-stream")
        .json(body)
        .send()
        .await
        .map_err(|e| GenerationError::transport(provider, &e))?;

    let status = response.status();
    if !status.is_success() {
        let body = read_capped(provider, response).await.unwrap_or_default();
        return Err(classify_failure(provider, status, &body));
    }

    Ok(Box::pin(response.bytes_stream()))
}

async fn send(provider: ProviderId, req: RequestBuilder) -> Result<Bytes, GenerationError> {
    let response = req
        .send()
        .await
        .map_err(|e| GenerationError::transport(provider, &e))?;
    let status = response.status();
    let body = read_capped(provider, response).await?;

    if !status.is_success() {
        return Err(classify_failure(provider, status, &body));
    }
    Ok(body)
}

async fn read_capped(
    provider: ProviderId,
    response: reqwest::Response,
) -> Result<Bytes, GenerationError> {
    if let Some(len) = response.content_length()
        && len as usize > MAX_RESPONSE_BYTES
    {
        return Err(too_large(provider, len as usize));
    }

    let mut body = Vec::new();
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| GenerationError::transport(provider, &e))?;
        if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
            return Err(too_large(provider, body.len() + chunk.len()));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(body))
}

fn too_large(provider: ProviderId, len: usize) -> GenerationError {
    GenerationError::Upstream {
        provider,
        message: format!("response too large: {len} bytes (max {MAX_RESPONSE_BYTES})"),
        status: None,
    }
}

// Error envelopes seen across providers:
//   {"error": {"message": "...", "code": "1113"}}      (OpenAI-compatible, Zhipu)
//   {"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}} (Gemini)
//   {"message": "...", "code": 20012}                   (SiliconFlow)
#[derive(Deserialize, Default)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

#[derive(Deserialize, Default)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    status: Option<String>,
}

/// Provider error code as a string, whichever JSON type it arrived as.
fn code_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Zhipu returns 1113 when the account is out of credit.
const BALANCE_CODES: &[&str] = &["1113"];

/// Content-safety rejection codes (Zhipu 1301, OpenAI-style policy codes).
const CONTENT_POLICY_CODES: &[&str] = &["1301", "content_policy_violation", "content_filter"];

/// Normalize a non-2xx response into the shared taxonomy.
pub fn classify_failure(provider: ProviderId, status: StatusCode, body: &[u8]) -> GenerationError {
    let envelope: ErrorEnvelope = serde_json::from_slice(body).unwrap_or_default();
    let detail = envelope.error.unwrap_or_default();

    let code = detail
        .code
        .as_ref()
        .or(envelope.code.as_ref())
        .and_then(code_string);
    let message = detail
        .message
        .or(envelope.message)
        .or(detail.status)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    let message: String = message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();

    let code = code.as_deref().unwrap_or_default();
    if BALANCE_CODES.contains(&code) || message.contains("余额不足") {
        return GenerationError::InsufficientBalance { provider };
    }
    if CONTENT_POLICY_CODES.contains(&code) {
        return GenerationError::ContentPolicy { provider, message };
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GenerationError::Auth { provider, message }
        }
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited { provider },
        _ => GenerationError::Upstream {
            provider,
            message: format!("{status}: {message}"),
            status: Some(status.as_u16()),
        },
    }
}

/// Parse a success body, attributing failures to the provider.
pub fn parse_body<T: serde::de::DeserializeOwned>(
    provider: ProviderId,
    body: &[u8],
) -> Result<T, GenerationError> {
    serde_json::from_slice(body)
        .map_err(|e| GenerationError::SchemaParse(format!("{provider} response: {e}")))
}
