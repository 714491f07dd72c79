//! Google Gemini: multimodal image generation and Veo long-running video.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::Deserialize;

use crate::dispatch::http::{AuthScheme, get, parse_body, post_json};
use crate::dispatch::{ImageAdapter, ImageJob, JobStatus, VideoAdapter, VideoJob, VideoSubmission};
use crate::error::GenerationError;
use crate::request::{Credential, InputMedia, ProviderId};
use crate::response::{MediaResult, MimeClass};

const PROVIDER: ProviderId = ProviderId::Gemini;

/// Finish reasons that mean the safety filter blocked the output.
const SAFETY_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "IMAGE_SAFETY",
    "PROHIBITED_CONTENT",
    "IMAGE_PROHIBITED_CONTENT",
    "BLOCK_LOW_AND_ABOVE",
    "BLOCK_MEDIUM_AND_ABOVE",
];

/// Characters of stray model text kept in an error.
const TEXT_PREVIEW_CHARS: usize = 100;

fn auth_headers(credential: &Credential) -> [(String, String); 1] {
    [AuthScheme::GoogApiKey.header(credential)]
}

fn inline_part(media: &InputMedia) -> serde_json::Value {
    serde_json::json!({
        "inlineData": {
            "mimeType": media.mime_type,
            "data": BASE64.encode(&media.bytes),
        }
    })
}

// ---------------------------------------------------------------------------
// Image: models/{model}:generateContent
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

pub struct GeminiImage {
    client: Client,
    url: String,
}

impl GeminiImage {
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            url: format!(
                "{}/models/{model}:generateContent",
                base_url.trim_end_matches('/')
            ),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Image part first (when present), then the text prompt.
    pub fn build_request_body(prompt: &str, input_media: Option<&InputMedia>) -> serde_json::Value {
        let mut parts = Vec::new();
        if let Some(media) = input_media {
            parts.push(inline_part(media));
        }
        parts.push(serde_json::json!({"text": prompt}));
        serde_json::json!({"contents": [{"parts": parts}]})
    }

    /// The first inline image becomes a `data:` URL. Text without an image is
    /// an unexpected shape, whatever the text says.
    pub fn parse_response(body: &[u8]) -> Result<MediaResult, GenerationError> {
        let parsed: GenerateContentResponse = parse_body(PROVIDER, body)?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GenerationError::ContentPolicy {
                provider: PROVIDER,
                message: format!("prompt blocked: {reason}"),
            });
        }

        let candidate = parsed.candidates.into_iter().next().ok_or_else(|| {
            GenerationError::UnexpectedResponseShape {
                provider: PROVIDER,
                message: "no candidate in response".to_string(),
            }
        })?;

        if let Some(reason) = candidate.finish_reason.as_deref()
            && SAFETY_FINISH_REASONS.contains(&reason)
        {
            return Err(GenerationError::ContentPolicy {
                provider: PROVIDER,
                message: format!("output blocked: {reason}"),
            });
        }

        let Some(content) = candidate.content else {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(GenerationError::UnexpectedResponseShape {
                provider: PROVIDER,
                message: format!("generation stopped without content: {reason}"),
            });
        };

        let mut text = String::new();
        for part in content.parts {
            if let Some(inline) = part.inline_data {
                let url = format!("data:{};base64,{}", inline.mime_type, inline.data);
                return Ok(MediaResult::remote(url, MimeClass::Image));
            }
            if let Some(t) = part.text {
                text.push_str(&t);
            }
        }

        let message = if text.is_empty() {
            "no image data in response".to_string()
        } else {
            let preview: String = text.chars().take(TEXT_PREVIEW_CHARS).collect();
            format!("model returned text instead of an image: {preview}")
        };
        Err(GenerationError::UnexpectedResponseShape {
            provider: PROVIDER,
            message,
        })
    }
}

#[async_trait]
impl ImageAdapter for GeminiImage {
    async fn submit_image(
        &self,
        job: ImageJob<'_>,
        credential: &Credential,
    ) -> Result<MediaResult, GenerationError> {
        let body = Self::build_request_body(&job.prompt, job.input_media);
        let bytes = post_json(&self.client, PROVIDER, &self.url, &auth_headers(credential), &body)
            .await?;
        Self::parse_response(&bytes)
    }
}

// ---------------------------------------------------------------------------
// Video: models/{model}:predictLongRunning, then GET the operation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct OperationHandle {
    name: Option<String>,
}

#[derive(Deserialize)]
struct Operation {
    #[serde(default)]
    done: bool,
    response: Option<OperationResponse>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    rai_media_filtered_reasons: Vec<String>,
}

#[derive(Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Deserialize)]
struct VideoRef {
    uri: Option<String>,
}

pub struct GeminiVideo {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiVideo {
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn submit_url(&self) -> String {
        format!("{}/models/{}:predictLongRunning", self.base_url, self.model)
    }

    /// Operation names are relative resource paths (`models/.../operations/...`).
    pub fn status_url(&self, operation: &str) -> String {
        format!("{}/{}", self.base_url, operation.trim_start_matches('/'))
    }

    /// Enhancement and text-only requests render at 1080p, other
    /// image-to-video requests at 720p for speed.
    pub fn resolution(job: &VideoJob<'_>) -> &'static str {
        if job.feature_id == "vid-enhance" || job.input_media.is_none() {
            "1080p"
        } else {
            "720p"
        }
    }

    pub fn build_submit_body(job: &VideoJob<'_>) -> serde_json::Value {
        let mut instance = serde_json::json!({"prompt": job.prompt});
        if let Some(media) = job.input_media {
            instance["image"] = serde_json::json!({
                "bytesBase64Encoded": BASE64.encode(&media.bytes),
                "mimeType": media.mime_type,
            });
        }
        serde_json::json!({
            "instances": [instance],
            "parameters": {
                "aspectRatio": job.aspect_ratio.as_str(),
                "resolution": Self::resolution(job),
                "sampleCount": 1,
            }
        })
    }

    pub fn parse_submit_response(body: &[u8]) -> Result<String, GenerationError> {
        let parsed: OperationHandle = parse_body(PROVIDER, body)?;
        parsed
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| GenerationError::SchemaParse("Veo submit response missing 'name'".into()))
    }

    pub fn parse_status_response(body: &[u8]) -> Result<JobStatus, GenerationError> {
        let op: Operation = parse_body(PROVIDER, body)?;
        if !op.done {
            return Ok(JobStatus::Running);
        }
        if let Some(error) = op.error {
            let detail = error["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Ok(JobStatus::Failed(detail));
        }

        let video = op.response.and_then(|r| r.generate_video_response);
        let Some(video) = video else {
            return Ok(JobStatus::Succeeded(None));
        };
        let uri = video
            .generated_samples
            .into_iter()
            .find_map(|s| s.video.and_then(|v| v.uri));
        match uri {
            Some(uri) => Ok(JobStatus::Succeeded(Some(uri))),
            // Safety filter refusals are a policy outcome, not a job failure.
            None if !video.rai_media_filtered_reasons.is_empty() => {
                Err(GenerationError::ContentPolicy {
                    provider: PROVIDER,
                    message: video.rai_media_filtered_reasons.join("; "),
                })
            }
            None => Ok(JobStatus::Succeeded(None)),
        }
    }
}

#[async_trait]
impl VideoAdapter for GeminiVideo {
    async fn submit_video(
        &self,
        job: VideoJob<'_>,
        credential: &Credential,
    ) -> Result<VideoSubmission, GenerationError> {
        let body = Self::build_submit_body(&job);
        let bytes = post_json(
            &self.client,
            PROVIDER,
            &self.submit_url(),
            &auth_headers(credential),
            &body,
        )
        .await?;
        Self::parse_submit_response(&bytes).map(VideoSubmission::Pending)
    }

    async fn check_status(
        &self,
        job_id: &str,
        credential: &Credential,
    ) -> Result<JobStatus, GenerationError> {
        let bytes = get(
            &self.client,
            PROVIDER,
            &self.status_url(job_id),
            &auth_headers(credential),
        )
        .await?;
        Self::parse_status_response(&bytes)
    }

    /// Veo file URIs only download with the API key attached.
    fn download_headers(&self, credential: &Credential) -> Vec<(String, String)> {
        auth_headers(credential).to_vec()
    }
}
