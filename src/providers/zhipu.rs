//! Zhipu AI (BigModel): CogView image generation and CogVideoX async video.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::dispatch::http::{AuthScheme, get, parse_body, post_json};
use crate::dispatch::{ImageAdapter, ImageJob, JobStatus, VideoAdapter, VideoJob, VideoSubmission};
use crate::error::GenerationError;
use crate::request::{Credential, ProviderId};
use crate::response::{MediaResult, MimeClass};

const PROVIDER: ProviderId = ProviderId::Zhipu;

/// Appended when an image is supplied to the text-only video endpoint.
pub const TEXT_ONLY_VIDEO_NOTE: &str = " (Note: Generate video based on this description)";

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<UrlItem>,
}

#[derive(Deserialize)]
struct UrlItem {
    url: Option<String>,
}

pub struct ZhipuImage {
    client: Client,
    url: String,
    model: String,
}

impl ZhipuImage {
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            url: format!("{}/images/generations", base_url.trim_end_matches('/')),
            model: model.to_string(),
        }
    }

    pub fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "size": "1024x1024",
        })
    }

    pub fn parse_response(body: &[u8]) -> Result<MediaResult, GenerationError> {
        let parsed: ImageResponse = parse_body(PROVIDER, body)?;
        parsed
            .data
            .into_iter()
            .find_map(|item| item.url.filter(|u| !u.is_empty()))
            .map(|url| MediaResult::remote(url, MimeClass::Image))
            .ok_or_else(|| GenerationError::UnexpectedResponseShape {
                provider: PROVIDER,
                message: "no image URL in response".to_string(),
            })
    }
}

#[async_trait]
impl ImageAdapter for ZhipuImage {
    async fn submit_image(
        &self,
        job: ImageJob<'_>,
        credential: &Credential,
    ) -> Result<MediaResult, GenerationError> {
        let body = self.build_request_body(&job.prompt);
        let headers = [AuthScheme::Bearer.header(credential)];
        let bytes = post_json(&self.client, PROVIDER, &self.url, &headers, &body).await?;
        Self::parse_response(&bytes)
    }
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: Option<String>,
}

#[derive(Deserialize)]
struct AsyncResult {
    task_status: Option<String>,
    #[serde(default)]
    video_result: Vec<UrlItem>,
}

/// CogVideoX: submit to `videos/generations`, poll `async-result/{id}`.
pub struct ZhipuVideo {
    client: Client,
    base_url: String,
    model: String,
}

impl ZhipuVideo {
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn submit_url(&self) -> String {
        format!("{}/videos/generations", self.base_url)
    }

    pub fn status_url(&self, job_id: &str) -> String {
        format!("{}/async-result/{job_id}", self.base_url)
    }

    pub fn build_submit_body(&self, job: &VideoJob<'_>) -> serde_json::Value {
        let mut prompt = job.prompt.clone();
        if job.input_media.is_some() {
            prompt.push_str(TEXT_ONLY_VIDEO_NOTE);
        }
        serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "quality": "quality",
            "with_audio": true,
            "size": job.aspect_ratio.video_size(),
            "fps": 30,
        })
    }

    pub fn parse_submit_response(body: &[u8]) -> Result<String, GenerationError> {
        let parsed: SubmitResponse = parse_body(PROVIDER, body)?;
        parsed
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GenerationError::SchemaParse("Zhipu submit response missing 'id'".into()))
    }

    pub fn parse_status_response(body: &[u8]) -> Result<JobStatus, GenerationError> {
        let parsed: AsyncResult = parse_body(PROVIDER, body)?;
        match parsed.task_status.as_deref() {
            Some("PROCESSING") => Ok(JobStatus::Running),
            Some("SUCCESS") => {
                let url = parsed.video_result.into_iter().find_map(|item| item.url);
                Ok(JobStatus::Succeeded(url))
            }
            // Verbatim body so the provider's own diagnostics survive.
            Some("FAIL") => Ok(JobStatus::Failed(String::from_utf8_lossy(body).into_owned())),
            Some(other) => {
                tracing::debug!(provider = %PROVIDER, status = other, "unrecognized task status");
                Ok(JobStatus::Pending)
            }
            None => Err(GenerationError::SchemaParse(
                "Zhipu status response missing 'task_status'".into(),
            )),
        }
    }
}

#[async_trait]
impl VideoAdapter for ZhipuVideo {
    async fn submit_video(
        &self,
        job: VideoJob<'_>,
        credential: &Credential,
    ) -> Result<VideoSubmission, GenerationError> {
        let body = self.build_submit_body(&job);
        let headers = [AuthScheme::Bearer.header(credential)];
        let bytes = post_json(&self.client, PROVIDER, &self.submit_url(), &headers, &body).await?;
        Self::parse_submit_response(&bytes).map(VideoSubmission::Pending)
    }

    async fn check_status(
        &self,
        job_id: &str,
        credential: &Credential,
    ) -> Result<JobStatus, GenerationError> {
        let headers = [AuthScheme::Bearer.header(credential)];
        let bytes = get(&self.client, PROVIDER, &self.status_url(job_id), &headers).await?;
        Self::parse_status_response(&bytes)
    }
}
