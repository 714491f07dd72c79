use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::dispatch::http::{AuthScheme, parse_body, post_json};
use crate::dispatch::{ImageAdapter, ImageJob};
use crate::error::GenerationError;
use crate::request::{Credential, ProviderId};
use crate::response::{MediaResult, MimeClass};

const PROVIDER: ProviderId = ProviderId::SiliconFlow;

/// Kolors text-to-image. The `images/generations` endpoint is prompt-only,
/// so any input image is dropped (the dispatcher flags it).
pub struct SiliconFlowImage {
    client: Client,
    url: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    images: Vec<ImageItem>,
    #[serde(default)]
    data: Vec<ImageItem>,
}

#[derive(Deserialize)]
struct ImageItem {
    url: Option<String>,
}

impl SiliconFlowImage {
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
            "image_size": "1024x1024",
            "num_inference_steps": 25,
        })
    }

    /// Current API returns `images`, older deployments `data`.
    pub fn parse_response(body: &[u8]) -> Result<MediaResult, GenerationError> {
        let parsed: GenerationResponse = parse_body(PROVIDER, body)?;
        parsed
            .images
            .into_iter()
            .chain(parsed.data)
            .find_map(|item| item.url.filter(|u| !u.is_empty()))
            .map(|url| MediaResult::remote(url, MimeClass::Image))
            .ok_or_else(|| GenerationError::UnexpectedResponseShape {
                provider: PROVIDER,
                message: "no image URL in response".to_string(),
            })
    }
}

#[async_trait]
impl ImageAdapter for SiliconFlowImage {
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
