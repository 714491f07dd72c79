pub mod async_poll;
pub mod http;
pub mod registry;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::error::GenerationError;
use crate::request::{AspectRatio, ChatMessage, Credential, InputMedia};
use crate::response::MediaResult;

/// Raw chat completion body, fed to `stream::decode`.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Provider-agnostic image submission.
#[derive(Debug)]
pub struct ImageJob<'a> {
    pub feature_id: &'a str,
    pub prompt: String,
    pub input_media: Option<&'a InputMedia>,
}

/// Provider-agnostic video submission.
#[derive(Debug)]
pub struct VideoJob<'a> {
    pub feature_id: &'a str,
    pub prompt: String,
    pub input_media: Option<&'a InputMedia>,
    pub aspect_ratio: AspectRatio,
}

/// What a video provider hands back on submission.
#[derive(Debug)]
pub enum VideoSubmission {
    Ready(MediaResult),
    /// Opaque provider job id, to be driven by the job poller.
    Pending(String),
}

/// Provider view of an async job on one status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    /// Media reference, if the provider included one.
    Succeeded(Option<String>),
    /// Provider failure detail, kept verbatim.
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

#[async_trait]
pub trait ChatAdapter: Send + Sync {
    async fn submit_chat(
        &self,
        messages: &[ChatMessage],
        system_instruction: Option<&str>,
        credential: &Credential,
    ) -> Result<ByteStream, GenerationError>;
}

#[async_trait]
pub trait ImageAdapter: Send + Sync {
    async fn submit_image(
        &self,
        job: ImageJob<'_>,
        credential: &Credential,
    ) -> Result<MediaResult, GenerationError>;
}

#[async_trait]
pub trait VideoAdapter: Send + Sync {
    async fn submit_video(
        &self,
        job: VideoJob<'_>,
        credential: &Credential,
    ) -> Result<VideoSubmission, GenerationError>;

    async fn check_status(
        &self,
        job_id: &str,
        credential: &Credential,
    ) -> Result<JobStatus, GenerationError>;

    /// Extra headers needed to download finished media.
    fn download_headers(&self, _credential: &Credential) -> Vec<(String, String)> {
        Vec::new()
    }
}
