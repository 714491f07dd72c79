use std::path::PathBuf;

use serde::Serialize;

use crate::request::ProviderId;
use crate::stream::DeltaStream;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeClass {
    Image,
    Video,
}

impl MimeClass {
    /// File extension used when a result is written to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Video => "mp4",
        }
    }
}

/// Non-fatal conditions attached to an otherwise successful result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultWarning {
    /// The provider endpoint is prompt-only, so the uploaded image was not sent.
    InputMediaIgnored { provider: ProviderId },
    /// Local download failed; `url` is the remote reference.
    MaterializationFailed { message: String },
}

/// Finished image or video.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MediaResult {
    /// Remote URL, `data:` URL, or `file://` URL once materialized.
    pub url: String,
    pub mime_class: MimeClass,
    /// Set when the media was downloaded to disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ResultWarning>,
}

impl MediaResult {
    pub fn remote(url: impl Into<String>, mime_class: MimeClass) -> Self {
        Self {
            url: url.into(),
            mime_class,
            local_path: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: ResultWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn is_materialized(&self) -> bool {
        self.local_path.is_some()
    }
}

/// Terminal outcome of a dispatched request, consumed once by the caller.
pub enum GenerationResult {
    Media(MediaResult),
    Chat(DeltaStream),
}

impl GenerationResult {
    pub fn into_media(self) -> Option<MediaResult> {
        match self {
            Self::Media(m) => Some(m),
            Self::Chat(_) => None,
        }
    }

    pub fn into_chat(self) -> Option<DeltaStream> {
        match self {
            Self::Chat(s) => Some(s),
            Self::Media(_) => None,
        }
    }
}

impl std::fmt::Debug for GenerationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Media(m) => f.debug_tuple("Media").field(m).finish(),
            Self::Chat(_) => f.write_str("Chat(<stream>)"),
        }
    }
}
