use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Kind of generation a provider may support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Chat,
    Image,
    Video,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Deepseek,
    Moonshot,
    Zhipu,
    #[serde(rename = "siliconflow")]
    SiliconFlow,
    Gemini,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        Self::Deepseek,
        Self::Moonshot,
        Self::Zhipu,
        Self::SiliconFlow,
        Self::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deepseek => "deepseek",
            Self::Moonshot => "moonshot",
            Self::Zhipu => "zhipu",
            Self::SiliconFlow => "siliconflow",
            Self::Gemini => "gemini",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Deepseek => "DeepSeek",
            Self::Moonshot => "Kimi (Moonshot)",
            Self::Zhipu => "Zhipu AI",
            Self::SiliconFlow => "SiliconFlow",
            Self::Gemini => "Google Gemini",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == needle)
            .ok_or_else(|| format!("unknown provider: {s}"))
    }
}

/// Caller-supplied API key. Passed by value per request and never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Uploaded file handed to providers that accept an input image.
#[derive(Clone, PartialEq, Eq)]
pub struct InputMedia {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl InputMedia {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }
}

impl fmt::Debug for InputMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputMedia")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }

    /// Pixel size used by providers that take `WxH` instead of a ratio.
    pub fn video_size(&self) -> &'static str {
        match self {
            Self::Landscape => "1920x1080",
            Self::Portrait => "1080x1920",
        }
    }
}

/// Feature-specific knobs chosen in the UI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredOptions {
    /// ID photo background: a catalog id (`white`, `blue`, `red`) or a literal colour.
    pub background_color: Option<String>,
    /// ID photo size: a catalog id (`1inch`, ...) or a literal size clause.
    pub target_size: Option<String>,
    pub aspect_ratio: Option<AspectRatio>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One user-initiated generation. Built once, never mutated.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub capability: Capability,
    pub provider: ProviderId,
    pub credential: Option<Credential>,
    pub feature_id: String,
    pub input_media: Option<InputMedia>,
    pub user_text: Option<String>,
    pub style_prompt_override: Option<String>,
    pub structured_options: StructuredOptions,
    /// Conversation history for chat requests. When empty, `user_text`
    /// becomes a single user message.
    pub messages: Vec<ChatMessage>,
    /// Overrides the feature's default system prompt (chat only).
    pub system_instruction: Option<String>,
    /// Download finished video into the configured directory.
    pub materialize: bool,
    /// Cooperative cancellation for the job poller.
    pub cancellation_token: Option<CancellationToken>,
}

impl GenerationRequest {
    pub fn builder(
        capability: Capability,
        provider: ProviderId,
        feature_id: impl Into<String>,
    ) -> GenerationRequestBuilder {
        GenerationRequestBuilder {
            inner: GenerationRequest {
                capability,
                provider,
                credential: None,
                feature_id: feature_id.into(),
                input_media: None,
                user_text: None,
                style_prompt_override: None,
                structured_options: StructuredOptions::default(),
                messages: Vec::new(),
                system_instruction: None,
                materialize: false,
                cancellation_token: None,
            },
        }
    }

    /// `user_text` with surrounding whitespace removed, `None` when blank.
    pub fn trimmed_user_text(&self) -> Option<&str> {
        non_blank(self.user_text.as_deref())
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.structured_options.aspect_ratio.unwrap_or_default()
    }

    /// Messages sent to a chat provider, falling back to `user_text`.
    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        if !self.messages.is_empty() {
            return self.messages.clone();
        }
        self.trimmed_user_text()
            .map(|t| vec![ChatMessage::user(t)])
            .unwrap_or_default()
    }
}

pub struct GenerationRequestBuilder {
    inner: GenerationRequest,
}

impl GenerationRequestBuilder {
    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.inner.credential = Some(Credential::new(credential));
        self
    }

    pub fn input_media(mut self, media: InputMedia) -> Self {
        self.inner.input_media = Some(media);
        self
    }

    pub fn user_text(mut self, text: impl Into<String>) -> Self {
        self.inner.user_text = Some(text.into());
        self
    }

    pub fn style_prompt(mut self, style: impl Into<String>) -> Self {
        self.inner.style_prompt_override = Some(style.into());
        self
    }

    pub fn options(mut self, options: StructuredOptions) -> Self {
        self.inner.structured_options = options;
        self
    }

    pub fn messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.inner.messages = messages;
        self
    }

    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.inner.system_instruction = Some(instruction.into());
        self
    }

    pub fn materialize(mut self, materialize: bool) -> Self {
        self.inner.materialize = materialize;
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.inner.cancellation_token = Some(token);
        self
    }

    pub fn build(self) -> GenerationRequest {
        self.inner
    }
}

pub(crate) fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
