use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;

use crate::catalog;
use crate::config::Config;
use crate::dispatch::async_poll::{AdapterStatusSource, AsyncJob, JobPoller};
use crate::dispatch::http::{AuthScheme, build_client};
use crate::dispatch::{ChatAdapter, ImageAdapter, ImageJob, VideoAdapter, VideoJob, VideoSubmission};
use crate::error::GenerationError;
use crate::prompt;
use crate::providers::gemini::{GeminiImage, GeminiVideo};
use crate::providers::openai_compat::OpenAiCompatChat;
use crate::providers::siliconflow::SiliconFlowImage;
use crate::providers::zhipu::{ZhipuImage, ZhipuVideo};
use crate::request::{Capability, Credential, GenerationRequest, ProviderId};
use crate::response::{GenerationResult, MediaResult, MimeClass, ResultWarning};
use crate::stream;

/// Where a provider's credential comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    /// Every request must carry its own key.
    PerRequest,
    /// Falls back to `Config::ambient_credentials` when the request has none.
    Ambient,
}

#[derive(Clone, Copy, Debug)]
pub struct ModelSpec {
    pub model: &'static str,
    /// False for prompt-only endpoints that drop an uploaded image.
    pub supports_image_input: bool,
}

/// Static, read-only provider metadata.
#[derive(Debug)]
pub struct ProviderProfile {
    pub id: ProviderId,
    pub base_url: &'static str,
    pub auth: AuthScheme,
    pub credential: CredentialSource,
    pub chat: Option<ModelSpec>,
    pub image: Option<ModelSpec>,
    pub video: Option<ModelSpec>,
}

impl ProviderProfile {
    pub fn model(&self, capability: Capability) -> Option<&ModelSpec> {
        match capability {
            Capability::Chat => self.chat.as_ref(),
            Capability::Image => self.image.as_ref(),
            Capability::Video => self.video.as_ref(),
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.model(capability).is_some()
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        [Capability::Chat, Capability::Image, Capability::Video]
            .into_iter()
            .filter(|c| self.supports(*c))
            .collect()
    }

    pub fn supports_image_input(&self, capability: Capability) -> bool {
        self.model(capability)
            .is_some_and(|m| m.supports_image_input)
    }
}

const fn spec(model: &'static str, supports_image_input: bool) -> Option<ModelSpec> {
    Some(ModelSpec {
        model,
        supports_image_input,
    })
}

pub static PROFILES: [ProviderProfile; 5] = [
    ProviderProfile {
        id: ProviderId::Deepseek,
        base_url: "https://api.deepseek.com",
        auth: AuthScheme::Bearer,
        credential: CredentialSource::PerRequest,
        chat: spec("deepseek-chat", false),
        image: None,
        video: None,
    },
    ProviderProfile {
        id: ProviderId::Moonshot,
        base_url: "https://api.moonshot.cn/v1",
        auth: AuthScheme::Bearer,
        credential: CredentialSource::PerRequest,
        chat: spec("moonshot-v1-8k", false),
        image: None,
        video: None,
    },
    ProviderProfile {
        id: ProviderId::Zhipu,
        base_url: "https://open.bigmodel.cn/api/paas/v4",
        auth: AuthScheme::Bearer,
        credential: CredentialSource::PerRequest,
        chat: spec("glm-4", false),
        image: spec("cogview-3-plus", false),
        // Image-to-video needs a hosted image URL, which this layer never has.
        video: spec("cogvideox", false),
    },
    ProviderProfile {
        id: ProviderId::SiliconFlow,
        base_url: "https://api.siliconflow.cn/v1",
        auth: AuthScheme::Bearer,
        credential: CredentialSource::PerRequest,
        chat: None,
        image: spec("Kwai-Kolors/Kolors", false),
        video: None,
    },
    ProviderProfile {
        id: ProviderId::Gemini,
        base_url: "https://generativelanguage.googleapis.com/v1beta",
        auth: AuthScheme::GoogApiKey,
        credential: CredentialSource::Ambient,
        chat: None,
        image: spec("gemini-2.5-flash-image", true),
        video: spec("veo-3.1-fast-generate-preview", true),
    },
];

pub fn profile(id: ProviderId) -> &'static ProviderProfile {
    // PROFILES holds one entry per ProviderId variant.
    match id {
        ProviderId::Deepseek => &PROFILES[0],
        ProviderId::Moonshot => &PROFILES[1],
        ProviderId::Zhipu => &PROFILES[2],
        ProviderId::SiliconFlow => &PROFILES[3],
        ProviderId::Gemini => &PROFILES[4],
    }
}

#[derive(Clone)]
enum Adapter {
    Chat(Arc<dyn ChatAdapter>),
    Image(Arc<dyn ImageAdapter>),
    Video(Arc<dyn VideoAdapter>),
}

/// Routes a request to the adapter registered for its (capability, provider).
pub struct Registry {
    adapters: HashMap<(Capability, ProviderId), Adapter>,
    ambient_credentials: HashMap<ProviderId, Credential>,
    poller: JobPoller,
}

impl Registry {
    /// Registry with the default adapter for every capability each profile declares.
    pub fn new(config: Config) -> Self {
        let client = build_client();
        let mut registry = Self::empty_with_client(config.clone(), client.clone());

        for p in &PROFILES {
            let base_url = config
                .base_urls
                .get(&p.id)
                .cloned()
                .unwrap_or_else(|| p.base_url.to_string());

            if let Some(m) = p.chat {
                registry.register_chat(
                    p.id,
                    Arc::new(OpenAiCompatChat::new(client.clone(), p.id, &base_url, m.model)),
                );
            }
            if let Some(m) = p.image {
                let adapter: Arc<dyn ImageAdapter> = match p.id {
                    ProviderId::Gemini => Arc::new(GeminiImage::new(client.clone(), &base_url, m.model)),
                    ProviderId::SiliconFlow => {
                        Arc::new(SiliconFlowImage::new(client.clone(), &base_url, m.model))
                    }
                    ProviderId::Zhipu => Arc::new(ZhipuImage::new(client.clone(), &base_url, m.model)),
                    other => {
                        tracing::warn!(provider = %other, "no image adapter implementation");
                        continue;
                    }
                };
                registry.register_image(p.id, adapter);
            }
            if let Some(m) = p.video {
                let adapter: Arc<dyn VideoAdapter> = match p.id {
                    ProviderId::Gemini => Arc::new(GeminiVideo::new(client.clone(), &base_url, m.model)),
                    ProviderId::Zhipu => Arc::new(ZhipuVideo::new(client.clone(), &base_url, m.model)),
                    other => {
                        tracing::warn!(provider = %other, "no video adapter implementation");
                        continue;
                    }
                };
                registry.register_video(p.id, adapter);
            }
        }

        registry
    }

    /// Registry with no adapters; callers register their own.
    pub fn empty(config: Config) -> Self {
        Self::empty_with_client(config, build_client())
    }

    fn empty_with_client(config: Config, client: Client) -> Self {
        Self {
            adapters: HashMap::new(),
            ambient_credentials: config.ambient_credentials,
            poller: JobPoller::new(config.poll, client, config.materialize_dir),
        }
    }

    pub fn register_chat(&mut self, provider: ProviderId, adapter: Arc<dyn ChatAdapter>) {
        self.adapters
            .insert((Capability::Chat, provider), Adapter::Chat(adapter));
    }

    pub fn register_image(&mut self, provider: ProviderId, adapter: Arc<dyn ImageAdapter>) {
        self.adapters
            .insert((Capability::Image, provider), Adapter::Image(adapter));
    }

    pub fn register_video(&mut self, provider: ProviderId, adapter: Arc<dyn VideoAdapter>) {
        self.adapters
            .insert((Capability::Video, provider), Adapter::Video(adapter));
    }

    pub fn is_routable(&self, capability: Capability, provider: ProviderId) -> bool {
        profile(provider).supports(capability) && self.adapters.contains_key(&(capability, provider))
    }

    pub fn poller(&self) -> &JobPoller {
        &self.poller
    }

    pub async fn dispatch(
        &self,
        req: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let provider = req.provider;
        let capability = req.capability;
        let profile = profile(provider);

        let unsupported = || GenerationError::UnsupportedCapability {
            provider,
            capability,
        };
        if !profile.supports(capability) {
            return Err(unsupported());
        }
        let adapter = self
            .adapters
            .get(&(capability, provider))
            .cloned()
            .ok_or_else(unsupported)?;

        let credential = self.resolve_credential(profile, req)?;
        validate_inputs(req)?;
        // A chat result has no slot for warnings, so media there is refused outright.
        if capability == Capability::Chat && req.input_media.is_some() {
            return Err(GenerationError::InvalidRequest(
                "chat requests do not accept input media".to_string(),
            ));
        }

        let ignored_input = req.input_media.is_some() && !profile.supports_image_input(capability);
        if ignored_input {
            tracing::warn!(
                provider = %provider,
                feature = req.feature_id,
                "provider is prompt-only, input media will be ignored"
            );
        }
        let annotate = |media: MediaResult| {
            if ignored_input {
                media.with_warning(ResultWarning::InputMediaIgnored { provider })
            } else {
                media
            }
        };

        tracing::info!(
            provider = %provider,
            capability = %capability,
            feature = req.feature_id,
            "dispatching generation request"
        );

        match adapter {
            Adapter::Chat(chat) => {
                let messages = req.chat_messages();
                if messages.is_empty() {
                    return Err(GenerationError::InvalidRequest(
                        "chat request needs at least one message".to_string(),
                    ));
                }
                let system = req
                    .system_instruction
                    .as_deref()
                    .unwrap_or_else(|| prompt::system_instruction(&req.feature_id));
                let bytes = chat.submit_chat(&messages, Some(system), &credential).await?;
                Ok(GenerationResult::Chat(stream::decode(provider, bytes)))
            }
            Adapter::Image(image) => {
                let job = ImageJob {
                    feature_id: &req.feature_id,
                    prompt: build_request_prompt(req),
                    input_media: req.input_media.as_ref(),
                };
                let media = image.submit_image(job, &credential).await?;
                Ok(GenerationResult::Media(annotate(media)))
            }
            Adapter::Video(video) => {
                let job = VideoJob {
                    feature_id: &req.feature_id,
                    prompt: build_request_prompt(req),
                    input_media: req.input_media.as_ref(),
                    aspect_ratio: req.aspect_ratio(),
                };
                let (media, label) = match video.submit_video(job, &credential).await? {
                    VideoSubmission::Ready(media) => (media, req.feature_id.clone()),
                    VideoSubmission::Pending(job_id) => {
                        tracing::info!(provider = %provider, job_id = job_id, "video job submitted");
                        let mut job = AsyncJob::submitted(provider, job_id);
                        let source = AdapterStatusSource {
                            adapter: video.as_ref(),
                            credential: &credential,
                        };
                        let media = self
                            .poller
                            .drive(
                                &mut job,
                                &source,
                                MimeClass::Video,
                                req.cancellation_token.as_ref(),
                            )
                            .await?;
                        (media, job.id().to_string())
                    }
                };

                let media = if req.materialize {
                    let headers = video.download_headers(&credential);
                    self.poller.materialize(media, &label, &headers).await
                } else {
                    media
                };
                Ok(GenerationResult::Media(annotate(media)))
            }
        }
    }

    fn resolve_credential(
        &self,
        profile: &ProviderProfile,
        req: &GenerationRequest,
    ) -> Result<Credential, GenerationError> {
        let supplied = req.credential.as_ref().filter(|c| !c.is_blank());
        let resolved = match profile.credential {
            CredentialSource::PerRequest => supplied,
            CredentialSource::Ambient => {
                supplied.or_else(|| self.ambient_credentials.get(&profile.id))
            }
        };
        resolved.cloned().ok_or_else(|| GenerationError::Auth {
            provider: profile.id,
            message: "missing API key".to_string(),
        })
    }
}

fn build_request_prompt(req: &GenerationRequest) -> String {
    prompt::build_prompt(
        &req.feature_id,
        req.style_prompt_override.as_deref(),
        req.user_text.as_deref(),
        &req.structured_options,
    )
}

/// Catalog-driven input checks. Unknown features pass through untouched.
fn validate_inputs(req: &GenerationRequest) -> Result<(), GenerationError> {
    let Some(feature) = catalog::find_feature(&req.feature_id) else {
        return Ok(());
    };
    if feature.requires_input_media && req.input_media.is_none() {
        return Err(GenerationError::InvalidRequest(format!(
            "feature {} needs an input image",
            feature.id
        )));
    }
    let has_text = req.trimmed_user_text().is_some() || !req.messages.is_empty();
    if feature.requires_user_text && !has_text {
        return Err(GenerationError::InvalidRequest(format!(
            "feature {} needs a text description",
            feature.id
        )));
    }
    Ok(())
}
