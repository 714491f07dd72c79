//! OpenAI-compatible streaming chat, shared by DeepSeek, Moonshot and Zhipu.

use async_trait::async_trait;
use reqwest::Client;

use crate::dispatch::http::{AuthScheme, post_stream};
use crate::dispatch::{ByteStream, ChatAdapter};
use crate::error::GenerationError;
use crate::request::{ChatMessage, Credential, ProviderId};

pub const CHAT_TEMPERATURE: f64 = 0.7;

pub struct OpenAiCompatChat {
    client: Client,
    provider: ProviderId,
    url: String,
    model: String,
}

impl OpenAiCompatChat {
    pub fn new(client: Client, provider: ProviderId, base_url: &str, model: &str) -> Self {
        Self {
            client,
            provider,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request body with the system prompt prepended to the conversation.
    pub fn build_chat_body(
        &self,
        messages: &[ChatMessage],
        system_instruction: Option<&str>,
    ) -> serde_json::Value {
        let mut api_messages = Vec::with_capacity(messages.len() + 1);
        if let Some(sys) = system_instruction {
            api_messages.push(serde_json::json!({"role": "system", "content": sys}));
        }
        api_messages.extend(
            messages
                .iter()
                .map(|m| serde_json::json!({"role": m.role, "content": m.content})),
        );

        serde_json::json!({
            "model": self.model,
            "messages": api_messages,
            "stream": true,
            "temperature": CHAT_TEMPERATURE,
        })
    }
}

#[async_trait]
impl ChatAdapter for OpenAiCompatChat {
    async fn submit_chat(
        &self,
        messages: &[ChatMessage],
        system_instruction: Option<&str>,
        credential: &Credential,
    ) -> Result<ByteStream, GenerationError> {
        let body = self.build_chat_body(messages, system_instruction);
        let headers = [AuthScheme::Bearer.header(credential)];

        tracing::debug!(
            provider = %self.provider,
            model = self.model,
            messages = messages.len(),
            "submitting chat completion"
        );
        post_stream(&self.client, self.provider, &self.url, &headers, &body).await
    }
}
