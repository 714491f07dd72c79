use thiserror::Error;

use crate::request::{Capability, ProviderId};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("auth failed for {provider}: {message}")]
    Auth { provider: ProviderId, message: String },

    #[error("rate limited by {provider}")]
    RateLimited { provider: ProviderId },

    #[error("transport error talking to {provider}: {message}")]
    Transport { provider: ProviderId, message: String },

    #[error("{provider} refused generation on content policy grounds: {message}")]
    ContentPolicy { provider: ProviderId, message: String },

    #[error("{provider} account balance is insufficient")]
    InsufficientBalance { provider: ProviderId },

    #[error("unexpected response shape from {provider}: {message}")]
    UnexpectedResponseShape { provider: ProviderId, message: String },

    #[error("upstream error from {provider}: {message}")]
    Upstream {
        provider: ProviderId,
        message: String,
        status: Option<u16>,
    },

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("job {job_id} failed on {provider}: {detail}")]
    JobFailed {
        provider: ProviderId,
        job_id: String,
        detail: String,
    },

    #[error("job {job_id} on {provider} reported success without a media reference")]
    InconsistentSuccess { provider: ProviderId, job_id: String },

    #[error("materialization failed: {message}")]
    MaterializationFailed { message: String },

    #[error("poll failed for {provider} job {job_id}: {message}")]
    PollFailed {
        provider: ProviderId,
        job_id: String,
        message: String,
    },

    #[error("job {job_id} on {provider} timed out after {attempts} status checks")]
    TimedOut {
        provider: ProviderId,
        job_id: String,
        attempts: u32,
    },

    #[error("job {job_id} on {provider} cancelled after {attempts} status checks")]
    Cancelled {
        provider: ProviderId,
        job_id: String,
        attempts: u32,
    },

    #[error("{provider} does not support {capability}")]
    UnsupportedCapability {
        provider: ProviderId,
        capability: Capability,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GenerationError {
    /// Wrap a reqwest failure. Status-bearing errors never reach here;
    /// those go through `dispatch::http::classify_failure`.
    pub fn transport(provider: ProviderId, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else {
            err.to_string()
        };
        Self::Transport { provider, message }
    }

    /// Extract provider from structured error variants.
    /// Returns None for variants that don't carry provider context.
    pub fn provider(&self) -> Option<ProviderId> {
        match self {
            Self::Auth { provider, .. }
            | Self::RateLimited { provider }
            | Self::Transport { provider, .. }
            | Self::ContentPolicy { provider, .. }
            | Self::InsufficientBalance { provider }
            | Self::UnexpectedResponseShape { provider, .. }
            | Self::Upstream { provider, .. }
            | Self::JobFailed { provider, .. }
            | Self::InconsistentSuccess { provider, .. }
            | Self::PollFailed { provider, .. }
            | Self::TimedOut { provider, .. }
            | Self::Cancelled { provider, .. }
            | Self::UnsupportedCapability { provider, .. } => Some(*provider),
            Self::SchemaParse(_) | Self::MaterializationFailed { .. } | Self::InvalidRequest(_) => {
                None
            }
        }
    }

    /// True when offering the user a "try again" makes sense.
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Transport { .. } => true,
            Self::TimedOut { .. } => true,
            Self::PollFailed { .. } => true,
            Self::Upstream { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }

    /// Sanitized message for display. Does not leak upstream bodies or URLs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth { provider, message } => {
                format!("authentication failed for {}: {message}", provider.display_name())
            }
            Self::RateLimited { provider } => {
                format!("rate limited by {}, try again shortly", provider.display_name())
            }
            Self::Transport { provider, .. } => format!(
                "could not reach {}. Check the network, proxy settings or API key",
                provider.display_name()
            ),
            Self::ContentPolicy { provider, .. } => format!(
                "{} blocked this request on safety grounds. Try a different image or description",
                provider.display_name()
            ),
            Self::InsufficientBalance { provider } => format!(
                "{} account balance is insufficient. Top up or switch provider",
                provider.display_name()
            ),
            Self::UnexpectedResponseShape { provider, .. } => {
                format!("{} returned no usable media", provider.display_name())
            }
            Self::Upstream { provider, status, .. } => match status {
                Some(code) => format!("{} failed with HTTP {code}", provider.display_name()),
                None => format!("{} request failed", provider.display_name()),
            },
            Self::SchemaParse(_) => "failed to parse provider response".to_string(),
            Self::JobFailed { provider, .. } => {
                format!("{} reported that generation failed", provider.display_name())
            }
            Self::InconsistentSuccess { provider, .. } => format!(
                "{} finished without returning the media, please retry",
                provider.display_name()
            ),
            Self::MaterializationFailed { .. } => "failed to download the generated media".to_string(),
            Self::PollFailed { provider, .. } => {
                format!("failed to check generation status on {}", provider.display_name())
            }
            Self::TimedOut { .. } => "generation is taking too long, try again".to_string(),
            Self::Cancelled { .. } => "generation cancelled".to_string(),
            Self::UnsupportedCapability {
                provider,
                capability,
            } => format!("{} does not offer {capability} generation", provider.display_name()),
            Self::InvalidRequest(msg) => msg.clone(),
        }
    }
}
