use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::request::{Credential, ProviderId};

/// Default poll interval for async video jobs.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Default attempt ceiling: ~5 minutes at the default interval.
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 60;

/// Env vars checked, in order, for the ambient Gemini credential.
pub const GEMINI_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Poll loop bounds for async jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    #[serde(alias = "intervalMs")]
    pub interval_ms: u64,
    #[serde(alias = "maxAttempts")]
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    poll: PollConfig,
    base_urls: HashMap<String, String>,
    materialize_dir: Option<PathBuf>,
}

/// Process-wide settings shared by every request.
#[derive(Clone)]
pub struct Config {
    pub poll: PollConfig,
    /// Keys for providers whose profile declares an ambient credential.
    pub ambient_credentials: HashMap<ProviderId, Credential>,
    /// Per-provider base URL overrides (relay proxies, tests).
    pub base_urls: HashMap<ProviderId, String>,
    /// Where finished videos are written when a request asks for materialization.
    pub materialize_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            ambient_credentials: HashMap::new(),
            base_urls: HashMap::new(),
            materialize_dir: PathBuf::from(".mirage/media"),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ambient: Vec<&ProviderId> = self.ambient_credentials.keys().collect();
        f.debug_struct("Config")
            .field("poll", &self.poll)
            .field("ambient_credentials", &ambient)
            .field("base_urls", &self.base_urls)
            .field("materialize_dir", &self.materialize_dir)
            .finish()
    }
}

impl Config {
    /// Defaults plus the ambient Gemini key from the environment (`.env` honoured).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Config::default();
        match GEMINI_KEY_VARS
            .iter()
            .find_map(|var| env::var(var).ok().filter(|v| !v.trim().is_empty()))
        {
            Some(key) => {
                config
                    .ambient_credentials
                    .insert(ProviderId::Gemini, Credential::new(key));
            }
            None => {
                tracing::warn!("GEMINI_API_KEY not set, gemini requires a per-request key");
            }
        }
        config
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(raw)?;
        if file.poll.max_attempts == 0 {
            return Err(ConfigError::Invalid("poll.max_attempts must be at least 1".into()));
        }

        let base_urls = file
            .base_urls
            .into_iter()
            .map(|(name, url)| {
                let provider = name.parse::<ProviderId>().map_err(ConfigError::Invalid)?;
                Ok((provider, url))
            })
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;

        let mut config = Config {
            poll: file.poll,
            base_urls,
            ..Config::default()
        };
        if let Some(dir) = file.materialize_dir {
            config.materialize_dir = dir;
        }
        Ok(config)
    }

    /// Load a TOML file, then layer the environment's ambient credentials on top.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        config.ambient_credentials = Self::from_env().ambient_credentials;
        Ok(config)
    }

    pub fn with_ambient_credential(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.ambient_credentials
            .insert(provider, Credential::new(key));
        self
    }

    pub fn with_base_url(mut self, provider: ProviderId, base_url: impl Into<String>) -> Self {
        self.base_urls.insert(provider, base_url.into());
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_materialize_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.materialize_dir = dir.into();
        self
    }
}
