//! `assetdesk.toml` loading, environment overrides, and the collaborators
//! built from them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use assetdesk_engine::gateway::{DEFAULT_API_URL, DEFAULT_MODEL, SYSTEM_MESSAGE};
use assetdesk_engine::{
    Caller, CompletionGateway, GatewayConfig, OfflineGateway, OpenAiCompatibleGateway, Role,
};
use assetdesk_storage::{MemoryStore, NewResource};
use serde::Deserialize;
use thiserror::Error;

pub(crate) const DEFAULT_CONFIG_PATH: &str = "assetdesk.toml";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid seed file {path}: {reason}")]
    Seed { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub store: StoreConfig,
    pub sessions: Vec<SessionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct ServerConfig {
    pub port: u16,
    /// Requests per minute per client IP.
    pub rate_limit: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            rate_limit: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
            max_tokens: 500,
            temperature: 0.1,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StoreConfig {
    /// JSON array of resources loaded into the in-memory store at startup.
    pub seed: Option<PathBuf>,
}

/// A session token issued by the identity provider and the principal it names.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SessionEntry {
    pub token: String,
    pub uid: String,
    pub email: String,
    pub role: Role,
}

impl Config {
    /// Load `path`, falling back to defaults when it does not exist, then
    /// apply `ASSETDESK_*` environment overrides.
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Config::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub(crate) fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply overrides from `lookup`. Empty and unparsable values are ignored.
    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("ASSETDESK_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = get("ASSETDESK_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = get("ASSETDESK_LLM_API_URL") {
            self.llm.api_url = url;
        }
        if let Some(limit) = get("ASSETDESK_RATE_LIMIT").and_then(|v| v.parse().ok()) {
            self.server.rate_limit = limit;
        }
        if let Some(port) = get("ASSETDESK_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Live gateway when an API key is configured, otherwise the offline one.
    pub(crate) fn gateway(&self) -> Arc<dyn CompletionGateway> {
        match self.llm.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => Arc::new(OpenAiCompatibleGateway::new(self.gateway_config(key))),
            None => {
                tracing::info!("no completion API key configured, using keyword parsing only");
                Arc::new(OfflineGateway)
            }
        }
    }

    fn gateway_config(&self, api_key: &str) -> GatewayConfig {
        GatewayConfig {
            api_url: self.llm.api_url.clone(),
            api_key: api_key.to_string(),
            model: self.llm.model.clone(),
            timeout: Duration::from_secs(self.llm.timeout_secs),
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
            system_message: SYSTEM_MESSAGE.to_string(),
        }
    }

    /// In-memory store, seeded from `[store] seed` when set.
    pub(crate) fn store(&self) -> Result<MemoryStore, ConfigError> {
        let Some(path) = &self.store.seed else {
            return Ok(MemoryStore::new());
        };
        let seed_error = |reason: String| ConfigError::Seed {
            path: path.clone(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| seed_error(e.to_string()))?;
        let resources: Vec<NewResource> =
            serde_json::from_str(&text).map_err(|e| seed_error(e.to_string()))?;
        tracing::info!(count = resources.len(), path = %path.display(), "seeded store");
        Ok(MemoryStore::with_resources(resources))
    }

    /// Session token → caller table for the auth middleware.
    pub(crate) fn session_table(&self) -> HashMap<String, Caller> {
        self.sessions
            .iter()
            .map(|s| {
                (
                    s.token.clone(),
                    Caller {
                        uid: s.uid.clone(),
                        email: s.email.clone(),
                        role: s.role,
                    },
                )
            })
            .collect()
    }
}
