//! Backend endpoint configuration.
//!
//! The base address is resolved once per process from the environment and
//! shared by the HTTP transport and the push-channel subscriber. The push
//! URL is derived from the same origin with the scheme upgraded to the
//! websocket equivalent.

use crate::ValidationError;

/// Environment variable consulted by [`BackendConfig::from_env`].
pub const API_URL_ENV: &str = "ADVISORDECK_API_URL";

/// Default origin used when the environment does not supply one.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Resolved backend origin plus derived endpoint helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    base_url: String,
}

impl BackendConfig {
    /// Build a config from an explicit origin.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ValidationError> {
        let raw: String = base_url.into();
        let trimmed = raw.trim().trim_end_matches('/');
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl { value: raw });
        }
        Ok(Self {
            base_url: trimmed.to_owned(),
        })
    }

    /// Resolve the origin from `ADVISORDECK_API_URL`, falling back to the
    /// local default. An unusable env value falls back rather than failing
    /// startup.
    pub fn from_env() -> Self {
        std::env::var(API_URL_ENV)
            .ok()
            .and_then(|value| Self::new(value).ok())
            .unwrap_or_else(Self::default)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join an absolute path onto the configured origin.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Push-channel endpoint: same origin, scheme upgraded http→ws /
    /// https→wss, path `/ws`.
    pub fn feed_url(&self) -> String {
        let upgraded = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{upgraded}/ws")
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_owned(),
        }
    }
}
