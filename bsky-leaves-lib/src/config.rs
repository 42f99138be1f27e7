use std::fmt;

use thiserror::Error;

use crate::api::DEFAULT_SERVICE;

pub const USERNAME_VAR: &str = "BSKY_USERNAME";
pub const PASSWORD_VAR: &str = "BSKY_PASSWORD";
pub const SERVICE_VAR: &str = "BSKY_SERVICE";
pub const WEB_HOST_VAR: &str = "BSKY_WEB_HOST";

/// Host used when building web URLs for posts.
pub const DEFAULT_WEB_HOST: &str = "staging.bsky.app";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
}

#[derive(Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub service: String,
    pub web_host: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Credentials must be present and non-empty.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        Ok(Self {
            username: required(USERNAME_VAR)?,
            password: required(PASSWORD_VAR)?,
            service: lookup(SERVICE_VAR).unwrap_or_else(|| DEFAULT_SERVICE.to_string()),
            web_host: lookup(WEB_HOST_VAR).unwrap_or_else(|| DEFAULT_WEB_HOST.to_string()),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("service", &self.service)
            .field("web_host", &self.web_host)
            .finish()
    }
}
