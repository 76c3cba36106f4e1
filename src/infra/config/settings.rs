//! Connection settings for the DHIS2 instance.
//!
//! Settings come from built-in defaults, then an optional `settings.toml`,
//! then `DHIS2_*` environment variables.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://hiskenya.org";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "DHIS2_BASE_URL";
pub const ENV_API_VERSION: &str = "DHIS2_API_VERSION";
pub const ENV_USERNAME: &str = "DHIS2_USERNAME";
pub const ENV_PASSWORD: &str = "DHIS2_PASSWORD";
pub const ENV_TOKEN: &str = "DHIS2_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse settings: {0}")]
    Deserialize(#[source] toml::de::Error),
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Instance root, e.g. `https://play.dhis2.org/dev`.
    pub base_url: String,

    /// Optional Web API version segment; empty means unversioned `/api`.
    pub api_version: String,

    pub timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthSettings {
    pub username: Option<String>,
    pub password: Option<String>,

    /// Personal access token. Wins over username and password.
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Anonymous,
    Basic { username: String, password: String },
    Token(String),
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data).map_err(ConfigError::Deserialize)
    }
}

impl Settings {
    /// Reads `path` when it exists and applies process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) if path.exists() => {
                let data = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read settings: {}", path.display()))?;
                data.parse::<Settings>()
                    .with_context(|| format!("invalid settings file: {}", path.display()))?
            }
            _ => Settings::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.server.base_url = base_url;
        }
        if let Some(api_version) = lookup(ENV_API_VERSION) {
            self.server.api_version = api_version;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.auth.username = Some(username);
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.auth.password = Some(password);
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.auth.token = Some(token);
        }
    }

    pub fn credentials(&self) -> Credentials {
        if let Some(token) = self.auth.token.as_ref().filter(|t| !t.is_empty()) {
            return Credentials::Token(token.clone());
        }
        match (&self.auth.username, &self.auth.password) {
            (Some(username), Some(password)) if !username.is_empty() => Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => Credentials::Anonymous,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs.max(1))
    }
}
