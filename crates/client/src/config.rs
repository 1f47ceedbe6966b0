// Client configuration file: `~/.donelist/config.toml`.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use donelist_common::types::{Role, Session, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use url::Url;
use uuid::Uuid;

use crate::controller::{ControllerConfig, DEFAULT_REQUEST_TIMEOUT};

pub const RELAY_URL_ENV: &str = "DONELIST_RELAY_URL";
pub const TOKEN_ENV: &str = "DONELIST_TOKEN";
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:8080";

/// Root directory for client state: `~/.donelist/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".donelist"))
}

pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid relay_url `{value}`: {reason}")]
    InvalidRelayUrl { value: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Relay origin, e.g. `https://todos.example.com`.
    pub relay_url: String,
    /// Bearer token minted by `donelist-relay issue-token`.
    pub access_token: Option<String>,
    /// Identity the token was issued for. The relay derives identity from
    /// the token alone; this is only used to filter pushed changes.
    pub user_id: Option<Uuid>,
    pub role: Role,
    pub sync: SyncConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            access_token: None,
            user_id: None,
            role: Role::Member,
            sync: SyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64 }
    }
}

impl ClientConfig {
    /// Load `~/.donelist/config.toml` with environment overrides applied.
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(RELAY_URL_ENV).filter(|value| !value.trim().is_empty()) {
            self.relay_url = url.trim().to_string();
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|value| !value.trim().is_empty()) {
            self.access_token = Some(token.trim().to_string());
        }
    }

    /// Parsed relay origin. `http` is accepted for loopback hosts only.
    pub fn relay_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidRelayUrl {
            value: self.relay_url.clone(),
            reason,
        };
        let parsed = Url::parse(&self.relay_url).map_err(|error| invalid(error.to_string()))?;
        match parsed.scheme() {
            "https" => Ok(parsed),
            "http" if is_loopback_host(parsed.host_str()) => Ok(parsed),
            _ => Err(invalid("must use https (http is allowed only for localhost)".to_string())),
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig { request_timeout: Duration::from_millis(self.sync.timeout_ms.max(1)) }
    }

    /// Session described by this config, or `None` when no token is set.
    pub fn session(&self) -> Option<Session> {
        let token = self.access_token.as_deref()?;
        let user_id = match self.user_id {
            Some(id) => UserId::from_uuid(id),
            None => {
                warn!("user_id not configured; change feed will only follow listed rows");
                UserId::from_uuid(Uuid::nil())
            }
        };
        Some(Session::new(user_id, self.role).with_access_token(token))
    }
}

fn is_loopback_host(host: Option<&str>) -> bool {
    let Some(host) = host else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok_and(|addr| addr.is_loopback())
}
