// Relay server configuration.
//
// Centralizes environment variable parsing with defaults for local
// development.

use std::{net::SocketAddr, time::Duration};

pub const DEV_JWT_SECRET: &str = "donelist_local_development_jwt_secret_must_be_32_chars";

/// Core relay server configuration.
///
/// Constructed via [`RelayConfig::from_env`] which reads environment
/// variables and falls back to development defaults.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listen address (host:port).
    pub listen_addr: SocketAddr,
    /// JWT signing secret for access tokens.
    pub jwt_secret: String,
    /// Comma-separated CORS origins (or `"*"` for any).
    pub cors_origins: Option<String>,
    /// Log filter directive (e.g. `info`, `donelist_relay=debug`).
    pub log_filter: String,
    /// Artificial delay applied before each write, for exercising
    /// optimistic clients against a slow backend.
    pub write_delay: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from_env_fn(|_| Err(std::env::VarError::NotPresent))
    }
}

impl RelayConfig {
    /// Parse configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `DONELIST_RELAY_HOST` | `0.0.0.0` |
    /// | `DONELIST_RELAY_PORT` | `8080` |
    /// | `DONELIST_RELAY_JWT_SECRET` | dev-only placeholder |
    /// | `DONELIST_RELAY_CORS_ORIGINS` | *(none, CORS disabled)* |
    /// | `DONELIST_RELAY_LOG_FILTER` | `info` |
    /// | `DONELIST_RELAY_WRITE_DELAY_MS` | `0` |
    pub fn from_env() -> Self {
        Self::from_env_fn(|key| std::env::var(key))
    }

    fn from_env_fn<F>(env: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let host = env("DONELIST_RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env("DONELIST_RELAY_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);
        let listen_addr = format!("{host}:{port}")
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));

        let jwt_secret =
            env("DONELIST_RELAY_JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.into());

        let cors_origins = env("DONELIST_RELAY_CORS_ORIGINS").ok();

        let log_filter = env("DONELIST_RELAY_LOG_FILTER").unwrap_or_else(|_| "info".into());

        let write_delay = env("DONELIST_RELAY_WRITE_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO);

        Self { listen_addr, jwt_secret, cors_origins, log_filter, write_delay }
    }

    /// Returns true when using the development-only JWT secret.
    pub fn is_dev_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}
