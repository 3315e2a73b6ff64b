//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::ClientError;

/// Default path of the token refresh endpoint
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Default user agent
pub const DEFAULT_USER_AGENT: &str = concat!("catalog-client/", env!("CARGO_PKG_VERSION"));

/// How the refresh call authenticates itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshAuth {
    /// Ambient session cookie held by the transport; no bearer header
    #[default]
    SessionCookie,
    /// Current bearer token in the `Authorization` header
    Bearer,
    /// No credential at all
    None,
}

/// Settings for [`CatalogClient`](super::CatalogClient)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API origin, e.g. `https://api.example.com`
    pub base_url: String,

    /// Path of the refresh endpoint, relative to `base_url`
    pub refresh_path: String,

    /// Credential presented by the refresh call
    pub refresh_auth: RefreshAuth,

    /// Let concurrent 401s wait on one refresh instead of each refreshing
    pub share_refresh: bool,

    /// Transport timeout in milliseconds (0 disables)
    pub timeout_ms: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            refresh_auth: RefreshAuth::default(),
            share_refresh: false,
            timeout_ms: 30_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }

    /// Set the transport timeout; `Duration::ZERO` disables it.
    ///
    /// Any non-zero duration keeps a timeout of at least one millisecond.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout_ms = if timeout.is_zero() {
            0
        } else {
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1)
        };
    }

    /// Check the settings and normalize the base URL and refresh path
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the base URL is missing or
    /// not an absolute http(s) URL.
    pub fn validate(mut self) -> Result<Self, ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Configuration("base_url is required".into()));
        }

        let parsed = url::Url::parse(self.base_url.trim())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Configuration(format!(
                "base_url must be http or https, got {}",
                parsed.scheme()
            )));
        }

        // Ensure base_url ends without a trailing slash
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();

        if !self.refresh_path.starts_with('/') {
            self.refresh_path = format!("/{}", self.refresh_path);
        }

        Ok(self)
    }
}
