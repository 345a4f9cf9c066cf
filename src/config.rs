//! Runtime configuration parsed from environment variables.

use crate::backend::{BackendError, HttpBackend};
use crate::notify::{DEFAULT_DURATION_MS, Notifier};
use crate::provider::config::ProviderConfig;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ROUTE: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for BackendTimeouts {
    fn default() -> Self {
        Self {
            request_secs: DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS,
            connect_secs: DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub api_base_url: String,
    pub notify_default_duration_ms: u64,
    pub backend_timeouts: BackendTimeouts,
    /// Where the navigation gate sends unauthenticated users.
    pub default_route: String,
    pub provider: ProviderConfig,
}

impl SessionConfig {
    /// Build typed config from environment variables, after loading `.env`
    /// if one is present.
    ///
    /// Optional:
    /// - `API_BASE_URL`: default `http://127.0.0.1:8000`
    /// - `NOTIFY_DEFAULT_DURATION_MS`: default 5000
    /// - `BACKEND_REQUEST_TIMEOUT_SECS`: default 30, must be nonzero
    /// - `BACKEND_CONNECT_TIMEOUT_SECS`: default 10, must be nonzero
    /// - `DEFAULT_ROUTE`: default `/`
    /// - `IDENTITY_*`: see [`ProviderConfig::from_env`]
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(read: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = read("API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let default_route = read("DEFAULT_ROUTE")
            .filter(|v| v.starts_with('/'))
            .unwrap_or_else(|| DEFAULT_ROUTE.to_owned());

        Self {
            api_base_url,
            notify_default_duration_ms: parse_or(&read, "NOTIFY_DEFAULT_DURATION_MS", DEFAULT_DURATION_MS),
            backend_timeouts: BackendTimeouts {
                request_secs: parse_nonzero_or(&read, "BACKEND_REQUEST_TIMEOUT_SECS", DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS),
                connect_secs: parse_nonzero_or(&read, "BACKEND_CONNECT_TIMEOUT_SECS", DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS),
            },
            default_route,
            provider: ProviderConfig::from_lookup(&read),
        }
    }

    /// HTTP client for [`SessionConfig::api_base_url`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn http_backend(&self) -> Result<HttpBackend, BackendError> {
        HttpBackend::new(&self.api_base_url, self.backend_timeouts)
    }

    #[must_use]
    pub fn notifier(&self) -> Notifier {
        Notifier::with_default_duration(self.notify_default_duration_ms)
    }
}

fn parse_or<F, T>(read: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    read(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Like [`parse_or`], but zero also yields `default`.
fn parse_nonzero_or<F>(read: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(read, key, default) {
        0 => default,
        secs => secs,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
