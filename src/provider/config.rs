//! Identity-provider configuration parsed from environment variables.
//!
//! A missing or empty variable drops the whole config to a placeholder so
//! the app still boots without credentials. The placeholder is detected by
//! its api key, and the session controller then runs signed-out only.

use tracing::warn;

pub const PLACEHOLDER_API_KEY: &str = "mock-api-key";

const API_KEY_VAR: &str = "IDENTITY_API_KEY";
const AUTH_DOMAIN_VAR: &str = "IDENTITY_AUTH_DOMAIN";
const PROJECT_ID_VAR: &str = "IDENTITY_PROJECT_ID";
const STORAGE_BUCKET_VAR: &str = "IDENTITY_STORAGE_BUCKET";
const MESSAGING_SENDER_ID_VAR: &str = "IDENTITY_MESSAGING_SENDER_ID";
const APP_ID_VAR: &str = "IDENTITY_APP_ID";

const REQUIRED_VARS: [&str; 6] = [
    API_KEY_VAR,
    AUTH_DOMAIN_VAR,
    PROJECT_ID_VAR,
    STORAGE_BUCKET_VAR,
    MESSAGING_SENDER_ID_VAR,
    APP_ID_VAR,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

impl ProviderConfig {
    /// Load from `IDENTITY_*` environment variables.
    ///
    /// Falls back to [`ProviderConfig::placeholder`] when any variable is
    /// missing or empty.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|&key| read(key).is_none())
            .collect();
        if !missing.is_empty() {
            warn!(?missing, "identity provider configuration incomplete; using placeholder config");
            return Self::placeholder();
        }

        Self {
            api_key: read(API_KEY_VAR).unwrap_or_default(),
            auth_domain: read(AUTH_DOMAIN_VAR).unwrap_or_default(),
            project_id: read(PROJECT_ID_VAR).unwrap_or_default(),
            storage_bucket: read(STORAGE_BUCKET_VAR).unwrap_or_default(),
            messaging_sender_id: read(MESSAGING_SENDER_ID_VAR).unwrap_or_default(),
            app_id: read(APP_ID_VAR).unwrap_or_default(),
        }
    }

    /// Development config used when real credentials are absent.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            api_key: PLACEHOLDER_API_KEY.into(),
            auth_domain: "mock-domain.example.com".into(),
            project_id: "mock-project".into(),
            storage_bucket: "mock-project.appspot.com".into(),
            messaging_sender_id: "123456789".into(),
            app_id: "mock-app-id".into(),
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.api_key == PLACEHOLDER_API_KEY
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
