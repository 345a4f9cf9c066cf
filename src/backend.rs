//! Backend REST client: the endpoints the session core itself needs.
//!
//! DESIGN
//! ======
//! Feature stores own their own CRUD calls; this client only covers the
//! Google user upsert performed during third-party sign-in and the
//! preferences endpoints behind the logout hook. Every call takes a freshly
//! minted bearer token from the caller; nothing here caches credentials.
//!
//! ERROR HANDLING
//! ==============
//! Any non-2xx response is a hard `BackendError::Status` carrying the body.
//! No retries: callers surface the failure and the user retries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BackendTimeouts;
use crate::preferences::UserPreferences;
use crate::provider::Identity;

const GOOGLE_SYNC_PATH: &str = "/api/auth/google";
const ME_PATH: &str = "/api/auth/me";
const PREFERENCES_PATH: &str = "/api/auth/preferences";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(String),
    #[error("backend returned status {status}")]
    Status { status: u16, body: String },
    #[error("backend response parse failed: {0}")]
    Parse(String),
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Body of `POST /api/auth/google`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoogleSyncRequest {
    pub uid: String,
    pub email: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl From<&Identity> for GoogleSyncRequest {
    fn from(identity: &Identity) -> Self {
        Self {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            photo_url: identity.photo_url.clone(),
        }
    }
}

/// Response of `GET /api/auth/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub preferences: Option<UserPreferences>,
}

#[derive(Serialize)]
struct PreferencesBody<'a> {
    preferences: &'a UserPreferences,
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait BackendApi: Send + Sync {
    /// Upsert the backend user record after a third-party sign-in.
    async fn sync_google_user(&self, token: &str, user: &GoogleSyncRequest) -> Result<(), BackendError>;

    async fn fetch_me(&self, token: &str) -> Result<CurrentUser, BackendError>;

    async fn save_preferences(&self, token: &str, preferences: &UserPreferences) -> Result<(), BackendError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client rooted at `base_url` (trailing `/` ignored).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(base_url: &str, timeouts: BackendTimeouts) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait::async_trait]
impl BackendApi for HttpBackend {
    async fn sync_google_user(&self, token: &str, user: &GoogleSyncRequest) -> Result<(), BackendError> {
        let response = self
            .http
            .post(self.url(GOOGLE_SYNC_PATH))
            .bearer_auth(token)
            .json(user)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        read_body(response).await?;
        debug!(uid = %user.uid, "backend user synced");
        Ok(())
    }

    async fn fetch_me(&self, token: &str) -> Result<CurrentUser, BackendError> {
        let response = self
            .http
            .get(self.url(ME_PATH))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        let body = read_body(response).await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Parse(e.to_string()))
    }

    async fn save_preferences(&self, token: &str, preferences: &UserPreferences) -> Result<(), BackendError> {
        let response = self
            .http
            .put(self.url(PREFERENCES_PATH))
            .bearer_auth(token)
            .json(&PreferencesBody { preferences })
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        read_body(response).await?;
        Ok(())
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, BackendError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| BackendError::Request(e.to_string()))?;
    if !status.is_success() {
        return Err(BackendError::Status { status: status.as_u16(), body });
    }
    Ok(body)
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;
