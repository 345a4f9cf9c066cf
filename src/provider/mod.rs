//! Token provider adapter: the seam to the external identity service.
//!
//! DESIGN
//! ======
//! The session controller never talks to an identity SDK directly. It holds
//! an `Arc<dyn TokenProvider>` and consumes one identity-change stream for
//! its whole lifetime. Identities are shared as `Arc<Identity>`: the
//! controller keeps a reference and mints every bearer token through the
//! provider, so rotation and expiry stay the provider's problem.
//!
//! ERROR HANDLING
//! ==============
//! Providers fail with a `ProviderError` carrying an adapter-defined code
//! string (`auth/wrong-password`, ...). The controller maps codes to typed
//! session errors and user-facing messages; the provider never decides what
//! the user sees.

pub mod config;
pub mod memory;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

// =============================================================================
// ERROR CODES
// =============================================================================

pub const WRONG_PASSWORD: &str = "auth/wrong-password";
pub const INVALID_CREDENTIAL: &str = "auth/invalid-credential";
pub const USER_NOT_FOUND: &str = "auth/user-not-found";
pub const INVALID_EMAIL: &str = "auth/invalid-email";
pub const EMAIL_ALREADY_IN_USE: &str = "auth/email-already-in-use";
pub const WEAK_PASSWORD: &str = "auth/weak-password";
pub const REQUIRES_RECENT_LOGIN: &str = "auth/requires-recent-login";
pub const POPUP_CLOSED_BY_USER: &str = "auth/popup-closed-by-user";
pub const CANCELLED_POPUP_REQUEST: &str = "auth/cancelled-popup-request";
pub const TOO_MANY_REQUESTS: &str = "auth/too-many-requests";
pub const USER_TOKEN_EXPIRED: &str = "auth/user-token-expired";
pub const NETWORK_REQUEST_FAILED: &str = "auth/network-request-failed";

// =============================================================================
// IDENTITY
// =============================================================================

/// Provider-issued record for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Stable unique id assigned by the provider.
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Identity-change events. `None` means signed out.
pub type IdentityStream = mpsc::UnboundedReceiver<Option<Arc<Identity>>>;

// =============================================================================
// ERROR
// =============================================================================

/// Failure reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({code})")]
pub struct ProviderError {
    /// Adapter-defined code, e.g. `auth/wrong-password`.
    pub code: String,
    /// Raw provider message.
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }

    #[must_use]
    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    /// The user dismissed a third-party sign-in popup.
    #[must_use]
    pub fn is_cancelled_popup(&self) -> bool {
        self.is(POPUP_CLOSED_BY_USER) || self.is(CANCELLED_POPUP_REQUEST)
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Operations the session core needs from an identity provider.
///
/// Every async call may fail with a [`ProviderError`]. Implementations push
/// the current identity to new subscribers immediately, then one event per
/// sign-in/sign-out/profile change.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// `false` when the provider runs on a placeholder configuration.
    fn is_configured(&self) -> bool;

    /// Subscribe to identity changes.
    fn on_identity_change(&self) -> IdentityStream;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Arc<Identity>, ProviderError>;

    async fn create_account(&self, email: &str, password: &str) -> Result<Arc<Identity>, ProviderError>;

    async fn update_profile(&self, identity: &Identity, display_name: &str) -> Result<Arc<Identity>, ProviderError>;

    /// Third-party (Google) popup flow.
    async fn sign_in_with_google(&self) -> Result<Arc<Identity>, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError>;

    async fn send_verification_email(&self, identity: &Identity) -> Result<(), ProviderError>;

    async fn reauthenticate(&self, identity: &Identity, current_password: &str) -> Result<(), ProviderError>;

    async fn change_password(&self, identity: &Identity, new_password: &str) -> Result<(), ProviderError>;

    /// Mint a fresh short-lived bearer token for `identity`.
    async fn mint_token(&self, identity: &Identity) -> Result<String, ProviderError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
