//! Session error taxonomy.

use crate::provider::ProviderError;

/// Errors raised by [`super::SessionController`] operations.
///
/// Every variant is also surfaced to the user as a notification before it
/// reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("identity provider is not configured")]
    NotConfigured,
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("sign in failed: {0}")]
    SignInFailed(ProviderError),
    #[error("sign up failed: {0}")]
    SignUpFailed(ProviderError),
    #[error("re-authentication required")]
    ReauthRequired,
    #[error("current password is incorrect")]
    WrongPassword,
    #[error("backend sync failed: {0}")]
    BackendSyncFailed(String),
    /// A third-party popup was dismissed. Not reported as a failure.
    #[error("cancelled by user")]
    UserCancelled,
    #[error("no account found for this email")]
    UserNotFound,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("identity provider error: {0}")]
    Provider(ProviderError),
}

impl SessionError {
    /// Stable machine-readable code for UI branching and logs.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "E_NOT_CONFIGURED",
            Self::NotAuthenticated => "E_NOT_AUTHENTICATED",
            Self::SignInFailed(_) => "E_SIGN_IN_FAILED",
            Self::SignUpFailed(_) => "E_SIGN_UP_FAILED",
            Self::ReauthRequired => "E_REAUTH_REQUIRED",
            Self::WrongPassword => "E_WRONG_PASSWORD",
            Self::BackendSyncFailed(_) => "E_BACKEND_SYNC_FAILED",
            Self::UserCancelled => "E_USER_CANCELLED",
            Self::UserNotFound => "E_USER_NOT_FOUND",
            Self::InvalidEmail => "E_INVALID_EMAIL",
            Self::Provider(_) => "E_PROVIDER",
        }
    }

    /// The underlying provider error, when there is one.
    #[must_use]
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::SignInFailed(e) | Self::SignUpFailed(e) | Self::Provider(e) => Some(e),
            _ => None,
        }
    }
}
