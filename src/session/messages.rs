//! User-facing notification text.
//!
//! Adapter error codes map to fixed messages; unknown codes fall back to a
//! generic prefix carrying the provider's raw text.

use crate::provider::{
    EMAIL_ALREADY_IN_USE, INVALID_CREDENTIAL, INVALID_EMAIL, NETWORK_REQUEST_FAILED, ProviderError,
    REQUIRES_RECENT_LOGIN, TOO_MANY_REQUESTS, USER_NOT_FOUND, WEAK_PASSWORD, WRONG_PASSWORD,
};

pub const NOT_CONFIGURED: &str =
    "Authentication is not configured. Please check your identity provider environment variables.";
pub const NOT_AUTHENTICATED: &str = "You need to be signed in to do that.";
pub const SIGNED_IN: &str = "Successfully signed in!";
pub const SIGNED_IN_UNVERIFIED: &str = "Signed in. Please verify your email address to unlock every feature.";
pub const SIGNED_IN_GOOGLE: &str = "Successfully signed in with Google!";
pub const ACCOUNT_CREATED: &str = "Account created! Check your inbox to verify your email address.";
pub const ACCOUNT_CREATED_NO_EMAIL: &str =
    "Account created, but we could not send the verification email. You can resend it from your profile.";
pub const SIGNED_OUT: &str = "Successfully signed out!";
pub const SIGN_IN_CANCELLED: &str = "Sign-in was cancelled.";
pub const PASSWORD_CHANGED: &str = "Password updated successfully.";
pub const REAUTH_REQUIRED: &str = "For your security, please sign out and sign in again before changing your password.";
pub const WRONG_CURRENT_PASSWORD: &str = "Your current password is incorrect.";
pub const PASSWORD_RESET_SENT: &str = "Password reset email sent. Check your inbox.";
pub const VERIFICATION_SENT: &str = "Verification email sent. Check your inbox.";
pub const ALREADY_VERIFIED: &str = "Your email address is already verified.";

/// Human-readable description of a provider failure.
#[must_use]
pub fn describe(err: &ProviderError) -> String {
    let text = match err.code.as_str() {
        USER_NOT_FOUND => "No account found with this email address.",
        INVALID_EMAIL => "Please enter a valid email address.",
        WRONG_PASSWORD | INVALID_CREDENTIAL => "Incorrect email or password.",
        EMAIL_ALREADY_IN_USE => "An account with this email already exists.",
        WEAK_PASSWORD => "Password should be at least 6 characters.",
        REQUIRES_RECENT_LOGIN => "Please sign in again to continue.",
        TOO_MANY_REQUESTS => "Too many attempts. Please try again later.",
        NETWORK_REQUEST_FAILED => "Network error. Check your connection and try again.",
        _ => return format!("Something went wrong: {}", err.message),
    };
    text.to_owned()
}

#[must_use]
pub fn sign_in_failed(err: &ProviderError) -> String {
    format!("Sign in failed: {}", describe(err))
}

#[must_use]
pub fn sign_up_failed(err: &ProviderError) -> String {
    format!("Sign up failed: {}", describe(err))
}

#[must_use]
pub fn sign_out_failed(err: &ProviderError) -> String {
    format!("Sign out failed: {}", describe(err))
}

#[must_use]
pub fn backend_sync_failed(detail: &str) -> String {
    format!("Could not finish signing in: {detail}")
}

#[must_use]
pub fn login_required(action_label: &str) -> String {
    format!("Please sign in to {action_label}.")
}

#[cfg(test)]
#[path = "messages_test.rs"]
mod tests;
