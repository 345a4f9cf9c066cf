//! In-process identity provider.
//!
//! DESIGN
//! ======
//! `MemoryProvider` keeps accounts in a `HashMap` and fans identity changes
//! out to every subscriber over unbounded channels. It backs local
//! development when no real provider is configured, and gives tests
//! deterministic control over provider failures (stale sessions, popup
//! outcomes, sign-out errors).
//!
//! Every trait call except `is_configured` bumps `call_count`, so callers can
//! assert that a guard short-circuited before reaching the provider.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;
use tokio::sync::{Notify, mpsc};
use tracing::debug;
use uuid::Uuid;

use super::config::ProviderConfig;
use super::{
    EMAIL_ALREADY_IN_USE, INVALID_EMAIL, Identity, IdentityStream, POPUP_CLOSED_BY_USER, ProviderError,
    REQUIRES_RECENT_LOGIN, TokenProvider, USER_NOT_FOUND, USER_TOKEN_EXPIRED, WEAK_PASSWORD, WRONG_PASSWORD,
};

const MIN_PASSWORD_LEN: usize = 6;

/// What the next third-party popup does.
#[derive(Debug, Clone)]
pub enum PopupOutcome {
    /// Popup completes with this identity.
    Account(Identity),
    /// User closes the popup.
    ClosedByUser,
    /// Provider fails with this error.
    Fail(ProviderError),
}

struct Account {
    password: String,
    identity: Identity,
}

struct MemoryInner {
    /// Accounts keyed by normalized email.
    accounts: HashMap<String, Account>,
    current: Option<Arc<Identity>>,
    subscribers: Vec<mpsc::UnboundedSender<Option<Arc<Identity>>>>,
    stale_session: bool,
    popup: PopupOutcome,
    sign_out_failure: Option<ProviderError>,
    /// When armed, the next password sign-in waits here before touching state.
    sign_in_hold: Option<Arc<Notify>>,
    verification_emails: Vec<String>,
    password_resets: Vec<String>,
}

pub struct MemoryProvider {
    configured: bool,
    calls: AtomicUsize,
    inner: Mutex<MemoryInner>,
}

impl MemoryProvider {
    /// A configured provider with no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_configured(true)
    }

    /// A provider running on a placeholder configuration.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::with_configured(false)
    }

    #[must_use]
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::with_configured(!config.is_placeholder())
    }

    fn with_configured(configured: bool) -> Self {
        Self {
            configured,
            calls: AtomicUsize::new(0),
            inner: Mutex::new(MemoryInner {
                accounts: HashMap::new(),
                current: None,
                subscribers: Vec::new(),
                stale_session: false,
                popup: PopupOutcome::ClosedByUser,
                sign_out_failure: None,
                sign_in_hold: None,
                verification_emails: Vec::new(),
                password_resets: Vec::new(),
            }),
        }
    }

    /// Register an account. Returns the created identity.
    pub fn add_account(&self, email: &str, password: &str, email_verified: bool) -> Identity {
        let normalized = normalize_email(email).unwrap_or_else(|| email.to_owned());
        let identity = new_identity(&normalized, email_verified);
        self.lock().accounts.insert(
            normalized,
            Account { password: password.to_owned(), identity: identity.clone() },
        );
        identity
    }

    /// Make re-authentication and password changes fail with `auth/requires-recent-login`.
    pub fn set_stale_session(&self, stale: bool) {
        self.lock().stale_session = stale;
    }

    pub fn set_popup(&self, outcome: PopupOutcome) {
        self.lock().popup = outcome;
    }

    /// Make `sign_out` fail with `error` until cleared.
    pub fn fail_sign_out(&self, error: Option<ProviderError>) {
        self.lock().sign_out_failure = error;
    }

    /// Park the next password sign-in until the returned handle is notified.
    ///
    /// The sign-in is held after the call is recorded and before any state
    /// changes, so other operations can be interleaved at that point.
    pub fn hold_sign_in(&self) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        self.lock().sign_in_hold = Some(Arc::clone(&release));
        release
    }

    /// Drop the current identity as if the provider revoked it.
    pub fn revoke_session(&self) {
        let mut inner = self.lock();
        inner.current = None;
        broadcast(&mut inner, None);
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn current(&self) -> Option<Arc<Identity>> {
        self.lock().current.clone()
    }

    /// Emails that received a verification message, in send order.
    #[must_use]
    pub fn verification_emails(&self) -> Vec<String> {
        self.lock().verification_emails.clone()
    }

    /// Emails that received a password reset, in send order.
    #[must_use]
    pub fn password_resets(&self) -> Vec<String> {
        self.lock().password_resets.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_call(&self, op: &'static str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(op, "memory provider call");
    }

    fn sign_in_as(&self, inner: &mut MemoryInner, identity: Identity) -> Arc<Identity> {
        let identity = Arc::new(identity);
        inner.current = Some(Arc::clone(&identity));
        broadcast(inner, Some(Arc::clone(&identity)));
        identity
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TokenProvider for MemoryProvider {
    fn is_configured(&self) -> bool {
        self.configured
    }

    fn on_identity_change(&self) -> IdentityStream {
        self.record_call("on_identity_change");
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let _ = tx.send(inner.current.clone());
        inner.subscribers.push(tx);
        rx
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Arc<Identity>, ProviderError> {
        self.record_call("sign_in_with_password");
        let hold = self.lock().sign_in_hold.take();
        if let Some(release) = hold {
            debug!("sign in held");
            release.notified().await;
        }
        let email = normalize_email(email).ok_or_else(invalid_email)?;
        let mut inner = self.lock();
        let account = inner
            .accounts
            .get(&email)
            .ok_or_else(|| ProviderError::new(USER_NOT_FOUND, "There is no user record corresponding to this identifier."))?;
        if account.password != password {
            return Err(wrong_password());
        }
        let identity = account.identity.clone();
        Ok(self.sign_in_as(&mut inner, identity))
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Arc<Identity>, ProviderError> {
        self.record_call("create_account");
        let email = normalize_email(email).ok_or_else(invalid_email)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ProviderError::new(WEAK_PASSWORD, "Password should be at least 6 characters."));
        }
        let mut inner = self.lock();
        if inner.accounts.contains_key(&email) {
            return Err(ProviderError::new(
                EMAIL_ALREADY_IN_USE,
                "The email address is already in use by another account.",
            ));
        }
        let identity = new_identity(&email, false);
        inner
            .accounts
            .insert(email, Account { password: password.to_owned(), identity: identity.clone() });
        Ok(self.sign_in_as(&mut inner, identity))
    }

    async fn update_profile(&self, identity: &Identity, display_name: &str) -> Result<Arc<Identity>, ProviderError> {
        self.record_call("update_profile");
        let mut inner = self.lock();
        let account = inner
            .accounts
            .values_mut()
            .find(|a| a.identity.uid == identity.uid)
            .ok_or_else(|| ProviderError::new(USER_NOT_FOUND, "User no longer exists."))?;
        account.identity.display_name = Some(display_name.to_owned());
        let updated = account.identity.clone();
        Ok(self.sign_in_as(&mut inner, updated))
    }

    async fn sign_in_with_google(&self) -> Result<Arc<Identity>, ProviderError> {
        self.record_call("sign_in_with_google");
        let mut inner = self.lock();
        match inner.popup.clone() {
            PopupOutcome::Account(identity) => Ok(self.sign_in_as(&mut inner, identity)),
            PopupOutcome::ClosedByUser => Err(ProviderError::new(POPUP_CLOSED_BY_USER, "The popup has been closed by the user.")),
            PopupOutcome::Fail(err) => Err(err),
        }
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.record_call("sign_out");
        let mut inner = self.lock();
        if let Some(err) = inner.sign_out_failure.clone() {
            return Err(err);
        }
        inner.current = None;
        broadcast(&mut inner, None);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        self.record_call("send_password_reset");
        let email = normalize_email(email).ok_or_else(invalid_email)?;
        let mut inner = self.lock();
        if !inner.accounts.contains_key(&email) {
            return Err(ProviderError::new(USER_NOT_FOUND, "There is no user record corresponding to this identifier."));
        }
        inner.password_resets.push(email);
        Ok(())
    }

    async fn send_verification_email(&self, identity: &Identity) -> Result<(), ProviderError> {
        self.record_call("send_verification_email");
        let email = identity
            .email
            .clone()
            .ok_or_else(|| ProviderError::new(INVALID_EMAIL, "User has no email address."))?;
        self.lock().verification_emails.push(email);
        Ok(())
    }

    async fn reauthenticate(&self, identity: &Identity, current_password: &str) -> Result<(), ProviderError> {
        self.record_call("reauthenticate");
        let inner = self.lock();
        if inner.stale_session {
            return Err(requires_recent_login());
        }
        let account = inner
            .accounts
            .values()
            .find(|a| a.identity.uid == identity.uid)
            .ok_or_else(|| ProviderError::new(USER_NOT_FOUND, "User no longer exists."))?;
        if account.password != current_password {
            return Err(wrong_password());
        }
        Ok(())
    }

    async fn change_password(&self, identity: &Identity, new_password: &str) -> Result<(), ProviderError> {
        self.record_call("change_password");
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(ProviderError::new(WEAK_PASSWORD, "Password should be at least 6 characters."));
        }
        let mut inner = self.lock();
        if inner.stale_session {
            return Err(requires_recent_login());
        }
        let account = inner
            .accounts
            .values_mut()
            .find(|a| a.identity.uid == identity.uid)
            .ok_or_else(|| ProviderError::new(USER_NOT_FOUND, "User no longer exists."))?;
        new_password.clone_into(&mut account.password);
        Ok(())
    }

    async fn mint_token(&self, identity: &Identity) -> Result<String, ProviderError> {
        self.record_call("mint_token");
        let inner = self.lock();
        match &inner.current {
            Some(current) if current.uid == identity.uid => Ok(generate_token()),
            _ => Err(ProviderError::new(USER_TOKEN_EXPIRED, "The user's credential is no longer valid.")),
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn broadcast(inner: &mut MemoryInner, identity: Option<Arc<Identity>>) {
    inner
        .subscribers
        .retain(|tx| tx.send(identity.clone()).is_ok());
}

fn new_identity(email: &str, email_verified: bool) -> Identity {
    Identity {
        uid: Uuid::new_v4().simple().to_string(),
        email: Some(email.to_owned()),
        email_verified,
        display_name: None,
        photo_url: None,
    }
}

fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// Random 32-byte hex token.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn invalid_email() -> ProviderError {
    ProviderError::new(INVALID_EMAIL, "The email address is badly formatted.")
}

fn wrong_password() -> ProviderError {
    ProviderError::new(WRONG_PASSWORD, "The password is invalid.")
}

fn requires_recent_login() -> ProviderError {
    ProviderError::new(
        REQUIRES_RECENT_LOGIN,
        "This operation is sensitive and requires recent authentication.",
    )
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
