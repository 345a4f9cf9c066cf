//! Session state controller: identity, pending flag, auth flows, modals.
//!
//! DESIGN
//! ======
//! One `SessionController` exists per process, built by the application root
//! and handed to the navigation gate and feature stores as
//! `Arc<SessionController>`. State lives in `watch` channels so observers
//! react to changes without polling, and derived values (`is_authenticated`)
//! are recomputed from the primary state on every read.
//!
//! `initialize` subscribes to the provider's identity stream. The task that
//! drains it is owned by the controller and aborted on drop.
//!
//! CONCURRENCY
//! ===========
//! The identity callback can land at any point, including in the middle of
//! an explicit `sign_in`. Both paths write the same `watch` slot and neither
//! assumes ordering: the last write wins. A `logout` racing a `sign_in`
//! leaves whichever state completed last; neither is suppressed.
//!
//! ERROR HANDLING
//! ==============
//! Each failure is shown through the notifier and returned as a typed
//! [`SessionError`]. Exceptions: a cancelled popup is informational, a
//! failed logout is reported only, and the unverified-email reminder rides
//! along with a successful sign-in.

pub mod error;
pub mod messages;
pub mod modal;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{BackendApi, GoogleSyncRequest};
use crate::notify::Notifier;
use crate::provider::{
    INVALID_CREDENTIAL, INVALID_EMAIL, Identity, ProviderError, REQUIRES_RECENT_LOGIN, TokenProvider, USER_NOT_FOUND,
    WRONG_PASSWORD,
};

pub use error::SessionError;
pub use modal::ModalState;

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Shared reference to the provider's identity; tokens are minted through it.
    pub identity: Option<Arc<Identity>>,
    /// True until the first provider resolution, and while a credential flow is in flight.
    pub pending: bool,
    pub last_error: Option<String>,
    pub configured: bool,
    /// Set once the provider's first identity event has been applied.
    resolved: bool,
}

impl SessionState {
    fn new(configured: bool) -> Self {
        Self { identity: None, pending: true, last_error: None, configured, resolved: false }
    }

    fn resolve(&mut self) {
        self.pending = false;
        self.resolved = true;
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

/// Result of a third-party sign-in that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupSignIn {
    SignedIn(Arc<Identity>),
    /// The user dismissed the popup.
    Cancelled,
}

impl PopupSignIn {
    /// Treat cancellation as [`SessionError::UserCancelled`].
    ///
    /// # Errors
    ///
    /// Returns `UserCancelled` when the popup was dismissed.
    pub fn into_identity(self) -> Result<Arc<Identity>, SessionError> {
        match self {
            Self::SignedIn(identity) => Ok(identity),
            Self::Cancelled => Err(SessionError::UserCancelled),
        }
    }
}

type LogoutHook = Box<dyn Fn() + Send + Sync>;

/// Sets `pending` on creation and releases it on drop, so every exit path
/// of a credential flow (including a dropped future) releases it. Before the
/// provider's first identity event, release leaves `pending` set.
struct PendingGuard<'a> {
    state: &'a watch::Sender<SessionState>,
}

impl<'a> PendingGuard<'a> {
    fn begin(state: &'a watch::Sender<SessionState>) -> Self {
        state.send_modify(|s| {
            s.pending = true;
            s.last_error = None;
        });
        Self { state }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.pending = !s.resolved);
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct SessionController {
    provider: Arc<dyn TokenProvider>,
    backend: Arc<dyn BackendApi>,
    notifier: Notifier,
    state: Arc<watch::Sender<SessionState>>,
    modal: watch::Sender<ModalState>,
    logout_hooks: Mutex<Vec<LogoutHook>>,
    initialized: AtomicBool,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    #[must_use]
    pub fn new(provider: Arc<dyn TokenProvider>, backend: Arc<dyn BackendApi>, notifier: Notifier) -> Self {
        let (state, _) = watch::channel(SessionState::new(provider.is_configured()));
        let (modal, _) = watch::channel(ModalState::default());
        Self {
            provider,
            backend,
            notifier,
            state: Arc::new(state),
            modal,
            logout_hooks: Mutex::new(Vec::new()),
            initialized: AtomicBool::new(false),
            subscription: Mutex::new(None),
        }
    }

    /// Start tracking the provider's identity. Idempotent.
    ///
    /// Must run inside a Tokio runtime. Without a real provider
    /// configuration the session resolves immediately as signed out.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("session already initialized");
            return;
        }

        let configured = self.provider.is_configured();
        if !configured {
            warn!("identity provider not configured; session runs signed out");
            self.state.send_modify(|s| {
                s.configured = false;
                s.identity = None;
                s.resolve();
            });
            return;
        }
        self.state.send_modify(|s| s.configured = true);

        let mut stream = self.provider.on_identity_change();
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            while let Some(identity) = stream.recv().await {
                info!(uid = ?identity.as_ref().map(|i| i.uid.as_str()), "identity changed");
                state.send_modify(|s| {
                    s.identity = identity;
                    s.resolve();
                });
            }
            debug!("identity stream closed");
        });
        *self.lock_subscription() = Some(handle);
    }

    // -------------------------------------------------------------------------
    // accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Arc<Identity>> {
        self.state.borrow().identity.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.borrow().pending
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.state.borrow().configured
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Resolve once `pending` is false.
    pub async fn wait_until_settled(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| !s.pending).await;
    }

    /// Register a callback run synchronously on successful logout, before
    /// the success notification. Hooks must not register further hooks.
    pub fn on_logout(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.logout_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
    }

    // -------------------------------------------------------------------------
    // credential flows
    // -------------------------------------------------------------------------

    /// Email/password sign-in.
    ///
    /// # Errors
    ///
    /// `NotConfigured` without contacting the provider, or `SignInFailed`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Arc<Identity>, SessionError> {
        self.ensure_configured("sign_in")?;
        let _pending = PendingGuard::begin(&self.state);

        match self.provider.sign_in_with_password(email, password).await {
            Ok(identity) => {
                self.set_identity(Some(Arc::clone(&identity)));
                info!(uid = %identity.uid, verified = identity.email_verified, "signed in");
                if identity.email_verified {
                    self.notifier.success(messages::SIGNED_IN);
                } else {
                    self.notifier.info(messages::SIGNED_IN_UNVERIFIED);
                }
                Ok(identity)
            }
            Err(err) => {
                warn!(code = %err.code, "sign in rejected");
                self.record_error(&err.message);
                self.notifier.error(messages::sign_in_failed(&err));
                Err(SessionError::SignInFailed(err))
            }
        }
    }

    /// Create an account, optionally set its display name, and request
    /// email verification.
    ///
    /// A failed verification email does not fail the sign-up.
    ///
    /// # Errors
    ///
    /// `NotConfigured`, or `SignUpFailed` when account creation or the
    /// profile update is rejected.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Arc<Identity>, SessionError> {
        self.ensure_configured("sign_up")?;
        let _pending = PendingGuard::begin(&self.state);

        let mut identity = match self.provider.create_account(email, password).await {
            Ok(identity) => identity,
            Err(err) => return Err(self.sign_up_rejected(err)),
        };
        if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
            identity = match self.provider.update_profile(&identity, name).await {
                Ok(updated) => updated,
                Err(err) => return Err(self.sign_up_rejected(err)),
            };
        }
        self.set_identity(Some(Arc::clone(&identity)));
        info!(uid = %identity.uid, "account created");

        match self.provider.send_verification_email(&identity).await {
            Ok(()) => self.notifier.success(messages::ACCOUNT_CREATED),
            Err(err) => {
                warn!(code = %err.code, "verification email not sent after sign up");
                self.notifier.warning(messages::ACCOUNT_CREATED_NO_EMAIL);
            }
        }
        Ok(identity)
    }

    /// Google popup sign-in followed by a backend user upsert.
    ///
    /// All-or-nothing: if the upsert fails the provider session is signed
    /// out again and the identity cleared.
    ///
    /// # Errors
    ///
    /// `NotConfigured`, `SignInFailed`, or `BackendSyncFailed`. A dismissed
    /// popup is `Ok(PopupSignIn::Cancelled)`.
    pub async fn sign_in_with_google(&self) -> Result<PopupSignIn, SessionError> {
        self.ensure_configured("sign_in_with_google")?;
        let _pending = PendingGuard::begin(&self.state);

        let identity = match self.provider.sign_in_with_google().await {
            Ok(identity) => identity,
            Err(err) if err.is_cancelled_popup() => {
                info!("google sign-in cancelled by user");
                self.notifier.info(messages::SIGN_IN_CANCELLED);
                return Ok(PopupSignIn::Cancelled);
            }
            Err(err) => {
                warn!(code = %err.code, "google sign-in rejected");
                self.record_error(&err.message);
                self.notifier.error(messages::sign_in_failed(&err));
                return Err(SessionError::SignInFailed(err));
            }
        };

        if let Err(detail) = self.sync_backend_user(&identity).await {
            warn!(uid = %identity.uid, error = %detail, "backend sync failed; rolling back sign-in");
            if let Err(err) = self.provider.sign_out().await {
                warn!(code = %err.code, "rollback sign-out failed");
            }
            self.set_identity(None);
            self.record_error(&detail);
            self.notifier.error(messages::backend_sync_failed(&detail));
            return Err(SessionError::BackendSyncFailed(detail));
        }

        self.set_identity(Some(Arc::clone(&identity)));
        info!(uid = %identity.uid, "signed in with google");
        self.notifier.success(messages::SIGNED_IN_GOOGLE);
        Ok(PopupSignIn::SignedIn(identity))
    }

    /// Sign out and run logout hooks. Failures are reported, not returned.
    pub async fn logout(&self) {
        if !self.is_configured() {
            self.set_identity(None);
            debug!("local sign out without provider");
            return;
        }

        match self.provider.sign_out().await {
            Ok(()) => {
                self.set_identity(None);
                self.run_logout_hooks();
                info!("signed out");
                self.notifier.success(messages::SIGNED_OUT);
            }
            Err(err) => {
                warn!(code = %err.code, "sign out failed");
                self.record_error(&err.message);
                self.notifier.error(messages::sign_out_failed(&err));
            }
        }
    }

    /// Change the password, re-authenticating first when `current_password`
    /// is given.
    ///
    /// # Errors
    ///
    /// `NotConfigured`, `NotAuthenticated`, `ReauthRequired` (stale session),
    /// `WrongPassword`, or `Provider`.
    pub async fn change_password(&self, new_password: &str, current_password: Option<&str>) -> Result<(), SessionError> {
        self.ensure_configured("change_password")?;
        let identity = self.require_identity("change_password")?;

        if let Some(current) = current_password {
            if let Err(err) = self.provider.reauthenticate(&identity, current).await {
                return Err(self.password_change_rejected(err));
            }
        }
        if let Err(err) = self.provider.change_password(&identity, new_password).await {
            return Err(self.password_change_rejected(err));
        }

        info!(uid = %identity.uid, "password changed");
        self.notifier.success(messages::PASSWORD_CHANGED);
        Ok(())
    }

    /// # Errors
    ///
    /// `NotConfigured`, `UserNotFound`, `InvalidEmail`, or `Provider`.
    pub async fn forgot_password(&self, email: &str) -> Result<(), SessionError> {
        self.ensure_configured("forgot_password")?;
        match self.provider.send_password_reset(email).await {
            Ok(()) => {
                info!("password reset email requested");
                self.notifier.success(messages::PASSWORD_RESET_SENT);
                Ok(())
            }
            Err(err) => Err(self.lookup_rejected("forgot_password", err)),
        }
    }

    /// # Errors
    ///
    /// `NotConfigured`, `NotAuthenticated`, `UserNotFound`, `InvalidEmail`,
    /// or `Provider`.
    pub async fn resend_email_verification(&self) -> Result<(), SessionError> {
        self.ensure_configured("resend_email_verification")?;
        let identity = self.require_identity("resend_email_verification")?;
        if identity.email_verified {
            self.notifier.info(messages::ALREADY_VERIFIED);
            return Ok(());
        }

        match self.provider.send_verification_email(&identity).await {
            Ok(()) => {
                info!(uid = %identity.uid, "verification email resent");
                self.notifier.success(messages::VERIFICATION_SENT);
                Ok(())
            }
            Err(err) => Err(self.lookup_rejected("resend_email_verification", err)),
        }
    }

    /// Mint a fresh bearer token for the current identity.
    ///
    /// Waits for any pending resolution first, so a token is never minted
    /// for an identity that is about to change. Tokens are never cached.
    ///
    /// # Errors
    ///
    /// `NotConfigured`, `NotAuthenticated`, or `Provider`.
    pub async fn get_bearer_token(&self) -> Result<String, SessionError> {
        self.ensure_configured("get_bearer_token")?;
        self.wait_until_settled().await;
        let identity = self.require_identity("get_bearer_token")?;

        self.provider
            .mint_token(&identity)
            .await
            .map_err(|err| {
                warn!(code = %err.code, "token mint failed");
                self.notifier.error(messages::describe(&err));
                SessionError::Provider(err)
            })
    }

    // -------------------------------------------------------------------------
    // modals
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn modal_state(&self) -> ModalState {
        *self.modal.borrow()
    }

    #[must_use]
    pub fn subscribe_modal(&self) -> watch::Receiver<ModalState> {
        self.modal.subscribe()
    }

    pub fn open_login_modal(&self) {
        self.modal.send_modify(ModalState::open_login);
    }

    pub fn close_login_modal(&self) {
        self.modal.send_modify(ModalState::close_login);
    }

    pub fn open_signup_modal(&self) {
        self.modal.send_modify(ModalState::open_signup);
    }

    pub fn close_signup_modal(&self) {
        self.modal.send_modify(ModalState::close_signup);
    }

    /// Gate an authenticated action. Signed out: tells the user what was
    /// blocked, opens the login modal, and returns `false`.
    pub fn require_auth(&self, action_label: &str) -> bool {
        if self.is_authenticated() {
            return true;
        }
        debug!(action = action_label, "action requires authentication");
        self.notifier.info(messages::login_required(action_label));
        self.open_login_modal();
        false
    }

    // -------------------------------------------------------------------------
    // helpers
    // -------------------------------------------------------------------------

    fn ensure_configured(&self, op: &'static str) -> Result<(), SessionError> {
        if self.is_configured() {
            return Ok(());
        }
        warn!(op, "identity provider not configured");
        self.notifier.error(messages::NOT_CONFIGURED);
        Err(SessionError::NotConfigured)
    }

    fn require_identity(&self, op: &'static str) -> Result<Arc<Identity>, SessionError> {
        self.identity().ok_or_else(|| {
            debug!(op, "no identity");
            self.notifier.error(messages::NOT_AUTHENTICATED);
            SessionError::NotAuthenticated
        })
    }

    fn set_identity(&self, identity: Option<Arc<Identity>>) {
        self.state.send_modify(|s| s.identity = identity);
    }

    fn record_error(&self, message: &str) {
        let message = message.to_owned();
        self.state.send_modify(|s| s.last_error = Some(message));
    }

    fn sign_up_rejected(&self, err: ProviderError) -> SessionError {
        warn!(code = %err.code, "sign up rejected");
        self.record_error(&err.message);
        self.notifier.error(messages::sign_up_failed(&err));
        SessionError::SignUpFailed(err)
    }

    fn password_change_rejected(&self, err: ProviderError) -> SessionError {
        self.record_error(&err.message);
        let (mapped, text) = if err.is(REQUIRES_RECENT_LOGIN) {
            (SessionError::ReauthRequired, messages::REAUTH_REQUIRED.to_owned())
        } else if err.is(WRONG_PASSWORD) || err.is(INVALID_CREDENTIAL) {
            (SessionError::WrongPassword, messages::WRONG_CURRENT_PASSWORD.to_owned())
        } else {
            let text = messages::describe(&err);
            (SessionError::Provider(err), text)
        };
        warn!(code = mapped.error_code(), "password change rejected");
        self.notifier.error(text);
        mapped
    }

    fn lookup_rejected(&self, op: &'static str, err: ProviderError) -> SessionError {
        warn!(op, code = %err.code, "provider rejected request");
        self.record_error(&err.message);
        self.notifier.error(messages::describe(&err));
        if err.is(USER_NOT_FOUND) {
            SessionError::UserNotFound
        } else if err.is(INVALID_EMAIL) {
            SessionError::InvalidEmail
        } else {
            SessionError::Provider(err)
        }
    }

    async fn sync_backend_user(&self, identity: &Identity) -> Result<(), String> {
        let token = self
            .provider
            .mint_token(identity)
            .await
            .map_err(|e| e.to_string())?;
        self.backend
            .sync_google_user(&token, &GoogleSyncRequest::from(identity))
            .await
            .map_err(|e| e.to_string())
    }

    fn run_logout_hooks(&self) {
        let hooks = self
            .logout_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for hook in hooks.iter() {
            hook();
        }
    }

    fn lock_subscription(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_subscription().take() {
            handle.abort();
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
