//! Application root context.
//!
//! DESIGN
//! ======
//! `AppState` is built once by the host and owns the single instance of each
//! component. Components receive their collaborators through constructors;
//! nothing is looked up globally. Clone is cheap: every field is an `Arc` or
//! a cloneable handle.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::backend::{BackendApi, BackendError};
use crate::config::SessionConfig;
use crate::gate::NavigationGate;
use crate::notify::Notifier;
use crate::preferences::PreferencesStore;
use crate::provider::TokenProvider;
use crate::session::SessionController;
use crate::theme::ThemeState;

#[derive(Clone)]
pub struct AppState {
    pub notifier: Notifier,
    pub session: Arc<SessionController>,
    pub gate: Arc<NavigationGate>,
    pub preferences: Arc<PreferencesStore>,
    pub theme: ThemeState,
    /// Task applying loaded themes. Aborted with the last clone.
    _theme_follower: Arc<AbortOnDrop>,
}

impl AppState {
    /// Wire every component against the HTTP backend described by `config`
    /// and start the session.
    ///
    /// Must run inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &SessionConfig, provider: Arc<dyn TokenProvider>) -> Result<Self, BackendError> {
        let backend: Arc<dyn BackendApi> = Arc::new(config.http_backend()?);
        Ok(Self::with_backend(config, provider, backend))
    }

    #[must_use]
    pub fn with_backend(config: &SessionConfig, provider: Arc<dyn TokenProvider>, backend: Arc<dyn BackendApi>) -> Self {
        let notifier = config.notifier();
        let session = Arc::new(SessionController::new(provider, Arc::clone(&backend), notifier.clone()));
        let preferences = PreferencesStore::attach(Arc::clone(&session), backend);
        let theme = ThemeState::default();
        let follower = theme.follow(preferences.subscribe());
        let gate = Arc::new(NavigationGate::new(Arc::clone(&session), config.default_route.clone()));

        session.initialize();
        info!(
            configured = session.is_configured(),
            api_base_url = %config.api_base_url,
            default_route = %config.default_route,
            "session core started"
        );

        Self {
            notifier,
            session,
            gate,
            preferences,
            theme,
            _theme_follower: Arc::new(AbortOnDrop(follower)),
        }
    }
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
