//! Navigation gate: decides whether a route transition may proceed.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every route transition goes through [`NavigationGate::resolve`]. While the
//! session is still resolving its first identity event the transition is
//! suspended (not cancelled) on a one-shot wait; dropping the returned future
//! abandons it and releases the wait.
//!
//! After the first resolution, [`NavigationGate::watch_sign_out`] covers the
//! other direction: a session that loses its identity while the current
//! route requires auth is redirected away without waiting for the next
//! navigation attempt.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::session::SessionController;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub requires_auth: bool,
}

impl Route {
    #[must_use]
    pub fn public(path: impl Into<String>) -> Self {
        Self { path: path.into(), requires_auth: false }
    }

    #[must_use]
    pub fn protected(path: impl Into<String>) -> Self {
        Self { path: path.into(), requires_auth: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Complete the requested navigation.
    Proceed(Route),
    /// Navigate here instead.
    Redirect(Route),
}

impl GateDecision {
    /// The route the renderer should end up on.
    #[must_use]
    pub fn route(&self) -> &Route {
        match self {
            Self::Proceed(route) | Self::Redirect(route) => route,
        }
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect(_))
    }
}

pub struct NavigationGate {
    session: Arc<SessionController>,
    default_route: Route,
    current: Arc<watch::Sender<Option<Route>>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl NavigationGate {
    /// `default_route` is where unauthenticated users are sent; it never
    /// requires auth itself.
    #[must_use]
    pub fn new(session: Arc<SessionController>, default_route: impl Into<String>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            session,
            default_route: Route::public(default_route),
            current: Arc::new(current),
            watcher: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn default_route(&self) -> &Route {
        &self.default_route
    }

    /// The route of the last completed transition.
    #[must_use]
    pub fn current_route(&self) -> Option<Route> {
        self.current.borrow().clone()
    }

    /// Evaluate a transition to `target`, waiting first if the session has
    /// not resolved yet.
    pub async fn resolve(&self, target: Route) -> GateDecision {
        if self.session.is_pending() {
            debug!(path = %target.path, "navigation suspended until session resolves");
            self.session.wait_until_settled().await;
        }

        let decision = if target.requires_auth && !self.session.is_authenticated() {
            info!(path = %target.path, to = %self.default_route.path, "redirecting unauthenticated navigation");
            GateDecision::Redirect(self.default_route.clone())
        } else {
            GateDecision::Proceed(target)
        };
        self.current.send_replace(Some(decision.route().clone()));
        decision
    }

    /// Redirect to the default route whenever an authenticated session
    /// becomes unauthenticated while the current route requires auth.
    ///
    /// `navigate` receives the path to move to. Replaces any previous
    /// watcher; the task stops when the gate is dropped.
    pub fn watch_sign_out<F>(&self, navigate: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut session = self.session.subscribe();
        // Baseline is taken when the watcher is armed, not when the task
        // first runs, so a sign-out in between is still seen as a change.
        let mut was_authenticated = session.borrow_and_update().is_authenticated();
        let current = Arc::clone(&self.current);
        let fallback = self.default_route.clone();

        let handle = tokio::spawn(async move {
            while session.changed().await.is_ok() {
                let authenticated = session.borrow_and_update().is_authenticated();
                let lost_session = was_authenticated && !authenticated;
                was_authenticated = authenticated;
                if !lost_session {
                    continue;
                }

                let on_protected = current
                    .borrow()
                    .as_ref()
                    .is_some_and(|route| route.requires_auth);
                if on_protected {
                    info!(to = %fallback.path, "session ended on protected route; redirecting");
                    current.send_replace(Some(fallback.clone()));
                    navigate(&fallback.path);
                }
            }
        });

        if let Some(previous) = self.lock_watcher().replace(handle) {
            previous.abort();
        }
    }

    fn lock_watcher(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.watcher.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NavigationGate {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_watcher().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
