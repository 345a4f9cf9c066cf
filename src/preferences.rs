//! User preferences: the collaborator cleared on logout.
//!
//! DESIGN
//! ======
//! `PreferencesStore::attach` registers `clear` as a session logout hook, so
//! preferences are gone before the sign-out notification is shown. Loads
//! publish a `PreferencesEvent` on a broadcast channel; the theme component
//! listens there instead of being called from here.
//!
//! `preferred_language` is derived on every call from the stored list, never
//! cached.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::backend::{BackendApi, BackendError};
use crate::session::{SessionController, SessionError};
use crate::theme::Theme;

pub const DEFAULT_LANGUAGE: &str = "Chinese";

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_languages: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "crate::theme::deserialize_known",
        skip_serializing_if = "Option::is_none"
    )]
    pub theme: Option<Theme>,
}

impl UserPreferences {
    /// Overwrite fields that are set in `other`.
    pub fn merge(&mut self, other: UserPreferences) {
        if other.child_name.is_some() {
            self.child_name = other.child_name;
        }
        if other.child_age.is_some() {
            self.child_age = other.child_age;
        }
        if other.preferred_languages.is_some() {
            self.preferred_languages = other.preferred_languages;
        }
        if other.theme.is_some() {
            self.theme = other.theme;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferencesEvent {
    /// Preferences were fetched from the backend.
    Loaded { theme: Option<Theme> },
    /// Preferences were reset (logout).
    Cleared,
}

#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Default)]
struct PreferencesInner {
    preferences: UserPreferences,
    loading: bool,
    error: Option<String>,
}

pub struct PreferencesStore {
    session: Arc<SessionController>,
    backend: Arc<dyn BackendApi>,
    inner: Mutex<PreferencesInner>,
    events: broadcast::Sender<PreferencesEvent>,
}

impl PreferencesStore {
    /// Create the store and register it as the session's logout hook.
    pub fn attach(session: Arc<SessionController>, backend: Arc<dyn BackendApi>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let store = Arc::new(Self {
            session: Arc::clone(&session),
            backend,
            inner: Mutex::new(PreferencesInner::default()),
            events,
        });
        let weak = Arc::downgrade(&store);
        session.on_logout(move || {
            if let Some(store) = weak.upgrade() {
                store.clear();
            }
        });
        store
    }

    /// Fetch preferences for the signed-in user.
    ///
    /// Signed out: clears (publishing [`PreferencesEvent::Cleared`]) without
    /// touching the network.
    ///
    /// # Errors
    ///
    /// Returns an error if no bearer token can be minted or the backend fails.
    pub async fn load(&self) -> Result<(), PreferencesError> {
        if !self.session.is_authenticated() {
            self.clear();
            return Ok(());
        }

        self.begin();
        let result = self.fetch().await;
        let mut inner = self.lock();
        inner.loading = false;
        match result {
            Ok(preferences) => {
                let theme = preferences.theme;
                inner.preferences = preferences;
                drop(inner);
                debug!(?theme, "preferences loaded");
                let _ = self.events.send(PreferencesEvent::Loaded { theme });
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "loading preferences failed");
                inner.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Persist `preferences` and merge them into local state.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when signed out, or the backend failure.
    pub async fn save(&self, preferences: UserPreferences) -> Result<(), PreferencesError> {
        if !self.session.is_authenticated() {
            return Err(SessionError::NotAuthenticated.into());
        }

        self.begin();
        let result = self.persist(&preferences).await;
        let mut inner = self.lock();
        inner.loading = false;
        match result {
            Ok(()) => {
                inner.preferences.merge(preferences);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "saving preferences failed");
                inner.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Replace the preferred language list and save.
    ///
    /// # Errors
    ///
    /// Same as [`PreferencesStore::save`].
    pub async fn update_preferred_languages(&self, languages: Vec<String>) -> Result<(), PreferencesError> {
        let mut next = self.preferences();
        next.preferred_languages = Some(languages);
        self.save(next).await
    }

    /// Reset to empty. Registered as the session logout hook.
    pub fn clear(&self) {
        {
            let mut inner = self.lock();
            inner.preferences = UserPreferences::default();
            inner.error = None;
        }
        let _ = self.events.send(PreferencesEvent::Cleared);
        debug!("preferences cleared");
    }

    #[must_use]
    pub fn preferences(&self) -> UserPreferences {
        self.lock().preferences.clone()
    }

    /// First preferred language, or [`DEFAULT_LANGUAGE`].
    #[must_use]
    pub fn preferred_language(&self) -> String {
        self.lock()
            .preferences
            .preferred_languages
            .as_ref()
            .and_then(|langs| langs.first().cloned())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_owned())
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PreferencesEvent> {
        self.events.subscribe()
    }

    async fn fetch(&self) -> Result<UserPreferences, PreferencesError> {
        let token = self.session.get_bearer_token().await?;
        let me = self.backend.fetch_me(&token).await?;
        Ok(me.preferences.unwrap_or_default())
    }

    async fn persist(&self, preferences: &UserPreferences) -> Result<(), PreferencesError> {
        let token = self.session.get_bearer_token().await?;
        self.backend.save_preferences(&token, preferences).await?;
        Ok(())
    }

    fn begin(&self) {
        let mut inner = self.lock();
        inner.loading = true;
        inner.error = None;
    }

    fn lock(&self) -> MutexGuard<'_, PreferencesInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "preferences_test.rs"]
mod tests;
