//! Light/dark theme selection.
//!
//! The theme component never reaches into preferences. It follows the
//! preferences event stream and applies whatever theme a load reports, so
//! the dependency points one way: preferences publish, theme listens.
//! Persistence is left to the host.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::preferences::PreferencesEvent;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Value for the renderer's `data-theme` attribute.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Read an optional theme, treating values other than `light`/`dark`
/// (e.g. `"system"`) as unset instead of failing the surrounding document.
pub(crate) fn deserialize_known<'de, D>(deserializer: D) -> Result<Option<Theme>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match serde_json::from_value::<Theme>(raw.clone()) {
        Ok(theme) => Ok(Some(theme)),
        Err(_) => {
            warn!(value = %raw, "ignoring unknown theme");
            Ok(None)
        }
    }
}

#[derive(Clone)]
pub struct ThemeState {
    current: Arc<watch::Sender<Theme>>,
}

impl ThemeState {
    #[must_use]
    pub fn new(initial: Theme) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { current: Arc::new(tx) }
    }

    #[must_use]
    pub fn current(&self) -> Theme {
        *self.current.borrow()
    }

    pub fn set(&self, theme: Theme) {
        self.current.send_replace(theme);
        debug!(theme = theme.as_str(), "theme applied");
    }

    /// Flip light/dark and return the new theme.
    pub fn toggle(&self) -> Theme {
        let next = self.current().toggled();
        self.set(next);
        next
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.current.subscribe()
    }

    /// Apply the theme carried by every preferences load until the stream closes.
    pub fn follow(&self, mut events: broadcast::Receiver<PreferencesEvent>) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(PreferencesEvent::Loaded { theme: Some(theme) }) => this.set(theme),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "theme listener lagged behind preferences events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl Default for ThemeState {
    fn default() -> Self {
        Self::new(Theme::Light)
    }
}

#[cfg(test)]
#[path = "theme_test.rs"]
mod tests;
