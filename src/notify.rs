//! Notification scheduler: one transient, typed, auto-expiring message.
//!
//! DESIGN
//! ======
//! The visible notification lives in a `watch` channel so renderers observe
//! it without polling. At most one auto-hide timer is outstanding: every
//! `notify` aborts the previous timer task before arming its own, and each
//! timer carries a generation number so a timer that already woke cannot
//! hide a newer message.
//!
//! `notify` spawns onto the ambient Tokio runtime and must be called from
//! inside one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_DURATION_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

/// Snapshot of what the renderer should show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationState {
    pub visible: bool,
    pub text: String,
    pub severity: Severity,
    /// Renderer may interpret `text` as markup.
    pub html_allowed: bool,
    /// Auto-hide interval of the current message; `0` means sticky.
    pub expiry_ms: u64,
}

/// Per-call options for [`Notifier::notify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyOptions {
    pub html_allowed: bool,
    /// `None` uses the notifier default; `Some(0)` disables auto-hide.
    pub duration_ms: Option<u64>,
}

struct TimerSlot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

struct NotifierInner {
    state: watch::Sender<NotificationState>,
    timer: Mutex<TimerSlot>,
    default_duration_ms: u64,
}

/// Cloneable handle to the shared notification slot.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::with_default_duration(DEFAULT_DURATION_MS)
    }

    #[must_use]
    pub fn with_default_duration(default_duration_ms: u64) -> Self {
        let (state, _) = watch::channel(NotificationState::default());
        Self {
            inner: Arc::new(NotifierInner {
                state,
                timer: Mutex::new(TimerSlot { generation: 0, handle: None }),
                default_duration_ms,
            }),
        }
    }

    /// Show `message`, replacing whatever is visible and re-arming auto-hide.
    pub fn notify(&self, message: impl Into<String>, severity: Severity, options: NotifyOptions) {
        let duration_ms = options
            .duration_ms
            .unwrap_or(self.inner.default_duration_ms);

        let mut slot = self.inner.lock_timer();
        if let Some(previous) = slot.handle.take() {
            previous.abort();
            debug!(generation = slot.generation, "cancelled pending auto-hide");
        }
        slot.generation += 1;
        let generation = slot.generation;

        self.inner.state.send_replace(NotificationState {
            visible: true,
            text: message.into(),
            severity,
            html_allowed: options.html_allowed,
            expiry_ms: duration_ms,
        });

        if duration_ms > 0 {
            let inner = Arc::downgrade(&self.inner);
            slot.handle = Some(tokio::spawn(expire_after(inner, generation, duration_ms)));
            debug!(generation, duration_ms, ?severity, "notification shown with auto-hide");
        } else {
            debug!(generation, ?severity, "notification shown without auto-hide");
        }
    }

    /// Clear the visible notification. Safe to call repeatedly.
    pub fn hide(&self) {
        let mut slot = self.inner.lock_timer();
        if let Some(handle) = slot.handle.take() {
            handle.abort();
        }
        slot.generation += 1;
        self.inner.clear();
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(message, Severity::Success, NotifyOptions::default());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(message, Severity::Error, NotifyOptions::default());
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.notify(message, Severity::Warning, NotifyOptions::default());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(message, Severity::Info, NotifyOptions::default());
    }

    #[must_use]
    pub fn current(&self) -> NotificationState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.inner.state.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifierInner {
    fn lock_timer(&self) -> MutexGuard<'_, TimerSlot> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clear(&self) {
        self.state.send_modify(|s| {
            s.visible = false;
            s.text.clear();
            s.html_allowed = false;
            s.expiry_ms = 0;
        });
    }

    fn expire(&self, generation: u64) {
        let mut slot = self.lock_timer();
        if slot.generation != generation {
            return;
        }
        // Dropping our own handle detaches it; the task is already finishing.
        slot.handle = None;
        self.clear();
        debug!(generation, "notification auto-hidden");
    }
}

async fn expire_after(inner: Weak<NotifierInner>, generation: u64, duration_ms: u64) {
    tokio::time::sleep(Duration::from_millis(duration_ms)).await;
    if let Some(inner) = inner.upgrade() {
        inner.expire(generation);
    }
}

#[cfg(test)]
#[path = "notify_test.rs"]
mod tests;
