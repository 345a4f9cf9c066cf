//! Session orchestration core.
//!
//! Owns the authenticated identity, mints bearer tokens for feature stores,
//! gates navigation on auth state, and drives a single transient
//! notification. See [`state::AppState`] for how the pieces are wired.

pub mod backend;
pub mod config;
pub mod gate;
pub mod notify;
pub mod preferences;
pub mod provider;
pub mod session;
pub mod state;
pub mod theme;

pub use config::SessionConfig;
pub use gate::{GateDecision, NavigationGate, Route};
pub use notify::{Notifier, Severity};
pub use provider::{Identity, ProviderError, TokenProvider};
pub use session::{SessionController, SessionError, SessionState};
pub use state::AppState;

/// Install a `fmt` subscriber unless the host already set one.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().try_init();
}
