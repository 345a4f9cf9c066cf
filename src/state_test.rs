use super::*;
use crate::backend::test_helpers::MockBackend;
use crate::gate::Route;
use crate::preferences::UserPreferences;
use crate::provider::memory::MemoryProvider;
use crate::theme::Theme;

fn config() -> SessionConfig {
    SessionConfig::from_lookup(|key| (key == "DEFAULT_ROUTE").then(|| "/welcome".to_owned()))
}

#[tokio::test]
async fn new_builds_http_backend_and_starts_session() {
    let provider = Arc::new(MemoryProvider::new());
    let app = AppState::new(&config(), provider).unwrap();

    app.session.wait_until_settled().await;
    assert!(app.session.is_configured());
    assert_eq!(app.gate.default_route(), &Route::public("/welcome"));
}

#[tokio::test]
async fn unconfigured_provider_runs_signed_out() {
    let app = AppState::new(&config(), Arc::new(MemoryProvider::unconfigured())).unwrap();
    assert!(!app.session.is_configured());
    assert!(!app.session.is_pending());
}

#[tokio::test]
async fn components_share_one_session() {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_account("ada@example.com", "correct-horse", true);
    let backend = Arc::new(MockBackend::default());
    backend.set_me(Some(UserPreferences { theme: Some(Theme::Dark), ..UserPreferences::default() }));
    let app = AppState::with_backend(&config(), provider, backend);
    app.session.wait_until_settled().await;

    app.session.sign_in("ada@example.com", "correct-horse").await.unwrap();
    app.preferences.load().await.unwrap();
    let mut theme = app.theme.subscribe();
    theme.wait_for(|t| *t == Theme::Dark).await.unwrap();

    let decision = app.gate.resolve(Route::protected("/stories")).await;
    assert!(!decision.is_redirect());

    app.session.logout().await;
    assert_eq!(app.preferences.preferences(), UserPreferences::default());
    assert_eq!(app.notifier.current().text, crate::session::messages::SIGNED_OUT);
}
