use super::*;

// =============================================================================
// sign in / accounts
// =============================================================================

#[tokio::test]
async fn sign_in_with_correct_password_returns_identity() {
    let provider = MemoryProvider::new();
    let created = provider.add_account("Reader@Example.com", "secret1", true);
    let identity = provider
        .sign_in_with_password("reader@example.com", "secret1")
        .await
        .unwrap();
    assert_eq!(identity.uid, created.uid);
    assert_eq!(identity.email.as_deref(), Some("reader@example.com"));
    assert_eq!(provider.current().map(|i| i.uid.clone()), Some(created.uid));
}

#[tokio::test]
async fn sign_in_errors_carry_adapter_codes() {
    let provider = MemoryProvider::new();
    provider.add_account("a@b.com", "secret1", true);

    let err = provider.sign_in_with_password("a@b.com", "nope").await.unwrap_err();
    assert!(err.is(WRONG_PASSWORD));

    let err = provider.sign_in_with_password("x@b.com", "secret1").await.unwrap_err();
    assert!(err.is(USER_NOT_FOUND));

    let err = provider.sign_in_with_password("not-an-email", "secret1").await.unwrap_err();
    assert!(err.is(INVALID_EMAIL));
}

#[tokio::test]
async fn create_account_rejects_duplicates_and_weak_passwords() {
    let provider = MemoryProvider::new();
    provider.add_account("a@b.com", "secret1", true);

    let err = provider.create_account("a@b.com", "another1").await.unwrap_err();
    assert!(err.is(EMAIL_ALREADY_IN_USE));

    let err = provider.create_account("new@b.com", "123").await.unwrap_err();
    assert!(err.is(WEAK_PASSWORD));

    let identity = provider.create_account("new@b.com", "123456").await.unwrap();
    assert!(!identity.email_verified);
}

#[tokio::test]
async fn held_sign_in_waits_for_release_and_disarms() {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_account("a@b.com", "secret1", true);
    let release = provider.hold_sign_in();

    let held = Arc::clone(&provider);
    let task = tokio::spawn(async move { held.sign_in_with_password("a@b.com", "secret1").await });
    tokio::task::yield_now().await;
    assert!(!task.is_finished());
    assert!(provider.current().is_none());

    release.notify_one();
    assert!(task.await.unwrap().is_ok());
    assert!(provider.current().is_some());

    // One-shot: the next sign-in is not held.
    provider.sign_in_with_password("a@b.com", "secret1").await.unwrap();
}

#[tokio::test]
async fn update_profile_sets_display_name() {
    let provider = MemoryProvider::new();
    let identity = provider.create_account("new@b.com", "123456").await.unwrap();
    let updated = provider.update_profile(&identity, "Mia").await.unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("Mia"));
    assert_eq!(updated.uid, identity.uid);
}

// =============================================================================
// identity stream
// =============================================================================

#[tokio::test]
async fn subscriber_receives_current_then_changes() {
    let provider = MemoryProvider::new();
    provider.add_account("a@b.com", "secret1", true);
    let mut stream = provider.on_identity_change();

    assert_eq!(stream.recv().await, Some(None));

    provider.sign_in_with_password("a@b.com", "secret1").await.unwrap();
    let signed_in = stream.recv().await.unwrap();
    assert!(signed_in.is_some());

    provider.sign_out().await.unwrap();
    assert_eq!(stream.recv().await, Some(None));
}

#[tokio::test]
async fn revoke_session_broadcasts_sign_out() {
    let provider = MemoryProvider::new();
    provider.add_account("a@b.com", "secret1", true);
    provider.sign_in_with_password("a@b.com", "secret1").await.unwrap();
    let mut stream = provider.on_identity_change();
    assert!(stream.recv().await.unwrap().is_some());

    provider.revoke_session();
    assert_eq!(stream.recv().await, Some(None));
    assert!(provider.current().is_none());
}

#[tokio::test]
async fn dropped_subscribers_are_pruned() {
    let provider = MemoryProvider::new();
    drop(provider.on_identity_change());
    provider.revoke_session();
    assert!(provider.lock().subscribers.is_empty());
}

// =============================================================================
// password flows
// =============================================================================

#[tokio::test]
async fn reauthenticate_distinguishes_stale_and_wrong_password() {
    let provider = MemoryProvider::new();
    let identity = provider.add_account("a@b.com", "secret1", true);

    assert!(provider.reauthenticate(&identity, "secret1").await.is_ok());
    assert!(provider.reauthenticate(&identity, "bad").await.unwrap_err().is(WRONG_PASSWORD));

    provider.set_stale_session(true);
    assert!(
        provider
            .reauthenticate(&identity, "secret1")
            .await
            .unwrap_err()
            .is(REQUIRES_RECENT_LOGIN)
    );
}

#[tokio::test]
async fn change_password_updates_credentials() {
    let provider = MemoryProvider::new();
    let identity = provider.add_account("a@b.com", "secret1", true);
    provider.change_password(&identity, "secret2").await.unwrap();
    assert!(provider.sign_in_with_password("a@b.com", "secret1").await.is_err());
    assert!(provider.sign_in_with_password("a@b.com", "secret2").await.is_ok());
}

#[tokio::test]
async fn password_reset_records_known_accounts_only() {
    let provider = MemoryProvider::new();
    provider.add_account("a@b.com", "secret1", true);
    provider.send_password_reset("A@b.com").await.unwrap();
    assert!(provider.send_password_reset("z@b.com").await.unwrap_err().is(USER_NOT_FOUND));
    assert_eq!(provider.password_resets(), vec!["a@b.com".to_owned()]);
}

// =============================================================================
// tokens / popup / counters
// =============================================================================

#[tokio::test]
async fn mint_token_is_fresh_hex_for_current_identity() {
    let provider = MemoryProvider::new();
    provider.add_account("a@b.com", "secret1", true);
    let identity = provider.sign_in_with_password("a@b.com", "secret1").await.unwrap();

    let a = provider.mint_token(&identity).await.unwrap();
    let b = provider.mint_token(&identity).await.unwrap();
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);

    provider.sign_out().await.unwrap();
    assert!(provider.mint_token(&identity).await.unwrap_err().is(USER_TOKEN_EXPIRED));
}

#[tokio::test]
async fn popup_outcomes_are_scripted() {
    let provider = MemoryProvider::new();
    let err = provider.sign_in_with_google().await.unwrap_err();
    assert!(err.is_cancelled_popup());

    provider.set_popup(PopupOutcome::Account(Identity {
        uid: "g-1".into(),
        email: Some("g@b.com".into()),
        email_verified: true,
        display_name: Some("G".into()),
        photo_url: None,
    }));
    let identity = provider.sign_in_with_google().await.unwrap();
    assert_eq!(identity.uid, "g-1");
}

#[tokio::test]
async fn sign_out_failure_keeps_identity() {
    let provider = MemoryProvider::new();
    provider.add_account("a@b.com", "secret1", true);
    provider.sign_in_with_password("a@b.com", "secret1").await.unwrap();
    provider.fail_sign_out(Some(ProviderError::new("auth/internal-error", "boom")));
    assert!(provider.sign_out().await.is_err());
    assert!(provider.current().is_some());
}

#[tokio::test]
async fn call_count_tracks_every_operation() {
    let provider = MemoryProvider::new();
    assert_eq!(provider.call_count(), 0);
    let _ = provider.is_configured();
    assert_eq!(provider.call_count(), 0);
    let _ = provider.sign_in_with_password("a@b.com", "x").await;
    let _ = provider.send_password_reset("a@b.com").await;
    assert_eq!(provider.call_count(), 2);
}

#[test]
fn from_config_reflects_placeholder() {
    assert!(!MemoryProvider::from_config(&ProviderConfig::placeholder()).is_configured());
    assert!(MemoryProvider::new().is_configured());
    assert!(!MemoryProvider::unconfigured().is_configured());
}

#[test]
fn normalize_email_rejects_bad_shapes() {
    assert_eq!(normalize_email("  A@B.com "), Some("a@b.com".to_owned()));
    assert_eq!(normalize_email("ab.com"), None);
    assert_eq!(normalize_email("@b.com"), None);
    assert_eq!(normalize_email("a@"), None);
    assert_eq!(normalize_email("a@b@c"), None);
}
