use super::*;

#[test]
fn known_codes_have_distinct_messages() {
    let not_found = describe(&ProviderError::new(USER_NOT_FOUND, "raw"));
    let invalid = describe(&ProviderError::new(INVALID_EMAIL, "raw"));
    assert_ne!(not_found, invalid);
    assert!(!not_found.contains("raw"));
    assert!(!invalid.contains("raw"));
}

#[test]
fn unknown_code_carries_raw_text() {
    let msg = describe(&ProviderError::new("auth/quota-exceeded", "Quota exceeded for project."));
    assert!(msg.contains("Quota exceeded for project."));
}

#[test]
fn wrong_password_and_invalid_credential_share_text() {
    assert_eq!(
        describe(&ProviderError::new(WRONG_PASSWORD, "a")),
        describe(&ProviderError::new(INVALID_CREDENTIAL, "b"))
    );
}

#[test]
fn prefixed_helpers() {
    let err = ProviderError::new(WEAK_PASSWORD, "weak");
    assert!(sign_in_failed(&err).starts_with("Sign in failed: "));
    assert!(sign_up_failed(&err).starts_with("Sign up failed: "));
    assert!(sign_out_failed(&err).starts_with("Sign out failed: "));
    assert_eq!(login_required("save flashcards"), "Please sign in to save flashcards.");
    assert!(backend_sync_failed("status 500").contains("status 500"));
}

#[test]
fn not_configured_mentions_configuration() {
    assert!(NOT_CONFIGURED.to_lowercase().contains("configured"));
}
