use std::collections::HashMap;

use super::*;

fn full_env() -> HashMap<&'static str, String> {
    HashMap::from([
        (API_KEY_VAR, "real-key".to_owned()),
        (AUTH_DOMAIN_VAR, "app.example.com".to_owned()),
        (PROJECT_ID_VAR, "vocab-project".to_owned()),
        (STORAGE_BUCKET_VAR, "vocab-project.appspot.com".to_owned()),
        (MESSAGING_SENDER_ID_VAR, "42".to_owned()),
        (APP_ID_VAR, "1:42:web:abc".to_owned()),
    ])
}

#[test]
fn all_vars_present_builds_real_config() {
    let env = full_env();
    let cfg = ProviderConfig::from_lookup(|k| env.get(k).cloned());
    assert_eq!(cfg.api_key, "real-key");
    assert_eq!(cfg.project_id, "vocab-project");
    assert_eq!(cfg.app_id, "1:42:web:abc");
    assert!(!cfg.is_placeholder());
}

#[test]
fn missing_var_falls_back_to_placeholder() {
    let mut env = full_env();
    env.remove(APP_ID_VAR);
    let cfg = ProviderConfig::from_lookup(|k| env.get(k).cloned());
    assert!(cfg.is_placeholder());
    assert_eq!(cfg, ProviderConfig::placeholder());
}

#[test]
fn blank_var_counts_as_missing() {
    let mut env = full_env();
    env.insert(API_KEY_VAR, "   ".to_owned());
    let cfg = ProviderConfig::from_lookup(|k| env.get(k).cloned());
    assert!(cfg.is_placeholder());
}

#[test]
fn empty_environment_is_placeholder() {
    let cfg = ProviderConfig::from_lookup(|_| None);
    assert!(cfg.is_placeholder());
    assert_eq!(cfg.api_key, PLACEHOLDER_API_KEY);
}
