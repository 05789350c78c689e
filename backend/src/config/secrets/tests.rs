//! Regression coverage for this module.

use super::*;
use mockable::MockEnv;
use rstest::rstest;
use std::collections::HashMap;

fn mock_env(vars: HashMap<&'static str, String>) -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_string()
        .times(0..)
        .returning(move |key| vars.get(key).cloned());
    env
}

fn release_defaults() -> HashMap<&'static str, String> {
    HashMap::from([
        (BOT_TOKEN_ENV, "123456:bot-token".to_owned()),
        (SESSION_SECRET_ENV, "s".repeat(SECRET_MIN_LEN)),
        (CLAIM_SECRET_ENV, "c".repeat(SECRET_MIN_LEN)),
    ])
}

fn expect_error(result: Result<SecretSettings, SecretsConfigError>) -> SecretsConfigError {
    match result {
        Ok(_) => panic!("expected secret validation to fail"),
        Err(error) => error,
    }
}

#[rstest]
fn release_accepts_full_length_secrets() {
    let mut vars = release_defaults();
    vars.insert(CHAIN_API_KEY_ENV, "indexer-key".to_owned());

    let secrets =
        secrets_from_env(&mock_env(vars), BuildMode::Release).expect("valid release secrets");

    assert_eq!(secrets.session_secret.expose(), "s".repeat(32).as_bytes());
    assert_eq!(secrets.claim_secret.len(), SECRET_MIN_LEN);
    assert!(secrets.chain_api_key.is_some());
}

#[rstest]
#[case(BuildMode::Debug)]
#[case(BuildMode::Release)]
fn bot_token_is_always_required(#[case] mode: BuildMode) {
    let mut vars = release_defaults();
    vars.remove(BOT_TOKEN_ENV);
    vars.insert(ALLOW_EPHEMERAL_ENV, "0".to_owned());

    let err = expect_error(secrets_from_env(&mock_env(vars), mode));
    assert!(matches!(
        err,
        SecretsConfigError::MissingEnv {
            name: BOT_TOKEN_ENV
        }
    ));
}

#[rstest]
fn release_rejects_short_secret() {
    let mut vars = release_defaults();
    vars.insert(CLAIM_SECRET_ENV, "short".to_owned());

    let err = expect_error(secrets_from_env(&mock_env(vars), BuildMode::Release));
    assert!(matches!(
        err,
        SecretsConfigError::SecretTooShort {
            name: CLAIM_SECRET_ENV,
            length: 5,
            ..
        }
    ));
}

#[rstest]
fn debug_tolerates_short_secret() {
    let mut vars = release_defaults();
    vars.insert(SESSION_SECRET_ENV, "dev".to_owned());

    let secrets = secrets_from_env(&mock_env(vars), BuildMode::Debug).expect("debug accepts");
    assert_eq!(secrets.session_secret.expose(), b"dev");
}

#[rstest]
fn release_refuses_ephemeral_toggle() {
    let mut vars = release_defaults();
    vars.insert(ALLOW_EPHEMERAL_ENV, "1".to_owned());

    let err = expect_error(secrets_from_env(&mock_env(vars), BuildMode::Release));
    assert!(matches!(err, SecretsConfigError::EphemeralNotAllowed));
}

#[rstest]
fn debug_generates_missing_secrets_when_allowed() {
    let vars = HashMap::from([
        (BOT_TOKEN_ENV, "123456:bot-token".to_owned()),
        (ALLOW_EPHEMERAL_ENV, "true".to_owned()),
    ]);

    let secrets = secrets_from_env(&mock_env(vars), BuildMode::Debug).expect("ephemeral");

    assert_eq!(secrets.session_secret.len(), SECRET_MIN_LEN);
    assert_eq!(secrets.claim_secret.len(), SECRET_MIN_LEN);
    assert_ne!(secrets.session_secret.expose(), secrets.claim_secret.expose());
}

#[rstest]
fn missing_secret_without_ephemeral_is_error() {
    let mut vars = release_defaults();
    vars.remove(SESSION_SECRET_ENV);

    let err = expect_error(secrets_from_env(&mock_env(vars), BuildMode::Debug));
    assert!(matches!(
        err,
        SecretsConfigError::MissingEnv {
            name: SESSION_SECRET_ENV
        }
    ));
}

#[rstest]
fn blank_chain_key_is_ignored() {
    let mut vars = release_defaults();
    vars.insert(CHAIN_API_KEY_ENV, "   ".to_owned());

    let secrets = secrets_from_env(&mock_env(vars), BuildMode::Release).expect("valid");
    assert!(secrets.chain_api_key.is_none());
}

#[rstest]
fn error_messages_never_include_secret_values() {
    let mut vars = release_defaults();
    vars.insert(SESSION_SECRET_ENV, "leaky-value".to_owned());

    let err = expect_error(secrets_from_env(&mock_env(vars), BuildMode::Release));
    assert!(!err.to_string().contains("leaky-value"));
}
