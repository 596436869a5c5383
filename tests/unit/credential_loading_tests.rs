//! Unit tests for credential loading from environment variables.
//!
//! The keychain service `game-relay` is absent in CI, so every lookup
//! falls through to the env vars. These tests mutate process-global env
//! vars and run serially.

use game_relay::config::GlobalConfig;

const VARS: [&str; 3] = [
    "TELEGRAM_BOT_TOKEN",
    "RELAY_DELIVERY_SECRET",
    "RELAY_CALLBACK_SECRET",
];

fn make_config() -> GlobalConfig {
    GlobalConfig::from_toml_str("[telegram]\noperator_id = 42\n").expect("config parses")
}

#[allow(unsafe_code)]
fn set_vars(values: [Option<&str>; 3]) {
    for (name, value) in VARS.iter().zip(values) {
        unsafe {
            match value {
                Some(v) => std::env::set_var(name, v),
                None => std::env::remove_var(name),
            }
        }
    }
}

#[tokio::test]
#[serial_test::serial]
async fn env_var_credentials_populate_config() {
    let mut config = make_config();
    set_vars([Some("123:abc"), Some("poll-secret"), Some("push-secret")]);

    config.load_credentials().await.expect("credentials load");

    assert_eq!(config.telegram.bot_token, "123:abc");
    assert_eq!(config.secrets.delivery, "poll-secret");
    assert_eq!(config.secrets.callback, "push-secret");

    set_vars([None, None, None]);
}

#[tokio::test]
#[serial_test::serial]
async fn missing_bot_token_is_tolerated() {
    let mut config = make_config();
    set_vars([None, Some("poll-secret"), Some("push-secret")]);

    config.load_credentials().await.expect("credentials load");
    assert!(config.telegram.bot_token.is_empty());

    set_vars([None, None, None]);
}

#[tokio::test]
#[serial_test::serial]
async fn missing_delivery_secret_names_keychain_and_env_var() {
    let mut config = make_config();
    set_vars([Some("123:abc"), None, Some("push-secret")]);

    let err = config.load_credentials().await.expect_err("missing secret");
    let text = err.to_string();
    assert!(text.contains("delivery_secret"), "{text}");
    assert!(text.contains("RELAY_DELIVERY_SECRET"), "{text}");
    assert!(text.contains("game-relay"), "{text}");

    set_vars([None, None, None]);
}

#[tokio::test]
#[serial_test::serial]
async fn empty_callback_secret_counts_as_missing() {
    let mut config = make_config();
    set_vars([Some("123:abc"), Some("poll-secret"), Some("")]);

    let err = config.load_credentials().await.expect_err("empty secret");
    assert!(err.to_string().contains("RELAY_CALLBACK_SECRET"), "{err}");

    set_vars([None, None, None]);
}

#[tokio::test]
#[serial_test::serial]
async fn secrets_stay_distinct_entries() {
    let mut config = make_config();
    set_vars([None, Some("same"), Some("same")]);

    // Identical values are allowed, only warned about.
    config.load_credentials().await.expect("credentials load");
    assert_eq!(config.secrets.delivery, config.secrets.callback);

    set_vars([None, None, None]);
}
