//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keychain service name under which credentials are stored.
pub const KEYRING_SERVICE: &str = "game-relay";

/// Telegram bot settings.
///
/// The bot token is loaded at runtime via OS keychain or environment
/// variable, never from the TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TelegramConfig {
    /// Telegram user id of the single operator allowed to issue commands.
    pub operator_id: i64,
    /// Server-side long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout_seconds")]
    pub poll_timeout_seconds: u64,
    /// Bot API base URL. Overridable for tests and self-hosted API servers.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bot token (populated at runtime).
    #[serde(skip)]
    pub bot_token: String,
}

/// Shared secrets guarding the two HTTP endpoints.
///
/// Kept as two distinct entries; neither defaults to the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedSecrets {
    /// Expected `X-Secret-Key` for `GET /get-commands`.
    pub delivery: String,
    /// Expected `X-Secret-Key` for `POST /send-data`.
    pub callback: String,
}

fn default_poll_timeout_seconds() -> u64 {
    30
}

fn default_api_base() -> String {
    "https://api.telegram.org".into()
}

fn default_http_host() -> String {
    "0.0.0.0".into()
}

fn default_http_port() -> u16 {
    3000
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Interface the HTTP surface binds to.
    #[serde(default = "default_http_host")]
    pub http_host: String,
    /// Port the HTTP surface listens on; 0 picks an ephemeral port.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Telegram connectivity and operator identity.
    pub telegram: TelegramConfig,
    /// Endpoint secrets (populated at runtime).
    #[serde(skip)]
    pub secrets: SharedSecrets,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the bot token and both endpoint secrets from the OS keychain
    /// with env-var fallback.
    ///
    /// A missing bot token is tolerated (the relay then runs HTTP-only);
    /// missing secrets are not.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if either shared secret is unavailable.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.telegram.bot_token = match load_credential("telegram_bot_token", "TELEGRAM_BOT_TOKEN")
            .await
        {
            Ok(token) => token,
            Err(err) => {
                warn!(%err, "telegram bot token unavailable");
                String::new()
            }
        };
        self.secrets.delivery = load_credential("delivery_secret", "RELAY_DELIVERY_SECRET").await?;
        self.secrets.callback = load_credential("callback_secret", "RELAY_CALLBACK_SECRET").await?;

        if self.secrets.delivery == self.secrets.callback {
            warn!("delivery and callback secrets are identical");
        }
        Ok(())
    }

    /// Socket address for the HTTP listener.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `http_host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .http_host
            .parse()
            .map_err(|err| AppError::Config(format!("http_host invalid: {err}")))?;
        Ok(SocketAddr::new(ip, self.http_port))
    }

    /// Validate that a chat sender is the configured operator.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` for any other sender.
    pub fn ensure_operator(&self, user_id: i64) -> Result<()> {
        if user_id == self.telegram.operator_id {
            Ok(())
        } else {
            Err(AppError::Unauthorized("sender is not the operator".into()))
        }
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.operator_id == 0 {
            return Err(AppError::Config(
                "telegram.operator_id must be non-zero".into(),
            ));
        }

        if self.telegram.poll_timeout_seconds == 0 {
            return Err(AppError::Config(
                "telegram.poll_timeout_seconds must be greater than zero".into(),
            ));
        }

        self.bind_addr()?;
        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    match env::var(env_key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Config(format!(
            "credential {keyring_key} not found in keychain service {KEYRING_SERVICE} or {env_key} env var"
        ))),
    }
}
