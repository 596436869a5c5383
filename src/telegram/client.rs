//! Telegram Bot API client with a small buffered send queue.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::{task::JoinHandle, time::sleep};
use tracing::{info, warn};

use super::types::{
    parse_mode, ApiResponse, GetUpdatesRequest, SendMessageRequest, Update,
};
use super::ChatTransport;
use crate::config::TelegramConfig;
use crate::models::chat::OutgoingMessage;
use crate::{AppError, Result};

const QUEUE_CAPACITY: usize = 256;
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
const MAX_SEND_ATTEMPTS: u32 = 5;
/// Headroom on top of the server-side long-poll timeout.
const POLL_HEADROOM: Duration = Duration::from_secs(15);

/// Why a Bot API call failed.
#[derive(Debug)]
pub enum ApiFailure {
    /// Network error, 5xx, or flood control. Worth retrying.
    Transient {
        /// Server-requested delay, when flood control applies.
        retry_after: Option<Duration>,
        /// Failure description.
        detail: String,
    },
    /// The request itself is bad (unknown chat, malformed Markdown, ...).
    Permanent(String),
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient { detail, .. } => write!(f, "transient: {detail}"),
            Self::Permanent(detail) => write!(f, "permanent: {detail}"),
        }
    }
}

/// Thin typed wrapper over the Bot API HTTP methods.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    /// Build a client for the bot identified by `config.bot_token`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Telegram` if the HTTP client cannot be built.
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| AppError::Telegram(format!("failed to build http client: {err}")))?;
        Ok(Self {
            http,
            base_url: format!(
                "{}/bot{}",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            poll_timeout: Duration::from_secs(config.poll_timeout_seconds),
        })
    }

    /// Long-poll for updates starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiFailure`] if the request fails or the API reports an error.
    pub async fn get_updates(&self, offset: i64) -> std::result::Result<Vec<Update>, ApiFailure> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: vec!["message"],
        };
        self.call("getUpdates", &request, self.poll_timeout + POLL_HEADROOM)
            .await
    }

    /// Deliver one message immediately, without queueing or retries.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiFailure`] if the request fails or the API reports an error.
    pub async fn send_now(&self, message: &OutgoingMessage) -> std::result::Result<(), ApiFailure> {
        let request = SendMessageRequest {
            chat_id: &message.chat,
            text: &message.text,
            parse_mode: parse_mode(message.format),
        };
        let _: serde_json::Value = self
            .call("sendMessage", &request, POLL_HEADROOM)
            .await?;
        Ok(())
    }

    async fn call<B, T>(
        &self,
        method: &str,
        body: &B,
        timeout: Duration,
    ) -> std::result::Result<T, ApiFailure>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // The URL embeds the bot token; never log it.
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| ApiFailure::Transient {
                retry_after: None,
                detail: format!("{method} request failed: {}", err.without_url()),
            })?;

        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await.map_err(|err| {
            ApiFailure::Transient {
                retry_after: None,
                detail: format!("{method} returned unreadable body ({status}): {}", err.without_url()),
            }
        })?;

        if envelope.ok {
            return envelope.result.ok_or_else(|| {
                ApiFailure::Permanent(format!("{method} returned ok without a result"))
            });
        }

        let detail = format!(
            "{method} failed ({}): {}",
            envelope.error_code.unwrap_or(status.as_u16()),
            envelope.description.unwrap_or_default()
        );
        let retry_after = envelope
            .parameters
            .and_then(|p| p.retry_after)
            .map(Duration::from_secs);
        if retry_after.is_some() || status.is_server_error() {
            Err(ApiFailure::Transient {
                retry_after,
                detail,
            })
        } else {
            Err(ApiFailure::Permanent(detail))
        }
    }
}

/// Telegram sender that owns a buffered outgoing queue.
///
/// Callers enqueue and return immediately; a full buffer drops the
/// message. A background worker delivers in order, retrying transient
/// failures with exponential backoff.
pub struct TelegramService {
    queue_tx: mpsc::Sender<OutgoingMessage>,
}

impl TelegramService {
    /// Start the background sender task.
    #[must_use]
    pub fn start(client: Arc<TelegramClient>) -> (Self, JoinHandle<()>) {
        Self::start_with_capacity(client, QUEUE_CAPACITY)
    }

    /// Start the background sender task with a buffer of `capacity` messages.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn start_with_capacity(
        client: Arc<TelegramClient>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (queue_tx, queue_rx) = mpsc::channel(capacity);
        let worker = Self::spawn_worker(client, queue_rx);
        info!(capacity, "telegram sender started with buffered queue");
        (Self { queue_tx }, worker)
    }

    /// Enqueue a message for async delivery without waiting for buffer space.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Telegram` if the buffer is full (the message is
    /// dropped) or the sender task has exited.
    pub fn enqueue(&self, message: OutgoingMessage) -> Result<()> {
        match self.queue_tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => Err(AppError::Telegram(format!(
                "send buffer full; dropped message for {}",
                message.chat
            ))),
            Err(TrySendError::Closed(_)) => Err(AppError::Telegram(
                "telegram sender task has exited".into(),
            )),
        }
    }

    fn spawn_worker(
        client: Arc<TelegramClient>,
        mut queue_rx: mpsc::Receiver<OutgoingMessage>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(message) = queue_rx.recv().await {
                deliver_with_retry(&client, &message).await;
            }
            info!("telegram sender task exiting");
        })
    }
}

impl ChatTransport for TelegramService {
    fn send_message(
        &self,
        message: OutgoingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let enqueued = self.enqueue(message);
        Box::pin(async move { enqueued })
    }
}

async fn deliver_with_retry(client: &TelegramClient, message: &OutgoingMessage) {
    let mut backoff = INITIAL_RETRY_DELAY;
    for attempt in 1..=MAX_SEND_ATTEMPTS {
        match client.send_now(message).await {
            Ok(()) => {
                info!(chat = %message.chat, "sent telegram message");
                return;
            }
            Err(ApiFailure::Permanent(detail)) => {
                warn!(chat = %message.chat, %detail, "telegram rejected message; dropping");
                return;
            }
            Err(ApiFailure::Transient {
                retry_after,
                detail,
            }) => {
                if attempt == MAX_SEND_ATTEMPTS {
                    warn!(chat = %message.chat, attempt, %detail, "telegram send failed");
                    break;
                }
                let delay = retry_after.unwrap_or(backoff);
                warn!(chat = %message.chat, attempt, %detail, delay = ?delay, "telegram send failed; retrying");
                sleep(delay).await;
                backoff = (backoff * 2).min(MAX_RETRY_DELAY);
            }
        }
    }
    warn!(chat = %message.chat, "telegram send attempts exhausted; dropping message");
}
