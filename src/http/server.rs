//! HTTP surface polled by the game server.
//!
//! - `GET /get-commands` drains the command queue (delivery).
//! - `POST /send-data` relays a message into a chat (callback).
//! - `GET /health` is an unauthenticated liveness probe.
//!
//! Both authenticated routes compare the `X-Secret-Key` header verbatim
//! against their own configured secret. Delivery is at-most-once: the
//! queue is drained before the response is written, so a response lost
//! in transit loses its commands.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GlobalConfig;
use crate::models::chat::{ChatTarget, OutgoingMessage};
use crate::models::command::Command;
use crate::state::AppState;
use crate::{AppError, Result};

/// Header carrying the shared secret.
pub const SECRET_HEADER: &str = "x-secret-key";

/// Body of a successful delivery poll.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandsResponse {
    /// Every command pending at the moment of the poll, oldest first.
    pub commands: Vec<Command>,
}

/// Callback body. Every field is optional; bad input is dropped, not refused.
#[derive(Debug, Default, Deserialize)]
struct CallbackBody {
    #[serde(rename = "chatId")]
    chat_id: Option<ChatTarget>,
    message: Option<String>,
}

impl CallbackBody {
    /// Destination and text, when both are present and non-empty.
    fn into_outgoing(self) -> Option<OutgoingMessage> {
        let chat = self.chat_id.filter(|chat| match chat {
            ChatTarget::Id(id) => *id != 0,
            ChatTarget::Username(name) => !name.is_empty(),
        })?;
        let message = self.message.filter(|m| !m.is_empty())?;
        Some(OutgoingMessage::markdown(chat, message))
    }
}

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/get-commands", get(get_commands))
        .route("/send-data", post(send_data))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind the listener at `config.bind_addr()`.
///
/// # Errors
///
/// Returns `AppError::Config` for an unparseable host and `AppError::Http`
/// if the address cannot be bound.
pub async fn bind_listener(config: &GlobalConfig) -> Result<TcpListener> {
    let bind = config.bind_addr()?;
    TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Http(format!("failed to bind HTTP on {bind}: {err}")))
}

/// Serve on an already-bound listener until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Http` if the server fails.
pub async fn serve_on(
    listener: TcpListener,
    state: Arc<AppState>,
    ct: CancellationToken,
) -> Result<()> {
    let local: Option<SocketAddr> = listener.local_addr().ok();
    info!(bind = ?local, "starting HTTP surface");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Http(format!("HTTP server error: {err}")))?;

    info!("HTTP surface shut down");
    Ok(())
}

/// Handler for `GET /health`.
async fn health() -> &'static str {
    "ok"
}

/// Handler for `GET /get-commands`.
async fn get_commands(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(err) = check_secret(&headers, &state.config.secrets.delivery) {
        warn!(%err, route = "/get-commands", "rejected poll");
        return forbidden();
    }

    let commands = state.queue.drain_all();
    if !commands.is_empty() {
        info!(count = commands.len(), "delivering queued commands");
    }
    Json(CommandsResponse { commands }).into_response()
}

/// Handler for `POST /send-data`.
async fn send_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(err) = check_secret(&headers, &state.config.secrets.callback) {
        warn!(%err, route = "/send-data", "rejected callback");
        return forbidden();
    }

    let parsed = serde_json::from_slice::<CallbackBody>(&body).unwrap_or_else(|err| {
        warn!(%err, "unreadable callback body; ignoring");
        CallbackBody::default()
    });

    match (parsed.into_outgoing(), &state.chat) {
        (Some(message), Some(chat)) => {
            let target = message.chat.clone();
            match chat.send_message(message).await {
                Ok(()) => info!(chat = %target, "relayed callback message"),
                Err(err) => warn!(chat = %target, %err, "failed to relay callback message"),
            }
        }
        (Some(message), None) => {
            warn!(chat = %message.chat, "no chat transport configured; dropping callback message");
        }
        (None, _) => {}
    }

    Json(serde_json::json!({ "success": true })).into_response()
}

fn check_secret(headers: &HeaderMap, expected: &str) -> Result<()> {
    match headers.get(SECRET_HEADER) {
        Some(provided) if provided.as_bytes() == expected.as_bytes() => Ok(()),
        Some(_) => Err(AppError::Forbidden("secret key mismatch".into())),
        None => Err(AppError::Forbidden("secret key missing".into())),
    }
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({ "error": "Forbidden" })),
    )
        .into_response()
}
