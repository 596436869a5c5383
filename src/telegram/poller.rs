//! Long-polling loop feeding Telegram updates into operator intake.
//!
//! The update offset lives in memory only: after a restart Telegram
//! re-delivers anything not yet confirmed by a later `getUpdates` call.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use super::client::{ApiFailure, TelegramClient};
use super::types::{Message, Update};
use super::ChatTransport;
use crate::intake::IntakeHandler;

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Spawn the update loop. It runs until `ct` is cancelled.
pub fn spawn_update_loop(
    client: Arc<TelegramClient>,
    intake: Arc<IntakeHandler>,
    transport: Arc<dyn ChatTransport>,
    ct: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            info!("telegram polling loop started");
            let mut offset: i64 = 0;

            loop {
                let polled = tokio::select! {
                    () = ct.cancelled() => break,
                    polled = client.get_updates(offset) => polled,
                };

                let updates = match polled {
                    Ok(updates) => updates,
                    Err(failure) => {
                        let delay = match &failure {
                            ApiFailure::Transient {
                                retry_after: Some(delay),
                                ..
                            } => *delay,
                            _ => ERROR_BACKOFF,
                        };
                        warn!(%failure, delay = ?delay, "telegram getUpdates failed");
                        tokio::select! {
                            () = ct.cancelled() => break,
                            () = tokio::time::sleep(delay) => continue,
                        }
                    }
                };

                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    dispatch_update(update, &intake, transport.as_ref()).await;
                }
            }

            info!("telegram polling loop stopped");
        }
        .instrument(info_span!("telegram_poller")),
    )
}

/// Run one update through intake and send the reply, if any.
pub async fn dispatch_update(update: Update, intake: &IntakeHandler, transport: &dyn ChatTransport) {
    let Some(message) = update.message.and_then(Message::into_chat_message) else {
        return;
    };

    let outcome = intake.handle(&message);
    if let Some(reply) = outcome.reply(&message) {
        if let Err(err) = transport.send_message(reply).await {
            warn!(chat_id = message.chat_id, %err, "failed to send intake reply");
        }
    }
}
