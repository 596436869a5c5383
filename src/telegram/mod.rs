//! Telegram bridge layer: outbound transport and inbound update polling.

pub mod client;
pub mod poller;
pub mod types;

use std::future::Future;
use std::pin::Pin;

use crate::models::chat::OutgoingMessage;
use crate::Result;

/// Outbound chat capability the relay core depends on.
///
/// Implemented by [`client::TelegramService`]; tests substitute a
/// recording implementation.
pub trait ChatTransport: Send + Sync {
    /// Hand a message to the transport for delivery.
    ///
    /// Success means the message was accepted for delivery, not that the
    /// chat service has received it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Telegram`](crate::AppError::Telegram) if the
    /// transport can no longer accept messages.
    fn send_message(
        &self,
        message: OutgoingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
