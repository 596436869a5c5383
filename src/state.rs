//! Shared application state handed to every HTTP handler.

use std::sync::Arc;

use crate::config::GlobalConfig;
use crate::queue::CommandQueue;
use crate::telegram::ChatTransport;

/// Process-wide state built once by the composition root.
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration, including both endpoint secrets.
    pub config: Arc<GlobalConfig>,
    /// The single command queue shared with operator intake.
    pub queue: Arc<CommandQueue>,
    /// Outbound chat transport; `None` when no bot token is configured.
    pub chat: Option<Arc<dyn ChatTransport>>,
}
