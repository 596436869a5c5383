#![forbid(unsafe_code)]

//! `game-relay`: Telegram-to-game-server command relay.
//!
//! Bootstraps configuration, starts the HTTP surface polled by the game
//! server, and the Telegram long-poll intake for operator commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use game_relay::config::GlobalConfig;
use game_relay::http::server;
use game_relay::intake::IntakeHandler;
use game_relay::queue::CommandQueue;
use game_relay::state::AppState;
use game_relay::telegram::client::{TelegramClient, TelegramService};
use game_relay::telegram::{poller, ChatTransport};
use game_relay::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "game-relay", about = "Telegram-to-game-server command relay", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the HTTP listen port from the config file.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("game-relay bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!(
        operator_id = config.telegram.operator_id,
        port = config.http_port,
        "configuration loaded"
    );

    // Bind before intake starts so an unusable port fails startup.
    let listener = server::bind_listener(&config).await?;

    // ── Shared state ────────────────────────────────────
    let ct = CancellationToken::new();
    let queue = Arc::new(CommandQueue::new());

    let mut telegram_tasks = Vec::new();
    let chat: Option<Arc<dyn ChatTransport>> = if config.telegram.bot_token.is_empty() {
        info!("telegram not configured; running HTTP-only");
        None
    } else {
        let client = Arc::new(TelegramClient::new(&config.telegram)?);
        let (service, sender_task) = TelegramService::start(Arc::clone(&client));
        let service: Arc<dyn ChatTransport> = Arc::new(service);

        let intake = Arc::new(IntakeHandler::new(Arc::clone(&config), Arc::clone(&queue)));
        let poll_task =
            poller::spawn_update_loop(client, intake, Arc::clone(&service), ct.clone());

        telegram_tasks.push(sender_task);
        telegram_tasks.push(poll_task);
        Some(service)
    };

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        queue: Arc::clone(&queue),
        chat,
    });

    // ── Start HTTP surface ──────────────────────────────
    let http_ct = ct.clone();
    let http_state = Arc::clone(&state);
    let http_handle = tokio::spawn(async move {
        let result = server::serve_on(listener, http_state, http_ct.clone()).await;
        if let Err(err) = &result {
            error!(%err, "http surface failed");
        }
        // Any exit of the HTTP surface stops the whole relay.
        http_ct.cancel();
        result
    });

    info!("game-relay ready");

    // ── Wait for shutdown signal ────────────────────────
    tokio::select! {
        () = shutdown_signal() => info!("shutdown signal received"),
        () = ct.cancelled() => warn!("http surface stopped; shutting down"),
    }
    ct.cancel();

    let http_result = http_handle
        .await
        .map_err(|err| AppError::Http(format!("http task panicked: {err}")))?;
    // The sender task ends once every transport handle is dropped.
    drop(state);
    for task in telegram_tasks {
        let _ = task.await;
    }

    info!(
        undelivered = queue.len(),
        "game-relay shut down"
    );
    http_result
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
