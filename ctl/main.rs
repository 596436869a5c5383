#![forbid(unsafe_code)]

//! `game-relay-ctl`: stand-in for the game server.
//!
//! Polls the relay's delivery endpoint and pushes messages through its
//! callback endpoint, so a running relay can be exercised by hand.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(
    name = "game-relay-ctl",
    about = "Game-server stand-in for a running game-relay",
    version,
    long_about = None
)]
struct Cli {
    /// Base URL of the relay.
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Drain pending commands and print them, one JSON object per line.
    Poll {
        /// Delivery endpoint secret.
        #[arg(long, env = "RELAY_DELIVERY_SECRET")]
        secret: String,
    },

    /// Relay a message into a chat via the callback endpoint.
    Send {
        /// Callback endpoint secret.
        #[arg(long, env = "RELAY_CALLBACK_SECRET")]
        secret: String,
        /// Destination chat id.
        #[arg(long)]
        chat_id: i64,
        /// Message text (Telegram Markdown).
        message: String,
    },
}

fn main() -> ExitCode {
    let args = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("error: failed to build runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(execute(&args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(args: &Cli) -> Result<(), String> {
    let base = args.url.trim_end_matches('/');
    let client = reqwest::Client::new();

    let response = match &args.command {
        Command::Poll { secret } => client
            .get(format!("{base}/get-commands"))
            .header("X-Secret-Key", secret),
        Command::Send {
            secret,
            chat_id,
            message,
        } => client
            .post(format!("{base}/send-data"))
            .header("X-Secret-Key", secret)
            .json(&serde_json::json!({ "chatId": chat_id, "message": message })),
    }
    .send()
    .await
    .map_err(|err| format!("request failed: {err}"))?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|err| format!("invalid response ({status}): {err}"))?;

    if !status.is_success() {
        return Err(format!("relay answered {status}: {body}"));
    }

    match (&args.command, body.get("commands").and_then(Value::as_array)) {
        (Command::Poll { .. }, Some(commands)) => {
            for command in commands {
                println!("{command}");
            }
        }
        _ => println!("{body}"),
    }
    Ok(())
}
