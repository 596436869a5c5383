#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod http;
pub mod intake;
pub mod models;
pub mod queue;
pub mod state;
pub mod telegram;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
