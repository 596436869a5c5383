//! HTTP surface for the game server.

pub mod server;
