//! Receiver implementation: server lifecycle and per-connection sessions

pub mod announce_handler;
pub mod auth;
pub mod config;
pub mod events;
pub mod rtsp_handler;
pub mod server;
pub mod session;

#[cfg(test)]
mod announce_handler_tests;
#[cfg(test)]
mod session_tests;
