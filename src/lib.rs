//! # raop-receiver
//!
//! A pure Rust `AirPlay` 1 (RAOP) audio receiver core.
//!
//! The crate implements the connection/session layer of a RAOP receiver:
//! a listening RTSP server, the per-connection protocol state machine,
//! the RSA/AES key negotiation and the per-packet audio decryption relay.
//! Decoded bytes are handed to an [`AudioSink`] supplied by the hosting
//! application; playback itself is out of scope.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use raop_receiver::{BufferSink, RaopServer, ReceiverConfig};
//!
//! # async fn example() -> Result<(), raop_receiver::ReceiverError> {
//! let config = ReceiverConfig::with_name("Living Room");
//! let sink = BufferSink::shared();
//!
//! let mut server = RaopServer::new(config, Arc::new(sink));
//! server.start().await?;
//!
//! // Accept sessions until shutdown...
//! server.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Server**: `RaopServer` - listening socket, session set, lifecycle
//! - **Session**: per-connection RTSP state machine and audio relay
//! - **Protocol**: sans-IO RTSP/SDP parsing and RAOP cryptography

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;

// Internal modules
pub mod audio;
pub mod discovery;
pub mod net;
pub mod protocol;
pub mod receiver;

// Re-exports
pub use audio::relay::AudioRelay;
pub use audio::sink::{AudioSink, BufferSink, SinkFactory, WriterSink};
pub use error::ReceiverError;
pub use protocol::crypto::{ReceiverRsaKey, SessionCipher};
pub use receiver::config::ReceiverConfig;
pub use receiver::events::ReceiverEvent;
pub use receiver::server::RaopServer;
pub use receiver::session::{RaopSession, SessionState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
///
/// Convenient re-exports
pub mod prelude {
    pub use crate::{
        AudioSink, BufferSink, RaopServer, ReceiverConfig, ReceiverError, ReceiverEvent,
        SessionState, SinkFactory,
    };
}
