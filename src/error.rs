use std::io;
use thiserror::Error;

use crate::discovery::advertiser::AdvertiserError;
use crate::protocol::crypto::CryptoError;
use crate::protocol::rtsp::server_codec::ParseError;

/// Errors surfaced by the receiver.
///
/// Only [`Bind`](ReceiverError::Bind) and
/// [`Advertise`](ReceiverError::Advertise) are fatal to the server: by the
/// time either is reported the server has fully stopped. Everything else is
/// local to a single connection and leaves the server and its other
/// sessions running.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Could not create or listen on the RTSP socket
    #[error("failed to bind RTSP listener: {0}")]
    Bind(#[source] io::Error),

    /// Service publication failed; the listening socket has been torn down
    #[error("failed to advertise service: {0}")]
    Advertise(#[from] AdvertiserError),

    /// Malformed or out-of-order RTSP traffic on one connection
    #[error("RTSP protocol error: {0}")]
    Protocol(#[from] ParseError),

    /// Bad key material on one connection
    #[error("crypto negotiation failed: {0}")]
    Crypto(#[from] CryptoError),

    /// Transport read/write failure on one connection
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// `start()` called while the server is already running
    #[error("receiver already running")]
    AlreadyRunning,
}

impl ReceiverError {
    /// Check whether this error stops the server.
    ///
    /// Fatal errors are reported only after the server has already been
    /// fully stopped; non-fatal errors are informational and the server
    /// keeps running.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Bind(_) | Self::Advertise(_))
    }
}

/// Result type alias for receiver operations
pub type Result<T> = std::result::Result<T, ReceiverError>;
