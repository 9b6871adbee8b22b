//! Receiver events for the hosting application

use std::net::SocketAddr;

/// Events emitted by the receiver
#[derive(Debug, Clone)]
pub enum ReceiverEvent {
    /// Receiver started and listening
    Started {
        /// Receiver name
        name: String,
        /// Listen port
        port: u16,
    },

    /// Receiver stopped
    Stopped,

    /// Client connected
    ClientConnected {
        /// Client address
        address: SocketAddr,
    },

    /// Client disconnected; its session is gone
    ClientDisconnected {
        /// Client address
        address: SocketAddr,
        /// Disconnect reason
        reason: String,
    },

    /// A session began streaming audio
    StreamingStarted {
        /// Client address
        address: SocketAddr,
    },

    /// A streaming session ended
    StreamingStopped {
        /// Client address
        address: SocketAddr,
    },

    /// Sender set the volume
    VolumeChanged {
        /// Volume in dB (-144 to 0, -144 meaning mute)
        db: f32,
    },

    /// Error occurred
    ///
    /// When `fatal` is true the server has already fully stopped by the
    /// time this event is observed; non-fatal errors are informational
    /// and the server keeps running.
    Error {
        /// Error message
        message: String,
        /// Whether the server stopped because of this error
        fatal: bool,
    },
}
