//! Per-connection session state
//!
//! Tracks the lifecycle of one RAOP connection from accept through
//! teardown. All mutation happens from the connection's own task; the
//! negotiated key material is write-once.

use std::net::SocketAddr;

use zeroize::ZeroizeOnDrop;

/// Session states following the RAOP protocol flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Initial state after TCP accept
    Open,
    /// ANNOUNCE processed: key material and stream format known
    Negotiated,
    /// SETUP complete, transport parameters exchanged
    Ready,
    /// RECORD received, sink open, audio relay active
    Streaming,
    /// Terminal; no further transitions
    Closed,
}

impl SessionState {
    /// Check if transition to new state is valid
    #[must_use]
    pub fn can_transition_to(&self, new_state: SessionState) -> bool {
        use SessionState::{Closed, Negotiated, Open, Ready, Streaming};

        match (self, new_state) {
            (Open, Negotiated)
            | (Negotiated, Ready)
            | (Ready, Streaming)
            | (Open | Negotiated | Ready | Streaming, Closed) => true,

            _ => false,
        }
    }

    /// Is the session finished?
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

/// Negotiated AES key material
///
/// Key and IV are always set together; a session either has both or
/// neither. Cleared when the session is dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SessionKeys {
    /// AES-128 session key
    pub key: [u8; 16],
    /// AES initialization vector
    pub iv: [u8; 16],
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKeys(..)")
    }
}

/// Consecutive malformed requests tolerated before the connection closes
pub const MAX_MALFORMED_REQUESTS: u8 = 3;

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// State transition is not allowed
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current state
        from: SessionState,
        /// Target state
        to: SessionState,
    },

    /// A second ANNOUNCE tried to replace negotiated key material
    #[error("session keys already negotiated")]
    KeysAlreadySet,
}

/// A receiver session
#[derive(Debug)]
pub struct RaopSession {
    /// RTSP session identifier sent to the client
    id: String,
    /// Client address, immutable after accept
    remote_addr: SocketAddr,
    /// Current state
    state: SessionState,
    /// Negotiated key material (set once by ANNOUNCE)
    keys: Option<SessionKeys>,
    /// Stream format descriptor from ANNOUNCE
    fmtp: Option<String>,
    /// Current volume in dB (-144.0 to 0.0)
    volume: f32,
    /// Nonce issued for the RTSP auth challenge
    auth_nonce: String,
    /// Consecutive malformed requests seen
    malformed_strikes: u8,
}

impl RaopSession {
    /// Create a new session for an accepted connection
    #[must_use]
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            id: generate_session_id(),
            remote_addr,
            state: SessionState::Open,
            keys: None,
            fmtp: None,
            volume: 0.0, // Full volume
            auth_nonce: generate_session_id(),
            malformed_strikes: 0,
        }
    }

    /// Get session ID
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get client address
    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Get current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Set state (validates transition)
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidTransition`] if the transition is
    /// not allowed.
    pub fn set_state(&mut self, new_state: SessionState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(new_state) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }
        self.state = new_state;
        Ok(())
    }

    /// Store negotiated key material and stream format.
    ///
    /// # Errors
    /// Returns [`SessionError::KeysAlreadySet`] if negotiation already
    /// happened; the stored pair is never overwritten.
    pub fn set_negotiated(&mut self, keys: SessionKeys, fmtp: String) -> Result<(), SessionError> {
        if self.keys.is_some() {
            return Err(SessionError::KeysAlreadySet);
        }
        self.keys = Some(keys);
        self.fmtp = Some(fmtp);
        Ok(())
    }

    /// Negotiated key material, if ANNOUNCE succeeded
    #[must_use]
    pub fn keys(&self) -> Option<&SessionKeys> {
        self.keys.as_ref()
    }

    /// Stream format descriptor, if ANNOUNCE succeeded
    #[must_use]
    pub fn fmtp(&self) -> Option<&str> {
        self.fmtp.as_deref()
    }

    /// Get volume in dB
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set volume in dB (-144.0 to 0.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(-144.0, 0.0);
    }

    /// Nonce for the RTSP auth challenge
    #[must_use]
    pub fn auth_nonce(&self) -> &str {
        &self.auth_nonce
    }

    /// Record a malformed request; returns true once the tolerance is
    /// exhausted and the connection should close.
    pub fn record_malformed(&mut self) -> bool {
        self.malformed_strikes = self.malformed_strikes.saturating_add(1);
        self.malformed_strikes >= MAX_MALFORMED_REQUESTS
    }

    /// Reset the malformed-request counter after a well-formed request
    pub fn clear_malformed(&mut self) {
        self.malformed_strikes = 0;
    }
}

fn generate_session_id() -> String {
    use rand::Rng;
    let id: u64 = rand::thread_rng().r#gen();
    format!("{id:016X}")
}
