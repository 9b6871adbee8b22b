//! ANNOUNCE request handling
//!
//! Runs the hybrid key exchange: parses the session description, decrypts
//! the RSA-wrapped AES key and returns the negotiated material together
//! with the stream format descriptor. Any failure here is fatal for the
//! connection (the session cannot ever decrypt audio), never for the
//! server.

use crate::protocol::crypto::{CryptoError, ReceiverRsaKey};
use crate::protocol::rtsp::RtspRequest;
use crate::protocol::sdp::{SdpParseError, SdpParser, raop};
use crate::receiver::session::SessionKeys;

/// Errors from ANNOUNCE handling
#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    /// Empty body in ANNOUNCE
    #[error("empty body in ANNOUNCE")]
    EmptyBody,

    /// Body is not valid UTF-8
    #[error("body is not valid UTF-8")]
    InvalidUtf8,

    /// Session description parse error
    #[error("SDP parse error: {0}")]
    Sdp(#[from] SdpParseError),

    /// RSA decryption of the session key failed
    #[error("key negotiation failed: {0}")]
    Crypto(#[from] CryptoError),
}

/// Result of a successful negotiation
#[derive(Debug)]
pub struct AnnounceOutcome {
    /// Decrypted AES key and IV
    pub keys: SessionKeys,
    /// Codec format descriptor, stored for the sink
    pub fmtp: String,
}

/// Process an ANNOUNCE request body.
///
/// # Errors
///
/// Returns [`AnnounceError`] if the body is missing or unparsable, the
/// key material is malformed, or RSA decryption fails.
pub fn process_announce(
    request: &RtspRequest,
    rsa_key: &ReceiverRsaKey,
) -> Result<AnnounceOutcome, AnnounceError> {
    if request.body.is_empty() {
        return Err(AnnounceError::EmptyBody);
    }

    let sdp_str = std::str::from_utf8(&request.body).map_err(|_| AnnounceError::InvalidUtf8)?;
    let sdp = SdpParser::parse(sdp_str)?;
    let params = raop::extract_announce_params(&sdp)?;

    let key = rsa_key.decrypt_session_key(&params.encrypted_aes_key)?;

    Ok(AnnounceOutcome {
        keys: SessionKeys {
            key,
            iv: params.aes_iv,
        },
        fmtp: params.fmtp,
    })
}
