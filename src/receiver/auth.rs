//! Sender authentication
//!
//! Two separate mechanisms live here. `Apple-Challenge` is the sender
//! proving it talks to a genuine receiver: we sign the challenge with the
//! receiver RSA key and return it as `Apple-Response`. The RTSP Digest
//! challenge (RFC 2617, MD5) is the receiver requiring a password from
//! the sender; it covers every method except OPTIONS.

use std::collections::HashMap;
use std::net::IpAddr;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use md5::{Digest, Md5};

use crate::protocol::crypto::{CryptoError, ReceiverRsaKey};
use crate::protocol::decode_base64_loose;
use crate::protocol::rtsp::RtspRequest;
use crate::protocol::rtsp::headers::names;

/// Realm announced in the Digest challenge
pub const REALM: &str = "raop";

/// Challenge buffers are zero-padded to this length before signing
const CHALLENGE_PADDED_LEN: usize = 32;

/// Errors from `Apple-Challenge` handling
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    /// The challenge header was not valid base64
    #[error("invalid base64 in Apple-Challenge")]
    InvalidChallenge,

    /// Signing failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Compute the `Apple-Response` value for an `Apple-Challenge` header.
///
/// The signed buffer is challenge bytes, then the connected address's IP
/// octets, then the advertised MAC, zero-padded to 32 bytes. The
/// signature is returned base64-encoded without padding, which is the
/// form senders expect.
///
/// # Errors
///
/// Returns [`ChallengeError`] if the challenge is not base64 or signing
/// fails.
pub fn apple_challenge_response(
    challenge_b64: &str,
    local_ip: IpAddr,
    mac: [u8; 6],
    key: &ReceiverRsaKey,
) -> Result<String, ChallengeError> {
    let challenge =
        decode_base64_loose(challenge_b64).map_err(|_| ChallengeError::InvalidChallenge)?;

    let mut buffer = challenge;
    match local_ip {
        IpAddr::V4(ip) => buffer.extend_from_slice(&ip.octets()),
        IpAddr::V6(ip) => buffer.extend_from_slice(&ip.octets()),
    }
    buffer.extend_from_slice(&mac);
    if buffer.len() < CHALLENGE_PADDED_LEN {
        buffer.resize(CHALLENGE_PADDED_LEN, 0);
    }

    let signature = key.sign_challenge(&buffer)?;

    let mut encoded = BASE64.encode(signature);
    while encoded.ends_with('=') {
        encoded.pop();
    }
    Ok(encoded)
}

/// Build the `WWW-Authenticate` value for a 401 response
#[must_use]
pub fn www_authenticate(nonce: &str) -> String {
    format!(r#"Digest realm="{REALM}", nonce="{nonce}""#)
}

/// Verify a request's `Authorization` header against the password.
///
/// Checks the Digest response computed over the password, the nonce we
/// issued and the request's method and URI.
#[must_use]
pub fn authenticate(request: &RtspRequest, password: &str, nonce: &str) -> bool {
    let Some(header) = request.headers.get(names::AUTHORIZATION) else {
        return false;
    };
    let Some(fields) = parse_digest_header(header) else {
        return false;
    };

    let (Some(username), Some(uri), Some(response)) = (
        fields.get("username"),
        fields.get("uri"),
        fields.get("response"),
    ) else {
        return false;
    };

    if fields.get("nonce").map(String::as_str) != Some(nonce) {
        return false;
    }
    if fields.get("realm").map(String::as_str) != Some(REALM) {
        return false;
    }

    let expected = digest_response(username, password, request.method.as_str(), uri, nonce);
    expected.eq_ignore_ascii_case(response)
}

/// Compute the Digest response value (RFC 2617, no qop)
#[must_use]
pub fn digest_response(
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    nonce: &str,
) -> String {
    let ha1 = md5_hex(&format!("{username}:{REALM}:{password}"));
    let ha2 = md5_hex(&format!("{method}:{uri}"));
    md5_hex(&format!("{ha1}:{nonce}:{ha2}"))
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse `Digest k="v", k2=v2` header fields
fn parse_digest_header(header: &str) -> Option<HashMap<String, String>> {
    let rest = header.trim().strip_prefix("Digest ")?;

    let mut fields = HashMap::new();
    for part in rest.split(',') {
        let (key, value) = part.split_once('=')?;
        let value = value.trim().trim_matches('"');
        fields.insert(key.trim().to_string(), value.to_string());
    }
    Some(fields)
}
