//! RAOP-specific SDP extraction
//!
//! Pulls the key-exchange and codec-format fields out of an ANNOUNCE
//! session description.

use super::{SdpParseError, SessionDescription};
use crate::protocol::decode_base64_loose;

/// Key-exchange and format parameters carried by an ANNOUNCE body
#[derive(Debug, Clone)]
pub struct AnnounceParams {
    /// RSA-encrypted AES session key (base64-decoded, still encrypted)
    pub encrypted_aes_key: Vec<u8>,
    /// AES initialization vector (base64-decoded)
    pub aes_iv: [u8; 16],
    /// Codec format parameter string (`fmtp`), stored verbatim
    pub fmtp: String,
}

/// Extract RAOP parameters from a parsed session description.
///
/// # Errors
///
/// Returns [`SdpParseError`] if the audio media section or any of the
/// `rsaaeskey`, `aesiv` or `fmtp` attributes is missing, if the base64 is
/// malformed, or if the IV is not 16 bytes.
pub fn extract_announce_params(sdp: &SessionDescription) -> Result<AnnounceParams, SdpParseError> {
    let media = sdp
        .audio_media()
        .ok_or(SdpParseError::MissingField("audio media"))?;

    let key_b64 = media
        .attribute("rsaaeskey")
        .ok_or(SdpParseError::MissingField("rsaaeskey"))?;
    let iv_b64 = media
        .attribute("aesiv")
        .ok_or(SdpParseError::MissingField("aesiv"))?;
    let fmtp = media
        .attribute("fmtp")
        .ok_or(SdpParseError::MissingField("fmtp"))?;

    let encrypted_aes_key = decode_base64_loose(key_b64)
        .map_err(|_| SdpParseError::InvalidAttribute("invalid base64 in rsaaeskey".to_string()))?;

    let iv_bytes = decode_base64_loose(iv_b64)
        .map_err(|_| SdpParseError::InvalidAttribute("invalid base64 in aesiv".to_string()))?;

    if iv_bytes.len() != 16 {
        return Err(SdpParseError::InvalidAttribute(format!(
            "AES IV must be 16 bytes, got {}",
            iv_bytes.len()
        )));
    }

    let mut aes_iv = [0u8; 16];
    aes_iv.copy_from_slice(&iv_bytes);

    Ok(AnnounceParams {
        encrypted_aes_key,
        aes_iv,
        fmtp: fmtp.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::sdp::SdpParser;
    use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

    fn announce_body(key_b64: &str, iv_b64: &str) -> String {
        format!(
            "v=0\r\n\
             o=iTunes 3413821438 0 IN IP4 192.168.1.10\r\n\
             s=iTunes\r\n\
             m=audio 0 RTP/AVP 96\r\n\
             a=rtpmap:96 AppleLossless\r\n\
             a=fmtp:96 352 0 16 40 10 14 2 255 0 0 44100\r\n\
             a=rsaaeskey:{key_b64}\r\n\
             a=aesiv:{iv_b64}\r\n"
        )
    }

    #[test]
    fn test_extract_announce_params() {
        let iv = [7u8; 16];
        let body = announce_body(&BASE64.encode([1u8; 128]), &BASE64.encode(iv));
        let sdp = SdpParser::parse(&body).unwrap();

        let params = extract_announce_params(&sdp).unwrap();
        assert_eq!(params.encrypted_aes_key.len(), 128);
        assert_eq!(params.aes_iv, iv);
        assert_eq!(params.fmtp, "96 352 0 16 40 10 14 2 255 0 0 44100");
    }

    #[test]
    fn test_unpadded_base64_accepted() {
        let iv = [9u8; 16];
        let iv_b64 = BASE64.encode(iv).trim_end_matches('=').to_string();
        let body = announce_body(&BASE64.encode([1u8; 128]), &iv_b64);
        let sdp = SdpParser::parse(&body).unwrap();

        let params = extract_announce_params(&sdp).unwrap();
        assert_eq!(params.aes_iv, iv);
    }

    #[test]
    fn test_corrupted_key_base64() {
        let body = announce_body("@@not base64@@", &BASE64.encode([7u8; 16]));
        let sdp = SdpParser::parse(&body).unwrap();

        assert!(matches!(
            extract_announce_params(&sdp),
            Err(SdpParseError::InvalidAttribute(_))
        ));
    }

    #[test]
    fn test_missing_iv() {
        let body = "v=0\r\nm=audio 0 RTP/AVP 96\r\na=fmtp:96 352\r\na=rsaaeskey:AAAA\r\n";
        let sdp = SdpParser::parse(body).unwrap();

        assert!(matches!(
            extract_announce_params(&sdp),
            Err(SdpParseError::MissingField("aesiv"))
        ));
    }

    #[test]
    fn test_wrong_iv_length() {
        let body = announce_body(&BASE64.encode([1u8; 128]), &BASE64.encode([7u8; 8]));
        let sdp = SdpParser::parse(&body).unwrap();

        assert!(matches!(
            extract_announce_params(&sdp),
            Err(SdpParseError::InvalidAttribute(_))
        ));
    }
}
