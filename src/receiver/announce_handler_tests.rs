use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rsa::Pkcs1v15Encrypt;

use super::announce_handler::{AnnounceError, process_announce};
use crate::protocol::crypto::{CryptoError, ReceiverRsaKey};
use crate::protocol::rtsp::{Method, RtspRequest};
use crate::protocol::sdp::SdpParseError;

pub(crate) const TEST_FMTP: &str = "96 352 0 16 40 10 14 2 255 0 0 44100";

pub(crate) fn announce_request(key_b64: &str, iv_b64: &str) -> RtspRequest {
    let mut request = RtspRequest::new(Method::Announce, "rtsp://192.168.1.20/3413821438");
    request.headers.insert("CSeq", "2");
    request.headers.insert("Content-Type", "application/sdp");
    request.body = format!(
        "v=0\r\n\
         o=iTunes 3413821438 0 IN IP4 192.168.1.10\r\n\
         s=iTunes\r\n\
         c=IN IP4 192.168.1.20\r\n\
         t=0 0\r\n\
         m=audio 0 RTP/AVP 96\r\n\
         a=rtpmap:96 AppleLossless\r\n\
         a=fmtp:96 {TEST_FMTP}\r\n\
         a=rsaaeskey:{key_b64}\r\n\
         a=aesiv:{iv_b64}\r\n"
    )
    .into_bytes();
    request
}

pub(crate) fn encrypt_session_key(rsa: &ReceiverRsaKey, aes_key: [u8; 16]) -> String {
    use rand::rngs::OsRng;

    let ciphertext = rsa
        .public_key()
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, &aes_key)
        .unwrap();
    BASE64.encode(ciphertext)
}

#[test]
fn test_announce_negotiates_expected_key_material() {
    let rsa = ReceiverRsaKey::generate().unwrap();
    let aes_key = [0xC4u8; 16];
    let aes_iv = [0x3Bu8; 16];

    let request = announce_request(&encrypt_session_key(&rsa, aes_key), &BASE64.encode(aes_iv));
    let outcome = process_announce(&request, &rsa).unwrap();

    assert_eq!(outcome.keys.key, aes_key);
    assert_eq!(outcome.keys.iv, aes_iv);
    assert_eq!(outcome.fmtp, TEST_FMTP);
}

#[test]
fn test_announce_empty_body() {
    let rsa = ReceiverRsaKey::generate().unwrap();
    let mut request = RtspRequest::new(Method::Announce, "rtsp://h/1");
    request.body.clear();

    assert!(matches!(
        process_announce(&request, &rsa),
        Err(AnnounceError::EmptyBody)
    ));
}

#[test]
fn test_announce_corrupted_base64_key() {
    let rsa = ReceiverRsaKey::generate().unwrap();
    let request = announce_request("@@corrupt@@", &BASE64.encode([1u8; 16]));

    assert!(matches!(
        process_announce(&request, &rsa),
        Err(AnnounceError::Sdp(SdpParseError::InvalidAttribute(_)))
    ));
}

#[test]
fn test_announce_undecryptable_key() {
    let rsa = ReceiverRsaKey::generate().unwrap();
    // Valid base64, but not encrypted with our public key
    let request = announce_request(&BASE64.encode([0u8; 256]), &BASE64.encode([1u8; 16]));

    assert!(matches!(
        process_announce(&request, &rsa),
        Err(AnnounceError::Crypto(CryptoError::DecryptionFailed(_)))
    ));
}

#[test]
fn test_announce_missing_fmtp() {
    let rsa = ReceiverRsaKey::generate().unwrap();
    let mut request = RtspRequest::new(Method::Announce, "rtsp://h/1");
    request.body = b"v=0\r\nm=audio 0 RTP/AVP 96\r\na=rsaaeskey:AAAA\r\na=aesiv:BBBB\r\n".to_vec();

    assert!(matches!(
        process_announce(&request, &rsa),
        Err(AnnounceError::Sdp(SdpParseError::MissingField("fmtp")))
    ));
}
