use bytes::BytesMut;
use proptest::prelude::*;

use super::server_codec::{ParseError, ResponseBuilder, RtspRequestCodec, decode, discard_malformed};
use super::{Method, StatusCode};

#[test]
fn test_decode_simple_options() {
    let mut codec = RtspRequestCodec::new();
    codec.feed(b"OPTIONS * RTSP/1.0\r\nCSeq: 1\r\n\r\n");

    let request = codec.decode().unwrap().expect("complete request");
    assert_eq!(request.method, Method::Options);
    assert_eq!(request.uri, "*");
    assert_eq!(request.cseq(), Some(1));
    assert!(request.body.is_empty());
    assert_eq!(codec.buffer_len(), 0);
}

#[test]
fn test_decode_needs_more_data() {
    let mut codec = RtspRequestCodec::new();
    codec.feed(b"OPTIONS * RTSP/1.0\r\nCSeq: 1\r\n");

    assert!(codec.decode().unwrap().is_none());

    codec.feed(b"\r\n");
    assert!(codec.decode().unwrap().is_some());
}

#[test]
fn test_decode_body_via_content_length() {
    let mut codec = RtspRequestCodec::new();
    codec.feed(b"ANNOUNCE rtsp://host/1 RTSP/1.0\r\nCSeq: 2\r\nContent-Length: 5\r\n\r\nhel");

    // Headers complete but body short: not ready yet
    assert!(codec.decode().unwrap().is_none());

    codec.feed(b"lo");
    let request = codec.decode().unwrap().expect("complete request");
    assert_eq!(request.method, Method::Announce);
    assert_eq!(request.body, b"hello");
}

#[test]
fn test_decode_split_across_many_reads_matches_single_read() {
    let wire = b"SETUP rtsp://host/1 RTSP/1.0\r\nCSeq: 3\r\nTransport: RTP/AVP/TCP;unicast;interleaved=0-1\r\nContent-Length: 4\r\n\r\nabcd";

    let mut whole = RtspRequestCodec::new();
    whole.feed(wire);
    let expected = whole.decode().unwrap().unwrap();

    let mut split = RtspRequestCodec::new();
    for chunk in wire.chunks(3) {
        split.feed(chunk);
    }
    let got = split.decode().unwrap().unwrap();

    assert_eq!(got.method, expected.method);
    assert_eq!(got.uri, expected.uri);
    assert_eq!(got.body, expected.body);
    assert_eq!(
        got.headers.get("Transport"),
        expected.headers.get("Transport")
    );
}

#[test]
fn test_two_pipelined_requests() {
    let mut codec = RtspRequestCodec::new();
    codec.feed(b"OPTIONS * RTSP/1.0\r\nCSeq: 1\r\n\r\nTEARDOWN rtsp://h/1 RTSP/1.0\r\nCSeq: 2\r\n\r\n");

    let first = codec.decode().unwrap().unwrap();
    let second = codec.decode().unwrap().unwrap();
    assert_eq!(first.method, Method::Options);
    assert_eq!(second.method, Method::Teardown);
    assert!(codec.decode().unwrap().is_none());
}

#[test]
fn test_unknown_method_parses() {
    let mut codec = RtspRequestCodec::new();
    codec.feed(b"DESCRIBE rtsp://host/1 RTSP/1.0\r\nCSeq: 9\r\n\r\n");

    let request = codec.decode().unwrap().unwrap();
    assert_eq!(request.method, Method::Unknown);
}

#[test]
fn test_malformed_request_line() {
    let mut codec = RtspRequestCodec::new();
    codec.feed(b"NONSENSE\r\nCSeq: 1\r\n\r\n");

    assert!(matches!(
        codec.decode(),
        Err(ParseError::InvalidRequestLine(_))
    ));
}

#[test]
fn test_wrong_protocol_token() {
    let mut codec = RtspRequestCodec::new();
    codec.feed(b"OPTIONS * HTTP/1.1\r\n\r\n");

    assert!(matches!(
        codec.decode(),
        Err(ParseError::InvalidRequestLine(_))
    ));
}

#[test]
fn test_bad_content_length() {
    let mut codec = RtspRequestCodec::new();
    codec.feed(b"ANNOUNCE rtsp://h/1 RTSP/1.0\r\nContent-Length: lots\r\n\r\n");

    assert!(matches!(
        codec.decode(),
        Err(ParseError::InvalidContentLength(_))
    ));
}

#[test]
fn test_discard_malformed_resynchronizes() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(b"GARBAGE LINE\r\n\r\nOPTIONS * RTSP/1.0\r\nCSeq: 4\r\n\r\n");

    assert!(decode(&mut buf).is_err());
    discard_malformed(&mut buf);

    let request = decode(&mut buf).unwrap().expect("next request parses");
    assert_eq!(request.method, Method::Options);
    assert_eq!(request.cseq(), Some(4));
}

#[test]
fn test_response_encoding() {
    let bytes = ResponseBuilder::ok()
        .cseq(7)
        .header("Public", "ANNOUNCE, SETUP, RECORD")
        .encode();
    let text = String::from_utf8(bytes).unwrap();

    assert!(text.starts_with("RTSP/1.0 200 OK\r\n"));
    assert!(text.contains("CSeq: 7\r\n"));
    assert!(text.contains("Public: ANNOUNCE, SETUP, RECORD\r\n"));
    assert!(text.ends_with("\r\n\r\n"));
}

#[test]
fn test_response_with_body_gets_content_length() {
    let response = ResponseBuilder::ok()
        .cseq(1)
        .text_body("volume: -11.5\r\n")
        .build();

    assert_eq!(response.headers.get("Content-Length"), Some("15"));
    assert_eq!(response.headers.content_type(), Some("text/parameters"));
}

#[test]
fn test_error_status_reason() {
    let response = ResponseBuilder::error(StatusCode::METHOD_NOT_VALID).cseq(2).build();
    assert_eq!(response.reason, "Method Not Valid in This State");
    assert!(response.status.is_client_error());
}

proptest! {
    /// A fixed request reassembles identically no matter where the
    /// transport splits it.
    #[test]
    fn prop_arbitrary_split_points(split in 1usize..80) {
        let wire: &[u8] = b"ANNOUNCE rtsp://10.0.0.2/1 RTSP/1.0\r\nCSeq: 11\r\nContent-Length: 14\r\n\r\nv=0\r\no=x y z\r\n";

        let mut codec = RtspRequestCodec::new();
        let cut = split.min(wire.len());
        codec.feed(&wire[..cut]);
        let early = codec.decode().unwrap();
        codec.feed(&wire[cut..]);

        let request = match early {
            Some(r) => r,
            None => codec.decode().unwrap().expect("request completes"),
        };

        prop_assert_eq!(request.method, Method::Announce);
        prop_assert_eq!(request.cseq(), Some(11));
        prop_assert_eq!(request.body.len(), 14);
    }
}
