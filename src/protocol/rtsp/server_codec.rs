//! Server-side RTSP codec for parsing requests and generating responses
//!
//! # Sans-IO Design
//!
//! No I/O happens here. [`decode`] pulls at most one complete request off
//! the front of a caller-owned buffer, leaving partial data in place until
//! more bytes arrive — a request may span any number of transport reads,
//! and a `Content-Length` header determines exactly how many body bytes
//! must be buffered before the request is complete.

use super::{Headers, Method, RtspRequest, RtspResponse, StatusCode};
use bytes::BytesMut;
use std::str;

/// Errors during RTSP request parsing
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid request line: {0}")]
    InvalidRequestLine(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("header section too large: {size} > {max}")]
    HeadersTooLarge { size: usize, max: usize },

    #[error("body too large: {size} > {max}")]
    BodyTooLarge { size: usize, max: usize },

    #[error("invalid UTF-8 in headers")]
    InvalidUtf8,
}

/// Maximum allowed body size (1 MB is generous for RAOP session control)
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Maximum header section size (16 KB)
const MAX_HEADER_SIZE: usize = 16 * 1024;

/// Attempt to decode one complete RTSP request from the front of `buf`.
///
/// Returns:
/// - `Ok(Some(request))` with the request's bytes consumed
/// - `Ok(None)` if more data is needed (nothing consumed)
/// - `Err(e)` if the data at the front is malformed (nothing consumed;
///   see [`discard_malformed`] to resynchronize)
///
/// # Errors
/// Returns [`ParseError`] if the request start line, a header or the
/// Content-Length is malformed, or a size cap is exceeded.
pub fn decode(buf: &mut BytesMut) -> Result<Option<RtspRequest>, ParseError> {
    let Some(header_end) = find_header_end(buf) else {
        if buf.len() > MAX_HEADER_SIZE {
            return Err(ParseError::HeadersTooLarge {
                size: buf.len(),
                max: MAX_HEADER_SIZE,
            });
        }
        return Ok(None);
    };

    let header_str = str::from_utf8(&buf[..header_end]).map_err(|_| ParseError::InvalidUtf8)?;
    let (method, uri, headers) = parse_headers(header_str)?;

    let content_length = match headers.get("Content-Length") {
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidContentLength(value.to_string()))?,
        None => 0,
    };

    if content_length > MAX_BODY_SIZE {
        return Err(ParseError::BodyTooLarge {
            size: content_length,
            max: MAX_BODY_SIZE,
        });
    }

    // Total message size: headers + \r\n\r\n + body
    let total_size = header_end + 4 + content_length;
    if buf.len() < total_size {
        return Ok(None);
    }

    let _ = buf.split_to(header_end + 4);
    let body = if content_length > 0 {
        buf.split_to(content_length).to_vec()
    } else {
        Vec::new()
    };

    Ok(Some(RtspRequest {
        method,
        uri,
        headers,
        body,
    }))
}

/// Drop the malformed message at the front of `buf`.
///
/// Consumes through the header terminator if one is present, otherwise
/// clears the buffer. Called after [`decode`] returns an error so the
/// session can answer 400 and keep parsing subsequent requests.
pub fn discard_malformed(buf: &mut BytesMut) {
    if let Some(header_end) = find_header_end(buf) {
        let _ = buf.split_to(header_end + 4);
    } else {
        buf.clear();
    }
}

fn find_header_end(buf: &BytesMut) -> Option<usize> {
    let needle = b"\r\n\r\n";
    buf.windows(needle.len()).position(|window| window == needle)
}

/// Parse request line and headers
fn parse_headers(header_str: &str) -> Result<(Method, String, Headers), ParseError> {
    let mut lines = header_str.lines();

    // Request line: "METHOD uri RTSP/1.0"
    let request_line = lines
        .next()
        .ok_or_else(|| ParseError::InvalidRequestLine("empty request".into()))?;

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(ParseError::InvalidRequestLine(request_line.to_string()));
    }

    let method = Method::from_token(parts[0]);
    let uri = parts[1].to_string();

    if !parts[2].starts_with("RTSP/") {
        return Err(ParseError::InvalidRequestLine(format!(
            "invalid protocol: {}",
            parts[2]
        )));
    }

    let mut headers = Headers::new();
    for line in lines {
        if line.is_empty() {
            break;
        }

        if let Some(pos) = line.find(':') {
            let name = line[..pos].trim().to_string();
            let value = line[pos + 1..].trim().to_string();
            if name.is_empty() {
                return Err(ParseError::InvalidHeader(line.to_string()));
            }
            headers.insert(name, value);
        } else {
            return Err(ParseError::InvalidHeader(line.to_string()));
        }
    }

    Ok((method, uri, headers))
}

/// Server-side RTSP request codec
///
/// Owns its buffer; `feed()` adds bytes, `decode()` attempts to parse one
/// complete request. Thin wrapper over the free [`decode`] function for
/// callers that do not share the buffer with another framing layer.
#[derive(Default)]
pub struct RtspRequestCodec {
    buffer: BytesMut,
}

impl RtspRequestCodec {
    /// Create a new codec
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Feed bytes into the internal buffer
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempt to decode one complete request
    ///
    /// # Errors
    /// Returns [`ParseError`] if the buffered data is malformed.
    pub fn decode(&mut self) -> Result<Option<RtspRequest>, ParseError> {
        decode(&mut self.buffer)
    }

    /// Bytes currently buffered
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Builder for RTSP responses
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl ResponseBuilder {
    /// Create a new response builder with the given status
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Create an OK (200) response
    #[must_use]
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: StatusCode) -> Self {
        Self::new(status)
    }

    /// Set the `CSeq` header (echoes the request)
    #[must_use]
    pub fn cseq(mut self, cseq: u32) -> Self {
        self.headers.insert("CSeq", cseq.to_string());
        self
    }

    /// Set the Session header
    #[must_use]
    pub fn session(mut self, session_id: &str) -> Self {
        self.headers.insert("Session", session_id);
        self
    }

    /// Add a custom header
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a text body (sets Content-Type to text/parameters)
    #[must_use]
    pub fn text_body(mut self, body: &str) -> Self {
        self.body = Some(body.as_bytes().to_vec());
        self.headers.insert("Content-Type", "text/parameters");
        self
    }

    /// Build into an [`RtspResponse`]
    #[must_use]
    pub fn build(mut self) -> RtspResponse {
        if let Some(ref body) = self.body {
            self.headers.insert("Content-Length", body.len().to_string());
        }

        RtspResponse {
            version: "RTSP/1.0".to_string(),
            status: self.status,
            reason: status_reason(self.status).to_string(),
            headers: self.headers,
            body: self.body.unwrap_or_default(),
        }
    }

    /// Encode directly to wire bytes
    #[must_use]
    pub fn encode(self) -> Vec<u8> {
        encode_response(&self.build())
    }
}

/// Encode an RTSP response to wire bytes
#[must_use]
pub fn encode_response(response: &RtspResponse) -> Vec<u8> {
    let mut output = Vec::with_capacity(256 + response.body.len());

    output.extend_from_slice(
        format!(
            "{} {} {}\r\n",
            response.version,
            response.status.as_u16(),
            response.reason
        )
        .as_bytes(),
    );

    for (name, value) in response.headers.iter() {
        output.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }

    output.extend_from_slice(b"\r\n");

    if !response.body.is_empty() {
        output.extend_from_slice(&response.body);
    }

    output
}

/// Get reason phrase for status code
fn status_reason(status: StatusCode) -> &'static str {
    match status.as_u16() {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        453 => "Not Enough Bandwidth",
        454 => "Session Not Found",
        455 => "Method Not Valid in This State",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
