//! Sans-IO RTSP protocol implementation for RAOP session control

pub mod headers;
pub mod request;
pub mod response;
pub mod server_codec;

pub use headers::Headers;
pub use request::RtspRequest;
pub use response::{RtspResponse, StatusCode};
pub use server_codec::{ResponseBuilder, RtspRequestCodec, encode_response};

#[cfg(test)]
mod server_codec_tests;

/// RTSP methods used in RAOP session control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Query supported methods
    Options,
    /// Announce stream information (SDP with key material)
    Announce,
    /// Set up transport parameters
    Setup,
    /// Start streaming
    Record,
    /// Set parameter (volume, metadata)
    SetParameter,
    /// Get parameter (keep-alive, status queries)
    GetParameter,
    /// Discard buffered audio
    Flush,
    /// Tear down session
    Teardown,
    /// Anything else; answered with 400 rather than rejected at parse time
    Unknown,
}

impl Method {
    /// Convert to RTSP method string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::Announce => "ANNOUNCE",
            Method::Setup => "SETUP",
            Method::Record => "RECORD",
            Method::SetParameter => "SET_PARAMETER",
            Method::GetParameter => "GET_PARAMETER",
            Method::Flush => "FLUSH",
            Method::Teardown => "TEARDOWN",
            Method::Unknown => "UNKNOWN",
        }
    }

    /// Parse a request-line method token.
    ///
    /// Unrecognized tokens map to [`Method::Unknown`]; deciding how to
    /// answer them is the state machine's job, not the parser's.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token.to_uppercase().as_str() {
            "OPTIONS" => Method::Options,
            "ANNOUNCE" => Method::Announce,
            "SETUP" => Method::Setup,
            "RECORD" => Method::Record,
            "SET_PARAMETER" => Method::SetParameter,
            "GET_PARAMETER" => Method::GetParameter,
            "FLUSH" => Method::Flush,
            "TEARDOWN" => Method::Teardown,
            _ => Method::Unknown,
        }
    }

    /// Methods advertised in the OPTIONS `Public` header
    pub const SUPPORTED: [Method; 8] = [
        Method::Announce,
        Method::Setup,
        Method::Record,
        Method::Flush,
        Method::Teardown,
        Method::Options,
        Method::GetParameter,
        Method::SetParameter,
    ];
}
