//! RTSP request handlers for the receiver
//!
//! The logic for handling each RTSP method. Handlers are pure functions
//! over the request, the current session and the server context; they
//! return a [`HandleResult`] describing the response and the side effects
//! the connection driver must apply. No I/O happens here.
//!
//! A method arriving in a state that does not permit it, or an
//! unrecognized method, is answered with 400 and leaves the state
//! unchanged — senders retry, so one out-of-order request must not cost
//! them the connection. The exceptions are ANNOUNCE failures, which close
//! the connection (the session can never decrypt audio), and TEARDOWN.

use std::net::IpAddr;

use super::announce_handler::{AnnounceError, AnnounceOutcome, process_announce};
use super::auth;
use super::session::{RaopSession, SessionState};
use crate::protocol::crypto::ReceiverRsaKey;
use crate::protocol::rtsp::headers::{names, raop};
use crate::protocol::rtsp::{Method, ResponseBuilder, RtspRequest, RtspResponse, StatusCode};

/// Server-wide context the handlers need
pub struct HandlerContext<'a> {
    /// Receiver RSA key for key exchange and challenge signing
    pub rsa_key: Option<&'a ReceiverRsaKey>,
    /// Configured password, if any
    pub password: Option<&'a str>,
    /// MAC advertised in the service name
    pub mac: [u8; 6],
    /// IP the client connected to (challenge signing)
    pub local_ip: IpAddr,
    /// Port the client connected to (echoed in SETUP)
    pub local_port: u16,
}

/// Result of handling an RTSP request
#[derive(Debug)]
pub struct HandleResult {
    /// Response to send back
    pub response: RtspResponse,
    /// New session state (if changed)
    pub new_state: Option<SessionState>,
    /// Negotiated key material to store (ANNOUNCE)
    pub announce: Option<AnnounceOutcome>,
    /// Open the sink and start relaying (RECORD)
    pub start_streaming: bool,
    /// Discard any buffered partial audio packet (FLUSH)
    pub flush: bool,
    /// Close the connection after sending the response
    pub close_connection: bool,
    /// Counts toward the malformed-request limit
    pub malformed: bool,
    /// Volume from SET_PARAMETER, in dB
    pub volume: Option<f32>,
}

impl HandleResult {
    fn from_response(response: RtspResponse) -> Self {
        Self {
            response,
            new_state: None,
            announce: None,
            start_streaming: false,
            flush: false,
            close_connection: false,
            malformed: false,
            volume: None,
        }
    }
}

/// Handle an incoming RTSP request
#[must_use]
pub fn handle_request(
    request: &RtspRequest,
    session: &RaopSession,
    ctx: &HandlerContext<'_>,
) -> HandleResult {
    let cseq = request.cseq().unwrap_or(0);

    let mut result = dispatch(request, session, ctx, cseq);

    // Any request may carry an Apple-Challenge; answer it on the way out.
    if let (Some(challenge), Some(rsa_key)) =
        (request.headers.get(raop::APPLE_CHALLENGE), ctx.rsa_key)
    {
        match auth::apple_challenge_response(challenge, ctx.local_ip, ctx.mac, rsa_key) {
            Ok(response) => result
                .response
                .headers
                .insert(raop::APPLE_RESPONSE, response),
            Err(e) => tracing::warn!(error = %e, "failed to answer Apple-Challenge"),
        }
    }

    result
}

fn dispatch(
    request: &RtspRequest,
    session: &RaopSession,
    ctx: &HandlerContext<'_>,
    cseq: u32,
) -> HandleResult {
    // OPTIONS stays reachable without credentials so senders can probe;
    // everything else requires the password when one is configured.
    if request.method != Method::Options {
        if let Some(password) = ctx.password {
            if !auth::authenticate(request, password, session.auth_nonce()) {
                return unauthorized(cseq, session);
            }
        }
    }

    match request.method {
        Method::Options => handle_options(cseq, session),
        Method::Announce => handle_announce(request, cseq, session, ctx),
        Method::Setup => handle_setup(request, cseq, session, ctx),
        Method::Record => handle_record(cseq, session),
        Method::SetParameter => handle_set_parameter(request, cseq, session),
        Method::GetParameter => handle_get_parameter(request, cseq, session),
        Method::Flush => handle_flush(cseq, session),
        Method::Teardown => handle_teardown(cseq),
        Method::Unknown => error_result(StatusCode::BAD_REQUEST, cseq),
    }
}

/// Handle OPTIONS: allowed in any state, reports supported methods
fn handle_options(cseq: u32, session: &RaopSession) -> HandleResult {
    if session.state().is_closed() {
        return error_result(StatusCode::BAD_REQUEST, cseq);
    }

    let methods = Method::SUPPORTED
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let response = ResponseBuilder::ok()
        .cseq(cseq)
        .header(names::PUBLIC, &methods)
        .build();

    HandleResult::from_response(response)
}

/// Handle ANNOUNCE: key negotiation, only valid on a fresh session
fn handle_announce(
    request: &RtspRequest,
    cseq: u32,
    session: &RaopSession,
    ctx: &HandlerContext<'_>,
) -> HandleResult {
    if session.state() != SessionState::Open {
        // Includes the second-ANNOUNCE case: negotiated material is
        // immutable, so a repeat is a protocol violation answered 400.
        return error_result(StatusCode::BAD_REQUEST, cseq);
    }

    let Some(rsa_key) = ctx.rsa_key else {
        tracing::error!("no receiver RSA key available, cannot negotiate");
        return announce_failure(StatusCode::INTERNAL_ERROR, cseq);
    };

    match process_announce(request, rsa_key) {
        Ok(outcome) => {
            let response = ResponseBuilder::ok().cseq(cseq).build();
            HandleResult {
                new_state: Some(SessionState::Negotiated),
                announce: Some(outcome),
                ..HandleResult::from_response(response)
            }
        }
        Err(e) => {
            tracing::warn!(
                remote = %session.remote_addr(),
                error = %e,
                "ANNOUNCE rejected, closing session"
            );
            let status = match e {
                AnnounceError::Crypto(_) => StatusCode::INTERNAL_ERROR,
                _ => StatusCode::BAD_REQUEST,
            };
            announce_failure(status, cseq)
        }
    }
}

/// A failed negotiation is fatal for the connection, not the server
fn announce_failure(status: StatusCode, cseq: u32) -> HandleResult {
    HandleResult {
        new_state: Some(SessionState::Closed),
        close_connection: true,
        ..HandleResult::from_response(ResponseBuilder::error(status).cseq(cseq).build())
    }
}

/// Handle SETUP: echo transport parameters, only valid once negotiated
fn handle_setup(
    request: &RtspRequest,
    cseq: u32,
    session: &RaopSession,
    ctx: &HandlerContext<'_>,
) -> HandleResult {
    if session.state() != SessionState::Negotiated {
        return error_result(StatusCode::BAD_REQUEST, cseq);
    }

    let Some(transport) = request.headers.get(names::TRANSPORT) else {
        // Required header missing: malformed, counts toward the limit
        return HandleResult {
            malformed: true,
            ..error_result(StatusCode::BAD_REQUEST, cseq)
        };
    };

    let response_transport = format!("{transport};server_port={}", ctx.local_port);

    let response = ResponseBuilder::ok()
        .cseq(cseq)
        .session(session.id())
        .header(names::TRANSPORT, &response_transport)
        .header(raop::AUDIO_JACK_STATUS, "connected; type=analog")
        .build();

    HandleResult {
        new_state: Some(SessionState::Ready),
        ..HandleResult::from_response(response)
    }
}

/// Handle RECORD: open the sink and start streaming
fn handle_record(cseq: u32, session: &RaopSession) -> HandleResult {
    if session.state() != SessionState::Ready {
        return error_result(StatusCode::BAD_REQUEST, cseq);
    }

    let response = ResponseBuilder::ok()
        .cseq(cseq)
        .session(session.id())
        .header(raop::AUDIO_JACK_STATUS, "connected; type=analog")
        .build();

    HandleResult {
        new_state: Some(SessionState::Streaming),
        start_streaming: true,
        ..HandleResult::from_response(response)
    }
}

/// Handle SET_PARAMETER: acknowledge, surface volume changes
fn handle_set_parameter(request: &RtspRequest, cseq: u32, session: &RaopSession) -> HandleResult {
    if !matches!(
        session.state(),
        SessionState::Ready | SessionState::Streaming
    ) {
        return error_result(StatusCode::BAD_REQUEST, cseq);
    }

    let volume = parse_volume_parameter(&request.body);

    let response = ResponseBuilder::ok().cseq(cseq).build();
    HandleResult {
        volume,
        ..HandleResult::from_response(response)
    }
}

/// Handle GET_PARAMETER: keep-alive and status queries
fn handle_get_parameter(request: &RtspRequest, cseq: u32, session: &RaopSession) -> HandleResult {
    if !matches!(
        session.state(),
        SessionState::Ready | SessionState::Streaming
    ) {
        return error_result(StatusCode::BAD_REQUEST, cseq);
    }

    let body_str = String::from_utf8_lossy(&request.body);

    let response = if body_str.contains("volume") {
        ResponseBuilder::ok()
            .cseq(cseq)
            .text_body(&format!("volume: {:.6}\r\n", session.volume()))
            .build()
    } else {
        ResponseBuilder::ok().cseq(cseq).build()
    };

    HandleResult::from_response(response)
}

/// Handle FLUSH: discard buffered audio, streaming continues
fn handle_flush(cseq: u32, session: &RaopSession) -> HandleResult {
    if session.state() != SessionState::Streaming {
        return error_result(StatusCode::BAD_REQUEST, cseq);
    }

    let response = ResponseBuilder::ok().cseq(cseq).build();
    HandleResult {
        flush: true,
        ..HandleResult::from_response(response)
    }
}

/// Handle TEARDOWN: allowed in any state, ends the connection
fn handle_teardown(cseq: u32) -> HandleResult {
    let response = ResponseBuilder::ok().cseq(cseq).build();
    HandleResult {
        new_state: Some(SessionState::Closed),
        close_connection: true,
        ..HandleResult::from_response(response)
    }
}

/// 401 with a fresh Digest challenge
fn unauthorized(cseq: u32, session: &RaopSession) -> HandleResult {
    let response = ResponseBuilder::error(StatusCode::UNAUTHORIZED)
        .cseq(cseq)
        .header(
            names::WWW_AUTHENTICATE,
            &auth::www_authenticate(session.auth_nonce()),
        )
        .build();
    HandleResult::from_response(response)
}

/// Generate an error result; state is left unchanged
fn error_result(status: StatusCode, cseq: u32) -> HandleResult {
    HandleResult::from_response(ResponseBuilder::error(status).cseq(cseq).build())
}

/// Extract `volume: <db>` from a text/parameters body
fn parse_volume_parameter(body: &[u8]) -> Option<f32> {
    let text = std::str::from_utf8(body).ok()?;
    for line in text.lines() {
        if let Some(value) = line.strip_prefix("volume:") {
            return value.trim().parse().ok();
        }
    }
    None
}
