use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use super::session::{MAX_MALFORMED_REQUESTS, RaopSession, SessionError, SessionKeys, SessionState};

fn test_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 12345)
}

fn test_keys() -> SessionKeys {
    SessionKeys {
        key: [0x11; 16],
        iv: [0x22; 16],
    }
}

#[test]
fn test_protocol_flow_transitions() {
    let mut session = RaopSession::new(test_addr());
    assert_eq!(session.state(), SessionState::Open);

    session.set_state(SessionState::Negotiated).unwrap();
    session.set_state(SessionState::Ready).unwrap();
    session.set_state(SessionState::Streaming).unwrap();
    session.set_state(SessionState::Closed).unwrap();
}

#[test]
fn test_skipping_states_is_rejected() {
    let mut session = RaopSession::new(test_addr());

    assert!(matches!(
        session.set_state(SessionState::Ready),
        Err(SessionError::InvalidTransition { .. })
    ));
    assert!(session.set_state(SessionState::Streaming).is_err());
    assert_eq!(session.state(), SessionState::Open);
}

#[test]
fn test_closed_is_terminal() {
    let mut session = RaopSession::new(test_addr());
    session.set_state(SessionState::Closed).unwrap();

    assert!(session.set_state(SessionState::Negotiated).is_err());
    assert!(session.set_state(SessionState::Closed).is_err());
    assert!(session.state().is_closed());
}

#[test]
fn test_every_state_may_close() {
    for target in [
        SessionState::Open,
        SessionState::Negotiated,
        SessionState::Ready,
        SessionState::Streaming,
    ] {
        assert!(target.can_transition_to(SessionState::Closed));
    }
}

#[test]
fn test_keys_set_once() {
    let mut session = RaopSession::new(test_addr());
    assert!(session.keys().is_none());
    assert!(session.fmtp().is_none());

    session
        .set_negotiated(test_keys(), "96 352 0 16".to_string())
        .unwrap();
    assert_eq!(session.keys().unwrap().key, [0x11; 16]);
    assert_eq!(session.fmtp(), Some("96 352 0 16"));

    let second = SessionKeys {
        key: [0x99; 16],
        iv: [0x88; 16],
    };
    assert!(matches!(
        session.set_negotiated(second, "other".to_string()),
        Err(SessionError::KeysAlreadySet)
    ));
    // Original material untouched
    assert_eq!(session.keys().unwrap().key, [0x11; 16]);
}

#[test]
fn test_malformed_strikes() {
    let mut session = RaopSession::new(test_addr());

    for _ in 0..MAX_MALFORMED_REQUESTS - 1 {
        assert!(!session.record_malformed());
    }
    assert!(session.record_malformed());
}

#[test]
fn test_malformed_strikes_reset_on_good_request() {
    let mut session = RaopSession::new(test_addr());

    assert!(!session.record_malformed());
    assert!(!session.record_malformed());
    session.clear_malformed();

    assert!(!session.record_malformed());
    assert!(!session.record_malformed());
    assert!(session.record_malformed());
}

#[test]
fn test_volume_is_clamped() {
    let mut session = RaopSession::new(test_addr());

    session.set_volume(-20.5);
    assert!((session.volume() - -20.5).abs() < f32::EPSILON);

    session.set_volume(5.0);
    assert!((session.volume() - 0.0).abs() < f32::EPSILON);

    session.set_volume(-500.0);
    assert!((session.volume() - -144.0).abs() < f32::EPSILON);
}

#[test]
fn test_session_ids_are_distinct() {
    let a = RaopSession::new(test_addr());
    let b = RaopSession::new(test_addr());
    assert_ne!(a.id(), b.id());
    assert_eq!(a.id().len(), 16);
}
