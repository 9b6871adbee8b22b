//! RAOP session server
//!
//! Owns the listening socket and the set of live sessions. Start is
//! all-or-nothing: the listener binds first, then the service is
//! published; if publishing fails the listener is torn down and nothing
//! is left running. Per-connection failures never stop the server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{Bytes, BytesMut};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};

use super::config::ReceiverConfig;
use super::events::ReceiverEvent;
use super::rtsp_handler::{HandleResult, HandlerContext, handle_request};
use super::session::{RaopSession, SessionState};
use crate::audio::relay::AudioRelay;
use crate::audio::sink::SinkFactory;
use crate::discovery::advertiser::{AdvertiserConfig, RaopAdvertiser, get_device_mac};
use crate::error::ReceiverError;
use crate::net::connection::{Connection, ConnectionEvent, ConnectionHandle};
use crate::protocol::crypto::{CryptoError, ReceiverRsaKey, SessionCipher};
use crate::protocol::rtsp::{ResponseBuilder, StatusCode, encode_response, server_codec};

/// Server lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Server is stopped
    Stopped,
    /// Server is starting
    Starting,
    /// Server is running and accepting connections
    Running,
    /// Server is stopping
    Stopping,
}

/// RAOP receiver server
pub struct RaopServer {
    config: ReceiverConfig,
    sink_factory: Arc<dyn SinkFactory>,
    state: Arc<RwLock<ServerState>>,
    event_tx: broadcast::Sender<ReceiverEvent>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    sessions: Arc<Mutex<HashMap<u64, SessionEntry>>>,
    port: u16,
}

/// One tracked connection
struct SessionEntry {
    remote: SocketAddr,
    handle: ConnectionHandle,
}

/// Notice sent by a connection task when it ends
struct SessionEnded {
    id: u64,
    remote: SocketAddr,
    reason: String,
}

/// Shared per-server context handed to connection tasks
struct ServerContext {
    password: Option<String>,
    mac: [u8; 6],
    rsa_key: Option<Arc<ReceiverRsaKey>>,
    sink_factory: Arc<dyn SinkFactory>,
    event_tx: broadcast::Sender<ReceiverEvent>,
}

impl ServerContext {
    /// Resolve the session RSA key: configured override or the builtin.
    fn rsa_key(&self) -> Result<Arc<ReceiverRsaKey>, CryptoError> {
        match &self.rsa_key {
            Some(key) => Ok(key.clone()),
            None => ReceiverRsaKey::builtin().map(Arc::new),
        }
    }
}

impl RaopServer {
    /// Create a new server.
    ///
    /// The sink factory is the external collaborator that opens playback
    /// byte sinks when sessions start recording.
    #[must_use]
    pub fn new(config: ReceiverConfig, sink_factory: Arc<dyn SinkFactory>) -> Self {
        let (event_tx, _) = broadcast::channel(64);

        Self {
            config,
            sink_factory,
            state: Arc::new(RwLock::new(ServerState::Stopped)),
            event_tx,
            shutdown_tx: None,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            port: 0,
        }
    }

    /// Subscribe to events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReceiverEvent> {
        self.event_tx.subscribe()
    }

    /// Get current lifecycle state
    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    /// Actual listen port; meaningful once started
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of live sessions
    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Start the server: bind, then advertise, then accept.
    ///
    /// # Errors
    ///
    /// [`ReceiverError::Bind`] if the listener cannot be created (nothing
    /// is advertised), [`ReceiverError::Advertise`] if publication fails
    /// (the listener is torn down), [`ReceiverError::AlreadyRunning`] if
    /// the server is not stopped. In every error case the server ends up
    /// fully stopped.
    pub async fn start(&mut self) -> Result<(), ReceiverError> {
        {
            let mut state = self.state.write().await;
            if *state != ServerState::Stopped {
                return Err(ReceiverError::AlreadyRunning);
            }
            *state = ServerState::Starting;
        }

        let result = self.start_inner().await;
        if let Err(ref e) = result {
            *self.state.write().await = ServerState::Stopped;
            let _ = self.event_tx.send(ReceiverEvent::Error {
                message: e.to_string(),
                fatal: true,
            });
        }
        result
    }

    async fn start_inner(&mut self) -> Result<(), ReceiverError> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port))
            .await
            .map_err(ReceiverError::Bind)?;
        self.port = listener.local_addr().map_err(ReceiverError::Bind)?.port();

        let mac = match self.config.mac_override {
            Some(mac) => mac,
            None => get_device_mac()?,
        };

        // Publish after the socket exists; a publish failure drops the
        // listener on return, leaving nothing half-started.
        let advertiser = if self.config.advertise {
            let advertiser_config = AdvertiserConfig {
                name: self.config.name.clone(),
                port: self.port,
                capabilities: self.config.capabilities.clone(),
                mac_override: Some(mac),
            };
            Some(RaopAdvertiser::start(advertiser_config).await?)
        } else {
            None
        };

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        let (ended_tx, mut ended_rx) = mpsc::channel::<SessionEnded>(32);

        let ctx = Arc::new(ServerContext {
            password: self.config.password.clone(),
            mac,
            rsa_key: self.config.rsa_key.clone(),
            sink_factory: self.sink_factory.clone(),
            event_tx: self.event_tx.clone(),
        });

        let _ = self.event_tx.send(ReceiverEvent::Started {
            name: self.config.name.clone(),
            port: self.port,
        });
        *self.state.write().await = ServerState::Running;

        let state = self.state.clone();
        let sessions = self.sessions.clone();
        let event_tx = self.event_tx.clone();
        let next_id = AtomicU64::new(1);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, addr)) => {
                                accept_connection(
                                    stream,
                                    addr,
                                    next_id.fetch_add(1, Ordering::Relaxed),
                                    &sessions,
                                    &ctx,
                                    &ended_tx,
                                )
                                .await;
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "accept failed");
                            }
                        }
                    }
                    Some(ended) = ended_rx.recv() => {
                        if sessions.lock().await.remove(&ended.id).is_some() {
                            let _ = event_tx.send(ReceiverEvent::ClientDisconnected {
                                address: ended.remote,
                                reason: ended.reason,
                            });
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }

            // Withdraw first, then close every tracked session.
            if let Some(advertiser) = advertiser {
                advertiser.shutdown().await;
            }
            let entries: Vec<SessionEntry> = sessions.lock().await.drain().map(|(_, e)| e).collect();
            for entry in entries {
                entry.handle.close();
                let _ = event_tx.send(ReceiverEvent::ClientDisconnected {
                    address: entry.remote,
                    reason: "server stopped".to_string(),
                });
            }

            *state.write().await = ServerState::Stopped;
            let _ = event_tx.send(ReceiverEvent::Stopped);
        });

        Ok(())
    }

    /// Stop the server: withdraw the advertisement, close every session,
    /// close the listener. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            *self.state.write().await = ServerState::Stopping;
            let _ = tx.send(()).await;
        }
    }
}

async fn accept_connection(
    stream: TcpStream,
    addr: SocketAddr,
    id: u64,
    sessions: &Arc<Mutex<HashMap<u64, SessionEntry>>>,
    ctx: &Arc<ServerContext>,
    ended_tx: &mpsc::Sender<SessionEnded>,
) {
    let (handle, events) = match Connection::open(stream) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(remote = %addr, error = %e, "failed to open connection");
            return;
        }
    };

    sessions.lock().await.insert(
        id,
        SessionEntry {
            remote: addr,
            handle: handle.clone(),
        },
    );

    let _ = ctx
        .event_tx
        .send(ReceiverEvent::ClientConnected { address: addr });

    let ctx = ctx.clone();
    let ended_tx = ended_tx.clone();
    tokio::spawn(async move {
        let reason = drive_connection(handle, events, &ctx).await;
        let _ = ended_tx
            .send(SessionEnded {
                id,
                remote: addr,
                reason,
            })
            .await;
    });
}

/// Drive one connection until it closes; returns the disconnect reason.
async fn drive_connection(
    handle: ConnectionHandle,
    mut events: mpsc::Receiver<ConnectionEvent>,
    ctx: &ServerContext,
) -> String {
    let mut session = RaopSession::new(handle.remote_addr());
    let mut buf = BytesMut::with_capacity(4096);
    let mut relay: Option<AudioRelay> = None;
    let mut reason = "connection closed".to_string();

    while let Some(event) = events.recv().await {
        match event {
            ConnectionEvent::Data(data) => {
                buf.extend_from_slice(&data);
                if !process_buffer(&mut buf, &mut session, &mut relay, &handle, ctx) {
                    reason = "session ended".to_string();
                    handle.close();
                    // Keep draining events until Closed arrives
                }
            }
            ConnectionEvent::Closed => break,
        }
    }

    if let Some(mut relay) = relay.take() {
        relay.close();
        let _ = ctx.event_tx.send(ReceiverEvent::StreamingStopped {
            address: session.remote_addr(),
        });
    }
    let _ = session.set_state(SessionState::Closed);

    reason
}

/// Consume as much of the buffer as possible; false means close.
fn process_buffer(
    buf: &mut BytesMut,
    session: &mut RaopSession,
    relay: &mut Option<AudioRelay>,
    handle: &ConnectionHandle,
    ctx: &ServerContext,
) -> bool {
    loop {
        if buf.is_empty() || session.state().is_closed() {
            return !session.state().is_closed();
        }

        // While streaming, audio frames and RTSP requests interleave on
        // the same byte stream; frames are routed to the relay.
        if session.state() == SessionState::Streaming && AudioRelay::owns_front(buf) {
            if let Some(relay) = relay.as_mut() {
                relay.drain(buf);
            }
            if AudioRelay::owns_front(buf) {
                // Incomplete frame; wait for more bytes
                return true;
            }
            continue;
        }

        match server_codec::decode(buf) {
            Ok(Some(request)) => {
                let rsa_key = match ctx.rsa_key() {
                    Ok(key) => Some(key),
                    Err(e) => {
                        tracing::error!(error = %e, "receiver RSA key unavailable");
                        None
                    }
                };
                let handler_ctx = HandlerContext {
                    rsa_key: rsa_key.as_deref(),
                    password: ctx.password.as_deref(),
                    mac: ctx.mac,
                    local_ip: handle.local_addr().ip(),
                    local_port: handle.local_addr().port(),
                };

                let result = handle_request(&request, session, &handler_ctx);
                if !apply_result(result, buf, session, relay, handle, ctx) {
                    return false;
                }
            }
            Ok(None) => return true,
            Err(e) => {
                tracing::warn!(remote = %session.remote_addr(), error = %e, "malformed request");
                server_codec::discard_malformed(buf);

                let response = ResponseBuilder::error(StatusCode::BAD_REQUEST).cseq(0).build();
                handle.send(Bytes::from(encode_response(&response)));

                if session.record_malformed() {
                    tracing::warn!(
                        remote = %session.remote_addr(),
                        "too many malformed requests, closing"
                    );
                    return false;
                }
            }
        }
    }
}

/// Apply a handler result to the session; false means close.
fn apply_result(
    result: HandleResult,
    buf: &mut BytesMut,
    session: &mut RaopSession,
    relay: &mut Option<AudioRelay>,
    handle: &ConnectionHandle,
    ctx: &ServerContext,
) -> bool {
    if result.malformed {
        if session.record_malformed() {
            handle.send(Bytes::from(encode_response(&result.response)));
            return false;
        }
    } else {
        session.clear_malformed();
    }

    if let Some(outcome) = result.announce {
        if let Err(e) = session.set_negotiated(outcome.keys, outcome.fmtp) {
            tracing::error!(error = %e, "negotiation bookkeeping failed");
        }
    }

    if result.start_streaming {
        match open_relay(session, ctx) {
            Ok(opened) => {
                *relay = Some(opened);
                let _ = ctx.event_tx.send(ReceiverEvent::StreamingStarted {
                    address: session.remote_addr(),
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to open audio sink");
                let _ = ctx.event_tx.send(ReceiverEvent::Error {
                    message: format!("failed to open audio sink: {e}"),
                    fatal: false,
                });
                let response = ResponseBuilder::error(StatusCode::INTERNAL_ERROR)
                    .cseq(result.response.cseq().unwrap_or(0))
                    .build();
                handle.send(Bytes::from(encode_response(&response)));
                return false;
            }
        }
    }

    if result.flush {
        AudioRelay::discard_partial(buf);
    }

    if let Some(volume) = result.volume {
        session.set_volume(volume);
        let _ = ctx.event_tx.send(ReceiverEvent::VolumeChanged { db: volume });
    }

    if let Some(new_state) = result.new_state {
        if let Err(e) = session.set_state(new_state) {
            tracing::error!(error = %e, "handler requested invalid transition");
        }
    }

    handle.send(Bytes::from(encode_response(&result.response)));

    if result.close_connection {
        if let Some(mut relay) = relay.take() {
            relay.close();
            let _ = ctx.event_tx.send(ReceiverEvent::StreamingStopped {
                address: session.remote_addr(),
            });
        }
        return false;
    }

    true
}

fn open_relay(session: &RaopSession, ctx: &ServerContext) -> std::io::Result<AudioRelay> {
    let keys = session.keys().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "no negotiated keys")
    })?;
    let fmtp = session.fmtp().unwrap_or_default();

    let sink = ctx.sink_factory.open(fmtp)?;
    Ok(AudioRelay::new(SessionCipher::new(keys.key, keys.iv), sink))
}
