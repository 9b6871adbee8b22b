//! Byte-oriented transport connection
//!
//! Wraps an accepted TCP socket behind a small handle/event pair: received
//! bytes are delivered in arrival order on an event channel, writes are
//! queued and never block the caller, and the close notification fires
//! exactly once no matter which side goes away first.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Notify, mpsc};

/// Events delivered to the upper-layer handler of a connection
#[derive(Debug)]
pub enum ConnectionEvent {
    /// Bytes received from the peer, in arrival order.
    ///
    /// The stream is byte-oriented: a single protocol message may span
    /// several `Data` events and one event may carry several messages.
    Data(Bytes),

    /// The connection is gone (remote close, I/O error or local `close()`).
    ///
    /// Delivered exactly once, always the final event.
    Closed,
}

/// Handle for sending on and closing a [`Connection`]
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    remote: SocketAddr,
    local: SocketAddr,
    outbound: mpsc::UnboundedSender<Bytes>,
    closed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl ConnectionHandle {
    /// Queue bytes for transmission.
    ///
    /// Never blocks; data is buffered until the socket is writable. Sends
    /// after close are silently dropped.
    pub fn send(&self, data: Bytes) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let _ = self.outbound.send(data);
    }

    /// Close the connection.
    ///
    /// Idempotent and safe to call from any path; queued writes are
    /// flushed before the socket is shut down.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.shutdown.notify_waiters();
        }
    }

    /// Whether `close()` has been invoked or the peer went away
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Peer address, fixed at accept time
    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// Local address of the accepted socket
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }
}

/// An open transport connection
pub struct Connection;

impl Connection {
    /// Take ownership of an accepted stream and start its I/O tasks.
    ///
    /// Returns the send/close handle and the event channel carrying
    /// received bytes and the final [`ConnectionEvent::Closed`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the socket handle is not usable (peer or
    /// local address cannot be resolved).
    pub fn open(
        stream: TcpStream,
    ) -> io::Result<(ConnectionHandle, mpsc::Receiver<ConnectionEvent>)> {
        let remote = stream.peer_addr()?;
        let local = stream.local_addr()?;
        let (read_half, write_half) = stream.into_split();

        let (event_tx, event_rx) = mpsc::channel(64);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());

        let handle = ConnectionHandle {
            remote,
            local,
            outbound: outbound_tx,
            closed: closed.clone(),
            shutdown: shutdown.clone(),
        };

        tokio::spawn(write_loop(write_half, outbound_rx, shutdown.clone()));
        tokio::spawn(read_loop(read_half, event_tx, closed, shutdown));

        Ok((handle, event_rx))
    }
}

async fn read_loop(
    mut read_half: OwnedReadHalf,
    event_tx: mpsc::Sender<ConnectionEvent>,
    closed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
) {
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        if closed.load(Ordering::Acquire) {
            break;
        }
        tokio::select! {
            result = read_half.read_buf(&mut buf) => {
                match result {
                    Ok(0) => break,
                    Ok(_) => {
                        let data = buf.split().freeze();
                        if event_tx.send(ConnectionEvent::Data(data)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "connection read failed");
                        break;
                    }
                }
            }
            () = shutdown.notified() => break,
        }
    }

    closed.store(true, Ordering::Release);
    shutdown.notify_waiters();
    let _ = event_tx.send(ConnectionEvent::Closed).await;
}

async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Bytes>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            msg = outbound.recv() => {
                match msg {
                    Some(data) => {
                        if write_half.write_all(&data).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            () = shutdown.notified() => {
                // Drain whatever was queued before the close request.
                while let Ok(data) = outbound.try_recv() {
                    if write_half.write_all(&data).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }

    let _ = write_half.shutdown().await;
}
