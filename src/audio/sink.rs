//! The sink seam: where decrypted audio leaves the core
//!
//! The receiver does not decode or play audio. On RECORD it asks the
//! hosting application for a byte sink, hands it every decrypted packet in
//! arrival order, and closes it when the stream ends.

use std::io;
use std::sync::{Arc, Mutex};

/// A writable destination for decrypted audio bytes
///
/// Implementations typically wrap a pipe to a decoder process or a file.
pub trait AudioSink: Send {
    /// Write one decrypted packet's bytes
    ///
    /// # Errors
    /// Returns an I/O error if the destination rejected the write.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Close the sink; called once when the stream ends
    fn close(&mut self) {}
}

/// Opens sinks on behalf of the receiver
///
/// Supplied by the hosting application; called once per session when
/// recording starts, with the codec format descriptor negotiated in
/// ANNOUNCE.
pub trait SinkFactory: Send + Sync {
    /// Open a sink for a stream with the given `fmtp` descriptor
    ///
    /// # Errors
    /// Returns an I/O error if the destination cannot be opened.
    fn open(&self, fmtp: &str) -> io::Result<Box<dyn AudioSink>>;
}

/// Sink wrapping any [`io::Write`], e.g. a decoder process stdin
pub struct WriterSink<W: io::Write + Send> {
    writer: W,
}

impl<W: io::Write + Send> WriterSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: io::Write + Send> AudioSink for WriterSink<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)
    }

    fn close(&mut self) {
        let _ = self.writer.flush();
    }
}

/// In-memory sink for tests and loopback setups
///
/// Clones share the same buffer; the factory implementation hands out
/// clones, so bytes written by the session are visible to the test.
#[derive(Clone, Default)]
pub struct BufferSink {
    data: Arc<Mutex<Vec<u8>>>,
    opened_fmtp: Arc<Mutex<Option<String>>>,
    closed: Arc<Mutex<bool>>,
}

impl BufferSink {
    /// Create a shared buffer sink
    #[must_use]
    pub fn shared() -> Self {
        Self::default()
    }

    /// Bytes written so far
    ///
    /// # Panics
    /// Panics if the buffer lock is poisoned.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }

    /// The `fmtp` string the sink was opened with, if it was opened
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn opened_fmtp(&self) -> Option<String> {
        self.opened_fmtp.lock().unwrap().clone()
    }

    /// Whether `close()` has been called
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

impl AudioSink for BufferSink {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.data.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {
        *self.closed.lock().unwrap() = true;
    }
}

impl SinkFactory for BufferSink {
    fn open(&self, fmtp: &str) -> io::Result<Box<dyn AudioSink>> {
        *self.opened_fmtp.lock().unwrap() = Some(fmtp.to_string());
        *self.closed.lock().unwrap() = false;
        Ok(Box::new(self.clone()))
    }
}
