//! Audio relay: decrypts framed packets and forwards them to the sink
//!
//! Active only while a session is streaming. The relay shares the
//! session's receive buffer: it pulls complete interleaved frames off the
//! front, decrypts each payload independently and writes the plaintext to
//! the sink in arrival order. A packet that fails to relay is dropped and
//! counted; one bad packet must not end an otherwise healthy stream.

use bytes::BytesMut;

use super::packet::{self, FRAME_HEADER_LEN, FRAME_MARKER, PacketError};
use super::sink::AudioSink;
use crate::protocol::crypto::SessionCipher;

/// Per-session audio relay
pub struct AudioRelay {
    cipher: SessionCipher,
    sink: Box<dyn AudioSink>,
    packets_relayed: u64,
    packets_dropped: u64,
}

impl AudioRelay {
    /// Create a relay from the session cipher and an opened sink
    #[must_use]
    pub fn new(cipher: SessionCipher, sink: Box<dyn AudioSink>) -> Self {
        Self {
            cipher,
            sink,
            packets_relayed: 0,
            packets_dropped: 0,
        }
    }

    /// Whether the byte at the front of `buf` starts an audio frame
    #[must_use]
    pub fn owns_front(buf: &BytesMut) -> bool {
        buf.first() == Some(&FRAME_MARKER)
    }

    /// Relay every complete frame at the front of `buf`.
    ///
    /// Stops when the front of the buffer is not an audio frame (RTSP
    /// bytes follow) or an incomplete frame remains. Returns the number of
    /// packets forwarded to the sink.
    pub fn drain(&mut self, buf: &mut BytesMut) -> u64 {
        let mut relayed = 0;

        while Self::owns_front(buf) {
            match packet::decode(buf) {
                Ok(Some(packet)) => {
                    let plaintext = self.cipher.decrypt_packet(&packet.payload);
                    match self.sink.write(&plaintext) {
                        Ok(()) => {
                            relayed += 1;
                            self.packets_relayed += 1;
                        }
                        Err(e) => {
                            self.packets_dropped += 1;
                            tracing::warn!(error = %e, "sink rejected packet, dropping");
                        }
                    }
                }
                Ok(None) => break,
                Err(PacketError::Truncated { len }) => {
                    self.packets_dropped += 1;
                    tracing::warn!(len, "dropping undersized audio frame");
                }
                Err(PacketError::BadMarker) => break,
            }
        }

        relayed
    }

    /// Discard a buffered partial frame (FLUSH).
    ///
    /// Only an incomplete frame is dropped; complete frames still in the
    /// buffer were sent after the flush point and are kept.
    pub fn discard_partial(buf: &mut BytesMut) {
        if !Self::owns_front(buf) {
            return;
        }
        if buf.len() < FRAME_HEADER_LEN {
            buf.clear();
            return;
        }
        let len = usize::from(u16::from_be_bytes([buf[2], buf[3]]));
        if buf.len() < FRAME_HEADER_LEN + len {
            buf.clear();
        }
    }

    /// Packets forwarded so far
    #[must_use]
    pub fn packets_relayed(&self) -> u64 {
        self.packets_relayed
    }

    /// Packets dropped so far
    #[must_use]
    pub fn packets_dropped(&self) -> u64 {
        self.packets_dropped
    }

    /// Close the sink; the relay is finished
    pub fn close(&mut self) {
        self.sink.close();
    }
}
