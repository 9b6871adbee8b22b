//! Interleaved audio frame parsing
//!
//! Once a session is streaming, audio shares the RTSP connection as
//! binary frames: a marker byte `$` (0x24), a channel byte and a
//! big-endian length, followed by that many bytes of RTP packet. The
//! 12-byte RTP header is not encrypted; the payload after it is.

use bytes::{Bytes, BytesMut};

/// Marker byte that opens every interleaved frame
pub const FRAME_MARKER: u8 = 0x24;

/// Interleaved frame header length: marker, channel, u16 length
pub const FRAME_HEADER_LEN: usize = 4;

/// Fixed unencrypted RTP header length inside each frame
pub const RTP_HEADER_LEN: usize = 12;

/// Errors from frame parsing
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// The buffer does not start with a frame marker
    #[error("not an interleaved frame")]
    BadMarker,

    /// Frame shorter than the RTP header; the frame has been discarded
    #[error("frame too short for RTP header: {len} bytes")]
    Truncated {
        /// Declared frame length
        len: usize,
    },
}

/// One complete audio packet, split at the RTP header boundary
#[derive(Debug, Clone)]
pub struct AudioPacket {
    /// Interleaved channel number
    pub channel: u8,
    /// The 12-byte RTP header, passed through unencrypted
    pub header: Bytes,
    /// Encrypted payload following the header
    pub payload: Bytes,
}

/// Attempt to decode one interleaved frame from the front of `buf`.
///
/// Returns `Ok(None)` and consumes nothing while the frame is incomplete;
/// a frame may span any number of transport reads.
///
/// # Errors
///
/// [`PacketError::BadMarker`] if `buf` does not start with `$` (nothing
/// consumed); [`PacketError::Truncated`] if a complete frame is shorter
/// than an RTP header (the frame is consumed so parsing can continue).
pub fn decode(buf: &mut BytesMut) -> Result<Option<AudioPacket>, PacketError> {
    if buf.first() != Some(&FRAME_MARKER) {
        return Err(PacketError::BadMarker);
    }
    if buf.len() < FRAME_HEADER_LEN {
        return Ok(None);
    }

    let len = usize::from(u16::from_be_bytes([buf[2], buf[3]]));
    if buf.len() < FRAME_HEADER_LEN + len {
        return Ok(None);
    }

    let channel = buf[1];
    let _ = buf.split_to(FRAME_HEADER_LEN);
    let mut frame = buf.split_to(len);

    if len < RTP_HEADER_LEN {
        return Err(PacketError::Truncated { len });
    }

    let header = frame.split_to(RTP_HEADER_LEN).freeze();
    Ok(Some(AudioPacket {
        channel,
        header,
        payload: frame.freeze(),
    }))
}

/// Encode a packet as an interleaved frame (loopback tests, mock senders)
#[must_use]
pub fn encode(channel: u8, rtp_header: &[u8], payload: &[u8]) -> Vec<u8> {
    let len = rtp_header.len() + payload.len();
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + len);
    frame.push(FRAME_MARKER);
    frame.push(channel);
    frame.extend_from_slice(
        &u16::try_from(len)
            .expect("frame length fits in u16")
            .to_be_bytes(),
    );
    frame.extend_from_slice(rtp_header);
    frame.extend_from_slice(payload);
    frame
}
