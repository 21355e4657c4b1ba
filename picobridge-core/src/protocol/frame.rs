//! Reassembly of MQTT frames from a byte stream

use crate::protocol::packets::Packet;
use crate::protocol::utils::read_variable_length;
use crate::protocol::ProtocolError;

/// Accumulates received bytes until complete frames can be decoded.
///
/// A transport may hand over half a frame, or several frames at once.
/// Bytes stay buffered until the fixed header and the full remaining length
/// are present. A frame can also be skipped before all of it has arrived.
#[derive(Debug, Default)]
pub struct FrameBuffer<const N: usize> {
    buf: heapless::Vec<u8, N>,
    /// Bytes of a skipped frame still to arrive
    discard: usize,
}

impl<const N: usize> FrameBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
            discard: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Space left before the buffer is full
    pub fn free(&self) -> usize {
        N - self.buf.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.discard = 0;
    }

    /// Take as much of `bytes` as fits, returning how many were used.
    ///
    /// Bytes owed to a skipped frame are dropped first and count as used.
    pub fn fill(&mut self, bytes: &[u8]) -> usize {
        let dropped = self.discard.min(bytes.len());
        self.discard -= dropped;
        let rest = &bytes[dropped..];
        let take = rest.len().min(self.free());
        if self.buf.extend_from_slice(&rest[..take]).is_err() {
            return dropped;
        }
        dropped + take
    }

    /// Drop a `len` byte frame from the front, including the part not received yet
    pub fn skip(&mut self, len: usize) {
        let buffered = len.min(self.buf.len());
        self.consume(buffered);
        self.discard = len - buffered;
    }

    /// Total length of the frame at the front of the buffer, if all of it has arrived
    pub fn next_frame_len(&self) -> Result<Option<usize>, ProtocolError> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let (remaining_length, len_bytes) = match read_variable_length(&self.buf[1..]) {
            Ok(decoded) => decoded,
            Err(ProtocolError::IncompletePacket { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let total = 1 + len_bytes + remaining_length;
        if total > N {
            return Err(ProtocolError::FrameTooLarge {
                max_size: N,
                actual_size: total,
            });
        }
        if self.buf.len() < total {
            return Ok(None);
        }
        Ok(Some(total))
    }

    /// Decode and remove the next complete frame.
    ///
    /// A frame that fails to decode stays at the front for the caller to inspect
    /// or [`skip`](Self::skip).
    pub fn next_packet<const MAX_TOPIC_NAME_LENGTH: usize, const MAX_PAYLOAD_SIZE: usize>(
        &mut self,
    ) -> Result<Option<Packet<MAX_TOPIC_NAME_LENGTH, MAX_PAYLOAD_SIZE>>, ProtocolError> {
        let Some(len) = self.next_frame_len()? else {
            return Ok(None);
        };
        let packet = Packet::decode(&self.buf[..len])?;
        self.consume(len);
        Ok(Some(packet))
    }

    fn consume(&mut self, len: usize) {
        let len = len.min(self.buf.len());
        let rest = self.buf.len() - len;
        self.buf.copy_within(len.., 0);
        self.buf.truncate(rest);
    }
}
