use crate::protocol::packet_type::PacketType;
use crate::protocol::packets::PacketEncoder;
use crate::protocol::qos::QoS;
use crate::protocol::utils::{
    read_string, read_u16, read_variable_length, split_frame, write_fixed_header, write_string,
    write_u16,
};
use crate::protocol::ProtocolError;
use crate::topics::TopicName;

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct PublishFlags {
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,
}

impl PublishFlags {
    pub const fn publish_header_byte(self) -> u8 {
        ((PacketType::Publish as u8) << 4) | (self.to_nibble() & 0x0F)
    }

    pub const fn to_nibble(self) -> u8 {
        let dup = if self.dup { 1u8 } else { 0u8 };
        let retain = if self.retain { 1u8 } else { 0u8 };
        (dup << 3) | ((self.qos as u8) << 1) | retain
    }

    pub fn from_nibble(nibble: u8) -> Result<Self, ProtocolError> {
        let qos = QoS::from_u8((nibble >> 1) & 0b11)?;
        Ok(PublishFlags {
            dup: (nibble & 0b1000) != 0,
            qos,
            retain: (nibble & 0b0001) != 0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPacket<const MAX_TOPIC_NAME_LENGTH: usize, const MAX_PAYLOAD_SIZE: usize> {
    pub topic_name: TopicName<MAX_TOPIC_NAME_LENGTH>,
    pub packet_id: Option<u16>,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD_SIZE>,
    pub qos: QoS,
    pub dup: bool,
    pub retain: bool,
}

impl<const MAX_TOPIC_NAME_LENGTH: usize, const MAX_PAYLOAD_SIZE: usize>
    PublishPacket<MAX_TOPIC_NAME_LENGTH, MAX_PAYLOAD_SIZE>
{
    pub fn flags(&self) -> PublishFlags {
        PublishFlags {
            dup: self.dup,
            qos: self.qos,
            retain: self.retain,
        }
    }

    fn remaining_length(&self) -> usize {
        let packet_id_len = if self.qos == QoS::AtMostOnce { 0 } else { 2 };
        2 + self.topic_name.len() + packet_id_len + self.payload.len()
    }
}

impl<const MAX_TOPIC_NAME_LENGTH: usize, const MAX_PAYLOAD_SIZE: usize> PacketEncoder
    for PublishPacket<MAX_TOPIC_NAME_LENGTH, MAX_PAYLOAD_SIZE>
{
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, ProtocolError> {
        let header = self.flags().publish_header_byte();
        let mut offset = write_fixed_header(header, self.remaining_length(), buffer)?;

        write_string(self.topic_name.as_str(), buffer, &mut offset)?;

        if self.qos != QoS::AtMostOnce {
            let pid = match self.packet_id {
                Some(pid) if pid != 0 => pid,
                _ => return Err(ProtocolError::MissingPacketId),
            };
            write_u16(pid, buffer, &mut offset)?;
        }

        buffer[offset..offset + self.payload.len()].copy_from_slice(&self.payload);
        offset += self.payload.len();

        Ok(offset)
    }

    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        split_frame(bytes)?;
        let header = PublishHeader::<MAX_TOPIC_NAME_LENGTH>::decode(bytes)?;

        let payload_bytes = &bytes[header.payload_offset..];
        let payload = heapless::Vec::from_slice(payload_bytes).map_err(|_| {
            ProtocolError::PayloadTooLarge {
                max_size: MAX_PAYLOAD_SIZE,
                actual_size: payload_bytes.len(),
            }
        })?;

        Ok(Self {
            topic_name: header.topic_name,
            packet_id: header.packet_id,
            payload,
            qos: header.flags.qos,
            dup: header.flags.dup,
            retain: header.flags.retain,
        })
    }
}

/// Everything in a PUBLISH frame in front of the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishHeader<const MAX_TOPIC_NAME_LENGTH: usize> {
    pub topic_name: TopicName<MAX_TOPIC_NAME_LENGTH>,
    pub packet_id: Option<u16>,
    pub flags: PublishFlags,
    /// Offset of the first payload byte from the start of the frame
    pub payload_offset: usize,
    pub payload_len: usize,
    /// Fixed header plus remaining length
    pub frame_len: usize,
}

impl<const MAX_TOPIC_NAME_LENGTH: usize> PublishHeader<MAX_TOPIC_NAME_LENGTH> {
    /// Decode the start of a PUBLISH frame.
    ///
    /// Only the bytes up to the payload have to be present, so this works on a
    /// frame too large to buffer whole. Runs out with `IncompletePacket`.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let header = match bytes.first() {
            Some(header) => *header,
            None => return Err(ProtocolError::IncompletePacket { available: 0 }),
        };
        let packet_type = header >> 4;
        if packet_type != PacketType::Publish as u8 {
            return Err(ProtocolError::InvalidPacketType { packet_type });
        }
        let flags = PublishFlags::from_nibble(header & 0x0F)?;

        let (remaining_length, len_bytes) = read_variable_length(&bytes[1..])?;
        let body_start = 1 + len_bytes;
        let frame_len = body_start + remaining_length;
        let body = &bytes[body_start..bytes.len().min(frame_len)];

        let mut offset = 0;
        let topic_name = TopicName::try_from(read_string(body, &mut offset)?)?;
        if topic_name.has_wildcards() {
            return Err(ProtocolError::TopicWildcard);
        }

        let packet_id = if flags.qos != QoS::AtMostOnce {
            let pid = read_u16(body, &mut offset)?;
            if pid == 0 {
                return Err(ProtocolError::MissingPacketId);
            }
            Some(pid)
        } else {
            None
        };

        Ok(Self {
            topic_name,
            packet_id,
            flags,
            payload_offset: body_start + offset,
            payload_len: remaining_length - offset,
            frame_len,
        })
    }
}

impl<const MAX_TOPIC_NAME_LENGTH: usize, const MAX_PAYLOAD_SIZE: usize> core::fmt::Display
    for PublishPacket<MAX_TOPIC_NAME_LENGTH, MAX_PAYLOAD_SIZE>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "PUBLISH {{ topic_name: {}, packet_id: {:?}, qos: {:?}, dup: {}, retain: {}, payload: {} bytes }}",
            self.topic_name,
            self.packet_id,
            self.qos,
            self.dup,
            self.retain,
            self.payload.len()
        )
    }
}
