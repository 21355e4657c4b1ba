mod connack;
mod connect;
mod disconnect;
mod pingreq;
mod pingresp;
mod puback;
mod pubcomp;
mod publish;
mod pubrec;
mod pubrel;
mod suback;
mod subscribe;

pub use connack::{ConnAckPacket, ConnectReturnCode};
pub use connect::{ConnectFlags, ConnectPacket, MQTT_3_1_1_PROTOCOL_LEVEL, MQTT_PROTOCOL_NAME};
pub use disconnect::DisconnectPacket;
pub use pingreq::PingReqPacket;
pub use pingresp::PingRespPacket;
pub use puback::PubAckPacket;
pub use pubcomp::PubCompPacket;
pub use publish::{PublishFlags, PublishHeader, PublishPacket};
pub use pubrec::PubRecPacket;
pub use pubrel::PubRelPacket;
pub use suback::{SubAckPacket, SubAckReturnCode, MAX_SUBACK_RETURN_CODES};
pub use subscribe::SubscribePacket;

use crate::protocol::utils::read_variable_length;
use crate::protocol::{PacketType, ProtocolError};

pub trait PacketTypeConst {
    const PACKET_TYPE: PacketType;
}

/// Packets whose fixed header flags never change
pub trait PacketFlagsConst: PacketTypeConst {
    const PACKET_FLAGS: u8;
    const HEADER_BYTE: u8 = ((Self::PACKET_TYPE as u8) << 4) | (Self::PACKET_FLAGS & 0x0F);

    fn validate_packet_type(header: u8) -> Result<(), ProtocolError> {
        if header >> 4 != Self::PACKET_TYPE as u8 {
            return Err(ProtocolError::InvalidPacketType {
                packet_type: header >> 4,
            });
        }
        if header & 0x0F != Self::PACKET_FLAGS {
            return Err(ProtocolError::InvalidFlags {
                packet_type: header >> 4,
                flags: header & 0x0F,
            });
        }
        Ok(())
    }
}

/// Packets with a fixed total size (header included)
pub trait PacketFixedSize: PacketFlagsConst {
    const PACKET_SIZE: usize;

    fn validate_buffer_size(len: usize) -> Result<(), ProtocolError> {
        if len < Self::PACKET_SIZE {
            return Err(ProtocolError::BufferTooSmall { buffer_size: len });
        }
        Ok(())
    }

    fn validate_frame_size(len: usize) -> Result<(), ProtocolError> {
        match len.cmp(&Self::PACKET_SIZE) {
            core::cmp::Ordering::Less => Err(ProtocolError::IncompletePacket { available: len }),
            core::cmp::Ordering::Greater => Err(ProtocolError::InvalidPacketLength {
                expected: Self::PACKET_SIZE,
                actual: len,
            }),
            core::cmp::Ordering::Equal => Ok(()),
        }
    }

    fn validate_remaining_length(remaining_length: usize) -> Result<(), ProtocolError> {
        if remaining_length != Self::PACKET_SIZE - 2 {
            return Err(ProtocolError::InvalidPacketLength {
                expected: Self::PACKET_SIZE - 2,
                actual: remaining_length,
            });
        }
        Ok(())
    }

    /// Common checks for decoding a complete fixed-size frame
    fn validate_frame(bytes: &[u8]) -> Result<(), ProtocolError> {
        Self::validate_frame_size(bytes.len())?;
        Self::validate_packet_type(bytes[0])?;
        let (remaining_length, _) = read_variable_length(&bytes[1..])?;
        Self::validate_remaining_length(remaining_length)
    }
}

/// Encoding and decoding of complete frames, fixed header included
pub trait PacketEncoder: Sized {
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, ProtocolError>;
    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError>;
}

/// Writes a 4-byte `type | 0x02 | packet_id` frame shared by the ack packets
fn encode_packet_id_frame(
    header: u8,
    packet_id: u16,
    buffer: &mut [u8],
) -> Result<usize, ProtocolError> {
    if buffer.len() < 4 {
        return Err(ProtocolError::BufferTooSmall {
            buffer_size: buffer.len(),
        });
    }
    buffer[0] = header;
    buffer[1] = 2u8;
    buffer[2..4].copy_from_slice(&packet_id.to_be_bytes());
    Ok(4)
}

fn decode_packet_id(bytes: &[u8]) -> Result<u16, ProtocolError> {
    let packet_id = u16::from_be_bytes([bytes[2], bytes[3]]);
    if packet_id == 0 {
        return Err(ProtocolError::MissingPacketId);
    }
    Ok(packet_id)
}

/// Every packet a client sends or receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet<const MAX_TOPIC_NAME_LENGTH: usize, const MAX_PAYLOAD_SIZE: usize> {
    Connect(ConnectPacket),
    ConnAck(ConnAckPacket),
    Publish(PublishPacket<MAX_TOPIC_NAME_LENGTH, MAX_PAYLOAD_SIZE>),
    PubAck(PubAckPacket),
    PubRec(PubRecPacket),
    PubRel(PubRelPacket),
    PubComp(PubCompPacket),
    Subscribe(SubscribePacket<MAX_TOPIC_NAME_LENGTH>),
    SubAck(SubAckPacket),
    PingReq(PingReqPacket),
    PingResp(PingRespPacket),
    Disconnect(DisconnectPacket),
}

impl<const MAX_TOPIC_NAME_LENGTH: usize, const MAX_PAYLOAD_SIZE: usize>
    Packet<MAX_TOPIC_NAME_LENGTH, MAX_PAYLOAD_SIZE>
{
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Connect(_) => PacketType::Connect,
            Packet::ConnAck(_) => PacketType::ConnAck,
            Packet::Publish(_) => PacketType::Publish,
            Packet::PubAck(_) => PacketType::PubAck,
            Packet::PubRec(_) => PacketType::PubRec,
            Packet::PubRel(_) => PacketType::PubRel,
            Packet::PubComp(_) => PacketType::PubComp,
            Packet::Subscribe(_) => PacketType::Subscribe,
            Packet::SubAck(_) => PacketType::SubAck,
            Packet::PingReq(_) => PacketType::PingReq,
            Packet::PingResp(_) => PacketType::PingResp,
            Packet::Disconnect(_) => PacketType::Disconnect,
        }
    }

    /// Decode one complete frame
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.is_empty() {
            return Err(ProtocolError::IncompletePacket { available: 0 });
        }
        match PacketType::from_header(bytes[0]) {
            PacketType::Connect => Ok(Packet::Connect(ConnectPacket::decode(bytes)?)),
            PacketType::ConnAck => Ok(Packet::ConnAck(ConnAckPacket::decode(bytes)?)),
            PacketType::Publish => Ok(Packet::Publish(PublishPacket::decode(bytes)?)),
            PacketType::PubAck => Ok(Packet::PubAck(PubAckPacket::decode(bytes)?)),
            PacketType::PubRec => Ok(Packet::PubRec(PubRecPacket::decode(bytes)?)),
            PacketType::PubRel => Ok(Packet::PubRel(PubRelPacket::decode(bytes)?)),
            PacketType::PubComp => Ok(Packet::PubComp(PubCompPacket::decode(bytes)?)),
            PacketType::Subscribe => Ok(Packet::Subscribe(SubscribePacket::decode(bytes)?)),
            PacketType::SubAck => Ok(Packet::SubAck(SubAckPacket::decode(bytes)?)),
            PacketType::PingReq => Ok(Packet::PingReq(PingReqPacket::decode(bytes)?)),
            PacketType::PingResp => Ok(Packet::PingResp(PingRespPacket::decode(bytes)?)),
            PacketType::Disconnect => Ok(Packet::Disconnect(DisconnectPacket::decode(bytes)?)),
            PacketType::Unsubscribe
            | PacketType::UnsubAck
            | PacketType::Reserved
            | PacketType::Reserved2 => Err(ProtocolError::InvalidPacketType {
                packet_type: bytes[0] >> 4,
            }),
        }
    }

    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, ProtocolError> {
        match self {
            Packet::Connect(packet) => packet.encode(buffer),
            Packet::ConnAck(packet) => packet.encode(buffer),
            Packet::Publish(packet) => packet.encode(buffer),
            Packet::PubAck(packet) => packet.encode(buffer),
            Packet::PubRec(packet) => packet.encode(buffer),
            Packet::PubRel(packet) => packet.encode(buffer),
            Packet::PubComp(packet) => packet.encode(buffer),
            Packet::Subscribe(packet) => packet.encode(buffer),
            Packet::SubAck(packet) => packet.encode(buffer),
            Packet::PingReq(packet) => packet.encode(buffer),
            Packet::PingResp(packet) => packet.encode(buffer),
            Packet::Disconnect(packet) => packet.encode(buffer),
        }
    }
}

impl<const MAX_TOPIC_NAME_LENGTH: usize, const MAX_PAYLOAD_SIZE: usize> core::fmt::Display
    for Packet<MAX_TOPIC_NAME_LENGTH, MAX_PAYLOAD_SIZE>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Packet::Publish(packet) => write!(f, "{}", packet),
            Packet::PubAck(PubAckPacket { packet_id })
            | Packet::PubRec(PubRecPacket { packet_id })
            | Packet::PubRel(PubRelPacket { packet_id })
            | Packet::PubComp(PubCompPacket { packet_id }) => {
                write!(f, "{} {{ packet_id: {} }}", self.packet_type(), packet_id)
            }
            _ => write!(f, "{}", self.packet_type()),
        }
    }
}
