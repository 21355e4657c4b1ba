use crate::protocol::packets::{
    decode_packet_id, encode_packet_id_frame, PacketEncoder, PacketFixedSize, PacketFlagsConst,
    PacketTypeConst,
};
use crate::protocol::{PacketType, ProtocolError};

/// First reply in the QoS 2 handshake, sent by the receiver of a PUBLISH
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubRecPacket {
    pub packet_id: u16,
}

impl PacketFixedSize for PubRecPacket {
    const PACKET_SIZE: usize = 4;
}

impl PacketTypeConst for PubRecPacket {
    const PACKET_TYPE: PacketType = PacketType::PubRec;
}

impl PacketFlagsConst for PubRecPacket {
    const PACKET_FLAGS: u8 = 0b0000;
}

impl PacketEncoder for PubRecPacket {
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, ProtocolError> {
        Self::validate_buffer_size(buffer.len())?;
        encode_packet_id_frame(Self::HEADER_BYTE, self.packet_id, buffer)
    }

    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::validate_frame(bytes)?;
        let packet_id = decode_packet_id(bytes)?;
        Ok(Self { packet_id })
    }
}
