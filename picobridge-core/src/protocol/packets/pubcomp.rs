use crate::protocol::packets::{
    decode_packet_id, encode_packet_id_frame, PacketEncoder, PacketFixedSize, PacketFlagsConst,
    PacketTypeConst,
};
use crate::protocol::{PacketType, ProtocolError};

/// Final step of the QoS 2 handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubCompPacket {
    pub packet_id: u16,
}

impl PacketFixedSize for PubCompPacket {
    const PACKET_SIZE: usize = 4;
}

impl PacketTypeConst for PubCompPacket {
    const PACKET_TYPE: PacketType = PacketType::PubComp;
}

impl PacketFlagsConst for PubCompPacket {
    const PACKET_FLAGS: u8 = 0b0000;
}

impl PacketEncoder for PubCompPacket {
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
