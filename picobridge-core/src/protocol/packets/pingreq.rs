use crate::protocol::packets::{PacketEncoder, PacketFixedSize, PacketFlagsConst, PacketTypeConst};
use crate::protocol::{PacketType, ProtocolError};

/// Keep-alive probe sent by the client
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PingReqPacket;

impl PacketFixedSize for PingReqPacket {
    const PACKET_SIZE: usize = 2;
}

impl PacketTypeConst for PingReqPacket {
    const PACKET_TYPE: PacketType = PacketType::PingReq;
}

impl PacketFlagsConst for PingReqPacket {
    const PACKET_FLAGS: u8 = 0b0000;
}

impl PacketEncoder for PingReqPacket {
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, ProtocolError> {
        Self::validate_buffer_size(buffer.len())?;
        buffer[0] = Self::HEADER_BYTE;
        buffer[1] = 0u8; // Remaining Length is 0
        Ok(2)
    }

    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::validate_frame(bytes)?;
        Ok(Self)
    }
}
