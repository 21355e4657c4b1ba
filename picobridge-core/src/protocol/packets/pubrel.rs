use crate::protocol::packets::{
    decode_packet_id, encode_packet_id_frame, PacketEncoder, PacketFixedSize, PacketFlagsConst,
    PacketTypeConst,
};
use crate::protocol::{PacketType, ProtocolError};

/// Release of a QoS 2 message, answered with PUBCOMP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubRelPacket {
    pub packet_id: u16,
}

impl PacketFixedSize for PubRelPacket {
    const PACKET_SIZE: usize = 4;
}

impl PacketTypeConst for PubRelPacket {
    const PACKET_TYPE: PacketType = PacketType::PubRel;
}

impl PacketFlagsConst for PubRelPacket {
    const PACKET_FLAGS: u8 = 0b0010;
}

impl PacketEncoder for PubRelPacket {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_test(bytes: &[u8]) -> PubRelPacket {
        let result = PubRelPacket::decode(bytes);
        assert!(
            result.is_ok(),
            "Failed to decode packet: {:?}",
            result.err()
        );
        let packet = result.unwrap();
        let mut buffer = [0u8; 8];
        let encoded_size = packet.encode(&mut buffer).unwrap();
        assert_eq!(&buffer[..encoded_size], bytes, "Encoded bytes mismatch");
        packet
    }

    #[test]
    fn test_pubrel_packet_id() {
        let packet = roundtrip_test(&[0x62, 0x02, 0x04, 0xD2]);
        assert_eq!(packet.packet_id, 1234);
    }

    #[test]
    fn test_pubrel_wrong_remaining_length() {
        assert_eq!(
            PubRelPacket::decode(&[0x62, 0x03, 0x04, 0xD2]),
            Err(ProtocolError::InvalidPacketLength {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn test_pubrel_zero_packet_id() {
        assert_eq!(
            PubRelPacket::decode(&[0x62, 0x02, 0x00, 0x00]),
            Err(ProtocolError::MissingPacketId)
        );
    }

    #[test]
    fn test_pubrel_truncated() {
        assert_eq!(
            PubRelPacket::decode(&[0x62, 0x02, 0x04]),
            Err(ProtocolError::IncompletePacket { available: 3 })
        );
    }
}
