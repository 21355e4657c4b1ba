use crate::protocol::packets::{PacketEncoder, PacketFlagsConst, PacketTypeConst};
use crate::protocol::utils::{read_string, read_u16, split_frame, write_fixed_header, write_string, write_u16};
use crate::protocol::{PacketType, ProtocolError, QoS};
use crate::topics::TopicName;

/// SUBSCRIBE carrying a single topic filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribePacket<const MAX_TOPIC_NAME_LENGTH: usize> {
    pub packet_id: u16,
    pub topic_filter: TopicName<MAX_TOPIC_NAME_LENGTH>,
    pub requested_qos: QoS,
}

impl<const MAX_TOPIC_NAME_LENGTH: usize> PacketTypeConst for SubscribePacket<MAX_TOPIC_NAME_LENGTH> {
    const PACKET_TYPE: PacketType = PacketType::Subscribe;
}

impl<const MAX_TOPIC_NAME_LENGTH: usize> PacketFlagsConst for SubscribePacket<MAX_TOPIC_NAME_LENGTH> {
    const PACKET_FLAGS: u8 = 0b0010;
}

impl<const MAX_TOPIC_NAME_LENGTH: usize> PacketEncoder for SubscribePacket<MAX_TOPIC_NAME_LENGTH> {
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, ProtocolError> {
        if self.packet_id == 0 {
            return Err(ProtocolError::MissingPacketId);
        }
        // packet id + filter + requested qos
        let remaining_length = 2 + 2 + self.topic_filter.len() + 1;
        let mut offset = write_fixed_header(Self::HEADER_BYTE, remaining_length, buffer)?;
        write_u16(self.packet_id, buffer, &mut offset)?;
        write_string(self.topic_filter.as_str(), buffer, &mut offset)?;
        buffer[offset] = self.requested_qos as u8;
        offset += 1;
        Ok(offset)
    }

    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (header, body) = split_frame(bytes)?;
        Self::validate_packet_type(header)?;

        let mut offset = 0;
        let packet_id = read_u16(body, &mut offset)?;
        if packet_id == 0 {
            return Err(ProtocolError::MissingPacketId);
        }
        let topic_filter = TopicName::try_from(read_string(body, &mut offset)?)?;
        if offset + 1 != body.len() {
            return Err(ProtocolError::InvalidPacketLength {
                expected: offset + 1,
                actual: body.len(),
            });
        }
        let requested_qos = QoS::from_u8(body[offset])?;

        Ok(Self {
            packet_id,
            topic_filter,
            requested_qos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_led_topic() {
        let packet = SubscribePacket::<64> {
            packet_id: 1234,
            topic_filter: TopicName::try_from("device/led/status").unwrap(),
            requested_qos: QoS::AtMostOnce,
        };
        let mut buffer = [0u8; 32];
        let len = packet.encode(&mut buffer).unwrap();
        let expected: &[u8] = &[
            0x82, 0x16, // SUBSCRIBE, remaining length 22
            0x04, 0xD2, // packet id 1234
            0x00, 0x11, // filter length 17
            b'd', b'e', b'v', b'i', b'c', b'e', b'/', b'l', b'e', b'd', b'/', b's', b't', b'a',
            b't', b'u', b's', 0x00, // requested qos 0
        ];
        assert_eq!(&buffer[..len], expected);
        assert_eq!(SubscribePacket::<64>::decode(expected).unwrap(), packet);
    }

    #[test]
    fn test_subscribe_wrong_flags() {
        assert_eq!(
            SubscribePacket::<64>::decode(&[0x80, 0x06, 0x00, 0x01, 0x00, 0x01, b'a', 0x00]),
            Err(ProtocolError::InvalidFlags {
                packet_type: 8,
                flags: 0
            })
        );
    }

    #[test]
    fn test_subscribe_wildcard_filter_allowed() {
        let packet =
            SubscribePacket::<64>::decode(&[0x82, 0x06, 0x00, 0x01, 0x00, 0x01, b'#', 0x01])
                .unwrap();
        assert_eq!(packet.topic_filter.as_str(), "#");
        assert_eq!(packet.requested_qos, QoS::AtLeastOnce);
    }
}
