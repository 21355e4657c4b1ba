use crate::protocol::packets::{PacketEncoder, PacketFlagsConst, PacketTypeConst};
use crate::protocol::utils::{read_u16, split_frame, write_fixed_header, write_u16};
use crate::protocol::{PacketType, ProtocolError, QoS};

/// Upper bound on return codes kept from one SUBACK
pub const MAX_SUBACK_RETURN_CODES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubAckReturnCode {
    Granted(QoS),
    Failure,
}

impl SubAckReturnCode {
    pub const FAILURE: u8 = 0x80;

    pub const fn to_u8(self) -> u8 {
        match self {
            SubAckReturnCode::Granted(qos) => qos as u8,
            SubAckReturnCode::Failure => Self::FAILURE,
        }
    }
}

impl TryFrom<u8> for SubAckReturnCode {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        if code == Self::FAILURE {
            return Ok(SubAckReturnCode::Failure);
        }
        QoS::from_u8(code).map(SubAckReturnCode::Granted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAckPacket {
    pub packet_id: u16,
    pub return_codes: heapless::Vec<SubAckReturnCode, MAX_SUBACK_RETURN_CODES>,
}

impl SubAckPacket {
    pub fn any_failed(&self) -> bool {
        self.return_codes.contains(&SubAckReturnCode::Failure)
    }
}

impl PacketTypeConst for SubAckPacket {
    const PACKET_TYPE: PacketType = PacketType::SubAck;
}

impl PacketFlagsConst for SubAckPacket {
    const PACKET_FLAGS: u8 = 0b0000;
}

impl PacketEncoder for SubAckPacket {
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, ProtocolError> {
        let remaining_length = 2 + self.return_codes.len();
        let mut offset = write_fixed_header(Self::HEADER_BYTE, remaining_length, buffer)?;
        write_u16(self.packet_id, buffer, &mut offset)?;
        for code in &self.return_codes {
            buffer[offset] = code.to_u8();
            offset += 1;
        }
        Ok(offset)
    }

    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (header, body) = split_frame(bytes)?;
        Self::validate_packet_type(header)?;

        let mut offset = 0;
        let packet_id = read_u16(body, &mut offset)?;
        if offset == body.len() {
            // at least one return code is required
            return Err(ProtocolError::IncompletePacket {
                available: bytes.len(),
            });
        }
        let mut return_codes = heapless::Vec::new();
        for &code in &body[offset..] {
            return_codes
                .push(SubAckReturnCode::try_from(code)?)
                .map_err(|_| ProtocolError::TooManyReturnCodes {
                    max_count: MAX_SUBACK_RETURN_CODES,
                })?;
        }
        Ok(Self {
            packet_id,
            return_codes,
        })
    }
}
