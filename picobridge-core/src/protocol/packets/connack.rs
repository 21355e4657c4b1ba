use crate::protocol::packets::{PacketEncoder, PacketFixedSize, PacketFlagsConst, PacketTypeConst};
use crate::protocol::{PacketType, ProtocolError};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectReturnCode {
    Accepted = 0,
    UnacceptableProtocolVersion = 1,
    IdentifierRejected = 2,
    ServerUnavailable = 3,
    BadUserNameOrPassword = 4,
    NotAuthorized = 5,
}

impl TryFrom<u8> for ConnectReturnCode {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ConnectReturnCode::Accepted),
            1 => Ok(ConnectReturnCode::UnacceptableProtocolVersion),
            2 => Ok(ConnectReturnCode::IdentifierRejected),
            3 => Ok(ConnectReturnCode::ServerUnavailable),
            4 => Ok(ConnectReturnCode::BadUserNameOrPassword),
            5 => Ok(ConnectReturnCode::NotAuthorized),
            _ => Err(ProtocolError::InvalidConnectReturnCode { return_code: code }),
        }
    }
}

impl core::fmt::Display for ConnectReturnCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            ConnectReturnCode::Accepted => "accepted",
            ConnectReturnCode::UnacceptableProtocolVersion => "unacceptable protocol version",
            ConnectReturnCode::IdentifierRejected => "identifier rejected",
            ConnectReturnCode::ServerUnavailable => "server unavailable",
            ConnectReturnCode::BadUserNameOrPassword => "bad user name or password",
            ConnectReturnCode::NotAuthorized => "not authorized",
        };
        write!(f, "{} ({})", text, *self as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnAckPacket {
    pub session_present: bool,
    pub return_code: ConnectReturnCode,
}

impl PacketFixedSize for ConnAckPacket {
    const PACKET_SIZE: usize = 4;
}

impl PacketTypeConst for ConnAckPacket {
    const PACKET_TYPE: PacketType = PacketType::ConnAck;
}

impl PacketFlagsConst for ConnAckPacket {
    const PACKET_FLAGS: u8 = 0b0000;
}

impl PacketEncoder for ConnAckPacket {
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, ProtocolError> {
        Self::validate_buffer_size(buffer.len())?;
        buffer[0] = Self::HEADER_BYTE;
        buffer[1] = 2u8;
        buffer[2] = if self.session_present {
            0b0000_0001
        } else {
            0b0000_0000
        };
        buffer[3] = self.return_code as u8;
        Ok(4)
    }

    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::validate_frame(bytes)?;
        let session_present = match bytes[2] {
            0b0000_0000 => false,
            0b0000_0001 => true,
            flag => return Err(ProtocolError::InvalidSessionPresentFlag { flag }),
        };
        let return_code = ConnectReturnCode::try_from(bytes[3])?;
        Ok(ConnAckPacket {
            session_present,
            return_code,
        })
    }
}
