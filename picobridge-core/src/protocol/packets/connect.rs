use crate::client::ClientId;
use crate::protocol::packets::{PacketEncoder, PacketFlagsConst, PacketTypeConst};
use crate::protocol::utils::{
    read_string, read_u16, split_frame, write_fixed_header, write_string, write_u16,
};
use crate::protocol::{PacketType, ProtocolError};

pub const MQTT_PROTOCOL_NAME: &str = "MQTT";
pub const MQTT_3_1_1_PROTOCOL_LEVEL: u8 = 4;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ConnectFlags(u8);

impl ConnectFlags {
    pub const RESERVED: Self = Self(0b_0000_0001);
    pub const CLEAN_SESSION: Self = Self(0b_0000_0010);
    pub const WILL_FLAG: Self = Self(0b_0000_0100);
    pub const WILL_QOS_1: Self = Self(0b_0000_1000);
    pub const WILL_QOS_2: Self = Self(0b_0001_0000);
    pub const WILL_RETAIN: Self = Self(0b_0010_0000);
    pub const PASSWORD: Self = Self(0b_0100_0000);
    pub const USERNAME: Self = Self(0b_1000_0000);

    /// Flags this client knows how to encode
    const SUPPORTED: Self = Self::CLEAN_SESSION;

    pub const fn empty() -> Self {
        Self(0)
    }
    pub const fn bits(self) -> u8 {
        self.0
    }
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

/// Fixed Header
///   byte 1:  0x10                      (type=1, flags=0000)
///   bytes :  Remaining Length (var-int)
///
/// Variable Header
///   Protocol Name      ("MQTT" as UTF-8 string)
///   Protocol Level     (0x04 for MQTT 3.1.1)
///   Connect Flags      (bitfield)
///   Keep Alive         (2 bytes)
///
/// Payload
///   Client Identifier  (UTF-8 string)
///
/// Will messages and credentials are not used by the bridge, so the
/// corresponding flags are rejected on decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPacket {
    pub connect_flags: ConnectFlags,
    pub keep_alive: u16,
    pub client_id: ClientId,
}

impl ConnectPacket {
    /// CONNECT with clean session set, which is how the bridge always connects
    pub fn clean(client_id: ClientId, keep_alive: u16) -> Self {
        let mut connect_flags = ConnectFlags::empty();
        connect_flags.insert(ConnectFlags::CLEAN_SESSION);
        Self {
            connect_flags,
            keep_alive,
            client_id,
        }
    }

    fn remaining_length(&self) -> usize {
        (2 + MQTT_PROTOCOL_NAME.len()) // Protocol Name
            + 1 // Protocol Level
            + 1 // Connect Flags
            + 2 // Keep Alive
            + (2 + self.client_id.len()) // Client ID
    }
}

impl PacketTypeConst for ConnectPacket {
    const PACKET_TYPE: PacketType = PacketType::Connect;
}

impl PacketFlagsConst for ConnectPacket {
    const PACKET_FLAGS: u8 = 0b0000;
}

impl PacketEncoder for ConnectPacket {
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, ProtocolError> {
        let mut offset = write_fixed_header(Self::HEADER_BYTE, self.remaining_length(), buffer)?;

        // write variable header
        write_string(MQTT_PROTOCOL_NAME, buffer, &mut offset)?;
        buffer[offset] = MQTT_3_1_1_PROTOCOL_LEVEL;
        offset += 1;
        buffer[offset] = self.connect_flags.bits();
        offset += 1;
        write_u16(self.keep_alive, buffer, &mut offset)?;

        // write payload
        write_string(self.client_id.as_str(), buffer, &mut offset)?;

        Ok(offset)
    }

    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (header, body) = split_frame(bytes)?;
        Self::validate_packet_type(header)?;

        // validate protocol name
        let mut offset = 0;
        let protocol_name = read_string(body, &mut offset)?;
        if protocol_name != MQTT_PROTOCOL_NAME {
            return Err(ProtocolError::InvalidProtocolName);
        }

        // validate protocol level
        if offset + 2 > body.len() {
            return Err(ProtocolError::IncompletePacket {
                available: bytes.len(),
            });
        }
        let protocol_level = body[offset];
        offset += 1;
        if protocol_level != MQTT_3_1_1_PROTOCOL_LEVEL {
            return Err(ProtocolError::UnsupportedProtocolLevel {
                level: protocol_level,
            });
        }

        // validate connect flags
        let connect_flags = ConnectFlags(body[offset]);
        offset += 1;
        if connect_flags.bits() & !ConnectFlags::SUPPORTED.bits() != 0 {
            return Err(ProtocolError::InvalidConnectFlags {
                flags: connect_flags.bits(),
            });
        }

        let keep_alive = read_u16(body, &mut offset)?;

        // extract client id
        let client_id = read_string(body, &mut offset)?;
        if client_id.is_empty() && !connect_flags.contains(ConnectFlags::CLEAN_SESSION) {
            return Err(ProtocolError::ClientIdEmpty);
        }
        let client_id = ClientId::try_from(client_id)?;

        if offset != body.len() {
            return Err(ProtocolError::InvalidPacketLength {
                expected: body.len(),
                actual: offset,
            });
        }

        Ok(Self {
            connect_flags,
            keep_alive,
            client_id,
        })
    }
}
