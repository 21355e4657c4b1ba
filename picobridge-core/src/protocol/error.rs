#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer too small for packet
    BufferTooSmall { buffer_size: usize },
    /// Client identifier is empty
    ClientIdEmpty,
    /// Client identifier length exceeded maximum allowed length
    ClientIdLengthExceeded {
        max_length: usize,
        actual_length: usize,
    },
    /// Incomplete packet (not enough data)
    IncompletePacket { available: usize },
    /// A frame announced a size larger than the receive buffer can hold
    FrameTooLarge { max_size: usize, actual_size: usize },
    /// Connect flags use bits this client does not support (reserved, will, credentials)
    InvalidConnectFlags { flags: u8 },
    /// Invalid connect return code in CONNACK
    InvalidConnectReturnCode { return_code: u8 },
    /// Fixed header flags do not match the packet type
    InvalidFlags { packet_type: u8, flags: u8 },
    /// Remaining length uses more than four bytes or exceeds the MQTT maximum
    InvalidLengthEncoding,
    /// Packet length does not match expected length
    InvalidPacketLength { expected: usize, actual: usize },
    /// Invalid packet type
    InvalidPacketType { packet_type: u8 },
    /// Invalid protocol name in CONNECT
    InvalidProtocolName,
    /// Invalid session present flag in CONNACK
    InvalidSessionPresentFlag { flag: u8 },
    /// Invalid UTF-8 string
    InvalidUtf8String,
    /// Packet identifier zero where a non-zero one is required
    MissingPacketId,
    /// Payload size exceeded maximum allowed size
    PayloadTooLarge { max_size: usize, actual_size: usize },
    /// Invalid QoS level
    InvalidQosLevel { level: u8 },
    /// Topic name is empty
    TopicEmpty,
    /// Topic name contains wildcard characters, which PUBLISH forbids
    TopicWildcard,
    /// Topic name length exceeded maximum allowed length
    TopicNameLengthExceeded {
        max_length: usize,
        actual_length: usize,
    },
    /// More SUBACK return codes than can be stored
    TooManyReturnCodes { max_count: usize },
    /// Unsupported protocol level in CONNECT
    UnsupportedProtocolLevel { level: u8 },
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProtocolError::BufferTooSmall { buffer_size } => {
                write!(f, "Buffer too small for packet: size {}", buffer_size)
            }
            ProtocolError::ClientIdEmpty => write!(f, "Client ID is empty"),
            ProtocolError::ClientIdLengthExceeded {
                max_length,
                actual_length,
            } => {
                write!(
                    f,
                    "Client ID length exceeded: length {}, max {}",
                    actual_length, max_length
                )
            }
            ProtocolError::IncompletePacket { available } => {
                write!(f, "Incomplete packet: available {}", available)
            }
            ProtocolError::FrameTooLarge {
                max_size,
                actual_size,
            } => {
                write!(f, "Frame too large: size {}, max {}", actual_size, max_size)
            }
            ProtocolError::InvalidConnectFlags { flags } => {
                write!(f, "Invalid connect flags in CONNECT packet: {:#010b}", flags)
            }
            ProtocolError::InvalidConnectReturnCode { return_code } => {
                write!(f, "Invalid connect return code in CONNACK: {}", return_code)
            }
            ProtocolError::InvalidFlags { packet_type, flags } => {
                write!(
                    f,
                    "Invalid fixed header flags {:#06b} for packet type {}",
                    flags, packet_type
                )
            }
            ProtocolError::InvalidLengthEncoding => {
                write!(f, "Invalid remaining length encoding")
            }
            ProtocolError::InvalidPacketLength { expected, actual } => {
                write!(
                    f,
                    "Invalid packet length: expected {}, got {}",
                    expected, actual
                )
            }
            ProtocolError::InvalidPacketType { packet_type } => {
                write!(f, "Invalid packet type: {}", packet_type)
            }
            ProtocolError::InvalidProtocolName => {
                write!(f, "Invalid protocol name in CONNECT packet")
            }
            ProtocolError::InvalidSessionPresentFlag { flag } => {
                write!(
                    f,
                    "Invalid session present flag in CONNACK packet: {}",
                    flag
                )
            }
            ProtocolError::InvalidUtf8String => write!(f, "Invalid UTF-8 string"),
            ProtocolError::MissingPacketId => {
                write!(f, "Missing Packet Identifier where one is required")
            }
            ProtocolError::PayloadTooLarge {
                max_size,
                actual_size,
            } => {
                write!(
                    f,
                    "Payload too large: size {}, max {}",
                    actual_size, max_size
                )
            }
            ProtocolError::InvalidQosLevel { level } => {
                write!(f, "Invalid QoS level: {}", level)
            }
            ProtocolError::TopicEmpty => write!(f, "Topic name is empty"),
            ProtocolError::TopicWildcard => write!(f, "Topic name contains a wildcard"),
            ProtocolError::TopicNameLengthExceeded {
                max_length,
                actual_length,
            } => {
                write!(
                    f,
                    "Topic name length exceeded: length {}, max {}",
                    actual_length, max_length
                )
            }
            ProtocolError::TooManyReturnCodes { max_count } => {
                write!(f, "Too many SUBACK return codes, max {}", max_count)
            }
            ProtocolError::UnsupportedProtocolLevel { level } => {
                write!(f, "Unsupported protocol level in CONNECT packet: {}", level)
            }
        }
    }
}

impl core::error::Error for ProtocolError {}
