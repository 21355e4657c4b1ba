/// MQTT control packet type, the high nibble of the fixed header
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
pub enum PacketType {
    /// Forbidden
    #[default]
    Reserved = 0,
    /// Client to Server
    Connect = 1,
    /// Server to Client
    ConnAck = 2,
    /// Both directions
    Publish = 3,
    /// QoS 1 acknowledgment, both directions
    PubAck = 4,
    /// Assured delivery part 1, both directions
    PubRec = 5,
    /// Assured delivery part 2, both directions
    PubRel = 6,
    /// Assured delivery part 3, both directions
    PubComp = 7,
    /// Client to Server
    Subscribe = 8,
    /// Server to Client
    SubAck = 9,
    /// Client to Server
    Unsubscribe = 10,
    /// Server to Client
    UnsubAck = 11,
    /// Client to Server
    PingReq = 12,
    /// Server to Client
    PingResp = 13,
    /// Client to Server
    Disconnect = 14,
    /// Forbidden
    Reserved2 = 15,
}

impl PacketType {
    /// Extract the packet type from the first header byte
    pub const fn from_header(byte: u8) -> Self {
        match byte >> 4 {
            1 => PacketType::Connect,
            2 => PacketType::ConnAck,
            3 => PacketType::Publish,
            4 => PacketType::PubAck,
            5 => PacketType::PubRec,
            6 => PacketType::PubRel,
            7 => PacketType::PubComp,
            8 => PacketType::Subscribe,
            9 => PacketType::SubAck,
            10 => PacketType::Unsubscribe,
            11 => PacketType::UnsubAck,
            12 => PacketType::PingReq,
            13 => PacketType::PingResp,
            14 => PacketType::Disconnect,
            15 => PacketType::Reserved2,
            _ => PacketType::Reserved,
        }
    }

    /// Human-readable packet name for logs
    pub const fn name(self) -> &'static str {
        match self {
            PacketType::Reserved | PacketType::Reserved2 => "RESERVED",
            PacketType::Connect => "CONNECT",
            PacketType::ConnAck => "CONNACK",
            PacketType::Publish => "PUBLISH",
            PacketType::PubAck => "PUBACK",
            PacketType::PubRec => "PUBREC",
            PacketType::PubRel => "PUBREL",
            PacketType::PubComp => "PUBCOMP",
            PacketType::Subscribe => "SUBSCRIBE",
            PacketType::SubAck => "SUBACK",
            PacketType::Unsubscribe => "UNSUBSCRIBE",
            PacketType::UnsubAck => "UNSUBACK",
            PacketType::PingReq => "PINGREQ",
            PacketType::PingResp => "PINGRESP",
            PacketType::Disconnect => "DISCONNECT",
        }
    }
}

impl core::fmt::Display for PacketType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
