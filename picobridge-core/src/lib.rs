//! # PicoBridge Core
//!
//! Pure `no_std` MQTT 3.1.1 client core bridging a button and an LED to a
//! pub/sub broker.
//!
//! This library contains the protocol codec, the sans-IO session state machine,
//! the client binding it to a transport, and the loop that drives both. It is
//! platform-agnostic and has no async runtime dependencies.
//!
//! ## Features
//!
//! - **no_std** compatible - Fully embedded, no standard library
//! - **MQTT 3.1.1** client - CONNECT, SUBSCRIBE, PUBLISH and keep-alive
//! - **QoS 2 receive** - PUBREC/PUBREL/PUBCOMP handshake for inbound messages
//! - **Heapless** - All stack/static allocation, no heap usage
//! - **Generic platform** - Socket, GPIO, link and clock behind traits
//!
//! ## Limitations
//!
//! - No outbound retry state for QoS 1/2 publishes
//! - No automatic reconnect
//! - No retained messages, will messages or authentication
//! - No TLS

#![no_std]

pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod link;
pub mod liveness;
pub mod protocol;
pub mod session;
pub mod topics;
pub mod traits;

pub use bridge::{EdgeHook, EdgeQueue, EventBridge, OutboundEvent};
pub use client::{ClientId, PubSubClient};
pub use config::BridgeConfig;
pub use error::{BridgeError, SessionError};
pub use link::{LinkState, NetworkLink};
pub use liveness::LivenessLoop;
pub use protocol::{ProtocolError, QoS};
pub use session::{InboundCommand, Session, SessionEvent, SessionState};
pub use topics::TopicName;
pub use traits::{
    Delay, Direction, Gpio, GpioError, Level, LinkDriver, LinkError, NetworkError, Pin,
    SocketAddr, TimeSource, Transport,
};

/// Maximum topic length in bytes
pub const MAX_TOPIC_NAME_LENGTH: usize = 64;

/// Maximum message payload in bytes
pub const MAX_PAYLOAD_SIZE: usize = 128;

/// Inbound QoS 2 messages awaiting PUBREL
pub const MAX_PENDING_ACKS: usize = 8;

/// Button events buffered between the interrupt and the loop
pub const EDGE_QUEUE_DEPTH: usize = 8;

pub type Topic = TopicName<MAX_TOPIC_NAME_LENGTH>;
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD_SIZE>;
pub type BridgePacket = protocol::packets::Packet<MAX_TOPIC_NAME_LENGTH, MAX_PAYLOAD_SIZE>;
