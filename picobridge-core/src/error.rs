//! Error types for PicoBridge
//!
//! no_std compatible error handling

use crate::protocol::packets::ConnectReturnCode;
use crate::protocol::ProtocolError;
use crate::traits::NetworkError;

/// Errors raised by the sans-IO session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// Publish or subscribe outside Connected/Subscribed
    NotConnected,
    /// The broker refused the connection
    Rejected { return_code: ConnectReturnCode },
    /// No PINGRESP within one and a half keep-alive intervals
    KeepAliveTimeout,
    /// Malformed or unexpected frame
    Protocol(ProtocolError),
    /// The outbound packet queue has no room left
    OutboxFull,
    /// Too many topics registered for subscription on connect
    SubscriptionsFull { max_subscriptions: usize },
}

impl core::fmt::Display for SessionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SessionError::NotConnected => write!(f, "Session is not connected"),
            SessionError::Rejected { return_code } => {
                write!(f, "Connection refused by broker: {}", return_code)
            }
            SessionError::KeepAliveTimeout => write!(f, "Keep-alive timeout expired"),
            SessionError::Protocol(e) => write!(f, "Protocol error: {}", e),
            SessionError::OutboxFull => write!(f, "Outbound packet queue is full"),
            SessionError::SubscriptionsFull { max_subscriptions } => {
                write!(f, "Maximum number of subscriptions reached: {}", max_subscriptions)
            }
        }
    }
}

impl core::error::Error for SessionError {}

impl From<ProtocolError> for SessionError {
    fn from(e: ProtocolError) -> Self {
        SessionError::Protocol(e)
    }
}

/// Errors surfaced by the client and the liveness loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// Malformed broker address
    Address,
    /// Socket open, read or write failure
    Transport(NetworkError),
    /// Malformed frame or encoding failure
    Protocol(ProtocolError),
    /// The broker refused the connection
    Rejected { return_code: ConnectReturnCode },
    /// Publish or subscribe in the wrong state
    NotConnected,
    /// No PINGRESP in time
    KeepAliveTimeout,
    /// The outbound packet queue has no room left
    OutboxFull,
    /// Too many topics registered for subscription on connect
    SubscriptionsFull { max_subscriptions: usize },
}

impl core::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BridgeError::Address => write!(f, "Malformed broker address"),
            BridgeError::Transport(e) => write!(f, "Transport error: {}", e),
            BridgeError::Protocol(e) => write!(f, "Protocol error: {}", e),
            BridgeError::Rejected { return_code } => {
                write!(f, "Connection refused by broker: {}", return_code)
            }
            BridgeError::NotConnected => write!(f, "Not connected to the broker"),
            BridgeError::KeepAliveTimeout => write!(f, "Keep-alive timeout expired"),
            BridgeError::OutboxFull => write!(f, "Outbound packet queue is full"),
            BridgeError::SubscriptionsFull { max_subscriptions } => {
                write!(f, "Maximum number of subscriptions reached: {}", max_subscriptions)
            }
        }
    }
}

impl core::error::Error for BridgeError {}

impl From<SessionError> for BridgeError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotConnected => BridgeError::NotConnected,
            SessionError::Rejected { return_code } => BridgeError::Rejected { return_code },
            SessionError::KeepAliveTimeout => BridgeError::KeepAliveTimeout,
            SessionError::Protocol(e) => BridgeError::Protocol(e),
            SessionError::OutboxFull => BridgeError::OutboxFull,
            SessionError::SubscriptionsFull { max_subscriptions } => {
                BridgeError::SubscriptionsFull { max_subscriptions }
            }
        }
    }
}

impl From<NetworkError> for BridgeError {
    fn from(e: NetworkError) -> Self {
        BridgeError::Transport(e)
    }
}

impl From<ProtocolError> for BridgeError {
    fn from(e: ProtocolError) -> Self {
        BridgeError::Protocol(e)
    }
}
