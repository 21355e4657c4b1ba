//! MQTT client: a [`Session`] bound to a [`Transport`]

use log::{debug, error, info, trace, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, SessionError};
use crate::protocol::{ProtocolError, QoS};
use crate::session::{InboundCommand, Session, SessionState, RX_BUFFER_SIZE};
use crate::traits::{NetworkError, SocketAddr, TimeSource, Transport};
use crate::{Payload, Topic};

pub const MAX_CLIENT_ID_LENGTH: usize = 23;

/// Bytes read from the transport per `recv` call
pub const RECV_CHUNK_SIZE: usize = 128;

/// Client identifier sent in CONNECT, at most 23 bytes
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(heapless::String<MAX_CLIENT_ID_LENGTH>);

impl ClientId {
    pub const fn new(value: heapless::String<MAX_CLIENT_ID_LENGTH>) -> Self {
        ClientId(value)
    }
}

impl TryFrom<&str> for ClientId {
    type Error = ProtocolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let client_id_str = heapless::String::try_from(value).map_err(|_| {
            ProtocolError::ClientIdLengthExceeded {
                max_length: MAX_CLIENT_ID_LENGTH,
                actual_length: value.len(),
            }
        })?;
        Ok(ClientId(client_id_str))
    }
}

impl core::ops::Deref for ClientId {
    type Target = heapless::String<MAX_CLIENT_ID_LENGTH>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl core::fmt::Display for ClientId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publish/subscribe client.
///
/// Every call that can queue packets flushes them to the transport before
/// returning. Transport and protocol failures close the socket and reset the
/// session to Disconnected.
pub struct PubSubClient<T: Transport, TS: TimeSource> {
    transport: T,
    time_source: TS,
    session: Session,
    default_port: u16,
    tx_buffer: [u8; RX_BUFFER_SIZE],
}

impl<T: Transport, TS: TimeSource> PubSubClient<T, TS> {
    pub fn new(transport: T, time_source: TS, session: Session, default_port: u16) -> Self {
        Self {
            transport,
            time_source,
            session,
            default_port,
            tx_buffer: [0u8; RX_BUFFER_SIZE],
        }
    }

    /// Client that subscribes to the configured actuator topic on every connect
    pub fn from_config(
        transport: T,
        time_source: TS,
        config: &BridgeConfig,
    ) -> Result<Self, BridgeError> {
        let mut session = Session::new(config.client_id.clone(), config.keep_alive_secs);
        session.subscribe_on_connect(config.actuator_topic.clone(), QoS::AtMostOnce)?;
        Ok(Self::new(transport, time_source, session, config.port))
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Open the transport and send CONNECT.
    ///
    /// Returns once the request is on the wire; CONNACK is handled by [`Self::receive`].
    pub async fn connect(&mut self, broker: &str) -> Result<(), BridgeError> {
        let addr = match SocketAddr::parse(broker, self.default_port) {
            Some(addr) => addr,
            None => {
                error!("Malformed broker address: {}", broker);
                return Err(BridgeError::Address);
            }
        };
        info!("Connecting to broker at {}", addr);
        if let Err(e) = self.transport.connect(addr).await {
            error!("Failed to open connection to {}: {}", addr, e);
            self.session.transport_closed();
            return Err(BridgeError::Transport(e));
        }
        let now = self.time_source.now_secs();
        self.session.begin_connect(now)?;
        self.flush().await
    }

    pub async fn subscribe(&mut self, topic: Topic, qos: QoS) -> Result<u16, BridgeError> {
        let packet_id = self.session.subscribe(topic, qos)?;
        self.flush().await?;
        Ok(packet_id)
    }

    pub async fn publish(
        &mut self,
        topic: Topic,
        payload: Payload,
        qos: QoS,
    ) -> Result<Option<u16>, BridgeError> {
        let packet_id = self.session.publish(topic, payload, qos)?;
        self.flush().await?;
        Ok(packet_id)
    }

    /// Wait up to `timeout_ms` for inbound data
    pub async fn poll(&mut self, timeout_ms: u64) -> Result<bool, BridgeError> {
        match self.transport.poll_readable(timeout_ms).await {
            Ok(readable) => Ok(readable),
            Err(e) => Err(self.fail(BridgeError::Transport(e)).await),
        }
    }

    /// Read what the transport has and feed it to the session.
    ///
    /// Each delivered message is handed to `on_command` in arrival order. Replies
    /// are flushed as they pile up, so a read holding more frames than the
    /// outbox is handled in full.
    pub async fn receive(
        &mut self,
        mut on_command: impl FnMut(InboundCommand),
    ) -> Result<(), BridgeError> {
        let mut chunk = [0u8; RECV_CHUNK_SIZE];
        let len = match self.transport.recv(&mut chunk).await {
            Ok(0) | Err(NetworkError::ConnectionClosed) => {
                info!("Broker closed the connection");
                let e = BridgeError::Transport(NetworkError::ConnectionClosed);
                return Err(self.fail(e).await);
            }
            Ok(len) => len,
            Err(NetworkError::WouldBlock) => return Ok(()),
            Err(e) => return Err(self.fail(BridgeError::Transport(e)).await),
        };
        debug!("Received {} bytes", len);

        let now = self.time_source.now_secs();
        let mut pending = &chunk[..len];
        loop {
            let used = match self.session.feed(pending, now, &mut on_command) {
                Ok(used) => used,
                Err(e @ (SessionError::Protocol(_) | SessionError::Rejected { .. })) => {
                    // the session already reset itself or faulted
                    self.transport.close().await;
                    return Err(e.into());
                }
                Err(e) => {
                    warn!("Failed to handle inbound data: {}", e);
                    self.flush().await?;
                    return Err(e.into());
                }
            };
            pending = &pending[used..];
            let backlogged = self.session.is_backlogged();
            self.flush().await?;
            if pending.is_empty() && !backlogged {
                return Ok(());
            }
            trace!("Outbox flushed, {} bytes left to feed", pending.len());
        }
    }

    /// Keep-alive housekeeping
    pub async fn tick(&mut self) -> Result<(), BridgeError> {
        let now = self.time_source.now_secs();
        match self.session.tick(now) {
            Ok(()) => self.flush().await,
            Err(SessionError::KeepAliveTimeout) => {
                self.transport.close().await;
                Err(BridgeError::KeepAliveTimeout)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Send DISCONNECT if connected, then close the transport
    pub async fn disconnect(&mut self) -> Result<(), BridgeError> {
        self.session.disconnect()?;
        let result = self.flush().await;
        self.transport.close().await;
        result
    }

    async fn flush(&mut self) -> Result<(), BridgeError> {
        while let Some(packet) = self.session.next_outbound(self.time_source.now_secs()) {
            let len = match packet.encode(&mut self.tx_buffer) {
                Ok(len) => len,
                Err(e) => {
                    error!("Failed to encode {}: {}", packet.packet_type(), e);
                    return Err(self.fail(BridgeError::Protocol(e)).await);
                }
            };
            debug!("Sending {}", packet);
            let mut sent = 0;
            while sent < len {
                match self.transport.send(&self.tx_buffer[sent..len]).await {
                    Ok(0) => {
                        let e = BridgeError::Transport(NetworkError::ConnectionClosed);
                        return Err(self.fail(e).await);
                    }
                    Ok(n) => sent += n,
                    Err(e) => return Err(self.fail(BridgeError::Transport(e)).await),
                }
            }
        }
        Ok(())
    }

    async fn fail(&mut self, e: BridgeError) -> BridgeError {
        error!("Connection lost: {}", e);
        self.transport.close().await;
        self.session.transport_closed();
        e
    }
}
