//! Sans-IO MQTT client session
//!
//! [`Session`] turns decoded packets into state transitions and queues the
//! packets it wants sent. It never touches a socket: the client feeds it
//! received bytes and drains [`Session::next_outbound`] into the transport.

use log::{debug, info, trace, warn};

use crate::client::ClientId;
use crate::error::SessionError;
use crate::protocol::packets::{
    ConnAckPacket, ConnectPacket, ConnectReturnCode, DisconnectPacket, Packet, PingReqPacket,
    PubAckPacket, PubCompPacket, PubRecPacket, PubRelPacket, PublishHeader, PublishPacket,
    SubAckPacket, SubscribePacket,
};
use crate::protocol::{FrameBuffer, ProtocolError, QoS};
use crate::{BridgePacket, Payload, Topic, MAX_PAYLOAD_SIZE, MAX_PENDING_ACKS, MAX_TOPIC_NAME_LENGTH};

/// Largest frame the session can reassemble
pub const RX_BUFFER_SIZE: usize = MAX_TOPIC_NAME_LENGTH + MAX_PAYLOAD_SIZE + 8;
/// Packets that can wait in the outbox between two flushes
pub const OUTBOX_DEPTH: usize = 16;
/// Topics subscribed automatically after CONNACK
pub const MAX_SUBSCRIPTIONS: usize = 4;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
    Faulted,
}

impl SessionState {
    /// Connected or Subscribed
    pub const fn is_online(self) -> bool {
        matches!(self, SessionState::Connected | SessionState::Subscribed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckPhase {
    /// PUBLISH seen, PUBREC queued but not yet handed to the transport
    Received,
    /// PUBREC sent, waiting for the broker's PUBREL
    ReleaseSent,
}

/// One in-flight inbound QoS 2 message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAck {
    pub message_id: u16,
    pub phase: AckPhase,
}

/// A message delivered by the broker on a subscribed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    pub topic: Topic,
    pub payload: Payload,
}

/// Inputs to the session state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ConnAck(ConnAckPacket),
    SubAck(SubAckPacket),
    Publish(PublishPacket<MAX_TOPIC_NAME_LENGTH, MAX_PAYLOAD_SIZE>),
    PubAck(u16),
    PubRec(u16),
    PubRel(u16),
    PubComp(u16),
    PingResp,
    TransportClosed,
}

impl TryFrom<BridgePacket> for SessionEvent {
    type Error = ProtocolError;

    /// Only packets a broker may send become events
    fn try_from(packet: BridgePacket) -> Result<Self, Self::Error> {
        match packet {
            Packet::ConnAck(connack) => Ok(SessionEvent::ConnAck(connack)),
            Packet::SubAck(suback) => Ok(SessionEvent::SubAck(suback)),
            Packet::Publish(publish) => Ok(SessionEvent::Publish(publish)),
            Packet::PubAck(PubAckPacket { packet_id }) => Ok(SessionEvent::PubAck(packet_id)),
            Packet::PubRec(PubRecPacket { packet_id }) => Ok(SessionEvent::PubRec(packet_id)),
            Packet::PubRel(PubRelPacket { packet_id }) => Ok(SessionEvent::PubRel(packet_id)),
            Packet::PubComp(PubCompPacket { packet_id }) => Ok(SessionEvent::PubComp(packet_id)),
            Packet::PingResp(_) => Ok(SessionEvent::PingResp),
            other => Err(ProtocolError::InvalidPacketType {
                packet_type: other.packet_type() as u8,
            }),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    client_id: ClientId,
    keep_alive_secs: u16,
    subscriptions: heapless::Vec<(Topic, QoS), MAX_SUBSCRIPTIONS>,
    pending_acks: heapless::index_map::FnvIndexMap<u16, PendingAck, MAX_PENDING_ACKS>,
    outbox: heapless::Deque<BridgePacket, OUTBOX_DEPTH>,
    rx: FrameBuffer<RX_BUFFER_SIZE>,
    last_packet_id: u16,
    last_outbound: u64,
    ping_sent_at: Option<u64>,
}

impl Session {
    pub fn new(client_id: ClientId, keep_alive_secs: u16) -> Self {
        Self {
            state: SessionState::Disconnected,
            client_id,
            keep_alive_secs,
            subscriptions: heapless::Vec::new(),
            pending_acks: heapless::index_map::FnvIndexMap::new(),
            outbox: heapless::Deque::new(),
            rx: FrameBuffer::new(),
            last_packet_id: 0,
            last_outbound: 0,
            ping_sent_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn keep_alive_secs(&self) -> u16 {
        self.keep_alive_secs
    }

    pub fn pending_ack(&self, message_id: u16) -> Option<&PendingAck> {
        self.pending_acks.get(&message_id)
    }

    pub fn pending_ack_count(&self) -> usize {
        self.pending_acks.len()
    }

    /// Register a topic to subscribe to each time CONNACK is accepted
    pub fn subscribe_on_connect(&mut self, topic: Topic, qos: QoS) -> Result<(), SessionError> {
        self.subscriptions
            .push((topic, qos))
            .map_err(|_| SessionError::SubscriptionsFull {
                max_subscriptions: MAX_SUBSCRIPTIONS,
            })
    }

    /// Queue CONNECT and move to Connecting. Any previous session state is dropped.
    pub fn begin_connect(&mut self, now: u64) -> Result<(), SessionError> {
        self.reset();
        let connect = ConnectPacket::clean(self.client_id.clone(), self.keep_alive_secs);
        self.queue(Packet::Connect(connect))?;
        self.state = SessionState::Connecting;
        self.last_outbound = now;
        info!("Connecting as {}", self.client_id);
        Ok(())
    }

    /// Queue SUBSCRIBE, returning the packet id used
    pub fn subscribe(&mut self, topic: Topic, qos: QoS) -> Result<u16, SessionError> {
        if !self.state.is_online() {
            return Err(SessionError::NotConnected);
        }
        let packet_id = self.next_packet_id();
        debug!("Subscribing to {} ({:?}) with packet id {}", topic, qos, packet_id);
        self.queue(Packet::Subscribe(SubscribePacket {
            packet_id,
            topic_filter: topic,
            requested_qos: qos,
        }))?;
        Ok(packet_id)
    }

    /// Queue PUBLISH. QoS 1 and 2 get a packet id but no retry state.
    pub fn publish(
        &mut self,
        topic: Topic,
        payload: Payload,
        qos: QoS,
    ) -> Result<Option<u16>, SessionError> {
        if !self.state.is_online() {
            return Err(SessionError::NotConnected);
        }
        if topic.has_wildcards() {
            return Err(SessionError::Protocol(ProtocolError::TopicWildcard));
        }
        let packet_id = match qos {
            QoS::AtMostOnce => None,
            QoS::AtLeastOnce | QoS::ExactlyOnce => Some(self.next_packet_id()),
        };
        self.queue(Packet::Publish(PublishPacket {
            topic_name: topic,
            packet_id,
            payload,
            qos,
            dup: false,
            retain: false,
        }))?;
        Ok(packet_id)
    }

    /// Queue DISCONNECT and drop all session state
    pub fn disconnect(&mut self) -> Result<(), SessionError> {
        let was_online = self.state.is_online();
        self.reset();
        if was_online {
            self.queue(Packet::Disconnect(DisconnectPacket))?;
        }
        info!("Session closed");
        Ok(())
    }

    /// The transport went away: forget everything in flight
    pub fn transport_closed(&mut self) {
        if self.state != SessionState::Disconnected {
            info!("Transport closed, session reset from {:?}", self.state);
        }
        self.reset();
    }

    /// Append received bytes and handle every complete frame in order.
    ///
    /// Returns how many bytes were taken. Frames stay buffered while the outbox
    /// cannot hold their replies: flush, then feed the rest (or nothing) while
    /// [`Self::is_backlogged`] holds. A PUBLISH too large to deliver is
    /// acknowledged and dropped. A frame that cannot be decoded resets the
    /// session, since the rest of the stream can no longer be trusted.
    pub fn feed(
        &mut self,
        bytes: &[u8],
        now: u64,
        mut on_command: impl FnMut(InboundCommand),
    ) -> Result<usize, SessionError> {
        let mut used = 0;
        loop {
            let filled = self.rx.fill(&bytes[used..]);
            used += filled;

            let mut handled = false;
            while self.next_frame(now, &mut on_command)? {
                handled = true;
            }

            if used == bytes.len() || self.is_backlogged() {
                return Ok(used);
            }
            if filled == 0 && !handled {
                return Err(self.desync(ProtocolError::FrameTooLarge {
                    max_size: RX_BUFFER_SIZE,
                    actual_size: self.rx.len() + bytes.len() - used,
                }));
            }
        }
    }

    /// Buffered frames are waiting for the outbox to be drained
    pub fn is_backlogged(&self) -> bool {
        !self.rx.is_empty() && !self.has_reply_room()
    }

    /// Handle the frame at the front of the receive buffer. Returns false when
    /// it is incomplete or the outbox has no room for its replies.
    fn next_frame(
        &mut self,
        now: u64,
        on_command: &mut impl FnMut(InboundCommand),
    ) -> Result<bool, SessionError> {
        if !self.has_reply_room() {
            return Ok(false);
        }
        let packet: BridgePacket = match self.rx.next_packet() {
            Ok(Some(packet)) => packet,
            Ok(None) => return Ok(false),
            Err(ProtocolError::PayloadTooLarge { .. } | ProtocolError::FrameTooLarge { .. }) => {
                return self.skip_oversized();
            }
            Err(e) => return Err(self.desync(e)),
        };
        trace!("Received {}", packet);
        let event = match SessionEvent::try_from(packet) {
            Ok(event) => event,
            Err(e) => return Err(self.desync(e)),
        };
        if let Some(command) = self.handle(event, now)? {
            on_command(command);
        }
        Ok(true)
    }

    /// Acknowledge a PUBLISH that does not fit and drop it from the stream
    fn skip_oversized(&mut self) -> Result<bool, SessionError> {
        let header = match PublishHeader::<MAX_TOPIC_NAME_LENGTH>::decode(self.rx.as_slice()) {
            Ok(header) => header,
            // topic or packet id not here yet
            Err(ProtocolError::IncompletePacket { .. }) => return Ok(false),
            Err(e) => return Err(self.desync(e)),
        };
        self.rx.skip(header.frame_len);
        warn!(
            "Dropping {} byte message on {}, limit is {}",
            header.payload_len, header.topic_name, MAX_PAYLOAD_SIZE
        );
        if self.state.is_online() {
            self.acknowledge(header.flags.qos, header.packet_id)?;
        }
        Ok(true)
    }

    /// A CONNACK queues one SUBSCRIBE per registered topic, any other frame at most one packet
    fn has_reply_room(&self) -> bool {
        OUTBOX_DEPTH - self.outbox.len() >= MAX_SUBSCRIPTIONS
    }

    /// The transition function: one event in, state updated, at most one command out
    pub fn handle(
        &mut self,
        event: SessionEvent,
        now: u64,
    ) -> Result<Option<InboundCommand>, SessionError> {
        match event {
            SessionEvent::ConnAck(connack) => self.on_connack(connack).map(|_| None),
            SessionEvent::SubAck(suback) => {
                if suback.any_failed() {
                    warn!("Broker refused subscription {}", suback.packet_id);
                }
                if self.state == SessionState::Connected {
                    info!("Subscribed (packet id {})", suback.packet_id);
                    self.state = SessionState::Subscribed;
                }
                Ok(None)
            }
            SessionEvent::Publish(publish) => self.on_publish(publish),
            SessionEvent::PubAck(packet_id) => {
                debug!("PUBACK for packet id {}", packet_id);
                Ok(None)
            }
            SessionEvent::PubRec(packet_id) => {
                debug!("PUBREC for packet id {}, releasing", packet_id);
                self.queue(Packet::PubRel(PubRelPacket { packet_id }))?;
                Ok(None)
            }
            SessionEvent::PubRel(packet_id) => {
                if self.pending_acks.remove(&packet_id).is_some() {
                    debug!("PUBREL for packet id {}, completing", packet_id);
                    self.queue(Packet::PubComp(PubCompPacket { packet_id }))?;
                } else {
                    debug!("PUBREL for unknown packet id {}, ignored", packet_id);
                }
                Ok(None)
            }
            SessionEvent::PubComp(packet_id) => {
                debug!("PUBCOMP for packet id {}", packet_id);
                Ok(None)
            }
            SessionEvent::PingResp => {
                trace!("PINGRESP at {}", now);
                self.ping_sent_at = None;
                Ok(None)
            }
            SessionEvent::TransportClosed => {
                self.transport_closed();
                Ok(None)
            }
        }
    }

    /// Keep-alive housekeeping, called once per loop iteration
    pub fn tick(&mut self, now: u64) -> Result<(), SessionError> {
        if !self.state.is_online() || self.keep_alive_secs == 0 {
            return Ok(());
        }
        if let Some(sent_at) = self.ping_sent_at {
            if self.is_expired(sent_at, now) {
                warn!("No PINGRESP since {}, dropping connection", sent_at);
                self.reset();
                return Err(SessionError::KeepAliveTimeout);
            }
            return Ok(());
        }
        if now.saturating_sub(self.last_outbound) >= self.keep_alive_secs as u64 {
            trace!("Keep-alive interval elapsed, sending PINGREQ");
            self.queue(Packet::PingReq(PingReqPacket))?;
            self.ping_sent_at = Some(now);
        }
        Ok(())
    }

    /// Take the next packet to hand to the transport
    pub fn next_outbound(&mut self, now: u64) -> Option<BridgePacket> {
        let packet = self.outbox.pop_front()?;
        if let Packet::PubRec(PubRecPacket { packet_id }) = &packet {
            if let Some(pending) = self.pending_acks.get_mut(packet_id) {
                pending.phase = AckPhase::ReleaseSent;
            }
        }
        self.last_outbound = now;
        Some(packet)
    }

    pub fn has_outbound(&self) -> bool {
        !self.outbox.is_empty()
    }

    /// Returns true if no PINGRESP arrived within 1.5x the keep-alive value
    fn is_expired(&self, sent_at: u64, now: u64) -> bool {
        let timeout_secs = (self.keep_alive_secs as u64) * 3 / 2;
        now.saturating_sub(sent_at) >= timeout_secs
    }

    fn on_connack(&mut self, connack: ConnAckPacket) -> Result<(), SessionError> {
        if self.state != SessionState::Connecting {
            warn!("Unexpected CONNACK in state {:?}, ignored", self.state);
            return Ok(());
        }
        if connack.return_code != ConnectReturnCode::Accepted {
            self.state = SessionState::Faulted;
            return Err(SessionError::Rejected {
                return_code: connack.return_code,
            });
        }
        info!("Connected to broker");
        self.state = SessionState::Connected;
        for index in 0..self.subscriptions.len() {
            let (topic, qos) = self.subscriptions[index].clone();
            self.subscribe(topic, qos)?;
        }
        Ok(())
    }

    fn on_publish(
        &mut self,
        publish: PublishPacket<MAX_TOPIC_NAME_LENGTH, MAX_PAYLOAD_SIZE>,
    ) -> Result<Option<InboundCommand>, SessionError> {
        if !self.state.is_online() {
            warn!("PUBLISH in state {:?}, ignored", self.state);
            return Ok(None);
        }
        if !self.acknowledge(publish.qos, publish.packet_id)? {
            return Ok(None);
        }
        debug!("Message on {} ({} bytes)", publish.topic_name, publish.payload.len());
        Ok(Some(InboundCommand {
            topic: publish.topic_name,
            payload: publish.payload,
        }))
    }

    /// Queue the receipt for an inbound PUBLISH. Returns false when the
    /// message must not be delivered.
    fn acknowledge(&mut self, qos: QoS, packet_id: Option<u16>) -> Result<bool, SessionError> {
        match (qos, packet_id) {
            (QoS::AtMostOnce, _) => Ok(true),
            (QoS::AtLeastOnce, Some(packet_id)) => {
                self.queue(Packet::PubAck(PubAckPacket { packet_id }))?;
                Ok(true)
            }
            (QoS::ExactlyOnce, Some(packet_id)) => {
                if self.pending_acks.contains_key(&packet_id) {
                    debug!("Duplicate QoS 2 PUBLISH {}, already pending", packet_id);
                    return Ok(false);
                }
                let pending = PendingAck {
                    message_id: packet_id,
                    phase: AckPhase::Received,
                };
                if self.pending_acks.insert(packet_id, pending).is_err() {
                    warn!("Too many QoS 2 messages in flight, dropping {}", packet_id);
                    return Ok(false);
                }
                if let Err(e) = self.queue(Packet::PubRec(PubRecPacket { packet_id })) {
                    self.pending_acks.remove(&packet_id);
                    return Err(e);
                }
                Ok(true)
            }
            (_, None) => Err(SessionError::Protocol(ProtocolError::MissingPacketId)),
        }
    }

    fn queue(&mut self, packet: BridgePacket) -> Result<(), SessionError> {
        self.outbox
            .push_back(packet)
            .map_err(|_| SessionError::OutboxFull)
    }

    fn next_packet_id(&mut self) -> u16 {
        self.last_packet_id = self.last_packet_id.wrapping_add(1);
        if self.last_packet_id == 0 {
            self.last_packet_id = 1;
        }
        self.last_packet_id
    }

    fn desync(&mut self, e: ProtocolError) -> SessionError {
        warn!("Malformed frame from broker: {}", e);
        self.reset();
        SessionError::Protocol(e)
    }

    fn reset(&mut self) {
        self.state = SessionState::Disconnected;
        self.pending_acks.clear();
        self.outbox.clear();
        self.rx.clear();
        self.ping_sent_at = None;
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::protocol::packets::{SubAckReturnCode, MAX_SUBACK_RETURN_CODES};
    use crate::protocol::packets::PacketEncoder;
    use crate::protocol::utils::write_variable_length;
    use std::vec::Vec;

    fn topic(name: &str) -> Topic {
        Topic::try_from(name).unwrap()
    }

    fn payload(bytes: &[u8]) -> Payload {
        Payload::from_slice(bytes).unwrap()
    }

    fn session() -> Session {
        let mut session = Session::new(ClientId::try_from("zephyr_client").unwrap(), 60);
        session
            .subscribe_on_connect(topic("device/led/status"), QoS::AtMostOnce)
            .unwrap();
        session
    }

    fn drain(session: &mut Session, now: u64) -> Vec<BridgePacket> {
        let mut packets = Vec::new();
        while let Some(packet) = session.next_outbound(now) {
            packets.push(packet);
        }
        packets
    }

    fn accepted() -> SessionEvent {
        SessionEvent::ConnAck(ConnAckPacket {
            session_present: false,
            return_code: ConnectReturnCode::Accepted,
        })
    }

    fn suback(packet_id: u16) -> SessionEvent {
        let mut return_codes = heapless::Vec::<_, MAX_SUBACK_RETURN_CODES>::new();
        return_codes
            .push(SubAckReturnCode::Granted(QoS::AtMostOnce))
            .unwrap();
        SessionEvent::SubAck(SubAckPacket {
            packet_id,
            return_codes,
        })
    }

    fn inbound(qos: QoS, packet_id: Option<u16>, body: &[u8]) -> SessionEvent {
        SessionEvent::Publish(PublishPacket {
            topic_name: topic("device/led/status"),
            packet_id,
            payload: payload(body),
            qos,
            dup: false,
            retain: false,
        })
    }

    /// A session that has seen CONNACK and SUBACK, with the outbox drained
    fn subscribed() -> Session {
        let mut session = session();
        session.begin_connect(0).unwrap();
        session.handle(accepted(), 0).unwrap();
        session.handle(suback(1), 0).unwrap();
        drain(&mut session, 0);
        assert_eq!(session.state(), SessionState::Subscribed);
        session
    }

    #[test]
    fn test_begin_connect_queues_connect() {
        let mut session = session();
        assert_eq!(session.state(), SessionState::Disconnected);
        session.begin_connect(5).unwrap();
        assert_eq!(session.state(), SessionState::Connecting);

        let packets = drain(&mut session, 5);
        assert_eq!(packets.len(), 1);
        match &packets[0] {
            Packet::Connect(connect) => {
                assert_eq!(connect.client_id.as_str(), "zephyr_client");
                assert_eq!(connect.keep_alive, 60);
            }
            other => panic!("expected CONNECT, got {:?}", other),
        }
    }

    #[test]
    fn test_connack_queues_one_subscribe_per_topic_in_order() {
        let mut session = Session::new(ClientId::try_from("c").unwrap(), 60);
        session
            .subscribe_on_connect(topic("first"), QoS::AtMostOnce)
            .unwrap();
        session
            .subscribe_on_connect(topic("second"), QoS::ExactlyOnce)
            .unwrap();
        session.begin_connect(0).unwrap();
        drain(&mut session, 0);

        session.handle(accepted(), 0).unwrap();
        assert_eq!(session.state(), SessionState::Connected);

        let topics: Vec<_> = drain(&mut session, 0)
            .into_iter()
            .map(|packet| match packet {
                Packet::Subscribe(subscribe) => {
                    (subscribe.topic_filter.as_str().into(), subscribe.requested_qos)
                }
                other => panic!("expected SUBSCRIBE, got {:?}", other),
            })
            .collect::<Vec<(std::string::String, QoS)>>();
        assert_eq!(
            topics,
            [
                (std::string::String::from("first"), QoS::AtMostOnce),
                (std::string::String::from("second"), QoS::ExactlyOnce)
            ]
        );
    }

    #[test]
    fn test_connack_refused_faults_session() {
        let mut session = session();
        session.begin_connect(0).unwrap();
        let result = session.handle(
            SessionEvent::ConnAck(ConnAckPacket {
                session_present: false,
                return_code: ConnectReturnCode::NotAuthorized,
            }),
            0,
        );
        assert_eq!(
            result,
            Err(SessionError::Rejected {
                return_code: ConnectReturnCode::NotAuthorized
            })
        );
        assert_eq!(session.state(), SessionState::Faulted);
        assert_eq!(
            session.subscribe(topic("a"), QoS::AtMostOnce),
            Err(SessionError::NotConnected)
        );
    }

    #[test]
    fn test_suback_moves_to_subscribed() {
        let mut session = session();
        session.begin_connect(0).unwrap();
        session.handle(accepted(), 0).unwrap();
        session.handle(suback(1), 0).unwrap();
        assert_eq!(session.state(), SessionState::Subscribed);
    }

    #[test]
    fn test_publish_and_subscribe_require_connection() {
        let mut session = session();
        assert_eq!(
            session.publish(topic("device/button/press"), payload(b"x"), QoS::AtMostOnce),
            Err(SessionError::NotConnected)
        );
        session.begin_connect(0).unwrap();
        assert_eq!(
            session.subscribe(topic("a"), QoS::AtMostOnce),
            Err(SessionError::NotConnected)
        );
    }

    #[test]
    fn test_qos0_publish_creates_no_state() {
        let mut session = subscribed();
        let result = session.publish(
            topic("device/button/press"),
            payload(b"Button Pressed"),
            QoS::AtMostOnce,
        );
        assert_eq!(result, Ok(None));
        assert_eq!(session.pending_ack_count(), 0);
        assert_eq!(drain(&mut session, 1).len(), 1);
    }

    #[test]
    fn test_packet_ids_are_never_zero() {
        let mut session = subscribed();
        session.last_packet_id = u16::MAX;
        let id = session
            .publish(topic("t"), payload(b""), QoS::AtLeastOnce)
            .unwrap();
        assert_eq!(id, Some(1));
    }

    #[test]
    fn test_qos0_delivery() {
        let mut session = subscribed();
        let command = session
            .handle(inbound(QoS::AtMostOnce, None, b"on"), 1)
            .unwrap()
            .unwrap();
        assert_eq!(command.topic.as_str(), "device/led/status");
        assert_eq!(command.payload.as_slice(), b"on");
        assert!(!session.has_outbound());
    }

    #[test]
    fn test_qos1_delivery_is_acknowledged() {
        let mut session = subscribed();
        let command = session
            .handle(inbound(QoS::AtLeastOnce, Some(3), b"off"), 1)
            .unwrap();
        assert!(command.is_some());
        assert_eq!(
            drain(&mut session, 1),
            [BridgePacket::PubAck(PubAckPacket { packet_id: 3 })]
        );
    }

    #[test]
    fn test_qos2_exactly_one_receipt_and_one_release() {
        let mut session = subscribed();

        let first = session
            .handle(inbound(QoS::ExactlyOnce, Some(1234), b"on"), 1)
            .unwrap();
        assert!(first.is_some());
        assert_eq!(
            session.pending_ack(1234),
            Some(&PendingAck {
                message_id: 1234,
                phase: AckPhase::Received
            })
        );

        // duplicate while pending: nothing at all
        let duplicate = session
            .handle(inbound(QoS::ExactlyOnce, Some(1234), b"on"), 1)
            .unwrap();
        assert!(duplicate.is_none());
        assert_eq!(session.pending_ack_count(), 1);

        assert_eq!(
            drain(&mut session, 1),
            [BridgePacket::PubRec(PubRecPacket { packet_id: 1234 })]
        );
        assert_eq!(
            session.pending_ack(1234).map(|p| p.phase),
            Some(AckPhase::ReleaseSent)
        );

        session.handle(SessionEvent::PubRel(1234), 2).unwrap();
        assert_eq!(session.pending_ack(1234), None);
        assert_eq!(
            drain(&mut session, 2),
            [BridgePacket::PubComp(PubCompPacket { packet_id: 1234 })]
        );

        // repeated release: no-op
        session.handle(SessionEvent::PubRel(1234), 3).unwrap();
        assert!(!session.has_outbound());
    }

    #[test]
    fn test_pubrel_for_unknown_id_ignored() {
        let mut session = subscribed();
        assert_eq!(session.handle(SessionEvent::PubRel(77), 1), Ok(None));
        assert!(!session.has_outbound());
        assert_eq!(session.state(), SessionState::Subscribed);
    }

    #[test]
    fn test_pending_acks_bounded() {
        let mut session = subscribed();
        for id in 1..=MAX_PENDING_ACKS as u16 {
            session
                .handle(inbound(QoS::ExactlyOnce, Some(id), b"on"), 1)
                .unwrap();
            drain(&mut session, 1);
        }
        let overflow = session
            .handle(inbound(QoS::ExactlyOnce, Some(100), b"on"), 1)
            .unwrap();
        assert!(overflow.is_none());
        assert_eq!(session.pending_ack_count(), MAX_PENDING_ACKS);
        assert!(!session.has_outbound());
    }

    #[test]
    fn test_outbound_qos2_acks_do_not_touch_pending() {
        let mut session = subscribed();
        session
            .handle(inbound(QoS::ExactlyOnce, Some(9), b"on"), 1)
            .unwrap();
        drain(&mut session, 1);

        session.handle(SessionEvent::PubRec(9), 1).unwrap();
        assert_eq!(
            drain(&mut session, 1),
            [BridgePacket::PubRel(PubRelPacket { packet_id: 9 })]
        );
        session.handle(SessionEvent::PubComp(9), 1).unwrap();
        session.handle(SessionEvent::PubAck(9), 1).unwrap();
        assert_eq!(session.pending_ack_count(), 1);
    }

    #[test]
    fn test_transport_closed_clears_everything_from_any_state() {
        let states: [fn() -> Session; 5] = [
            session,
            || {
                let mut s = session();
                s.begin_connect(0).unwrap();
                s
            },
            || {
                // SUBSCRIBE still queued
                let mut s = session();
                s.begin_connect(0).unwrap();
                s.handle(accepted(), 0).unwrap();
                s
            },
            subscribed,
            || {
                let mut s = session();
                s.begin_connect(0).unwrap();
                let refused = SessionEvent::ConnAck(ConnAckPacket {
                    session_present: false,
                    return_code: ConnectReturnCode::IdentifierRejected,
                });
                assert!(s.handle(refused, 0).is_err());
                s
            },
        ];
        let mut seen = Vec::new();
        for make in states {
            let mut session = make();
            seen.push(session.state());
            if session.state().is_online() {
                session
                    .handle(inbound(QoS::ExactlyOnce, Some(5), b"on"), 1)
                    .unwrap();
                assert_eq!(session.pending_ack_count(), 1);
            }
            session.handle(SessionEvent::TransportClosed, 2).unwrap();
            assert_eq!(session.state(), SessionState::Disconnected);
            assert_eq!(session.pending_ack_count(), 0);
            assert!(!session.has_outbound());
        }
        assert_eq!(
            seen,
            [
                SessionState::Disconnected,
                SessionState::Connecting,
                SessionState::Connected,
                SessionState::Subscribed,
                SessionState::Faulted,
            ]
        );
    }

    #[test]
    fn test_release_after_reconnect_is_unknown() {
        let mut session = subscribed();
        session
            .handle(inbound(QoS::ExactlyOnce, Some(5), b"on"), 1)
            .unwrap();
        session.transport_closed();
        session.begin_connect(2).unwrap();
        session.handle(accepted(), 2).unwrap();
        drain(&mut session, 2);
        session.handle(SessionEvent::PubRel(5), 3).unwrap();
        assert!(!session.has_outbound());
    }

    #[test]
    fn test_tick_sends_pingreq_after_keep_alive() {
        let mut session = subscribed();
        session.tick(59).unwrap();
        assert!(!session.has_outbound());

        session.tick(60).unwrap();
        assert_eq!(drain(&mut session, 60), [BridgePacket::PingReq(PingReqPacket)]);

        // outstanding ping: no second one
        session.tick(80).unwrap();
        assert!(!session.has_outbound());

        session.handle(SessionEvent::PingResp, 81).unwrap();
        session.tick(119).unwrap();
        assert!(!session.has_outbound());
        session.tick(120).unwrap();
        assert_eq!(drain(&mut session, 120), [BridgePacket::PingReq(PingReqPacket)]);
    }

    #[test]
    fn test_tick_times_out_without_pingresp() {
        let mut session = subscribed();
        session.tick(60).unwrap();
        drain(&mut session, 60);
        session.tick(149).unwrap();
        assert_eq!(session.tick(150), Err(SessionError::KeepAliveTimeout));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_tick_idle_while_disconnected() {
        let mut session = session();
        session.tick(1_000).unwrap();
        assert!(!session.has_outbound());
    }

    #[test]
    fn test_feed_reassembles_and_preserves_order() {
        let mut session = session();
        session.begin_connect(0).unwrap();
        drain(&mut session, 0);

        let mut stream = Vec::new();
        stream.extend_from_slice(&[0x20, 0x02, 0x00, 0x00]); // CONNACK
        stream.extend_from_slice(&[0x90, 0x03, 0x00, 0x01, 0x00]); // SUBACK
        let mut buffer = [0u8; 64];
        let len = PublishPacket::<MAX_TOPIC_NAME_LENGTH, MAX_PAYLOAD_SIZE> {
            topic_name: topic("device/led/status"),
            packet_id: None,
            payload: payload(b"on"),
            qos: QoS::AtMostOnce,
            dup: false,
            retain: false,
        }
        .encode(&mut buffer)
        .unwrap();
        stream.extend_from_slice(&buffer[..len]);
        stream.extend_from_slice(&buffer[..len]);
        // half a PINGRESP
        stream.push(0xD0);

        let mut commands = Vec::new();
        for chunk in stream.chunks(3) {
            session.feed(chunk, 1, |c| commands.push(c)).unwrap();
        }
        assert_eq!(session.state(), SessionState::Subscribed);
        assert_eq!(commands.len(), 2);
        assert!(commands.iter().all(|c| c.payload.as_slice() == b"on"));
        assert_eq!(session.rx.len(), 1);
    }

    #[test]
    fn test_feed_malformed_frame_resets_session() {
        let mut session = subscribed();
        session
            .handle(inbound(QoS::ExactlyOnce, Some(5), b"on"), 1)
            .unwrap();
        let result = session.feed(&[0xF0, 0x00], 1, |_| {});
        assert_eq!(
            result,
            Err(SessionError::Protocol(ProtocolError::InvalidPacketType {
                packet_type: 15
            }))
        );
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.pending_ack_count(), 0);
    }

    #[test]
    fn test_feed_rejects_client_only_packets() {
        let mut session = subscribed();
        let result = session.feed(&[0xC0, 0x00], 1, |_| {});
        assert_eq!(
            result,
            Err(SessionError::Protocol(ProtocolError::InvalidPacketType {
                packet_type: 12
            }))
        );
    }

    #[test]
    fn test_disconnect_queues_disconnect_when_online() {
        let mut session = subscribed();
        session.disconnect().unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(drain(&mut session, 1), [BridgePacket::Disconnect(DisconnectPacket)]);

        session.disconnect().unwrap();
        assert!(!session.has_outbound());
    }

    fn publish_frame(topic: &str, qos: QoS, packet_id: u16, body: &[u8]) -> Vec<u8> {
        let id_len = if qos == QoS::AtMostOnce { 0 } else { 2 };
        let mut frame = Vec::new();
        frame.push(0x30 | ((qos as u8) << 1));
        let mut length = [0u8; 4];
        let n = write_variable_length(2 + topic.len() + id_len + body.len(), &mut length).unwrap();
        frame.extend_from_slice(&length[..n]);
        frame.extend_from_slice(&(topic.len() as u16).to_be_bytes());
        frame.extend_from_slice(topic.as_bytes());
        if id_len > 0 {
            frame.extend_from_slice(&packet_id.to_be_bytes());
        }
        frame.extend_from_slice(body);
        frame
    }

    const LED: &str = "device/led/status";

    #[test]
    fn test_oversized_payload_dropped_session_kept() {
        let mut session = subscribed();
        let frame = publish_frame(LED, QoS::AtMostOnce, 0, &[b'x'; 150]);
        let mut commands = Vec::new();
        assert_eq!(session.feed(&frame, 1, |c| commands.push(c)), Ok(frame.len()));
        assert!(commands.is_empty());
        assert_eq!(session.state(), SessionState::Subscribed);
        assert!(!session.has_outbound());
        assert!(session.rx.is_empty());
    }

    #[test]
    fn test_oversized_payload_still_acknowledged() {
        let mut session = subscribed();
        let mut stream = publish_frame(LED, QoS::AtLeastOnce, 42, &[b'x'; 150]);
        stream.extend_from_slice(&publish_frame(LED, QoS::ExactlyOnce, 43, &[b'x'; 140]));
        let mut commands = Vec::new();
        session.feed(&stream, 1, |c| commands.push(c)).unwrap();
        assert!(commands.is_empty());
        assert_eq!(
            drain(&mut session, 1),
            [
                BridgePacket::PubAck(PubAckPacket { packet_id: 42 }),
                BridgePacket::PubRec(PubRecPacket { packet_id: 43 }),
            ]
        );
        assert_eq!(
            session.pending_ack(43).map(|p| p.phase),
            Some(AckPhase::ReleaseSent)
        );
        assert_eq!(session.state(), SessionState::Subscribed);
    }

    #[test]
    fn test_frame_larger_than_buffer_skipped_across_reads() {
        let mut session = subscribed();
        let mut stream = publish_frame(LED, QoS::AtLeastOnce, 7, &[b'x'; 300]);
        assert!(stream.len() > RX_BUFFER_SIZE);
        stream.extend_from_slice(&publish_frame(LED, QoS::AtMostOnce, 0, b"on"));

        let mut commands = Vec::new();
        for chunk in stream.chunks(50) {
            let used = session.feed(chunk, 1, |c| commands.push(c)).unwrap();
            assert_eq!(used, chunk.len());
        }
        assert_eq!(session.state(), SessionState::Subscribed);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].payload.as_slice(), b"on");
        assert_eq!(
            drain(&mut session, 1),
            [BridgePacket::PubAck(PubAckPacket { packet_id: 7 })]
        );
    }

    #[test]
    fn test_burst_beyond_outbox_waits_for_flush() {
        let mut session = subscribed();
        let mut stream = Vec::new();
        for id in 1..=18u16 {
            stream.extend_from_slice(&publish_frame("t", QoS::AtLeastOnce, id, b""));
        }
        // more acks than the outbox holds, all in one read
        assert!(stream.len() <= RX_BUFFER_SIZE);

        let mut commands = Vec::new();
        let mut acks = Vec::new();
        let mut rest = &stream[..];
        loop {
            let used = session.feed(rest, 1, |c| commands.push(c)).unwrap();
            rest = &rest[used..];
            let backlogged = session.is_backlogged();
            acks.extend(drain(&mut session, 1));
            if rest.is_empty() && !backlogged {
                break;
            }
        }

        assert_eq!(commands.len(), 18);
        let expected: Vec<BridgePacket> = (1..=18u16)
            .map(|packet_id| BridgePacket::PubAck(PubAckPacket { packet_id }))
            .collect();
        assert_eq!(acks, expected);
        assert_eq!(session.state(), SessionState::Subscribed);
        assert!(session.rx.is_empty());
    }
}
