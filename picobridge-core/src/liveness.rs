//! The steady-state loop driving the bridge

use log::{debug, error, warn};

use crate::bridge::{EdgeQueue, EventBridge};
use crate::client::PubSubClient;
use crate::error::BridgeError;
use crate::session::SessionState;
use crate::traits::{Delay, Gpio, TimeSource, Transport};

/// Single owner of the client and the bridge.
///
/// Each iteration drains queued button events, waits a bounded time for inbound
/// data and then runs keep-alive housekeeping.
pub struct LivenessLoop<T, TS, G, D>
where
    T: Transport,
    TS: TimeSource,
    G: Gpio,
    D: Delay,
{
    client: PubSubClient<T, TS>,
    bridge: EventBridge<G>,
    edges: &'static EdgeQueue,
    delay: D,
    poll_timeout_ms: u64,
}

impl<T, TS, G, D> LivenessLoop<T, TS, G, D>
where
    T: Transport,
    TS: TimeSource,
    G: Gpio,
    D: Delay,
{
    pub fn new(
        client: PubSubClient<T, TS>,
        bridge: EventBridge<G>,
        edges: &'static EdgeQueue,
        delay: D,
        poll_timeout_ms: u64,
    ) -> Self {
        Self {
            client,
            bridge,
            edges,
            delay,
            poll_timeout_ms,
        }
    }

    pub fn client(&self) -> &PubSubClient<T, TS> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut PubSubClient<T, TS> {
        &mut self.client
    }

    pub fn bridge(&self) -> &EventBridge<G> {
        &self.bridge
    }

    /// Run iterations until the future is dropped
    pub async fn run(&mut self) {
        loop {
            if let Err(e) = self.run_once().await {
                error!("Bridge error: {}", e);
            }
        }
    }

    /// One iteration. Publish failures are logged here, everything else is returned.
    pub async fn run_once(&mut self) -> Result<(), BridgeError> {
        self.drain_edges().await;

        match self.client.state() {
            SessionState::Disconnected | SessionState::Faulted => {
                self.delay.sleep_ms(self.poll_timeout_ms).await;
                return Ok(());
            }
            _ => {}
        }

        let received = match self.client.poll(self.poll_timeout_ms).await {
            Ok(true) => {
                let bridge = &mut self.bridge;
                self.client
                    .receive(|command| {
                        bridge.actuate(&command);
                    })
                    .await
            }
            Ok(false) => Ok(()),
            Err(e) => {
                self.delay.sleep_ms(self.poll_timeout_ms).await;
                return Err(e);
            }
        };

        // keep-alive runs even after a failed receive; the first error wins
        let ticked = self.client.tick().await;
        received.and(ticked)
    }

    async fn drain_edges(&mut self) {
        while let Some(event) = self.edges.pop() {
            debug!("Publishing button event on {}", event.topic);
            if let Err(e) = self
                .client
                .publish(event.topic, event.payload, event.qos)
                .await
            {
                warn!("Button event dropped: {}", e);
            }
        }
    }
}
