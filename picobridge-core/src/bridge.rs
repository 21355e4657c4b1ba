//! Mapping between hardware events and messages
//!
//! A rising edge on the button pin becomes one [`OutboundEvent`], queued for
//! the liveness loop. A message on the actuator topic drives the LED.

use heapless::mpmc::Queue;
use log::{error, info, warn};

use crate::config::BridgeConfig;
use crate::protocol::QoS;
use crate::session::InboundCommand;
use crate::traits::{Direction, Gpio, GpioError, Level, Pin};
use crate::{Payload, Topic, EDGE_QUEUE_DEPTH};

/// Payload published on every button press
pub const BUTTON_PAYLOAD: &[u8] = b"Button Pressed";

pub const LED_ON: &[u8] = b"on";
pub const LED_OFF: &[u8] = b"off";

/// A message waiting to be published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEvent {
    pub topic: Topic,
    pub payload: Payload,
    pub qos: QoS,
}

/// Bounded queue between the edge interrupt and the liveness loop
pub struct EdgeQueue {
    queue: Queue<OutboundEvent, EDGE_QUEUE_DEPTH>,
}

impl EdgeQueue {
    // A lost race only drops a QoS 0 button event.
    #[expect(deprecated)]
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
        }
    }

    /// Enqueue an event. When the queue is full the event is dropped and `false` returned.
    pub fn push(&self, event: OutboundEvent) -> bool {
        match self.queue.enqueue(event) {
            Ok(()) => true,
            Err(event) => {
                warn!("Edge queue full, dropping event for {}", event.topic);
                false
            }
        }
    }

    pub fn pop(&self) -> Option<OutboundEvent> {
        self.queue.dequeue()
    }
}

impl Default for EdgeQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for EdgeQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("EdgeQueue")
    }
}

/// Runs on the interrupt path for the button pin
#[derive(Debug, Clone)]
pub struct EdgeHook {
    edges: &'static EdgeQueue,
    topic: Topic,
}

impl EdgeHook {
    pub fn new(edges: &'static EdgeQueue, topic: Topic) -> Self {
        Self { edges, topic }
    }

    /// Build the button message and queue it. Never touches the session.
    pub fn on_edge(&self, pin: Pin) -> OutboundEvent {
        let event = OutboundEvent {
            topic: self.topic.clone(),
            payload: Payload::from_slice(BUTTON_PAYLOAD).unwrap_or_default(),
            qos: QoS::AtMostOnce,
        };
        if self.edges.push(event.clone()) {
            info!("Rising edge on {}, queued for {}", pin, self.topic);
        }
        event
    }
}

/// Owns the GPIO bank and applies inbound commands to the LED
pub struct EventBridge<G: Gpio> {
    gpio: G,
    button_pin: Pin,
    led_pin: Pin,
    sensor_topic: Topic,
    actuator_topic: Topic,
}

impl<G: Gpio> EventBridge<G> {
    pub fn new(gpio: G, config: &BridgeConfig) -> Self {
        Self {
            gpio,
            button_pin: config.button_pin,
            led_pin: config.led_pin,
            sensor_topic: config.sensor_topic.clone(),
            actuator_topic: config.actuator_topic.clone(),
        }
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    pub fn actuator_topic(&self) -> &Topic {
        &self.actuator_topic
    }

    /// Set up the LED as an output and attach the edge hook to the button.
    ///
    /// Each pin is attempted even if the other one fails. The first failure is returned.
    pub fn configure(&mut self, edges: &'static EdgeQueue) -> Result<(), GpioError> {
        let led = self.configure_led();
        if let Err(e) = &led {
            error!("LED unavailable: {}", e);
        }
        let button = self.configure_button(edges);
        if let Err(e) = &button {
            error!("Button unavailable: {}", e);
        }
        led.and(button)
    }

    fn configure_led(&mut self) -> Result<(), GpioError> {
        self.gpio.configure(self.led_pin, Direction::Output)?;
        self.gpio.set(self.led_pin, Level::Low);
        Ok(())
    }

    fn configure_button(&mut self, edges: &'static EdgeQueue) -> Result<(), GpioError> {
        self.gpio.configure(self.button_pin, Direction::Input)?;
        let hook = EdgeHook::new(edges, self.sensor_topic.clone());
        self.gpio
            .on_rising_edge(self.button_pin, move |pin| {
                hook.on_edge(pin);
            })
    }

    /// Apply a delivered message, returning the level written to the LED
    pub fn actuate(&mut self, command: &InboundCommand) -> Option<Level> {
        if command.topic != self.actuator_topic {
            return None;
        }
        let level = match command.payload.as_slice() {
            LED_ON => Level::High,
            LED_OFF => Level::Low,
            _ => {
                warn!("Unknown command on {}, ignored", command.topic);
                return None;
            }
        };
        self.gpio.set(self.led_pin, level);
        info!("LED {:?}", level);
        Some(level)
    }

    pub fn led_level(&self) -> Level {
        self.gpio.get(self.led_pin)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    extern crate std;

    use super::*;
    use std::boxed::Box;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::vec::Vec;

    type Callback = Arc<dyn Fn(Pin) + Send + Sync>;

    #[derive(Default)]
    pub(crate) struct MockGpio {
        pub levels: HashMap<u8, Level>,
        pub directions: HashMap<u8, Direction>,
        pub callbacks: HashMap<u8, Callback>,
        pub broken: Vec<u8>,
    }

    impl MockGpio {
        /// Simulate a rising edge the way the interrupt controller would
        pub fn rise(&self, pin: Pin) {
            if let Some(callback) = self.callbacks.get(&pin.0) {
                callback(pin);
            }
        }
    }

    impl Gpio for MockGpio {
        fn configure(&mut self, pin: Pin, direction: Direction) -> Result<(), GpioError> {
            if self.broken.contains(&pin.0) {
                return Err(GpioError::ConfigurationFailed { pin: pin.0 });
            }
            self.directions.insert(pin.0, direction);
            Ok(())
        }

        fn set(&mut self, pin: Pin, level: Level) {
            self.levels.insert(pin.0, level);
        }

        fn get(&self, pin: Pin) -> Level {
            self.levels.get(&pin.0).copied().unwrap_or_default()
        }

        fn on_rising_edge<F>(&mut self, pin: Pin, callback: F) -> Result<(), GpioError>
        where
            F: Fn(Pin) + Send + Sync + 'static,
        {
            self.callbacks.insert(pin.0, Arc::new(callback));
            Ok(())
        }
    }

    pub(crate) fn leaked_queue() -> &'static EdgeQueue {
        Box::leak(Box::new(EdgeQueue::new()))
    }

    fn command(topic: &str, payload: &[u8]) -> InboundCommand {
        InboundCommand {
            topic: Topic::try_from(topic).unwrap(),
            payload: Payload::from_slice(payload).unwrap(),
        }
    }

    fn bridge() -> EventBridge<MockGpio> {
        EventBridge::new(MockGpio::default(), &BridgeConfig::default())
    }

    #[test]
    fn test_on_and_off_drive_the_led() {
        let mut bridge = bridge();
        assert_eq!(
            bridge.actuate(&command("device/led/status", b"on")),
            Some(Level::High)
        );
        assert_eq!(bridge.led_level(), Level::High);
        assert_eq!(
            bridge.actuate(&command("device/led/status", b"off")),
            Some(Level::Low)
        );
        assert_eq!(bridge.led_level(), Level::Low);
    }

    #[test]
    fn test_other_payloads_leave_led_unchanged() {
        let mut bridge = bridge();
        bridge.actuate(&command("device/led/status", b"on"));
        for payload in [&b"toggle"[..], b"ON", b"on ", b""] {
            assert_eq!(bridge.actuate(&command("device/led/status", payload)), None);
            assert_eq!(bridge.led_level(), Level::High);
        }
    }

    #[test]
    fn test_other_topics_ignored() {
        let mut bridge = bridge();
        assert_eq!(bridge.actuate(&command("device/led/other", b"on")), None);
        assert_eq!(bridge.led_level(), Level::Low);
    }

    #[test]
    fn test_edge_produces_one_button_event() {
        let edges = leaked_queue();
        let hook = EdgeHook::new(edges, Topic::try_from("device/button/press").unwrap());
        let event = hook.on_edge(Pin(0));
        assert_eq!(event.topic.as_str(), "device/button/press");
        assert_eq!(event.payload.as_slice(), b"Button Pressed");
        assert_eq!(event.qos, QoS::AtMostOnce);
        assert_eq!(edges.pop(), Some(event));
        assert_eq!(edges.pop(), None);
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let edges = leaked_queue();
        let hook = EdgeHook::new(edges, Topic::try_from("device/button/press").unwrap());
        for _ in 0..EDGE_QUEUE_DEPTH {
            hook.on_edge(Pin(0));
        }
        assert!(!edges.push(hook.on_edge(Pin(0))));
        let mut drained = 0;
        while edges.pop().is_some() {
            drained += 1;
        }
        assert_eq!(drained, EDGE_QUEUE_DEPTH);
    }

    #[test]
    fn test_configure_wires_button_to_queue() {
        let edges = leaked_queue();
        let mut bridge = bridge();
        bridge.configure(edges).unwrap();
        assert_eq!(bridge.gpio().directions.get(&1), Some(&Direction::Output));
        assert_eq!(bridge.gpio().directions.get(&0), Some(&Direction::Input));

        bridge.gpio().rise(Pin(0));
        let event = edges.pop().unwrap();
        assert_eq!(event.payload.as_slice(), BUTTON_PAYLOAD);
    }

    #[test]
    fn test_configure_failure_keeps_other_pin() {
        let edges = leaked_queue();
        let mut gpio = MockGpio::default();
        gpio.broken.push(1);
        let mut bridge = EventBridge::new(gpio, &BridgeConfig::default());
        assert_eq!(
            bridge.configure(edges),
            Err(GpioError::ConfigurationFailed { pin: 1 })
        );
        bridge.gpio().rise(Pin(0));
        assert!(edges.pop().is_some());
    }
}
