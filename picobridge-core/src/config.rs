//! Bridge configuration with the defaults the device ships with

use crate::client::ClientId;
use crate::traits::Pin;
use crate::Topic;

pub const DEFAULT_BROKER_ADDRESS: &str = "192.168.1.10";
pub const DEFAULT_BROKER_PORT: u16 = 1883;
pub const DEFAULT_CLIENT_ID: &str = "zephyr_client";
pub const DEFAULT_SENSOR_TOPIC: &str = "device/button/press";
pub const DEFAULT_ACTUATOR_TOPIC: &str = "device/led/status";
pub const DEFAULT_KEEP_ALIVE_SECS: u16 = 60;
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 1000;

pub const BUTTON_PIN: Pin = Pin(0);
pub const LED_PIN: Pin = Pin(1);

/// Maximum length of the broker address string (`a.b.c.d:port`)
pub const MAX_BROKER_ADDRESS_LENGTH: usize = 21;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// IPv4 literal, optionally with `:port`
    pub broker: heapless::String<MAX_BROKER_ADDRESS_LENGTH>,
    /// Port used when `broker` has none
    pub port: u16,
    pub client_id: ClientId,
    /// Topic the button publishes on
    pub sensor_topic: Topic,
    /// Topic the LED listens on
    pub actuator_topic: Topic,
    pub keep_alive_secs: u16,
    pub poll_timeout_ms: u64,
    pub button_pin: Pin,
    pub led_pin: Pin,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            broker: heapless::String::try_from(DEFAULT_BROKER_ADDRESS).unwrap_or_default(),
            port: DEFAULT_BROKER_PORT,
            client_id: ClientId::try_from(DEFAULT_CLIENT_ID).unwrap_or_default(),
            sensor_topic: Topic::try_from(DEFAULT_SENSOR_TOPIC).unwrap_or_default(),
            actuator_topic: Topic::try_from(DEFAULT_ACTUATOR_TOPIC).unwrap_or_default(),
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            button_pin: BUTTON_PIN,
            led_pin: LED_PIN,
        }
    }
}
