//! Environment overrides on top of the built-in defaults

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use picobridge_core::config::MAX_BROKER_ADDRESS_LENGTH;
use picobridge_core::{BridgeConfig, ClientId, Topic};

pub const ENV_BROKER: &str = "PICOBRIDGE_BROKER";
pub const ENV_PORT: &str = "PICOBRIDGE_PORT";
pub const ENV_CLIENT_ID: &str = "PICOBRIDGE_CLIENT_ID";
pub const ENV_SENSOR_TOPIC: &str = "PICOBRIDGE_SENSOR_TOPIC";
pub const ENV_ACTUATOR_TOPIC: &str = "PICOBRIDGE_ACTUATOR_TOPIC";
pub const ENV_KEEP_ALIVE_SECS: &str = "PICOBRIDGE_KEEP_ALIVE_SECS";
pub const ENV_POLL_TIMEOUT_MS: &str = "PICOBRIDGE_POLL_TIMEOUT_MS";
pub const ENV_LINK_TIMEOUT_SECS: &str = "PICOBRIDGE_LINK_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The value could not be parsed
    Invalid { var: &'static str, value: String },
    /// The value does not fit its buffer
    TooLong { var: &'static str, max_length: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { var, value } => {
                write!(f, "Invalid value for {}: {:?}", var, value)
            }
            ConfigError::TooLong { var, max_length } => {
                write!(f, "Value for {} is longer than {} bytes", var, max_length)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Everything the binary needs to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub bridge: BridgeConfig,
    /// Upper bound on link bring-up. `None` waits forever.
    pub link_timeout: Option<Duration>,
}

/// Read the configuration from the process environment
pub fn load_config() -> Result<RuntimeConfig, ConfigError> {
    load_config_from(|var| std::env::var(var).ok())
}

/// Read the configuration through `lookup`, falling back to defaults for unset variables
pub fn load_config_from<F>(lookup: F) -> Result<RuntimeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut bridge = BridgeConfig::default();

    if let Some(value) = lookup(ENV_PORT) {
        bridge.port = parse(ENV_PORT, &value)?;
    }
    if let Some(value) = lookup(ENV_BROKER) {
        bridge.broker = heapless::String::try_from(value.as_str()).map_err(|_| {
            ConfigError::TooLong {
                var: ENV_BROKER,
                max_length: MAX_BROKER_ADDRESS_LENGTH,
            }
        })?;
    }
    if let Some(value) = lookup(ENV_CLIENT_ID) {
        if value.is_empty() {
            return Err(invalid(ENV_CLIENT_ID, &value));
        }
        bridge.client_id =
            ClientId::try_from(value.as_str()).map_err(|_| ConfigError::TooLong {
                var: ENV_CLIENT_ID,
                max_length: picobridge_core::client::MAX_CLIENT_ID_LENGTH,
            })?;
    }
    if let Some(value) = lookup(ENV_SENSOR_TOPIC) {
        bridge.sensor_topic = topic(ENV_SENSOR_TOPIC, &value)?;
        if bridge.sensor_topic.has_wildcards() {
            return Err(invalid(ENV_SENSOR_TOPIC, &value));
        }
    }
    if let Some(value) = lookup(ENV_ACTUATOR_TOPIC) {
        bridge.actuator_topic = topic(ENV_ACTUATOR_TOPIC, &value)?;
    }
    if let Some(value) = lookup(ENV_KEEP_ALIVE_SECS) {
        bridge.keep_alive_secs = parse(ENV_KEEP_ALIVE_SECS, &value)?;
    }
    if let Some(value) = lookup(ENV_POLL_TIMEOUT_MS) {
        bridge.poll_timeout_ms = parse(ENV_POLL_TIMEOUT_MS, &value)?;
        if bridge.poll_timeout_ms == 0 {
            return Err(invalid(ENV_POLL_TIMEOUT_MS, &value));
        }
    }

    let link_timeout = match lookup(ENV_LINK_TIMEOUT_SECS) {
        Some(value) => match parse::<u64>(ENV_LINK_TIMEOUT_SECS, &value)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        },
        None => None,
    };

    Ok(RuntimeConfig {
        bridge,
        link_timeout,
    })
}

fn invalid(var: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
    }
}

fn parse<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(var, value))
}

fn topic(var: &'static str, value: &str) -> Result<Topic, ConfigError> {
    if value.is_empty() {
        return Err(invalid(var, value));
    }
    Topic::try_from(value).map_err(|_| ConfigError::TooLong {
        var,
        max_length: picobridge_core::MAX_TOPIC_NAME_LENGTH,
    })
}
