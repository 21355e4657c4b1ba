//! # PicoBridge Tokio
//!
//! Tokio runtime support for PicoBridge.
//!
//! This crate provides the TCP transport, link driver, simulated GPIO bank,
//! time source and configuration loading needed to run the bridge on a host
//! with the standard library. It re-exports all types from `picobridge-core`
//! for convenience.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! picobridge-tokio = "0.1"
//! ```
//!
//! ```rust,no_run
//! use picobridge_tokio::*;
//!
//! static EDGES: EdgeQueue = EdgeQueue::new();
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config()?.bridge;
//!     let client = PubSubClient::from_config(TokioTransport::new(), StdTimeSource::new(), &config)?;
//!     let mut bridge = EventBridge::new(SimGpio::new(), &config);
//!     bridge.configure(&EDGES)?;
//!     let mut liveness = LivenessLoop::new(client, bridge, &EDGES, TokioDelay, config.poll_timeout_ms);
//!     liveness.client_mut().connect(&config.broker).await?;
//!     liveness.run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod gpio;
pub mod link;
pub mod network;
pub mod time;

// Re-export core for convenience
pub use picobridge_core::*;

// Tokio-specific types
pub use config::{load_config, ConfigError, RuntimeConfig};
pub use gpio::SimGpio;
pub use link::{bring_up_within, probe_host_address, watch_link, LinkHandle, WatchLink};
pub use network::TokioTransport;
pub use time::{StdTimeSource, TokioDelay};

/// Liveness loop wired to the tokio implementations
pub type TokioLivenessLoop = LivenessLoop<TokioTransport, StdTimeSource, SimGpio, TokioDelay>;
