//! Interfaces to the platform: socket, GPIO bank, network interface, clock

use core::str::FromStr;

/// Stream socket to the broker
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Open a connection to the given address
    async fn connect(&mut self, addr: SocketAddr) -> Result<(), NetworkError>;

    /// Write data from the buffer to the socket, returning how much was written
    async fn send(&mut self, buf: &[u8]) -> Result<usize, NetworkError>;

    /// Wait at most `timeout_ms` for the socket to become readable
    async fn poll_readable(&mut self, timeout_ms: u64) -> Result<bool, NetworkError>;

    /// Read available data into the buffer. `Ok(0)` means the peer closed the stream.
    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, NetworkError>;

    /// Close the socket. Closing an already closed socket does nothing.
    async fn close(&mut self);
}

/// GPIO bank driving the button and the LED
pub trait Gpio {
    fn configure(&mut self, pin: Pin, direction: Direction) -> Result<(), GpioError>;

    fn set(&mut self, pin: Pin, level: Level);

    fn get(&self, pin: Pin) -> Level;

    /// Register a callback invoked from the interrupt path on each rising edge
    fn on_rising_edge<F>(&mut self, pin: Pin, callback: F) -> Result<(), GpioError>
    where
        F: Fn(Pin) + Send + Sync + 'static;
}

/// Network interface that must hold an address before sockets are usable
#[allow(async_fn_in_trait)]
pub trait LinkDriver {
    /// Ask the interface to come up and start address negotiation
    fn request_up(&mut self) -> Result<(), LinkError>;

    /// Resolve once an address has been assigned to the interface
    async fn address_assigned(&mut self) -> Result<[u8; 4], LinkError>;
}

/// Time source trait
///
/// Abstracts time operations for both std and embedded platforms
pub trait TimeSource {
    /// Monotonic time in seconds
    fn now_secs(&self) -> u64;
}

/// Delay trait for abstracting sleep/delay functionality
#[allow(async_fn_in_trait)]
pub trait Delay {
    /// Async sleep for the specified duration in milliseconds
    async fn sleep_ms(&self, millis: u64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin(pub u8);

impl core::fmt::Display for Pin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "pin {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Socket address (IPv4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketAddr {
    pub ip: [u8; 4],
    pub port: u16,
}

impl SocketAddr {
    /// Parse `a.b.c.d` or `a.b.c.d:port`, falling back to `default_port`
    pub fn parse(addr: &str, default_port: u16) -> Option<Self> {
        let (host, port) = match addr.rsplit_once(':') {
            Some((host, port)) => (host, u16::from_str(port).ok()?),
            None => (addr, default_port),
        };
        let ip = core::net::Ipv4Addr::from_str(host).ok()?;
        Some(SocketAddr {
            ip: ip.octets(),
            port,
        })
    }
}

impl core::fmt::Display for SocketAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}:{}",
            self.ip[0], self.ip[1], self.ip[2], self.ip[3], self.port
        )
    }
}

/// Network error enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    /// The connection could not be established
    ConnectFailed,
    /// I/O error occurred
    IoError,
    /// The peer closed the connection
    ConnectionClosed,
    /// No data available right now
    WouldBlock,
    /// Operation on a socket that is not connected
    NotConnected,
    /// The operation did not finish in time
    Timeout,
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NetworkError::ConnectFailed => write!(f, "Failed to connect to the broker"),
            NetworkError::IoError => write!(f, "I/O error occurred"),
            NetworkError::ConnectionClosed => write!(f, "Connection closed by peer"),
            NetworkError::WouldBlock => write!(f, "Operation would block"),
            NetworkError::NotConnected => write!(f, "Socket is not connected"),
            NetworkError::Timeout => write!(f, "Operation timed out"),
        }
    }
}

impl core::error::Error for NetworkError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    /// The pin does not exist on this bank
    InvalidPin { pin: u8 },
    /// The pin exists but could not be configured
    ConfigurationFailed { pin: u8 },
    /// The edge interrupt could not be attached
    CallbackFailed { pin: u8 },
}

impl core::fmt::Display for GpioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GpioError::InvalidPin { pin } => write!(f, "Invalid GPIO pin {}", pin),
            GpioError::ConfigurationFailed { pin } => {
                write!(f, "Failed to configure GPIO pin {}", pin)
            }
            GpioError::CallbackFailed { pin } => {
                write!(f, "Failed to attach edge callback to GPIO pin {}", pin)
            }
        }
    }
}

impl core::error::Error for GpioError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// No network interface available
    NoInterface,
    /// The driver refused to bring the interface up
    DriverFailed,
    /// Address negotiation failed
    AddressNegotiationFailed,
    /// The driver went away while waiting for an address
    Closed,
    /// No address within the allowed time
    Timeout,
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinkError::NoInterface => write!(f, "No network interface available"),
            LinkError::DriverFailed => write!(f, "Network driver failed to bring the link up"),
            LinkError::AddressNegotiationFailed => write!(f, "Address negotiation failed"),
            LinkError::Closed => write!(f, "Network driver closed"),
            LinkError::Timeout => write!(f, "Timed out waiting for an address"),
        }
    }
}

impl core::error::Error for LinkError {}
