//! Tokio networking implementation

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use log::{debug, warn};
use picobridge_core::{NetworkError, SocketAddr, Transport};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Tokio TCP transport
///
/// Holds at most one connection to the broker
#[derive(Debug, Default)]
pub struct TokioTransport {
    inner: Option<TcpStream>,
}

impl TokioTransport {
    pub fn new() -> Self {
        Self { inner: None }
    }

    /// Wrap an already connected stream
    pub fn from_tcp_stream(stream: TcpStream) -> Self {
        Self {
            inner: Some(stream),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_some()
    }

    fn stream(&mut self) -> Result<&mut TcpStream, NetworkError> {
        self.inner.as_mut().ok_or(NetworkError::NotConnected)
    }
}

fn map_io_error(e: std::io::Error) -> NetworkError {
    match e.kind() {
        ErrorKind::WouldBlock => NetworkError::WouldBlock,
        ErrorKind::TimedOut => NetworkError::Timeout,
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => NetworkError::ConnectionClosed,
        ErrorKind::NotConnected => NetworkError::NotConnected,
        _ => NetworkError::IoError,
    }
}

impl Transport for TokioTransport {
    async fn connect(&mut self, addr: SocketAddr) -> Result<(), NetworkError> {
        self.close().await;
        let target = SocketAddrV4::new(Ipv4Addr::from(addr.ip), addr.port);
        let stream = TcpStream::connect(target).await.map_err(|e| {
            warn!("TCP connect to {} failed: {}", target, e);
            NetworkError::ConnectFailed
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }
        self.inner = Some(stream);
        Ok(())
    }

    async fn send(&mut self, buf: &[u8]) -> Result<usize, NetworkError> {
        self.stream()?.write(buf).await.map_err(map_io_error)
    }

    async fn poll_readable(&mut self, timeout_ms: u64) -> Result<bool, NetworkError> {
        let stream = self.stream()?;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), stream.readable()).await {
            Ok(Ok(())) => Ok(true),
            Ok(Err(e)) => Err(map_io_error(e)),
            Err(_) => Ok(false),
        }
    }

    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, NetworkError> {
        self.stream()?.try_read(buf).map_err(map_io_error)
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.inner.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("TCP shutdown failed: {}", e);
            }
        }
    }
}
