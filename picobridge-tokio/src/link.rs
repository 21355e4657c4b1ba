//! Link driver backed by a tokio watch channel
//!
//! Whatever learns the interface address (DHCP client, netlink listener, the
//! host probe below) publishes it through a [`LinkHandle`].

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use log::{info, warn};
use picobridge_core::{LinkDriver, LinkError, NetworkLink, SocketAddr};
use tokio::net::UdpSocket;
use tokio::sync::watch;

/// Producer side: announces the assigned address
#[derive(Debug, Clone)]
pub struct LinkHandle {
    tx: watch::Sender<Option<[u8; 4]>>,
}

impl LinkHandle {
    pub fn assign(&self, address: [u8; 4]) {
        self.tx.send_replace(Some(address));
    }
}

/// Consumer side, handed to [`NetworkLink`]
#[derive(Debug)]
pub struct WatchLink {
    rx: watch::Receiver<Option<[u8; 4]>>,
    up_requested: bool,
}

pub fn watch_link() -> (LinkHandle, WatchLink) {
    let (tx, rx) = watch::channel(None);
    (
        LinkHandle { tx },
        WatchLink {
            rx,
            up_requested: false,
        },
    )
}

impl LinkDriver for WatchLink {
    fn request_up(&mut self) -> Result<(), LinkError> {
        if self.rx.has_changed().is_err() && self.rx.borrow().is_none() {
            return Err(LinkError::NoInterface);
        }
        self.up_requested = true;
        Ok(())
    }

    async fn address_assigned(&mut self) -> Result<[u8; 4], LinkError> {
        if !self.up_requested {
            return Err(LinkError::DriverFailed);
        }
        match self.rx.wait_for(Option::is_some).await {
            Ok(address) => (*address).ok_or(LinkError::AddressNegotiationFailed),
            Err(_) => Err(LinkError::Closed),
        }
    }
}

/// Bring the link up, optionally bounded by `timeout`. `None` waits forever.
pub async fn bring_up_within<D: LinkDriver>(
    link: &mut NetworkLink<D>,
    timeout: Option<Duration>,
) -> Result<[u8; 4], LinkError> {
    match timeout {
        None => link.bring_up().await,
        Some(timeout) => match tokio::time::timeout(timeout, link.bring_up()).await {
            Ok(result) => result,
            Err(_) => {
                warn!("No address after {:?}", timeout);
                Err(LinkError::Timeout)
            }
        },
    }
}

/// Find the local address the host would use to reach `target`.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
pub async fn probe_host_address(target: SocketAddr) -> Result<[u8; 4], LinkError> {
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(|_| LinkError::NoInterface)?;
    socket
        .connect(SocketAddrV4::new(Ipv4Addr::from(target.ip), target.port))
        .await
        .map_err(|_| LinkError::NoInterface)?;
    match socket.local_addr() {
        Ok(std::net::SocketAddr::V4(local)) => {
            info!("Host route to {} uses {}", target, local.ip());
            Ok(local.ip().octets())
        }
        _ => Err(LinkError::AddressNegotiationFailed),
    }
}
