//! Network interface bring-up gate

use log::{error, info};

use crate::traits::{LinkDriver, LinkError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Down,
    AwaitingAddress,
    Ready,
}

/// Holds startup until the interface has an address
pub struct NetworkLink<D: LinkDriver> {
    driver: D,
    state: LinkState,
    address: Option<[u8; 4]>,
}

impl<D: LinkDriver> NetworkLink<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            state: LinkState::Down,
            address: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn address(&self) -> Option<[u8; 4]> {
        self.address
    }

    /// Bring the interface up and wait, without a deadline, for an address.
    ///
    /// Driver errors are returned unchanged and leave the link Down.
    pub async fn bring_up(&mut self) -> Result<[u8; 4], LinkError> {
        if let (LinkState::Ready, Some(address)) = (self.state, self.address) {
            return Ok(address);
        }

        if let Err(e) = self.driver.request_up() {
            error!("Failed to bring the interface up: {}", e);
            self.state = LinkState::Down;
            return Err(e);
        }
        self.state = LinkState::AwaitingAddress;
        info!("Waiting for an address");

        match self.driver.address_assigned().await {
            Ok(address) => {
                info!(
                    "Address assigned: {}.{}.{}.{}",
                    address[0], address[1], address[2], address[3]
                );
                self.address = Some(address);
                self.state = LinkState::Ready;
                Ok(address)
            }
            Err(e) => {
                error!("Address negotiation failed: {}", e);
                self.address = None;
                self.state = LinkState::Down;
                Err(e)
            }
        }
    }
}
