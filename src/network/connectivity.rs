//! # Connectivity
//!
//! Owns the network interface. Bring-up probes the co-processor a fixed
//! number of times; after that, [`ConnectivityManager::ensure_connected`]
//! blocks until the interface reports a link, driving the status light red
//! while it waits.

use std::thread;
use std::time::Duration;

use log::{info, warn};

use super::interface::{Credentials, NetworkInterface};
use crate::error::PortalError;
use crate::status::{self, StatusLight};

/// Firmware probes before the co-processor is declared missing.
pub const INIT_ATTEMPTS: usize = 3;

/// Pause between failed probes.
pub const INIT_RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct ConnectivityManager {
    interface: Box<dyn NetworkInterface>,
    firmware: String,
}

impl ConnectivityManager {
    /// Probe the co-processor, resetting it between failed attempts.
    ///
    /// ## Errors
    ///
    /// Returns [`PortalError::Connectivity`] when all [`INIT_ATTEMPTS`]
    /// probes fail. The interface is unusable at that point.
    pub fn initialize(
        mut interface: Box<dyn NetworkInterface>,
        retry_delay: Duration,
    ) -> Result<Self, PortalError> {
        for attempt in 1..=INIT_ATTEMPTS {
            match interface.firmware_version() {
                Ok(firmware) => {
                    info!("Network firmware: {}", firmware);
                    return Ok(Self {
                        interface,
                        firmware,
                    });
                }
                Err(e) => {
                    warn!(
                        "Co-processor probe {}/{} failed: {}",
                        attempt, INIT_ATTEMPTS, e
                    );
                    thread::sleep(retry_delay);
                    interface.reset();
                }
            }
        }

        Err(PortalError::Connectivity(format!(
            "Was not able to find the network co-processor after {} attempts",
            INIT_ATTEMPTS
        )))
    }

    pub fn firmware(&self) -> &str {
        &self.firmware
    }

    /// Block until the interface is connected.
    ///
    /// There is no timeout here; each `connect` call carries the interface's
    /// own retry policy, and a connect that gives up aborts the wait.
    pub fn ensure_connected(
        &mut self,
        credentials: &Credentials,
        status: &mut StatusLight,
    ) -> Result<(), PortalError> {
        status.set(status::CONNECTING);
        while !self.interface.is_connected() {
            status.set(status::DISCONNECTED);
            info!("Connecting to {}...", credentials.ssid);
            self.interface.connect(credentials).map_err(|e| match e {
                PortalError::Connectivity(_) => e,
                other => PortalError::Connectivity(other.to_string()),
            })?;
            thread::yield_now();
        }
        Ok(())
    }
}
