//! Network interface abstraction.
//!
//! On a display board the network lives on an auxiliary WiFi chip driven over
//! a local bus. The rest of the crate only needs four things from it, captured
//! by [`NetworkInterface`].

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::PortalError;

/// WiFi credentials, kept apart from the main config file.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub ssid: String,
    pub password: String,
}

impl Credentials {
    /// Load `{"ssid": "...", "password": "..."}` from a secrets file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PortalError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            PortalError::Config(format!(
                "WiFi secrets are kept in {}, please add them there! ({})",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| PortalError::Config(format!("Invalid secrets file {}: {}", path.display(), e)))
    }
}

/// The network co-processor.
pub trait NetworkInterface {
    /// Ask the co-processor for its firmware identity. Fails while the chip
    /// is not responding.
    fn firmware_version(&mut self) -> Result<String, PortalError>;

    /// Hard-reset the co-processor.
    fn reset(&mut self);

    fn is_connected(&mut self) -> bool;

    /// Issue one connect attempt. The interface applies its own retry policy
    /// and only fails once it gives up.
    fn connect(&mut self, credentials: &Credentials) -> Result<(), PortalError>;
}

/// The host machine's own network stack: always up, nothing to reset.
#[derive(Debug, Default)]
pub struct HostInterface;

impl NetworkInterface for HostInterface {
    fn firmware_version(&mut self) -> Result<String, PortalError> {
        Ok(format!("host-{}", env!("CARGO_PKG_VERSION")))
    }

    fn reset(&mut self) {}

    fn is_connected(&mut self) -> bool {
        true
    }

    fn connect(&mut self, _credentials: &Credentials) -> Result<(), PortalError> {
        Ok(())
    }
}
