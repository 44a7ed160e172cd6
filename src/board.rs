//! # Board
//!
//! Owned handles to every piece of hardware the portal drives. The network
//! interface, HTTP transport and display are always present; the status
//! light, backlight, speaker and touchscreen are optional and checked
//! explicitly where they are used.

use std::path::{Path, PathBuf};

use log::debug;

use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::network::{HostInterface, HttpTransport, NetworkInterface, ReqwestTransport};
use crate::scene::{Point, RasterSurface, Surface};
use crate::status::{LogIndicator, StatusIndicator};

/// PWM-driven display backlight.
pub trait Backlight {
    /// 16-bit duty cycle, `0` is off and `u16::MAX` fully on.
    fn set_duty(&mut self, duty: u16);
}

/// Audio output for short clips.
pub trait Speaker {
    /// Start playing `path`. Returns immediately.
    fn play(&mut self, path: &Path) -> Result<(), PortalError>;

    fn is_playing(&mut self) -> bool;
}

pub trait Touchscreen {
    /// Current touch point, `None` when nothing is touching the panel.
    fn touch_point(&mut self) -> Option<Point>;
}

/// Host stand-in for a backlight: remembers and logs the duty cycle.
#[derive(Debug, Default)]
pub struct LogBacklight {
    duty: u16,
}

impl LogBacklight {
    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl Backlight for LogBacklight {
    fn set_duty(&mut self, duty: u16) {
        debug!("backlight duty {}", duty);
        self.duty = duty;
    }
}

pub struct Board {
    pub interface: Box<dyn NetworkInterface>,
    pub transport: Box<dyn HttpTransport>,
    pub surface: Box<dyn Surface>,
    pub status: Option<Box<dyn StatusIndicator>>,
    pub backlight: Option<Box<dyn Backlight>>,
    pub speaker: Option<Box<dyn Speaker>>,
    pub touchscreen: Option<Box<dyn Touchscreen>>,
}

impl Board {
    /// Board with only the mandatory handles.
    pub fn new(
        interface: Box<dyn NetworkInterface>,
        transport: Box<dyn HttpTransport>,
        surface: Box<dyn Surface>,
    ) -> Self {
        Self {
            interface,
            transport,
            surface,
            status: None,
            backlight: None,
            speaker: None,
            touchscreen: None,
        }
    }

    pub fn with_status(mut self, status: Box<dyn StatusIndicator>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_backlight(mut self, backlight: Box<dyn Backlight>) -> Self {
        self.backlight = Some(backlight);
        self
    }

    pub fn with_speaker(mut self, speaker: Box<dyn Speaker>) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn with_touchscreen(mut self, touchscreen: Box<dyn Touchscreen>) -> Self {
        self.touchscreen = Some(touchscreen);
        self
    }

    /// Desktop board: host network stack, reqwest, an in-memory framebuffer
    /// optionally mirrored to `snapshot` as PNG, and log-backed status light
    /// and backlight.
    pub fn host(config: &PortalConfig, snapshot: Option<PathBuf>) -> Result<Self, PortalError> {
        let mut surface = RasterSurface::new(config.display.width, config.display.height);
        if let Some(path) = snapshot {
            surface = surface.with_mirror(path);
        }

        let mut board = Self::new(
            Box::new(HostInterface),
            Box::new(ReqwestTransport::new()?),
            Box::new(surface),
        )
        .with_backlight(Box::new(LogBacklight::default()));
        if config.status_indicator {
            board = board.with_status(Box::new(LogIndicator::default()));
        }
        Ok(board)
    }
}
