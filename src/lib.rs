//! # PortalFrame - Internet Display Library
//!
//! PortalFrame drives a small internet-connected display: it brings up a
//! network co-processor, periodically fetches a JSON/XML/text document,
//! pulls values out of it with declarative paths, and renders them onto a
//! layered scene together with an optional background image and QR code.
//!
//! - **Bounded memory**: documents are read under a byte budget, images are
//!   streamed to storage in fixed-size chunks
//! - **Incremental rendering**: text slots are re-texted without disturbing
//!   the stacking order of the rest of the scene
//! - **Explicit hardware**: every device is an owned handle on a [`Board`];
//!   optional ones (status light, backlight, speaker, touch) may be absent
//!
//! ## Quick Start
//!
//! ```no_run
//! use portalframe::{Board, Credentials, Portal, PortalConfig};
//!
//! let config = PortalConfig::load("portal.json")?;
//! let credentials = Credentials::load("secrets.json")?;
//! let board = Board::host(&config, None)?;
//!
//! let mut portal = Portal::new(board, &config, credentials)?;
//! portal.on_success(|result| {
//!     println!("got {:?}", result);
//!     Ok(())
//! });
//! portal.fetch()?;
//!
//! # Ok::<(), portalframe::PortalError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`portal`] | Fetch/render orchestrator |
//! | [`network`] | Connectivity and streaming HTTP |
//! | [`extract`] | Document parsing and path lookup |
//! | [`scene`] | Scene graph, fonts and surfaces |
//! | [`qr`] | QR code rasterization |
//! | [`image_pipeline`] | Remote background images |
//! | [`config`] | JSON configuration |
//! | [`board`] | Hardware handles |
//! | [`error`] | Error types |

pub mod board;
pub mod color;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod image_pipeline;
pub mod network;
pub mod portal;
pub mod qr;
pub mod scene;
pub mod status;

// Re-exports for convenience
pub use board::Board;
pub use color::Color;
pub use config::PortalConfig;
pub use error::PortalError;
pub use network::Credentials;
pub use portal::{FetchResult, FetchStage, Portal};
