//! # Network Layer
//!
//! Everything between the board and the remote data source.
//!
//! ## Modules
//!
//! - [`interface`]: the WiFi co-processor seam and credentials
//! - [`connectivity`]: co-processor bring-up and connect-until-online
//! - [`fetcher`]: HTTP GET with bounded-memory streaming to storage

pub mod connectivity;
pub mod fetcher;
pub mod interface;

pub use connectivity::ConnectivityManager;
pub use fetcher::{HttpTransport, ReqwestTransport, Response, StreamingFetcher};
pub use interface::{Credentials, HostInterface, NetworkInterface};
