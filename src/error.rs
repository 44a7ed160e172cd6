//! # Error Types
//!
//! This module defines error types used throughout the portalframe library.

use thiserror::Error;

/// Main error type for portalframe operations
#[derive(Debug, Error)]
pub enum PortalError {
    /// Network co-processor unreachable or refused to connect
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// HTTP request or body stream failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Malformed JSON/XML body
    #[error("Parse error: {0}")]
    Parse(String),

    /// A data path did not match the document
    #[error("Extraction error at {path}: {reason}")]
    Extraction { path: String, reason: String },

    /// Body or document too large for the memory budget
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// Invalid argument rejected before any work
    #[error("Validation error: {0}")]
    Validation(String),

    /// Background image conversion/download failed
    #[error("Image fetch error: {0}")]
    ImageFetch(String),

    /// Display surface or scene failure
    #[error("Display error: {0}")]
    Display(String),

    /// Invalid or unreadable configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Optional hardware is not fitted on this board
    #[error("Missing capability: {0}")]
    Capability(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PortalError {
    /// True when the device must be brought up again from scratch.
    ///
    /// Only memory exhaustion qualifies; every other fetch failure leaves the
    /// previous frame on screen and the caller retries on its next poll.
    pub fn requires_restart(&self) -> bool {
        matches!(self, PortalError::OutOfMemory(_))
    }
}
