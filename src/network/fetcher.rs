//! # Streaming Fetcher
//!
//! Blocking HTTP GET with two ways to consume the body:
//!
//! - **In memory** via [`Response::text`], capped by a byte budget. Used for
//!   the data document.
//! - **Streamed to storage** via [`StreamingFetcher::get_streamed`], which
//!   never holds more than one [`CHUNK_SIZE`] buffer regardless of payload
//!   size. Used for background bitmaps.
//!
//! ## Local Override
//!
//! A well-known file on local storage short-circuits the network: when it
//! exists, [`StreamingFetcher::local_override`] hands back a [`Response`]
//! built from its contents, indistinguishable from a network reply.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use reqwest::header::CONTENT_LENGTH;

use crate::error::PortalError;
use crate::status::{self, StatusLight};

/// Largest single read from a streamed body (bytes).
pub const CHUNK_SIZE: usize = 12_000;

/// A received HTTP reply whose body has not been consumed yet.
///
/// Dropping the response releases the underlying connection.
pub struct Response {
    status: u16,
    content_length: Option<u64>,
    body: Box<dyn Read>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl Response {
    pub fn new(status: u16, content_length: Option<u64>, body: impl Read + 'static) -> Self {
        Self {
            status,
            content_length,
            body: Box::new(body),
        }
    }

    /// A complete `200 OK` reply around an in-memory body.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self::new(200, Some(len), io::Cursor::new(bytes))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Declared body length from the `content-length` header.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Read at most `buf.len()` body bytes.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.body.read(buf)
    }

    /// Read the whole body into memory, refusing bodies over `limit` bytes.
    ///
    /// ## Errors
    ///
    /// - [`PortalError::OutOfMemory`] if the declared or actual length exceeds
    ///   `limit`, or the buffer cannot be allocated.
    /// - [`PortalError::Fetch`] if the body stream fails mid-read.
    pub fn bytes(mut self, limit: usize) -> Result<Vec<u8>, PortalError> {
        let declared = self.content_length.unwrap_or(0);
        if declared > limit as u64 {
            return Err(PortalError::OutOfMemory(format!(
                "body of {} bytes exceeds the {} byte budget",
                declared, limit
            )));
        }

        let mut buf = Vec::new();
        buf.try_reserve_exact(declared as usize)
            .map_err(|e| PortalError::OutOfMemory(format!("body buffer: {}", e)))?;

        (&mut self.body)
            .take(limit as u64 + 1)
            .read_to_end(&mut buf)
            .map_err(|e| PortalError::Fetch(format!("Failed to read body: {}", e)))?;

        if buf.len() > limit {
            return Err(PortalError::OutOfMemory(format!(
                "body exceeds the {} byte budget",
                limit
            )));
        }
        Ok(buf)
    }

    /// Read the whole body as UTF-8 text. See [`Response::bytes`].
    pub fn text(self, limit: usize) -> Result<String, PortalError> {
        let bytes = self.bytes(limit)?;
        String::from_utf8(bytes)
            .map_err(|e| PortalError::Parse(format!("Body is not valid UTF-8: {}", e)))
    }
}

/// Something that can perform a blocking HTTP GET.
pub trait HttpTransport {
    /// Send the request and return once headers have arrived.
    /// Non-success statuses are errors.
    fn get(&mut self, url: &str) -> Result<Response, PortalError>;
}

/// [`HttpTransport`] backed by reqwest's blocking client.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, PortalError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("portalframe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PortalError::Fetch(format!("HTTP client error: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&mut self, url: &str) -> Result<Response, PortalError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| PortalError::Fetch(format!("Failed to download {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(PortalError::Fetch(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        Ok(Response::new(
            response.status().as_u16(),
            content_length,
            response,
        ))
    }
}

/// HTTP fetcher with a local-file override and bounded streaming.
pub struct StreamingFetcher {
    transport: Box<dyn HttpTransport>,
    local_override: Option<PathBuf>,
    chunk_size: usize,
}

impl StreamingFetcher {
    pub fn new(transport: Box<dyn HttpTransport>, local_override: Option<PathBuf>) -> Self {
        Self {
            transport,
            local_override,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Use a smaller chunk size (clamped to at least one byte).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Response synthesized from the local override file, if it exists.
    pub fn local_override(&self) -> Result<Option<Response>, PortalError> {
        let Some(path) = self.local_override.as_deref() else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }
        info!("Using local data from {}", path.display());
        let bytes = fs::read(path)?;
        Ok(Some(Response::from_bytes(bytes)))
    }

    /// Plain GET; the caller decides how to consume the body.
    pub fn get(&mut self, url: &str) -> Result<Response, PortalError> {
        let response = self.transport.get(url)?;
        debug!(
            "GET {} -> {} ({:?} bytes)",
            url,
            response.status(),
            response.content_length()
        );
        Ok(response)
    }

    /// GET `url` and write the body to `destination` one chunk at a time.
    ///
    /// The destination is truncated first. Each chunk read is at most
    /// `min(remaining, chunk_size)` bytes and lights the status cyan. On any
    /// failure the partially written file is removed.
    ///
    /// Returns the number of bytes written.
    ///
    /// ## Errors
    ///
    /// [`PortalError::Fetch`] if the request fails, `content-length` is missing
    /// or invalid, or the body ends early.
    pub fn get_streamed(
        &mut self,
        url: &str,
        destination: &Path,
        status: &mut StatusLight,
    ) -> Result<u64, PortalError> {
        status.set(status::FETCHING);
        let mut response = self.get(url)?;
        let total = response.content_length().ok_or_else(|| {
            PortalError::Fetch(format!("No valid content-length in reply from {}", url))
        })?;

        let result = self.stream_body(&mut response, total, destination, status);
        drop(response);

        if result.is_err() && destination.exists() {
            if let Err(e) = fs::remove_file(destination) {
                warn!("Could not remove partial {}: {}", destination.display(), e);
            }
        }
        result.map(|_| total)
    }

    fn stream_body(
        &self,
        response: &mut Response,
        total: u64,
        destination: &Path,
        status: &mut StatusLight,
    ) -> Result<(), PortalError> {
        info!("Saving {} bytes to {}", total, destination.display());
        let mut file = BufWriter::new(File::create(destination)?);
        let mut buf = vec![0u8; (total.min(self.chunk_size as u64)) as usize];
        let mut remaining = total;

        while remaining > 0 {
            let want = remaining.min(self.chunk_size as u64) as usize;
            let got = response
                .read_chunk(&mut buf[..want])
                .map_err(|e| PortalError::Fetch(format!("Body stream failed: {}", e)))?;
            if got == 0 {
                return Err(PortalError::Fetch(format!(
                    "Body ended with {} of {} bytes outstanding",
                    remaining, total
                )));
            }
            file.write_all(&buf[..got])?;
            remaining -= got as u64;
            status.set(status::STREAMING);
            debug!("Read {} bytes, {} remaining", got, remaining);
        }

        file.flush()?;
        Ok(())
    }
}
