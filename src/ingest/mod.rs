//! Frame ingestion sources.
//!
//! This module provides the sources a watch session can pull frames from:
//! - HTTP MJPEG/JPEG streams, e.g. ESP32-class IP cameras (feature: ingest-http)
//! - Local V4L2 devices (feature: ingest-v4l2)
//! - Stub source (testing, `stub://` locators)
//!
//! All sources produce RGB `Frame`s at the configured target rate. Sources
//! never write frames anywhere; persistence is the session's job.

use anyhow::{anyhow, Result};

use crate::config::CameraSettings;
use crate::frame::Frame;

#[cfg(feature = "ingest-http")]
pub mod http;
pub mod stub;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

#[cfg(feature = "ingest-http")]
pub use http::HttpSource;
pub use stub::StubSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

/// A connected camera or camera stand-in.
///
/// `Send` so a session can own its source on the worker thread.
pub trait FrameSource: Send {
    /// Establish the connection. Must be called before `next_frame`.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame, blocking until one is available.
    fn next_frame(&mut self) -> Result<Frame>;

    /// Whether the source has produced a frame recently enough.
    fn is_healthy(&self) -> bool;

    /// Capture statistics.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Build a source from its locator.
///
/// `stub://…` yields a synthetic source, `http(s)://…` an MJPEG/JPEG
/// stream, and anything without a scheme is treated as a local V4L2
/// device path.
pub fn open_source(source: &str, camera: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    let source = source.trim();
    if source.is_empty() {
        return Err(anyhow!("frame source locator is empty"));
    }
    if source.starts_with("stub://") {
        return Ok(Box::new(StubSource::new(source, camera)));
    }
    if source.starts_with("http://") || source.starts_with("https://") {
        #[cfg(feature = "ingest-http")]
        {
            return Ok(Box::new(HttpSource::new(source, camera)));
        }
        #[cfg(not(feature = "ingest-http"))]
        {
            return Err(anyhow!(
                "http sources require the ingest-http feature (source: {})",
                source
            ));
        }
    }
    if source.contains("://") {
        return Err(anyhow!(
            "unsupported source scheme in '{}'; expected stub://, http(s)://, or a device path",
            source
        ));
    }

    #[cfg(feature = "ingest-v4l2")]
    {
        Ok(Box::new(V4l2Source::new(source, camera)))
    }
    #[cfg(not(feature = "ingest-v4l2"))]
    {
        Err(anyhow!(
            "device sources require the ingest-v4l2 feature (source: {})",
            source
        ))
    }
}
