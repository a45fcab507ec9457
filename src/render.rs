//! Annotated-frame rendering.
//!
//! The session hands every annotated frame to a `Renderer`. The production
//! renderer maintains a small preview JPEG on disk that a dashboard or
//! `watch`-style viewer can poll; tests and headless deployments use
//! `NullRenderer`.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use crate::frame::Frame;

const PREVIEW_WIDTH: u32 = 400;
const PREVIEW_HEIGHT: u32 = 300;
const PREVIEW_JPEG_QUALITY: u8 = 85;

/// Current watch verdict, as shown to operators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WatchStatus {
    /// No classified frame yet.
    #[default]
    Idle,
    HelmetDetected,
    NoHelmet,
}

impl fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchStatus::Idle => write!(f, "idle"),
            WatchStatus::HelmetDetected => write!(f, "helmet-detected"),
            WatchStatus::NoHelmet => write!(f, "no-helmet"),
        }
    }
}

/// Sink for annotated frames.
pub trait Renderer: Send {
    fn render(&mut self, frame: &Frame) -> Result<()>;

    /// Called on verdict transitions only, never per frame.
    fn set_status(&mut self, status: WatchStatus);
}

/// Renderer that keeps a downscaled preview JPEG on disk.
pub struct PreviewRenderer {
    path: PathBuf,
    status: WatchStatus,
}

impl PreviewRenderer {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            status: WatchStatus::Idle,
        }
    }

    pub fn status(&self) -> WatchStatus {
        self.status
    }
}

impl Renderer for PreviewRenderer {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        let preview = frame.resized(PREVIEW_WIDTH, PREVIEW_HEIGHT);

        // Write next to the target and rename so readers never observe a
        // half-written JPEG.
        let partial = self.path.with_extension("jpg.part");
        {
            let file = File::create(&partial)
                .with_context(|| format!("create preview file {}", partial.display()))?;
            let mut encoder =
                JpegEncoder::new_with_quality(BufWriter::new(file), PREVIEW_JPEG_QUALITY);
            encoder
                .encode_image(preview.image())
                .context("encode preview jpeg")?;
        }
        std::fs::rename(&partial, &self.path)
            .with_context(|| format!("publish preview {}", self.path.display()))?;
        Ok(())
    }

    fn set_status(&mut self, status: WatchStatus) {
        self.status = status;
        log::info!("status: {}", status);
    }
}

/// Renderer that drops every frame. Used headless and in tests.
#[derive(Default)]
pub struct NullRenderer {
    frames: u64,
    status: WatchStatus,
}

impl NullRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn status(&self) -> WatchStatus {
        self.status
    }
}

impl Renderer for NullRenderer {
    fn render(&mut self, _frame: &Frame) -> Result<()> {
        self.frames += 1;
        Ok(())
    }

    fn set_status(&mut self, status: WatchStatus) {
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn preview_renderer_writes_downscaled_jpeg() -> Result<()> {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("preview.jpg");
        let mut renderer = PreviewRenderer::new(path.clone());

        let frame = Frame::filled(640, 480, [10, 120, 200]);
        renderer.render(&frame)?;

        let written = image::open(&path).expect("readable preview").into_rgb8();
        assert_eq!(written.width(), 400);
        assert_eq!(written.height(), 300);
        assert!(!path.with_extension("jpg.part").exists());
        Ok(())
    }

    #[test]
    fn preview_render_overwrites_previous_frame() -> Result<()> {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("preview.jpg");
        let mut renderer = PreviewRenderer::new(path.clone());

        renderer.render(&Frame::filled(640, 480, [255, 0, 0]))?;
        renderer.render(&Frame::filled(640, 480, [0, 0, 255]))?;

        let written = image::open(&path).expect("readable preview").into_rgb8();
        let pixel = written.get_pixel(200, 150).0;
        assert!(pixel[2] > pixel[0]);
        Ok(())
    }

    #[test]
    fn null_renderer_counts_frames_and_tracks_status() -> Result<()> {
        let mut renderer = NullRenderer::new();
        renderer.render(&Frame::filled(8, 8, [0, 0, 0]))?;
        renderer.render(&Frame::filled(8, 8, [0, 0, 0]))?;
        renderer.set_status(WatchStatus::HelmetDetected);
        assert_eq!(renderer.frames_rendered(), 2);
        assert_eq!(renderer.status(), WatchStatus::HelmetDetected);
        Ok(())
    }

    #[test]
    fn status_display_names() {
        assert_eq!(WatchStatus::Idle.to_string(), "idle");
        assert_eq!(WatchStatus::HelmetDetected.to_string(), "helmet-detected");
        assert_eq!(WatchStatus::NoHelmet.to_string(), "no-helmet");
    }
}
