//! Frame and region primitives.
//!
//! A `Frame` is one RGB raster owned transiently by the caller for the
//! duration of a classification call; the pipeline never retains it.
//! A `Region` is an axis-aligned rectangle inside a frame. Regions produced
//! by detection may reach outside the frame (boxes decoded from network
//! output regularly do); `Region::clamped` clips them to the raster and
//! discards anything that ends up with zero area.

use anyhow::{anyhow, Context, Result};
use image::{imageops, Rgb, RgbImage};
use std::path::Path;

/// One RGB video frame.
#[derive(Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Frame filled with a single color. Mostly useful for tests and stubs.
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, Rgb(color)),
        }
    }

    /// Build a frame from raw interleaved RGB bytes.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("raster construction failed for {}x{}", width, height))?;
        Ok(Self { image })
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw interleaved RGB bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.image.get_pixel(x, y).0
    }

    /// Single-channel intensity copy (ITU-R BT.601 luma), row-major.
    pub fn to_gray(&self) -> Vec<u8> {
        self.image
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                (0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)).round() as u8
            })
            .collect()
    }

    /// Bilinear resize to a new raster.
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        Frame {
            image: imageops::resize(&self.image, width, height, imageops::FilterType::Triangle),
        }
    }

    pub fn save_jpeg<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.image
            .save(path)
            .with_context(|| format!("write jpeg {}", path.display()))
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Axis-aligned rectangle in frame coordinates.
///
/// Coordinates are signed because decoded detection boxes can extend past the
/// frame edges before clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn area(&self) -> i64 {
        if self.w <= 0 || self.h <= 0 {
            return 0;
        }
        i64::from(self.w) * i64::from(self.h)
    }

    /// Clip to `[0, width) x [0, height)`. Returns `None` when nothing of the
    /// region remains, so zero-area regions never reach color analysis.
    pub fn clamped(&self, width: u32, height: u32) -> Option<Region> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(width as i32);
        let y1 = self.bottom().min(height as i32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Region {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        })
    }

    /// Overlap with another region, if any.
    pub fn intersection(&self, other: &Region) -> Option<Region> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Region {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        })
    }
}
