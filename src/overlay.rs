//! Rectangle and label drawing on annotated frames.
//!
//! Label text is best-effort: it renders only when a font file was configured
//! and loadable. Drawing must never fail a classification call, so every
//! operation here is infallible and clips to the raster.

use ab_glyph::{FontVec, PxScale};
use image::Rgb;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

use crate::frame::{Frame, Region};

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);

const LABEL_SCALE: f32 = 16.0;

pub struct Overlay {
    font: Option<FontVec>,
}

impl Overlay {
    /// Overlay without label text.
    pub fn new() -> Self {
        Self { font: None }
    }

    /// Overlay that draws labels with the TrueType font at `path`.
    ///
    /// A missing or malformed font downgrades to rectangles only.
    pub fn with_font(path: Option<&Path>) -> Self {
        let font = path.and_then(|path| match load_font(path) {
            Ok(font) => Some(font),
            Err(err) => {
                log::warn!("overlay font {} unusable: {:#}", path.display(), err);
                None
            }
        });
        Self { font }
    }

    /// Two-pixel hollow rectangle around `region`.
    pub fn rect(&self, frame: &mut Frame, region: Region, color: Rgb<u8>) {
        for inset in 0..2 {
            let w = region.w - 2 * inset;
            let h = region.h - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(region.x + inset, region.y + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(frame.image_mut(), rect, color);
        }
    }

    /// Label text just above `region`, when a font is available.
    pub fn label(&self, frame: &mut Frame, region: Region, text: &str, color: Rgb<u8>) {
        let Some(font) = &self.font else {
            return;
        };
        let y = region.y - 10 - LABEL_SCALE as i32;
        draw_text_mut(
            frame.image_mut(),
            color,
            region.x,
            y.max(0),
            PxScale::from(LABEL_SCALE),
            font,
            text,
        );
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

fn load_font(path: &Path) -> anyhow::Result<FontVec> {
    let bytes = std::fs::read(path)?;
    Ok(FontVec::try_from_vec(bytes)?)
}
