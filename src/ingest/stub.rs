//! Synthetic frame source for tests and dry runs.

use anyhow::Result;

use super::{FrameSource, SourceStats};
use crate::config::CameraSettings;
use crate::frame::Frame;

/// Synthetic source producing a slowly shifting pixel pattern, or a flat
/// color when built with [`StubSource::flat`].
pub struct StubSource {
    locator: String,
    width: u32,
    height: u32,
    fill: Option<[u8; 3]>,
    frame_count: u64,
    scene_state: u8,
}

impl StubSource {
    pub fn new(locator: &str, camera: &CameraSettings) -> Self {
        Self {
            locator: locator.to_string(),
            width: camera.width,
            height: camera.height,
            fill: None,
            frame_count: 0,
            scene_state: 0,
        }
    }

    /// A source that emits the same flat-color frame forever. Handy when a
    /// test needs deterministic classifier input.
    pub fn flat(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self {
            locator: "stub://flat".to_string(),
            width,
            height,
            fill: Some(color),
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn generate_pattern(&mut self) -> Frame {
        // Shift the pattern now and then so downstream consumers see
        // something other than a static image.
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut frame = Frame::filled(self.width, self.height, [0, 0, 0]);
        for (i, byte) in frame.pixels_mut().iter_mut().enumerate() {
            *byte = ((i as u64 + self.frame_count + u64::from(self.scene_state)) % 256) as u8;
        }
        frame
    }
}

impl FrameSource for StubSource {
    fn connect(&mut self) -> Result<()> {
        log::info!("StubSource: connected to {} (synthetic)", self.locator);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        match self.fill {
            Some(color) => Ok(Frame::filled(self.width, self.height, color)),
            None => Ok(self.generate_pattern()),
        }
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.locator.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraSettings;

    #[test]
    fn pattern_frames_vary_between_captures() -> Result<()> {
        let camera = CameraSettings {
            target_fps: 30,
            width: 64,
            height: 48,
        };
        let mut source = StubSource::new("stub://camera", &camera);
        source.connect()?;
        let first = source.next_frame()?;
        let second = source.next_frame()?;
        assert_ne!(first.pixels(), second.pixels());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn flat_source_emits_constant_color() -> Result<()> {
        let mut source = StubSource::flat(32, 32, [255, 220, 0]);
        source.connect()?;
        let frame = source.next_frame()?;
        assert_eq!(frame.pixel(0, 0), [255, 220, 0]);
        assert_eq!(frame.pixel(31, 31), [255, 220, 0]);
        Ok(())
    }
}
