//! Heuristic classification backend: face detection plus color bands.
//!
//! Fallback path when no network detector is available. Faces are located on
//! the intensity image, a zone above each face is tested against the helmet
//! color bands, and the verdict is the OR across all faces. Each face gets a
//! rectangle colored by its own result.

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::config::DetectSettings;
use crate::detect::backend::ClassifyBackend;
use crate::detect::{color, helmet_zone_above_face};
use crate::frame::{Frame, Region};
use crate::overlay::{Overlay, GREEN, RED};

// Tuning for the SeetaFace cascade, the counterpart of the classic
// scale-factor 1.1 / min-neighbors 4 frontal-face settings.
const MIN_FACE_SIZE: u32 = 40;
const SCORE_THRESH: f64 = 2.0;
const PYRAMID_SCALE_FACTOR: f32 = 0.8;
const SLIDE_WINDOW_STEP: u32 = 4;

/// Face locator seam.
///
/// The production implementation wraps the SeetaFace cascade; tests inject
/// scripted finders so the color path can be exercised without a model file.
pub trait FaceFinder {
    /// Candidate face regions on a single-channel intensity image.
    fn find_faces(&mut self, gray: &[u8], width: u32, height: u32) -> Vec<Region>;
}

/// SeetaFace frontal-face cascade.
pub struct SeetaFaceFinder {
    detector: Box<dyn rustface::Detector>,
}

impl SeetaFaceFinder {
    pub fn from_model(path: &Path) -> Result<Self> {
        let path = path
            .to_str()
            .ok_or_else(|| anyhow!("face model path is not valid UTF-8"))?;
        let mut detector = rustface::create_detector(path)
            .map_err(|e| anyhow!("load face model {}: {}", path, e))?;
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(SCORE_THRESH);
        detector.set_pyramid_scale_factor(PYRAMID_SCALE_FACTOR);
        detector.set_slide_window_step(SLIDE_WINDOW_STEP, SLIDE_WINDOW_STEP);
        Ok(Self { detector })
    }
}

impl FaceFinder for SeetaFaceFinder {
    fn find_faces(&mut self, gray: &[u8], width: u32, height: u32) -> Vec<Region> {
        let mut image = rustface::ImageData::new(gray, width, height);
        self.detector
            .detect(&mut image)
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                Region::new(
                    bbox.x(),
                    bbox.y(),
                    bbox.width() as i32,
                    bbox.height() as i32,
                )
            })
            .collect()
    }
}

/// Heuristic backend.
///
/// Without a face finder (face model missing or unloadable) it still runs,
/// reporting no detections and leaving frames untouched.
pub struct HeuristicBackend {
    finder: Option<Box<dyn FaceFinder>>,
    min_coverage: f64,
    overlay: Overlay,
}

impl HeuristicBackend {
    pub fn new(
        finder: Option<Box<dyn FaceFinder>>,
        settings: &DetectSettings,
        overlay: Overlay,
    ) -> Self {
        Self {
            finder,
            min_coverage: settings.face_coverage,
            overlay,
        }
    }
}

impl ClassifyBackend for HeuristicBackend {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn classify(&mut self, frame: &mut Frame) -> Result<bool> {
        let Some(finder) = self.finder.as_mut() else {
            return Ok(false);
        };

        let gray = frame.to_gray();
        let faces = finder.find_faces(&gray, frame.width(), frame.height());

        let mut any_helmet = false;
        for face in faces {
            // Color analysis first; the rectangle drawn below must not feed
            // back into it.
            let helmet = helmet_zone_above_face(face)
                .clamped(frame.width(), frame.height())
                .map(|zone| color::region_has_helmet_color(frame, zone, self.min_coverage))
                .unwrap_or(false);

            let rect_color = if helmet { GREEN } else { RED };
            self.overlay.rect(frame, face, rect_color);
            any_helmet = any_helmet || helmet;
        }
        Ok(any_helmet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedFinder {
        faces: Vec<Region>,
    }

    impl FaceFinder for ScriptedFinder {
        fn find_faces(&mut self, _gray: &[u8], _width: u32, _height: u32) -> Vec<Region> {
            self.faces.clone()
        }
    }

    fn settings() -> DetectSettings {
        DetectSettings {
            confidence_threshold: 0.5,
            nms_threshold: 0.4,
            input_size: 416,
            face_coverage: 0.30,
            person_coverage: 0.25,
        }
    }

    fn backend_with_faces(faces: Vec<Region>) -> HeuristicBackend {
        HeuristicBackend::new(
            Some(Box::new(ScriptedFinder { faces })),
            &settings(),
            Overlay::new(),
        )
    }

    #[test]
    fn no_faces_leaves_frame_untouched_and_verdict_false() -> Result<()> {
        let mut frame = Frame::filled(64, 64, [30, 30, 30]);
        let before = frame.pixels().to_vec();
        let mut backend = backend_with_faces(vec![]);
        assert!(!backend.classify(&mut frame)?);
        assert_eq!(frame.pixels(), &before[..]);
        Ok(())
    }

    #[test]
    fn missing_finder_reports_no_helmet() -> Result<()> {
        let mut frame = Frame::filled(64, 64, [30, 30, 30]);
        let before = frame.pixels().to_vec();
        let mut backend = HeuristicBackend::new(None, &settings(), Overlay::new());
        assert!(!backend.classify(&mut frame)?);
        assert_eq!(frame.pixels(), &before[..]);
        Ok(())
    }

    #[test]
    fn yellow_zone_above_face_yields_helmet_and_green_rect() -> Result<()> {
        // Gray frame with a solid helmet-yellow block filling the zone above
        // the scripted face at (100, 200, 80, 80): rows 150..220, cols 100..180.
        let mut frame = Frame::filled(640, 480, [60, 60, 60]);
        for y in 150..220 {
            for x in 100..180 {
                frame.image_mut().get_pixel_mut(x, y).0 = [255, 220, 0];
            }
        }

        let face = Region::new(100, 200, 80, 80);
        let mut backend = backend_with_faces(vec![face]);
        assert!(backend.classify(&mut frame)?);

        // Green rectangle at the face corner.
        assert_eq!(frame.pixel(100, 200), [0, 255, 0]);
        Ok(())
    }

    #[test]
    fn gray_zone_yields_no_helmet_and_red_rect() -> Result<()> {
        let mut frame = Frame::filled(640, 480, [60, 60, 60]);
        let face = Region::new(100, 200, 80, 80);
        let mut backend = backend_with_faces(vec![face]);
        assert!(!backend.classify(&mut frame)?);
        assert_eq!(frame.pixel(100, 200), [255, 0, 0]);
        Ok(())
    }

    #[test]
    fn verdict_is_or_across_faces() -> Result<()> {
        // Helmet over the second face only; first face stays bare. The
        // verdict must still be true.
        let mut frame = Frame::filled(640, 480, [60, 60, 60]);
        for y in 150..220 {
            for x in 400..480 {
                frame.image_mut().get_pixel_mut(x, y).0 = [255, 220, 0];
            }
        }

        let bare = Region::new(100, 200, 80, 80);
        let helmeted = Region::new(400, 200, 80, 80);
        let mut backend = backend_with_faces(vec![bare, helmeted]);
        assert!(backend.classify(&mut frame)?);

        assert_eq!(frame.pixel(100, 200), [255, 0, 0]);
        assert_eq!(frame.pixel(400, 200), [0, 255, 0]);
        Ok(())
    }
}
