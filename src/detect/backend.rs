use anyhow::Result;

use crate::frame::Frame;

/// Classification backend trait.
///
/// One implementation per detection strategy: the network-based detector and
/// the face-plus-color heuristic. `classify` annotates the frame in place
/// (rectangles, optional labels) and returns the helmet verdict for that
/// frame. Every call is independent; backends must not track identity across
/// frames.
pub trait ClassifyBackend {
    /// Backend identifier, used for logs.
    fn name(&self) -> &'static str;

    /// Annotate `frame` and return true when any detected person appears to
    /// wear a helmet.
    fn classify(&mut self, frame: &mut Frame) -> Result<bool>;
}

/// Decision pipeline wrapper around the selected backend.
///
/// Enforces the failure contract: a backend error yields the original
/// unmodified frame and a false verdict, never a propagated error. The worker
/// loop survives every per-frame failure.
pub struct Classifier {
    backend: Box<dyn ClassifyBackend>,
}

impl Classifier {
    pub fn new(backend: Box<dyn ClassifyBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Classify one frame, producing the annotated frame and the verdict.
    pub fn process(&mut self, frame: &Frame) -> (Frame, bool) {
        let mut annotated = frame.clone();
        match self.backend.classify(&mut annotated) {
            Ok(helmet_present) => (annotated, helmet_present),
            Err(err) => {
                log::warn!(
                    "{} backend failed on frame, treating as no-helmet: {:#}",
                    self.backend.name(),
                    err
                );
                (frame.clone(), false)
            }
        }
    }
}
