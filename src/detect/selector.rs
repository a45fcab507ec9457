//! Backend selection.
//!
//! Runs once at session start: prefer the network detector when its model
//! artifact is present and loadable, otherwise degrade to the heuristic
//! backend. Degradation is reported but never fatal; even a heuristic
//! backend without a face model runs (and reports no detections).

use crate::config::WatchConfig;
use crate::detect::backend::ClassifyBackend;
use crate::detect::backends::{FaceFinder, HeuristicBackend, SeetaFaceFinder};
use crate::models::ModelStore;
use crate::overlay::Overlay;

#[cfg(feature = "backend-network")]
use crate::detect::backends::NetworkBackend;

pub fn select_backend(cfg: &WatchConfig, store: &ModelStore) -> Box<dyn ClassifyBackend> {
    #[cfg(feature = "backend-network")]
    {
        let model_path = store.detector_model_path();
        if model_path.exists() {
            let labels = store.load_labels();
            let overlay = Overlay::with_font(cfg.font_path.as_deref());
            match NetworkBackend::load(&model_path, labels, &cfg.detect, overlay) {
                Ok(backend) => return Box::new(backend),
                Err(err) => {
                    log::warn!(
                        "network backend unavailable, falling back to heuristic: {:#}",
                        err
                    );
                }
            }
        } else {
            log::warn!(
                "detector model {} missing, falling back to heuristic backend",
                model_path.display()
            );
        }
    }

    let face_model = store.face_model_path();
    let finder: Option<Box<dyn FaceFinder>> = match SeetaFaceFinder::from_model(&face_model) {
        Ok(finder) => Some(Box::new(finder)),
        Err(err) => {
            log::warn!(
                "face model unavailable, heuristic backend will report no detections: {:#}",
                err
            );
            None
        }
    };
    log::info!("using heuristic detection backend");
    Box::new(HeuristicBackend::new(
        finder,
        &cfg.detect,
        Overlay::with_font(cfg.font_path.as_deref()),
    ))
}
