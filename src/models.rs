//! Model artifact store.
//!
//! Local directory holding the detector model, the class label list and the
//! face-detection model. Missing artifacts are fetched from their configured
//! URLs at session start, best-effort: a failed download is logged and the
//! backend selector simply works with whatever is on disk.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use crate::config::ModelSettings;

pub const DETECTOR_MODEL_FILE: &str = "detector.onnx";
pub const LABELS_FILE: &str = "labels.txt";
pub const FACE_MODEL_FILE: &str = "seeta_fd_frontal_v1.0.bin";

/// Labels assumed when no label file is available.
const FALLBACK_LABELS: [&str; 2] = ["person", "helmet"];

pub struct ModelStore {
    dir: PathBuf,
    detector_url: String,
    labels_url: String,
    face_model_url: String,
}

impl ModelStore {
    pub fn new(settings: &ModelSettings) -> Self {
        Self {
            dir: settings.dir.clone(),
            detector_url: settings.detector_url.clone(),
            labels_url: settings.labels_url.clone(),
            face_model_url: settings.face_model_url.clone(),
        }
    }

    pub fn detector_model_path(&self) -> PathBuf {
        self.dir.join(DETECTOR_MODEL_FILE)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.dir.join(LABELS_FILE)
    }

    pub fn face_model_path(&self) -> PathBuf {
        self.dir.join(FACE_MODEL_FILE)
    }

    /// Create the store directory and fetch any missing artifact.
    ///
    /// Nothing here is fatal: every failure is logged and the caller
    /// continues with the artifacts that exist.
    pub fn ensure_artifacts(&self) {
        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            log::warn!("cannot create model dir {}: {}", self.dir.display(), err);
            return;
        }

        let artifacts = [
            (self.detector_model_path(), self.detector_url.as_str()),
            (self.labels_path(), self.labels_url.as_str()),
            (self.face_model_path(), self.face_model_url.as_str()),
        ];
        for (path, url) in artifacts {
            if path.exists() {
                continue;
            }
            log::info!("fetching {} from {}", path.display(), url);
            match fetch_artifact(url, &path) {
                Ok(()) => log::info!("fetched {}", path.display()),
                Err(err) => log::warn!("fetch of {} failed: {:#}", path.display(), err),
            }
        }
    }

    /// Class labels, one per line, with a minimal person/helmet fallback
    /// when the label file is missing or unreadable.
    pub fn load_labels(&self) -> Vec<String> {
        let path = self.labels_path();
        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let labels = parse_labels(&raw);
                if labels.is_empty() {
                    log::warn!("label file {} is empty, using fallback", path.display());
                    fallback_labels()
                } else {
                    labels
                }
            }
            Err(err) => {
                log::warn!(
                    "label file {} unreadable ({}), using fallback",
                    path.display(),
                    err
                );
                fallback_labels()
            }
        }
    }
}

fn fallback_labels() -> Vec<String> {
    FALLBACK_LABELS.iter().map(|s| s.to_string()).collect()
}

/// Parse a label file, one class name per line.
pub fn parse_labels(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(feature = "fetch-models")]
fn fetch_artifact(url: &str, dest: &Path) -> Result<()> {
    use anyhow::Context;
    use std::io::Read;

    let parsed = url::Url::parse(url).with_context(|| format!("parse artifact url {}", url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("unsupported artifact scheme '{}'", parsed.scheme()));
    }

    let response = ureq::get(url)
        .call()
        .with_context(|| format!("fetch {}", url))?;

    // Stream into a sibling temp file so a partial download never looks like
    // a complete artifact.
    let partial = dest.with_extension("part");
    let mut file = std::fs::File::create(&partial)
        .with_context(|| format!("create {}", partial.display()))?;
    let mut reader = response.into_reader();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer).context("read artifact body")?;
        if read == 0 {
            break;
        }
        std::io::Write::write_all(&mut file, &buffer[..read])
            .with_context(|| format!("write {}", partial.display()))?;
    }
    drop(file);
    std::fs::rename(&partial, dest)
        .with_context(|| format!("rename {} into place", partial.display()))?;
    Ok(())
}

#[cfg(not(feature = "fetch-models"))]
fn fetch_artifact(_url: &str, dest: &Path) -> Result<()> {
    Err(anyhow!(
        "{} missing and model fetching is compiled out",
        dest.display()
    ))
}
