//! Snapshot capture.
//!
//! On request the session persists the current raw frame (no overlays) as
//! `capture_YYYYMMDD_HHMMSS.jpg` in the snapshot directory.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

use crate::frame::Frame;

pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create snapshot dir {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn save(&self, frame: &Frame) -> Result<PathBuf> {
        let name = format!("capture_{}.jpg", Local::now().format("%Y%m%d_%H%M%S"));
        let path = self.dir.join(name);
        frame.save_jpeg(&path)?;
        Ok(path)
    }
}
