//! Detection event log.
//!
//! Verdict transitions and snapshot saves go to a plain-text daily file,
//! `helmet_detection_YYYYMMDD.log`, separate from the process log so the
//! detection history survives log-level changes and process restarts.
//! Rotation is by local calendar day, decided per write.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::render::WatchStatus;

pub struct TransitionLogger {
    dir: PathBuf,
}

impl TransitionLogger {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create log dir {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Record a verdict transition.
    pub fn verdict(&self, status: WatchStatus) -> Result<()> {
        self.write_line(Local::now(), &format!("detection: {}", status))
    }

    /// Record a saved snapshot.
    pub fn snapshot_saved(&self, path: &Path) -> Result<()> {
        self.write_line(Local::now(), &format!("snapshot saved to {}", path.display()))
    }

    /// Path of the log file covering `at`'s calendar day.
    pub fn file_for(&self, at: DateTime<Local>) -> PathBuf {
        self.dir
            .join(format!("helmet_detection_{}.log", at.format("%Y%m%d")))
    }

    fn write_line(&self, at: DateTime<Local>, message: &str) -> Result<()> {
        let path = self.file_for(at);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open detection log {}", path.display()))?;
        writeln!(file, "{} - INFO - {}", at.format("%Y-%m-%d %H:%M:%S"), message)
            .with_context(|| format!("append to detection log {}", path.display()))
    }
}
