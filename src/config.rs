use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SOURCE: &str = "stub://camera";
const DEFAULT_FPS: u32 = 30;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_NMS_THRESHOLD: f32 = 0.4;
const DEFAULT_INPUT_SIZE: u32 = 416;
const DEFAULT_FACE_COVERAGE: f64 = 0.30;
const DEFAULT_PERSON_COVERAGE: f64 = 0.25;
const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_SNAPSHOT_DIR: &str = "captures";
const DEFAULT_PREVIEW_PATH: &str = "preview.jpg";

const DEFAULT_DETECTOR_URL: &str = "https://github.com/onnx/models/raw/main/validated/vision/object_detection_segmentation/yolov3/model/yolov3-10.onnx";
const DEFAULT_LABELS_URL: &str =
    "https://raw.githubusercontent.com/pjreddie/darknet/master/data/coco.names";
const DEFAULT_FACE_MODEL_URL: &str =
    "https://github.com/atomashpolskiy/rustface/raw/master/model/seeta_fd_frontal_v1.0.bin";

#[derive(Debug, Deserialize, Default)]
struct WatchConfigFile {
    source: Option<String>,
    camera: Option<CameraConfigFile>,
    detect: Option<DetectConfigFile>,
    models: Option<ModelConfigFile>,
    log_dir: Option<PathBuf>,
    snapshot_dir: Option<PathBuf>,
    preview_path: Option<PathBuf>,
    font_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectConfigFile {
    confidence_threshold: Option<f32>,
    nms_threshold: Option<f32>,
    input_size: Option<u32>,
    face_coverage: Option<f64>,
    person_coverage: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    dir: Option<PathBuf>,
    detector_url: Option<String>,
    labels_url: Option<String>,
    face_model_url: Option<String>,
}

/// Resolved watcher configuration.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Frame source locator: `stub://…`, `http(s)://…`, or a device path.
    pub source: String,
    pub camera: CameraSettings,
    pub detect: DetectSettings,
    pub models: ModelSettings,
    pub log_dir: PathBuf,
    pub snapshot_dir: PathBuf,
    /// Where the preview renderer writes the annotated frame. `None`
    /// disables preview output.
    pub preview_path: Option<PathBuf>,
    /// TrueType font for overlay labels. `None` draws rectangles only.
    pub font_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl CameraSettings {
    /// Pause between loop iterations (~33ms at the default 30 fps).
    pub fn frame_interval(&self) -> Duration {
        if self.target_fps == 0 {
            Duration::from_millis(0)
        } else {
            Duration::from_millis(u64::from((1000 / self.target_fps).max(1)))
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectSettings {
    /// Minimum class score, exclusive. A detection at exactly the threshold
    /// is discarded.
    pub confidence_threshold: f32,
    /// IoU above which overlapping boxes are suppressed.
    pub nms_threshold: f32,
    /// Square input edge the network expects.
    pub input_size: u32,
    /// Color coverage required over a face helmet zone, exclusive.
    pub face_coverage: f64,
    /// Color coverage required over a person-box helmet zone, exclusive.
    pub person_coverage: f64,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub dir: PathBuf,
    pub detector_url: String,
    pub labels_url: String,
    pub face_model_url: String,
}

impl WatchConfig {
    /// Load from the file named by `HELMET_CONFIG` (when set), then apply
    /// env-var overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("HELMET_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Same as `load`, with an explicit config path taking precedence over
    /// `HELMET_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => WatchConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: WatchConfigFile) -> Self {
        let camera = CameraSettings {
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_HEIGHT),
        };
        let detect = DetectSettings {
            confidence_threshold: file
                .detect
                .as_ref()
                .and_then(|detect| detect.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            nms_threshold: file
                .detect
                .as_ref()
                .and_then(|detect| detect.nms_threshold)
                .unwrap_or(DEFAULT_NMS_THRESHOLD),
            input_size: file
                .detect
                .as_ref()
                .and_then(|detect| detect.input_size)
                .unwrap_or(DEFAULT_INPUT_SIZE),
            face_coverage: file
                .detect
                .as_ref()
                .and_then(|detect| detect.face_coverage)
                .unwrap_or(DEFAULT_FACE_COVERAGE),
            person_coverage: file
                .detect
                .as_ref()
                .and_then(|detect| detect.person_coverage)
                .unwrap_or(DEFAULT_PERSON_COVERAGE),
        };
        let models = ModelSettings {
            dir: file
                .models
                .as_ref()
                .and_then(|models| models.dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR)),
            detector_url: file
                .models
                .as_ref()
                .and_then(|models| models.detector_url.clone())
                .unwrap_or_else(|| DEFAULT_DETECTOR_URL.to_string()),
            labels_url: file
                .models
                .as_ref()
                .and_then(|models| models.labels_url.clone())
                .unwrap_or_else(|| DEFAULT_LABELS_URL.to_string()),
            face_model_url: file
                .models
                .and_then(|models| models.face_model_url)
                .unwrap_or_else(|| DEFAULT_FACE_MODEL_URL.to_string()),
        };
        Self {
            source: file.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            camera,
            detect,
            models,
            log_dir: file.log_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            snapshot_dir: file
                .snapshot_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR)),
            preview_path: Some(
                file.preview_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PREVIEW_PATH)),
            ),
            font_path: file.font_path,
        }
    }

    fn apply_env(&mut self) {
        if let Ok(source) = std::env::var("HELMET_SOURCE") {
            if !source.trim().is_empty() {
                self.source = source;
            }
        }
        if let Ok(dir) = std::env::var("HELMET_MODEL_DIR") {
            if !dir.trim().is_empty() {
                self.models.dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = std::env::var("HELMET_LOG_DIR") {
            if !dir.trim().is_empty() {
                self.log_dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = std::env::var("HELMET_SNAPSHOT_DIR") {
            if !dir.trim().is_empty() {
                self.snapshot_dir = PathBuf::from(dir);
            }
        }
        if let Ok(path) = std::env::var("HELMET_PREVIEW_PATH") {
            if !path.trim().is_empty() {
                self.preview_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("HELMET_FONT_PATH") {
            if !path.trim().is_empty() {
                self.font_path = Some(PathBuf::from(path));
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(anyhow!("source must not be empty"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be non-zero"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.detect.confidence_threshold) {
            return Err(anyhow!("confidence_threshold must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.detect.nms_threshold) {
            return Err(anyhow!("nms_threshold must lie in [0, 1]"));
        }
        if self.detect.input_size == 0 {
            return Err(anyhow!("input_size must be non-zero"));
        }
        for (name, coverage) in [
            ("face_coverage", self.detect.face_coverage),
            ("person_coverage", self.detect.person_coverage),
        ] {
            if !(0.0..1.0).contains(&coverage) {
                return Err(anyhow!("{} must lie in [0, 1)", name));
            }
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<WatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
