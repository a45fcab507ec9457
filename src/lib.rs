//! helmet-watch: camera watcher that checks whether people in view are
//! wearing safety helmets.
//!
//! The pipeline pulls RGB frames from an ingestion source, classifies every
//! other frame through a detection backend, annotates the frame, and keeps a
//! transition-only detection log plus on-demand snapshots. Two backends are
//! available:
//! - `network`: ONNX object detector (feature: backend-network), boxes
//!   filtered to person/helmet classes and checked for helmet-colored pixels
//!   above the head
//! - `heuristic`: frontal-face cascade plus the same color test, used when
//!   no detector model is on disk
//!
//! The session layer (`session::Session`) owns the loop on a worker thread;
//! `bin/helmetd.rs` is the daemon around it.

pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod models;
pub mod overlay;
pub mod render;
pub mod session;
pub mod snapshot;
pub mod watchlog;

pub use config::WatchConfig;
pub use detect::{select_backend, Classifier, ClassifyBackend};
pub use frame::{Frame, Region};
pub use ingest::{open_source, FrameSource};
pub use models::ModelStore;
pub use render::{NullRenderer, PreviewRenderer, Renderer, WatchStatus};
pub use session::{Session, SessionHandle, SessionOptions, SessionReport};
pub use snapshot::SnapshotWriter;
pub use watchlog::TransitionLogger;
