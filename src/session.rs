//! Watch session.
//!
//! A session owns one frame source and one classifier on a dedicated worker
//! thread and drives the capture/classify/render loop:
//! - every other frame is classified (the rest reuse the last verdict)
//! - verdict transitions go to the detection log and the renderer; steady
//!   state is never re-logged
//! - snapshots are taken on demand or on a fixed cadence
//!
//! The classifier is built inside the worker via a factory closure, so
//! backends that are not `Send` (the face cascade is one) never cross a
//! thread boundary.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::detect::Classifier;
use crate::ingest::FrameSource;
use crate::render::{Renderer, WatchStatus};
use crate::snapshot::SnapshotWriter;
use crate::watchlog::TransitionLogger;

/// Classify every n-th captured frame.
const CLASSIFY_STRIDE: u64 = 2;

#[derive(Clone, Copy, Debug, Default)]
pub struct SessionOptions {
    /// Stop after this many captured frames. `None` runs until stopped.
    pub max_frames: Option<u64>,
    /// Save a snapshot every n captured frames.
    pub snapshot_every: Option<u64>,
}

/// Final accounting returned by a finished session.
#[derive(Clone, Copy, Debug)]
pub struct SessionReport {
    pub frames_seen: u64,
    pub frames_classified: u64,
    pub snapshots_saved: u64,
    pub last_status: WatchStatus,
}

pub struct SessionHandle {
    stop: Arc<AtomicBool>,
    snapshot_requested: Arc<AtomicBool>,
    worker: JoinHandle<SessionReport>,
}

impl SessionHandle {
    /// Ask the worker to finish its current iteration and exit.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Save a snapshot of the next captured frame.
    pub fn request_snapshot(&self) {
        self.snapshot_requested.store(true, Ordering::SeqCst);
    }

    /// Whether the worker has exited on its own (frame budget reached).
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    pub fn join(self) -> Result<SessionReport> {
        self.worker
            .join()
            .map_err(|_| anyhow!("session worker panicked"))
    }
}

pub struct Session;

impl Session {
    /// Connect the source and spawn the worker loop.
    ///
    /// A source that cannot connect is fatal; everything after that point
    /// degrades per frame instead of stopping the session.
    pub fn start<F>(
        mut source: Box<dyn FrameSource>,
        make_classifier: F,
        mut renderer: Box<dyn Renderer>,
        logger: TransitionLogger,
        snapshots: SnapshotWriter,
        frame_interval: Duration,
        options: SessionOptions,
    ) -> Result<SessionHandle>
    where
        F: FnOnce() -> Classifier + Send + 'static,
    {
        source.connect()?;

        let stop = Arc::new(AtomicBool::new(false));
        let snapshot_requested = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let worker_snapshot = Arc::clone(&snapshot_requested);

        let worker = std::thread::Builder::new()
            .name("helmet-watch".to_string())
            .spawn(move || {
                let mut classifier = make_classifier();
                log::info!(
                    "session started (backend: {}, source: {})",
                    classifier.backend_name(),
                    source.stats().source
                );
                run_loop(
                    source.as_mut(),
                    &mut classifier,
                    renderer.as_mut(),
                    &logger,
                    &snapshots,
                    frame_interval,
                    options,
                    &worker_stop,
                    &worker_snapshot,
                )
            })
            .map_err(|e| anyhow!("spawn session worker: {}", e))?;

        Ok(SessionHandle {
            stop,
            snapshot_requested,
            worker,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn run_loop(
    source: &mut dyn FrameSource,
    classifier: &mut Classifier,
    renderer: &mut dyn Renderer,
    logger: &TransitionLogger,
    snapshots: &SnapshotWriter,
    frame_interval: Duration,
    options: SessionOptions,
    stop: &AtomicBool,
    snapshot_requested: &AtomicBool,
) -> SessionReport {
    let mut frames_seen: u64 = 0;
    let mut frames_classified: u64 = 0;
    let mut snapshots_saved: u64 = 0;
    let mut status = WatchStatus::Idle;

    let mut fps_window_start = Instant::now();
    let mut fps_window_frames: u64 = 0;

    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        if let Some(max) = options.max_frames {
            if frames_seen >= max {
                break;
            }
        }

        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("frame capture failed, retrying: {:#}", err);
                std::thread::sleep(frame_interval);
                continue;
            }
        };
        frames_seen += 1;
        fps_window_frames += 1;

        // Snapshots persist the raw frame, before any overlay lands on it.
        let take_snapshot = snapshot_requested.swap(false, Ordering::SeqCst)
            || options
                .snapshot_every
                .map(|every| every > 0 && frames_seen % every == 0)
                .unwrap_or(false);
        if take_snapshot {
            match snapshots.save(&frame) {
                Ok(path) => {
                    snapshots_saved += 1;
                    log::info!("snapshot saved to {}", path.display());
                    if let Err(err) = logger.snapshot_saved(&path) {
                        log::warn!("detection log write failed: {:#}", err);
                    }
                }
                Err(err) => log::warn!("snapshot save failed: {:#}", err),
            }
        }

        let display = if (frames_seen - 1) % CLASSIFY_STRIDE == 0 {
            let (annotated, helmet) = classifier.process(&frame);
            frames_classified += 1;

            let new_status = if helmet {
                WatchStatus::HelmetDetected
            } else {
                WatchStatus::NoHelmet
            };
            if new_status != status {
                status = new_status;
                renderer.set_status(status);
                if let Err(err) = logger.verdict(status) {
                    log::warn!("detection log write failed: {:#}", err);
                }
            }
            annotated
        } else {
            frame
        };

        if let Err(err) = renderer.render(&display) {
            log::warn!("render failed: {:#}", err);
        }

        let window = fps_window_start.elapsed();
        if window >= Duration::from_secs(1) {
            log::debug!(
                "fps: {:.1}",
                fps_window_frames as f64 / window.as_secs_f64()
            );
            fps_window_start = Instant::now();
            fps_window_frames = 0;
        }

        std::thread::sleep(frame_interval);
    }

    log::info!(
        "session finished ({} frames, {} classified, {} snapshots)",
        frames_seen,
        frames_classified,
        snapshots_saved
    );
    SessionReport {
        frames_seen,
        frames_classified,
        snapshots_saved,
        last_status: status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ClassifyBackend;
    use crate::frame::Frame;
    use crate::ingest::StubSource;
    use crate::render::NullRenderer;
    use chrono::Local;
    use std::sync::atomic::AtomicU64;
    use tempfile::TempDir;

    struct ScriptedBackend {
        verdicts: Vec<bool>,
        calls: usize,
    }

    impl ClassifyBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn classify(&mut self, _frame: &mut Frame) -> Result<bool> {
            let verdict = self
                .verdicts
                .get(self.calls)
                .copied()
                .unwrap_or_else(|| self.verdicts.last().copied().unwrap_or(false));
            self.calls += 1;
            Ok(verdict)
        }
    }

    struct CountingRenderer {
        frames: Arc<AtomicU64>,
        transitions: Arc<AtomicU64>,
    }

    impl Renderer for CountingRenderer {
        fn render(&mut self, _frame: &Frame) -> Result<()> {
            self.frames.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn set_status(&mut self, _status: WatchStatus) {
            self.transitions.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        log_dir: TempDir,
        snap_dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                log_dir: TempDir::new().expect("log dir"),
                snap_dir: TempDir::new().expect("snapshot dir"),
            }
        }

        fn logger(&self) -> TransitionLogger {
            TransitionLogger::new(self.log_dir.path()).expect("logger")
        }

        fn snapshots(&self) -> SnapshotWriter {
            SnapshotWriter::new(self.snap_dir.path()).expect("snapshots")
        }

        fn detection_log(&self) -> String {
            let path = self.log_dir.path().join(format!(
                "helmet_detection_{}.log",
                Local::now().format("%Y%m%d")
            ));
            std::fs::read_to_string(path).unwrap_or_default()
        }
    }

    fn run_session(
        verdicts: Vec<bool>,
        options: SessionOptions,
        fixture: &Fixture,
        renderer: Box<dyn Renderer>,
    ) -> SessionReport {
        let source = Box::new(StubSource::flat(32, 32, [60, 60, 60]));
        let handle = Session::start(
            source,
            move || Classifier::new(Box::new(ScriptedBackend { verdicts, calls: 0 })),
            renderer,
            fixture.logger(),
            fixture.snapshots(),
            Duration::from_millis(1),
            options,
        )
        .expect("session start");
        handle.join().expect("join")
    }

    #[test]
    fn steady_verdict_is_logged_once() {
        let fixture = Fixture::new();
        let report = run_session(
            vec![true],
            SessionOptions {
                max_frames: Some(6),
                snapshot_every: None,
            },
            &fixture,
            Box::new(NullRenderer::new()),
        );

        assert_eq!(report.frames_seen, 6);
        assert_eq!(report.frames_classified, 3);
        assert_eq!(report.last_status, WatchStatus::HelmetDetected);

        let log = fixture.detection_log();
        let detections: Vec<&str> = log
            .lines()
            .filter(|line| line.contains("detection:"))
            .collect();
        assert_eq!(detections.len(), 1);
        assert!(detections[0].ends_with("detection: helmet-detected"));
    }

    #[test]
    fn every_transition_is_logged() {
        let fixture = Fixture::new();
        let transitions = Arc::new(AtomicU64::new(0));
        let frames = Arc::new(AtomicU64::new(0));
        let renderer = Box::new(CountingRenderer {
            frames: Arc::clone(&frames),
            transitions: Arc::clone(&transitions),
        });
        let report = run_session(
            vec![true, false, true],
            SessionOptions {
                max_frames: Some(6),
                snapshot_every: None,
            },
            &fixture,
            renderer,
        );

        assert_eq!(report.frames_classified, 3);
        assert_eq!(transitions.load(Ordering::SeqCst), 3);
        assert_eq!(frames.load(Ordering::SeqCst), 6);

        let log = fixture.detection_log();
        let detections: Vec<&str> = log
            .lines()
            .filter(|line| line.contains("detection:"))
            .collect();
        assert_eq!(detections.len(), 3);
        assert!(detections[1].ends_with("detection: no-helmet"));
    }

    #[test]
    fn snapshot_cadence_saves_and_logs() {
        let fixture = Fixture::new();
        let report = run_session(
            vec![false],
            SessionOptions {
                max_frames: Some(4),
                snapshot_every: Some(2),
            },
            &fixture,
            Box::new(NullRenderer::new()),
        );

        assert_eq!(report.snapshots_saved, 2);
        let log = fixture.detection_log();
        assert_eq!(
            log.lines()
                .filter(|line| line.contains("snapshot saved to"))
                .count(),
            2
        );
    }

    #[test]
    fn stop_flag_ends_open_ended_session() {
        let fixture = Fixture::new();
        let source = Box::new(StubSource::flat(16, 16, [0, 0, 0]));
        let handle = Session::start(
            source,
            || {
                Classifier::new(Box::new(ScriptedBackend {
                    verdicts: vec![false],
                    calls: 0,
                }))
            },
            Box::new(NullRenderer::new()),
            fixture.logger(),
            fixture.snapshots(),
            Duration::from_millis(1),
            SessionOptions::default(),
        )
        .expect("session start");

        std::thread::sleep(Duration::from_millis(20));
        handle.stop();
        let report = handle.join().expect("join");
        assert!(report.frames_seen > 0);
    }

    #[test]
    fn requested_snapshot_is_taken_on_next_frame() {
        let fixture = Fixture::new();
        let source = Box::new(StubSource::flat(16, 16, [0, 0, 0]));
        let handle = Session::start(
            source,
            || {
                Classifier::new(Box::new(ScriptedBackend {
                    verdicts: vec![false],
                    calls: 0,
                }))
            },
            Box::new(NullRenderer::new()),
            fixture.logger(),
            fixture.snapshots(),
            Duration::from_millis(1),
            SessionOptions::default(),
        )
        .expect("session start");

        handle.request_snapshot();
        std::thread::sleep(Duration::from_millis(30));
        handle.stop();
        let report = handle.join().expect("join");
        assert!(report.snapshots_saved >= 1);
    }
}
