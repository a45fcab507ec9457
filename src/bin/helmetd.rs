//! helmetd - helmet watch daemon
//!
//! This daemon:
//! 1. Loads configuration (JSON file + env overrides)
//! 2. Fetches missing model artifacts into the model store
//! 3. Opens the configured frame source
//! 4. Runs the watch session: classify, annotate, log transitions
//! 5. Writes a preview JPEG and snapshots on request

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use helmet_watch::detect::{select_backend, Classifier};
use helmet_watch::{
    open_source, ModelStore, NullRenderer, PreviewRenderer, Renderer, Session, SessionOptions,
    SnapshotWriter, TransitionLogger, WatchConfig,
};

#[derive(Parser, Debug)]
#[command(name = "helmetd", version, about = "Helmet watch daemon")]
struct Args {
    /// Configuration file (JSON). Overrides HELMET_CONFIG.
    #[arg(long, env = "HELMET_CONFIG")]
    config: Option<PathBuf>,

    /// Frame source locator: stub://…, http(s)://…, or a device path.
    #[arg(long)]
    source: Option<String>,

    /// Stop after this many frames (default: run until interrupted).
    #[arg(long)]
    frames: Option<u64>,

    /// Save a snapshot every N frames.
    #[arg(long, value_name = "N")]
    snapshot_every: Option<u64>,

    /// Disable the preview JPEG.
    #[arg(long)]
    no_preview: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = WatchConfig::load_from(args.config.as_deref())?;
    if let Some(source) = args.source {
        cfg.source = source;
    }
    if args.no_preview {
        cfg.preview_path = None;
    }

    log::info!(
        "helmetd {} starting (source: {}, {}x{} @ {} fps)",
        env!("CARGO_PKG_VERSION"),
        cfg.source,
        cfg.camera.width,
        cfg.camera.height,
        cfg.camera.target_fps
    );

    let source = open_source(&cfg.source, &cfg.camera)?;
    let renderer: Box<dyn Renderer> = match &cfg.preview_path {
        Some(path) => {
            log::info!("preview at {}", path.display());
            Box::new(PreviewRenderer::new(path.clone()))
        }
        None => Box::new(NullRenderer::new()),
    };
    let logger = TransitionLogger::new(&cfg.log_dir)?;
    let snapshots = SnapshotWriter::new(&cfg.snapshot_dir)?;

    // Backend construction happens on the worker thread; the face cascade
    // is not Send.
    let backend_cfg = cfg.clone();
    let make_classifier = move || {
        let store = ModelStore::new(&backend_cfg.models);
        store.ensure_artifacts();
        Classifier::new(select_backend(&backend_cfg, &store))
    };

    let handle = Session::start(
        source,
        make_classifier,
        renderer,
        logger,
        snapshots,
        cfg.camera.frame_interval(),
        SessionOptions {
            max_frames: args.frames,
            snapshot_every: args.snapshot_every,
        },
    )
    .context("start watch session")?;

    let stop_requested = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    {
        let stop_requested = std::sync::Arc::clone(&stop_requested);
        ctrlc::set_handler(move || {
            stop_requested.store(true, Ordering::SeqCst);
        })
        .context("install signal handler")?;
    }

    // Wait for either the session to run out of frames or the operator to
    // interrupt.
    while !handle.is_finished() {
        if stop_requested.load(Ordering::SeqCst) {
            log::info!("interrupt received, stopping session");
            handle.stop();
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    let report = handle.join()?;
    log::info!(
        "helmetd exiting: {} frames, {} classified, {} snapshots, last status {}",
        report.frames_seen,
        report.frames_classified,
        report.snapshots_saved,
        report.last_status
    );
    Ok(())
}
