// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scanner operations
//!
//! This module provides command-line functionality for:
//! - Scanning image sequences through the full pipeline
//! - Printing the region of interest for a frame size
//! - Printing the effective configuration

use chrono::Local;
use clap::Args;
use roi_scanner::app::frame_processor::{QrDetector, compute_roi};
use roi_scanner::app::qr_overlay::RasterSurface;
use roi_scanner::app::{EventSink, PlaybackController, ScannerEvent};
use roi_scanner::backends::camera::ImageSequenceProvider;
use roi_scanner::config::ScannerConfig;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

/// Options of the `scan` command
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Image files played back as camera frames
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Stop after the first detection
    #[arg(long)]
    pub once: bool,

    /// Process one in every N frames
    #[arg(long)]
    pub frame_skip: Option<u32>,

    /// Only decode the region of interest
    #[arg(long)]
    pub crop: bool,

    /// Drop detections centered outside the region of interest
    #[arg(long)]
    pub roi_only: bool,

    /// Never use the native detector
    #[arg(long)]
    pub force_fallback: bool,

    /// Detection budget per frame in ms (default: until the next frame is due)
    #[arg(long)]
    pub stall_ms: Option<u64>,

    /// Write the last overlay to this PNG file
    #[arg(long)]
    pub overlay_out: Option<PathBuf>,

    /// Number of ticks to run (default: one pass over the input)
    #[arg(long)]
    pub max_ticks: Option<u64>,
}

impl ScanArgs {
    fn apply(&self, config: &mut ScannerConfig) {
        if let Some(frame_skip) = self.frame_skip {
            config.frame_skip = frame_skip;
        }
        if let Some(stall_ms) = self.stall_ms {
            config.detect_stall_ms = stall_ms;
        }
        config.stop_after_detection |= self.once;
        config.crop_to_roi |= self.crop;
        config.roi_only |= self.roi_only;
        config.force_fallback |= self.force_fallback;
    }
}

/// Run the scanner over image files and print events as JSON lines
pub fn scan(config_path: Option<&Path>, args: ScanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ScannerConfig::load_or_default(config_path)?;
    args.apply(&mut config);
    let config = config.sanitized();

    let provider = ImageSequenceProvider::from_paths(&args.input)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_scan(config, provider, args))
}

async fn run_scan(
    config: ScannerConfig,
    provider: ImageSequenceProvider,
    args: ScanArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let max_ticks = args
        .max_ticks
        .unwrap_or(args.input.len() as u64 * u64::from(config.frame_skip));
    let (events, mut receiver) = EventSink::channel();
    let mut scanner = PlaybackController::new(
        config.clone(),
        Box::new(provider),
        None,
        Box::new(QrDetector::new()),
        RasterSurface::default(),
        events,
    );

    scanner.start().await?;
    info!(session = %scanner.session_id(), max_ticks, "Scanning");

    let mut ticker = tokio::time::interval(config.tick_interval());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticks = 0;
    let mut detections = 0;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = ticker.tick() => {
                let outcome = scanner.step().await;
                ticks += 1;
                detections += print_events(&mut receiver)?;
                match outcome {
                    Some(outcome) if outcome.reschedule() => {}
                    other => {
                        debug!(outcome = ?other, "Scanning finished");
                        break;
                    }
                }
                if ticks >= max_ticks {
                    break;
                }
            }
        }
    }

    if let Some(path) = &args.overlay_out {
        scanner.surface().save(path)?;
        info!(path = %path.display(), "Overlay written");
    }
    scanner.shutdown();
    detections += print_events(&mut receiver)?;
    info!(ticks, detections, "Scan complete");
    Ok(())
}

/// Print pending events; returns the number of detection events
fn print_events(
    receiver: &mut UnboundedReceiver<ScannerEvent>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut detections = 0;
    while let Ok(event) = receiver.try_recv() {
        let timestamp = Local::now().to_rfc3339();
        let line = match event {
            ScannerEvent::Detected(codes) => {
                detections += 1;
                json!({ "timestamp": timestamp, "event": "detected", "codes": codes })
            }
            ScannerEvent::EngineChanged(engine) => {
                json!({ "timestamp": timestamp, "event": "engine", "engine": engine })
            }
            ScannerEvent::StateChanged(state) => {
                json!({ "timestamp": timestamp, "event": "state", "state": state })
            }
            ScannerEvent::Error(error) => {
                warn!(error = %error, "Scanner reported an error");
                json!({ "timestamp": timestamp, "event": "error", "message": error.to_string() })
            }
        };
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(detections)
}

/// Print the region of interest for a frame size
pub fn print_roi(
    config_path: Option<&Path>,
    width: u32,
    height: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ScannerConfig::load_or_default(config_path)?;
    let roi = compute_roi(width, height, &config.roi);
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "frame": { "width": width, "height": height },
            "roi": roi,
        }))?
    );
    Ok(())
}

/// Print the effective configuration
pub fn print_config(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ScannerConfig::load_or_default(config_path)?;
    match config_path
        .map(Path::to_path_buf)
        .or_else(ScannerConfig::default_path)
    {
        Some(path) => eprintln!("Config file: {}", path.display()),
        None => eprintln!("Config file: (none)"),
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
