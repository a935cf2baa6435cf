//! vision-rs - Main Entry Point
//!
//! Runs the live filter pipeline headless. Keys typed on stdin (followed by
//! Enter) toggle filters; see [`vision_rs::orchestrator::command`] for the
//! key map.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vision_rs::{
    capture::{CaptureDevice, ImageDirCamera, SyntheticCamera},
    config::{self, CaptureSource, LoggingConfig, VisionConfig},
    display::{DisplaySink, LogSink, SnapshotSink},
    orchestrator::{CommandSource, Orchestrator, ScriptedCommands, StdinCommands},
};

#[derive(Parser, Debug)]
#[command(name = "vision-rs", version, about = "Live video filter pipeline")]
struct Args {
    /// Config file (TOML, or JSON with a .json extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run these keys as commands instead of reading stdin
    #[arg(long)]
    script: Option<String>,

    /// Replay images from this directory instead of the configured source
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Save every window as a PNG into this directory
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Stop after this many loop iterations
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Write the default configuration to this path and exit
    #[arg(long)]
    write_default_config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.write_default_config {
        VisionConfig::default()
            .save(path)
            .with_context(|| format!("Failed to write {:?}", path))?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => VisionConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => config::default_config_path()
            .map(VisionConfig::load_or_default)
            .unwrap_or_default(),
    };
    apply_overrides(&mut config, &args);

    let _log_guard = init_logging(&config.logging)?;
    tracing::info!("Starting vision-rs");

    let sink: Box<dyn DisplaySink> = match &config.display.snapshot_dir {
        Some(dir) => Box::new(SnapshotSink::new(
            dir,
            Duration::from_millis(config.display.snapshot_interval_ms),
        )?),
        None => Box::new(LogSink::new()),
    };

    let device: Box<dyn CaptureDevice> = match &config.capture.source {
        CaptureSource::Synthetic {
            width,
            height,
            pattern,
        } => Box::new(SyntheticCamera::new(*width, *height, *pattern)),
        CaptureSource::ImageDir { path } => Box::new(
            ImageDirCamera::open(path).context("Failed to open capture source")?,
        ),
    };

    let mut source: Box<dyn CommandSource> = match &args.script {
        Some(keys) => {
            Box::new(ScriptedCommands::from_keys(keys).with_pace(config.runtime.command_poll()))
        }
        None => Box::new(
            StdinCommands::spawn(config.runtime.command_poll())
                .context("Failed to start command input")?,
        ),
    };

    let mut orchestrator = Orchestrator::new(&config, sink);
    orchestrator.attach_capture(device)?;
    orchestrator.run(source.as_mut());

    tracing::info!(
        "Captured {} frames",
        orchestrator.frames_captured().unwrap_or(0)
    );
    Ok(())
}

fn apply_overrides(config: &mut VisionConfig, args: &Args) {
    if let Some(dir) = &args.frames_dir {
        config.capture.source = CaptureSource::ImageDir { path: dir.clone() };
    }
    if let Some(dir) = &args.snapshot_dir {
        config.display.snapshot_dir = Some(dir.clone());
    }
    if args.max_iterations.is_some() {
        config.runtime.max_iterations = args.max_iterations;
    }
}

/// Stderr logging, plus a daily rolling file when a directory is configured.
///
/// The returned guard must live until exit so buffered lines are flushed.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let default_filter = logging
        .filter
        .clone()
        .unwrap_or_else(|| "info,vision_rs=debug".to_string());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (file_layer, guard) = match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {:?}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, "vision-rs.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
