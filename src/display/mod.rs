//! Display sinks.
//!
//! The orchestrator pushes every non-empty frame to a [`DisplaySink`] each
//! iteration, keyed by the producing task's name, and closes a key when its
//! task goes away.
//!
//! - [`LogSink`] - keeps track of open windows and frame counts, logs changes
//! - [`SnapshotSink`] - writes each window to `<dir>/<key>.png` at a fixed interval

use crate::error::{Result, ResultExt};
use crate::types::Frame;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Destination for displayed frames
#[cfg_attr(test, mockall::automock)]
pub trait DisplaySink: Send {
    /// Show `frame` in the window named `key`, opening it if needed
    fn show(&mut self, key: &str, frame: &Frame);

    /// Release the window named `key`
    fn close(&mut self, key: &str);

    /// Release every window
    fn close_all(&mut self);
}

/// Headless sink that only tracks and logs window state
#[derive(Debug, Default)]
pub struct LogSink {
    windows: BTreeMap<String, u64>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, key: &str) -> bool {
        self.windows.contains_key(key)
    }

    /// Frames shown under `key` since it was opened
    pub fn frames_shown(&self, key: &str) -> u64 {
        self.windows.get(key).copied().unwrap_or(0)
    }

    pub fn open_windows(&self) -> Vec<String> {
        self.windows.keys().cloned().collect()
    }
}

impl DisplaySink for LogSink {
    fn show(&mut self, key: &str, frame: &Frame) {
        let count = self.windows.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!("Opened window '{}' ({:?})", key, frame);
            0
        });
        *count += 1;
    }

    fn close(&mut self, key: &str) {
        if let Some(count) = self.windows.remove(key) {
            tracing::debug!("Closed window '{}' after {} frames", key, count);
        }
    }

    fn close_all(&mut self) {
        for (key, count) in std::mem::take(&mut self.windows) {
            tracing::debug!("Closed window '{}' after {} frames", key, count);
        }
    }
}

/// Periodically saves every window as a PNG file
#[derive(Debug)]
pub struct SnapshotSink {
    dir: PathBuf,
    interval: Duration,
    last_saved: HashMap<String, Instant>,
}

impl SnapshotSink {
    /// Create the sink, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>, interval: Duration) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot directory {:?}", dir))?;
        Ok(Self {
            dir,
            interval,
            last_saved: HashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a window is saved to
    pub fn path_for(&self, key: &str) -> PathBuf {
        let stem: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        self.dir.join(format!("{}.png", stem))
    }

    fn save(&self, key: &str, frame: &Frame) -> Result<()> {
        let Some(rgb) = frame.to_rgb() else {
            return Ok(());
        };
        rgb.save(self.path_for(key))?;
        Ok(())
    }
}

impl DisplaySink for SnapshotSink {
    fn show(&mut self, key: &str, frame: &Frame) {
        let due = self
            .last_saved
            .get(key)
            .map_or(true, |last| last.elapsed() >= self.interval);
        if !due {
            return;
        }

        if let Err(e) = self.save(key, frame) {
            tracing::warn!("Failed to save snapshot for '{}': {}", key, e);
        }
        self.last_saved.insert(key.to_string(), Instant::now());
    }

    fn close(&mut self, key: &str) {
        self.last_saved.remove(key);
    }

    fn close_all(&mut self) {
        self.last_saved.clear();
    }
}
