//! Capture devices and the producer thread feeding the root channel.
//!
//! # Architecture
//!
//! ```text
//! [CaptureDevice] --read()--> [CaptureThread] --write()--> root SlotChannel
//! ```
//!
//! A device returns [`Frame::Empty`] when it has nothing to offer; the
//! producer logs that (at most once per warn interval) and tries again. It
//! never blocks a reader: the root channel only ever holds the latest frame.

pub mod image_dir;
pub mod synthetic;

pub use image_dir::ImageDirCamera;
pub use synthetic::{SyntheticCamera, SyntheticPattern};

use crate::error::{Result, ResultExt};
use crate::pipeline::SlotChannel;
use crate::types::Frame;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A source of frames
pub trait CaptureDevice: Send {
    /// Fetch the next frame, or [`Frame::Empty`] on failure
    fn read(&mut self) -> Frame;

    /// Target frame rate; zero means as fast as possible
    fn set_rate(&mut self, fps: u32);

    /// Human readable description for logs
    fn describe(&self) -> String;
}

impl<D: CaptureDevice + ?Sized> CaptureDevice for Box<D> {
    fn read(&mut self) -> Frame {
        (**self).read()
    }

    fn set_rate(&mut self, fps: u32) {
        (**self).set_rate(fps)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Sleeps between frames to hold a device at its configured rate
#[derive(Debug)]
pub(crate) struct FramePacer {
    interval: Duration,
    last_frame: Option<Instant>,
}

impl FramePacer {
    pub(crate) fn new(fps: u32) -> Self {
        let mut pacer = Self {
            interval: Duration::ZERO,
            last_frame: None,
        };
        pacer.set_rate(fps);
        pacer
    }

    pub(crate) fn set_rate(&mut self, fps: u32) {
        self.interval = if fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(1_000_000 / fps as u64)
        };
    }

    /// Block until the next frame is due
    pub(crate) fn wait(&mut self) {
        if let Some(last) = self.last_frame {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());
    }
}

/// Producer thread copying device frames into the root channel
pub struct CaptureThread {
    stop: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureThread {
    /// Configure `device` for `fps` and start pumping frames into `root`
    pub fn spawn<D>(
        mut device: D,
        root: Arc<SlotChannel<Frame>>,
        fps: u32,
        warn_interval: Duration,
    ) -> Result<Self>
    where
        D: CaptureDevice + 'static,
    {
        device.set_rate(fps);

        let stop = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));
        let description = device.describe();

        let thread_stop = Arc::clone(&stop);
        let thread_frames = Arc::clone(&frames);
        let handle = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                tracing::info!("Capture started: {} at {} fps", description, fps);
                let mut last_warning: Option<Instant> = None;

                while !thread_stop.load(Ordering::SeqCst) {
                    let frame = device.read();
                    if frame.is_empty() {
                        if last_warning.map_or(true, |t| t.elapsed() >= warn_interval) {
                            tracing::warn!("Failed to capture frame from {}", description);
                            last_warning = Some(Instant::now());
                        }
                        thread::sleep(Duration::from_millis(1));
                        continue;
                    }
                    root.write(frame);
                    thread_frames.fetch_add(1, Ordering::Relaxed);
                }

                tracing::info!(
                    "Capture stopped after {} frames",
                    thread_frames.load(Ordering::Relaxed)
                );
            })
            .context("Failed to spawn capture thread")?;

        Ok(Self {
            stop,
            frames,
            handle: Some(handle),
        })
    }

    /// Frames written to the root channel so far
    pub fn frames_captured(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Signal the producer and join it. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stop.store(true, Ordering::SeqCst);
        if handle.join().is_err() {
            tracing::warn!("Capture thread panicked");
        }
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        self.stop();
    }
}
