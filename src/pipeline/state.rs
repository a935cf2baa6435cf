//! Run control and telemetry shared between a task's worker and the orchestrator.

use crate::types::ProcessorSnapshot;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Run flag, cancellation flag and telemetry for one drive loop.
///
/// The worker writes `fps` and `last_frame_time_ms`; the orchestrator writes
/// `running` and `cancelled`. Every field is an atomic, so concurrent access
/// never needs a lock.
#[derive(Debug)]
pub struct ProcessorState {
    running: AtomicBool,
    fps: AtomicU32,
    last_frame_time_ms: AtomicU64,
    cancelled: AtomicBool,
}

impl Default for ProcessorState {
    fn default() -> Self {
        Self {
            running: AtomicBool::new(true),
            fps: AtomicU32::new(0),
            last_frame_time_ms: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        }
    }
}

impl ProcessorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Pause or resume. Takes effect on the worker's next iteration.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    /// Flip the run flag and return the new value
    pub fn toggle_running(&self) -> bool {
        !self.running.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn fps(&self) -> u32 {
        self.fps.load(Ordering::Relaxed)
    }

    pub fn last_frame_time_ms(&self) -> u64 {
        self.last_frame_time_ms.load(Ordering::Relaxed)
    }

    pub fn reset_telemetry(&self) {
        self.fps.store(0, Ordering::Relaxed);
        self.last_frame_time_ms.store(0, Ordering::Relaxed);
    }

    pub fn record_frame_time(&self, ms: u64) {
        self.last_frame_time_ms.store(ms, Ordering::Relaxed);
    }

    pub fn publish_fps(&self, fps: u32) {
        self.fps.store(fps, Ordering::Relaxed);
    }

    /// Ask the drive loop to exit at the top of its next iteration
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> ProcessorSnapshot {
        ProcessorSnapshot {
            running: self.is_running(),
            fps: self.fps(),
            last_frame_time_ms: self.last_frame_time_ms(),
        }
    }
}
