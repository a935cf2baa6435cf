//! A named pipeline stage: output channel, run state and worker thread.
//!
//! A [`Task`] is created idle. One of the `start_*` calls spawns exactly one
//! worker running a [`Processor`] or [`DualProcessor`] bound to the task's own
//! state and output channel. Upstream channels are handed over as `Arc`s, so a
//! worker never sees anything but the channels it reads and writes.
//!
//! Stopping a task pauses it, cancels the drive loop and joins the worker.
//! Dropping a task stops it.

use super::channel::SlotChannel;
use super::processor::{binary_callback, unary_callback, DualProcessor, Processor};
use super::state::ProcessorState;
use crate::display::DisplaySink;
use crate::error::{Result, ResultExt, VisionError};
use crate::filters::TransformError;
use crate::types::{Frame, ProcessorSnapshot};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct Task {
    name: String,
    output: Arc<SlotChannel<Frame>>,
    state: Arc<ProcessorState>,
    worker: Option<JoinHandle<()>>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: Arc::new(SlotChannel::new()),
            state: Arc::new(ProcessorState::new()),
            worker: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the worker for a single-input transform
    pub fn start_unary<F>(
        &mut self,
        input: Arc<SlotChannel<Frame>>,
        transform: F,
        idle_delay: Duration,
    ) -> Result<()>
    where
        F: FnMut(&Frame) -> std::result::Result<Frame, TransformError> + Send + 'static,
    {
        self.ensure_not_started()?;

        let mut processor = Processor::new(self.name.clone(), Arc::clone(&self.state))
            .with_idle_delay(idle_delay);
        processor.register_callback(unary_callback(self.name.clone(), transform));

        let output = Arc::clone(&self.output);
        self.spawn(move || processor.start(&input, &output))
    }

    /// Spawn the worker for a dual-input transform
    pub fn start_binary<F>(
        &mut self,
        input_a: Arc<SlotChannel<Frame>>,
        input_b: Arc<SlotChannel<Frame>>,
        transform: F,
        idle_delay: Duration,
    ) -> Result<()>
    where
        F: FnMut(&Frame, &Frame) -> std::result::Result<Frame, TransformError> + Send + 'static,
    {
        self.ensure_not_started()?;

        let mut processor = DualProcessor::new(self.name.clone(), Arc::clone(&self.state))
            .with_idle_delay(idle_delay);
        processor.register_callback(binary_callback(self.name.clone(), transform));

        let output = Arc::clone(&self.output);
        self.spawn(move || processor.start(&input_a, &input_b, &output))
    }

    fn ensure_not_started(&self) -> Result<()> {
        if self.worker.is_some() {
            return Err(VisionError::TaskAlreadyStarted(self.name.clone()));
        }
        Ok(())
    }

    fn spawn<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let name = self.name.clone();
        let handle = thread::Builder::new()
            .name(format!("task-{}", name))
            .spawn(move || {
                if let Err(e) = body() {
                    tracing::error!("Task '{}' worker failed: {}", name, e);
                }
            })
            .with_context(|| format!("Failed to spawn worker for '{}'", self.name))?;

        self.worker = Some(handle);
        tracing::info!("Task '{}' started", self.name);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.worker.is_some()
    }

    pub fn set_running(&self, running: bool) {
        self.state.set_running(running);
    }

    /// Flip the pause flag, returning the new run state
    pub fn toggle_running(&self) -> bool {
        self.state.toggle_running()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn get_state(&self) -> ProcessorSnapshot {
        self.state.snapshot()
    }

    pub fn output_channel(&self) -> Arc<SlotChannel<Frame>> {
        Arc::clone(&self.output)
    }

    /// Show the latest output under this task's name.
    ///
    /// Returns `false` when there is nothing to show yet.
    pub fn display(&self, sink: &mut dyn DisplaySink) -> bool {
        let frame = self.output.read();
        if frame.is_empty() {
            return false;
        }
        sink.show(&self.name, &frame);
        true
    }

    /// Cancel the drive loop and join the worker. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };

        self.state.set_running(false);
        self.state.cancel();
        if handle.join().is_err() {
            tracing::warn!("Task '{}' worker panicked", self.name);
        }
        tracing::info!("Task '{}' stopped", self.name);
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("started", &self.worker.is_some())
            .field("state", &self.state.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::MockDisplaySink;
    use crate::filters;
    use image::{Rgb, RgbImage};
    use mockall::predicate::eq;

    fn wait_for_output(task: &Task) -> Frame {
        for _ in 0..200 {
            let frame = task.output_channel().read();
            if !frame.is_empty() {
                return frame;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("Task '{}' produced no output", task.name());
    }

    #[test]
    fn test_unary_task_produces_output() {
        let root = Arc::new(SlotChannel::new());
        root.write(Frame::color(RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]))));

        let mut task = Task::new("Negative");
        task.start_unary(Arc::clone(&root), filters::negative, Duration::from_millis(1))
            .unwrap();

        let frame = wait_for_output(&task);
        assert_eq!(frame.to_rgb().unwrap().get_pixel(0, 0).0, [245, 235, 225]);
        task.stop();
        assert!(!task.is_started());
    }

    #[test]
    fn test_double_start_is_rejected() {
        let root = Arc::new(SlotChannel::new());
        let mut task = Task::new("Blur");
        task.start_unary(Arc::clone(&root), filters::blur5x5, Duration::ZERO)
            .unwrap();
        let err = task
            .start_unary(root, filters::blur5x5, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, VisionError::TaskAlreadyStarted(_)));
    }

    #[test]
    fn test_stop_joins_worker_and_is_idempotent() {
        let root = Arc::new(SlotChannel::new());
        let mut task = Task::new("Grayscale");
        task.start_unary(root, filters::grayscale, Duration::from_millis(1))
            .unwrap();
        task.stop();
        task.stop();
        assert!(!task.get_state().running);
    }

    #[test]
    fn test_display_skips_empty_output() {
        let task = Task::new("Quantized");
        let mut sink = MockDisplaySink::new();
        sink.expect_show().never();
        assert!(!task.display(&mut sink));
    }

    #[test]
    fn test_display_shows_under_task_name() {
        let task = Task::new("Quantized");
        task.output_channel()
            .write(Frame::color(RgbImage::new(2, 2)));

        let mut sink = MockDisplaySink::new();
        sink.expect_show()
            .with(eq("Quantized"), mockall::predicate::always())
            .times(1)
            .return_const(());
        assert!(task.display(&mut sink));
    }

    #[test]
    fn test_pause_toggle() {
        let task = Task::new("Sobel X");
        assert!(task.is_running());
        assert!(!task.toggle_running());
        assert!(!task.get_state().running);
        task.set_running(true);
        assert!(task.is_running());
    }
}
