//! Drive loops for single-input and dual-input pipeline stages.
//!
//! A [`Processor`] repeatedly invokes its callback with one input channel and
//! one output channel; a [`DualProcessor`] does the same with two inputs.
//! Both share one loop that honours the run flag, measures per-iteration
//! latency, publishes a frames-per-second count once a second, and exits when
//! the state is cancelled.
//!
//! The callback owns the read/transform/write step. [`unary_callback`] and
//! [`binary_callback`] wrap a pure frame transform in the usual contract:
//! skip when any input is empty, write on success, drop the frame on a
//! transform error.

use super::channel::SlotChannel;
use super::state::ProcessorState;
use crate::error::{Result, VisionError};
use crate::filters::TransformError;
use crate::types::Frame;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Length of the FPS counting window
pub const FPS_WINDOW: Duration = Duration::from_millis(1000);

/// Default sleep per iteration while paused
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_millis(1);

/// Callback for a single-input stage: `(input, output)`
pub type UnaryCallback<T> = Box<dyn FnMut(&SlotChannel<T>, &SlotChannel<T>) + Send>;

/// Callback for a dual-input stage: `(input_a, input_b, output)`
pub type BinaryCallback<T> =
    Box<dyn FnMut(&SlotChannel<T>, &SlotChannel<T>, &SlotChannel<T>) + Send>;

/// Single-input drive loop
pub struct Processor<T> {
    name: String,
    state: Arc<ProcessorState>,
    callback: Option<UnaryCallback<T>>,
    idle_delay: Duration,
}

impl<T: Clone + Default> Processor<T> {
    pub fn new(name: impl Into<String>, state: Arc<ProcessorState>) -> Self {
        Self {
            name: name.into(),
            state,
            callback: None,
            idle_delay: DEFAULT_IDLE_DELAY,
        }
    }

    /// Sleep this long per iteration while paused (zero yields instead)
    pub fn with_idle_delay(mut self, idle_delay: Duration) -> Self {
        self.idle_delay = idle_delay;
        self
    }

    pub fn register_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&SlotChannel<T>, &SlotChannel<T>) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run until the state is cancelled.
    ///
    /// Fails immediately, without invoking anything, if no callback was
    /// registered.
    pub fn start(&mut self, input: &SlotChannel<T>, output: &SlotChannel<T>) -> Result<()> {
        let Some(callback) = self.callback.as_mut() else {
            return Err(callback_not_registered(&self.name));
        };
        drive(&self.name, &self.state, self.idle_delay, || {
            callback(input, output)
        });
        Ok(())
    }
}

/// Dual-input drive loop
pub struct DualProcessor<T> {
    name: String,
    state: Arc<ProcessorState>,
    callback: Option<BinaryCallback<T>>,
    idle_delay: Duration,
}

impl<T: Clone + Default> DualProcessor<T> {
    pub fn new(name: impl Into<String>, state: Arc<ProcessorState>) -> Self {
        Self {
            name: name.into(),
            state,
            callback: None,
            idle_delay: DEFAULT_IDLE_DELAY,
        }
    }

    pub fn with_idle_delay(mut self, idle_delay: Duration) -> Self {
        self.idle_delay = idle_delay;
        self
    }

    pub fn register_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&SlotChannel<T>, &SlotChannel<T>, &SlotChannel<T>) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(
        &mut self,
        input_a: &SlotChannel<T>,
        input_b: &SlotChannel<T>,
        output: &SlotChannel<T>,
    ) -> Result<()> {
        let Some(callback) = self.callback.as_mut() else {
            return Err(callback_not_registered(&self.name));
        };
        drive(&self.name, &self.state, self.idle_delay, || {
            callback(input_a, input_b, output)
        });
        Ok(())
    }
}

fn callback_not_registered(name: &str) -> VisionError {
    tracing::error!("Processor '{}': callback not registered", name);
    VisionError::CallbackNotRegistered {
        processor: name.to_string(),
    }
}

/// Shared loop body for both processor shapes
fn drive(name: &str, state: &ProcessorState, idle_delay: Duration, mut step: impl FnMut()) {
    state.reset_telemetry();
    tracing::debug!("Processor '{}' loop started", name);

    let mut window_start = Instant::now();
    let mut frames_in_window: u32 = 0;

    while !state.is_cancelled() {
        if !state.is_running() {
            idle(idle_delay);
            continue;
        }

        let started = Instant::now();
        step();
        frames_in_window = frames_in_window.saturating_add(1);
        state.record_frame_time(started.elapsed().as_millis() as u64);

        if window_start.elapsed() >= FPS_WINDOW {
            state.publish_fps(frames_in_window);
            frames_in_window = 0;
            window_start = Instant::now();
        }
    }

    tracing::debug!("Processor '{}' loop exited", name);
}

fn idle(delay: Duration) {
    if delay.is_zero() {
        std::thread::yield_now();
    } else {
        std::thread::sleep(delay);
    }
}

/// Wrap a single-input frame transform as a processor callback.
///
/// Empty input means no write. A transform error is logged at debug level
/// and the output keeps its previous frame.
pub fn unary_callback<F>(
    name: impl Into<String>,
    mut transform: F,
) -> impl FnMut(&SlotChannel<Frame>, &SlotChannel<Frame>) + Send + 'static
where
    F: FnMut(&Frame) -> std::result::Result<Frame, TransformError> + Send + 'static,
{
    let name = name.into();
    move |input: &SlotChannel<Frame>, output: &SlotChannel<Frame>| {
        let frame = input.read();
        if frame.is_empty() {
            return;
        }
        match transform(&frame) {
            Ok(result) => output.write(result),
            Err(e) => tracing::debug!("{}: skipping frame: {}", name, e),
        }
    }
}

/// Wrap a dual-input frame transform as a processor callback.
///
/// Both inputs must be non-empty; a half-ready pair is never fused.
pub fn binary_callback<F>(
    name: impl Into<String>,
    mut transform: F,
) -> impl FnMut(&SlotChannel<Frame>, &SlotChannel<Frame>, &SlotChannel<Frame>) + Send + 'static
where
    F: FnMut(&Frame, &Frame) -> std::result::Result<Frame, TransformError> + Send + 'static,
{
    let name = name.into();
    move |input_a: &SlotChannel<Frame>,
          input_b: &SlotChannel<Frame>,
          output: &SlotChannel<Frame>| {
        let a = input_a.read();
        let b = input_b.read();
        if a.is_empty() || b.is_empty() {
            return;
        }
        match transform(&a, &b) {
            Ok(result) => output.write(result),
            Err(e) => tracing::debug!("{}: skipping frame: {}", name, e),
        }
    }
}
