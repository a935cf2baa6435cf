//! The control loop: task registry, dependency rules and display.
//!
//! # Architecture
//!
//! ```text
//!   [CommandSource] ──poll──► Orchestrator ──show──► [DisplaySink]
//!                                 │
//!            owns ┌───────────────┼──────────────────┐
//!                 ▼               ▼                  ▼
//!          CaptureThread   root SlotChannel   BTreeMap<name, Task>
//! ```
//!
//! The orchestrator is the only thing that mutates the registries. Workers
//! get `Arc` handles to exactly the channels they read and write when they
//! are spawned, and never see the registry itself.
//!
//! # Dependencies
//!
//! Starting a task first starts any missing upstream task, reusing the ones
//! already live. Stopping a feature is refused while a live task outside the
//! feature still reads from one of its members.

pub mod catalog;
pub mod command;

pub use catalog::{TaskInputs, TaskKind, ROOT_NAME};
pub use command::{Command, CommandSource, Feature, ScriptedCommands, StdinCommands};

use crate::capture::{CaptureDevice, CaptureThread};
use crate::config::{FilterConfig, VisionConfig};
use crate::display::DisplaySink;
use crate::error::{Result, VisionError};
use crate::filters;
use crate::pipeline::{SlotChannel, Task};
use crate::types::{Frame, ProcessorSnapshot, TaskTelemetry, TelemetryReport};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// What a dispatched command did
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    /// Tasks created, upstream first
    Started(Vec<String>),
    /// Tasks removed, dependents first
    Stopped(Vec<String>),
    /// New run flag per affected task
    Paused(Vec<(String, bool)>),
    Telemetry(TelemetryReport),
    /// Nothing changed; the reason is logged
    Refused(String),
    Shutdown,
}

pub struct Orchestrator {
    root: Arc<SlotChannel<Frame>>,
    capture: Option<CaptureThread>,
    tasks: BTreeMap<String, Task>,
    channels: BTreeMap<String, Arc<SlotChannel<Frame>>>,
    sink: Box<dyn DisplaySink>,
    filters: FilterConfig,
    idle_delay: Duration,
    capture_fps: u32,
    capture_warn_interval: Duration,
    max_iterations: Option<u64>,
    iterations: u64,
    shut_down: bool,
}

impl Orchestrator {
    pub fn new(config: &VisionConfig, sink: Box<dyn DisplaySink>) -> Self {
        Self {
            root: Arc::new(SlotChannel::new()),
            capture: None,
            tasks: BTreeMap::new(),
            channels: BTreeMap::new(),
            sink,
            filters: config.filters.clone(),
            idle_delay: config.runtime.pause_idle(),
            capture_fps: config.capture.fps,
            capture_warn_interval: config.capture.warn_interval(),
            max_iterations: config.runtime.max_iterations,
            iterations: 0,
            shut_down: false,
        }
    }

    /// Start the producer thread feeding the root channel
    pub fn attach_capture<D>(&mut self, device: D) -> Result<()>
    where
        D: CaptureDevice + 'static,
    {
        if self.capture.is_some() {
            return Err(VisionError::Capture(
                "a capture device is already attached".to_string(),
            ));
        }
        self.capture = Some(CaptureThread::spawn(
            device,
            Arc::clone(&self.root),
            self.capture_fps,
            self.capture_warn_interval,
        )?);
        Ok(())
    }

    pub fn root_channel(&self) -> Arc<SlotChannel<Frame>> {
        Arc::clone(&self.root)
    }

    pub fn is_live(&self, kind: TaskKind) -> bool {
        self.tasks.contains_key(kind.name())
    }

    /// Live task names in registry order
    pub fn live_tasks(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    pub fn task_state(&self, name: &str) -> Option<ProcessorSnapshot> {
        self.tasks.get(name).map(Task::get_state)
    }

    pub fn output_channel(&self, name: &str) -> Option<Arc<SlotChannel<Frame>>> {
        self.channels.get(name).cloned()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Frames the capture thread has published, if one is attached
    pub fn frames_captured(&self) -> Option<u64> {
        self.capture.as_ref().map(CaptureThread::frames_captured)
    }

    pub fn dispatch(&mut self, command: Command) -> CommandOutcome {
        if self.shut_down {
            return CommandOutcome::Shutdown;
        }

        match command {
            Command::Toggle(feature) => self.toggle(feature),
            Command::TogglePause(feature) => self.toggle_pause(feature),
            Command::QueryTelemetry => CommandOutcome::Telemetry(self.telemetry()),
            Command::Shutdown => {
                tracing::info!("Shutdown requested");
                self.shutdown();
                CommandOutcome::Shutdown
            }
            Command::Unknown(key) => {
                tracing::info!("Unmapped key {:?}, shutting down", key);
                self.shutdown();
                CommandOutcome::Shutdown
            }
        }
    }

    fn toggle(&mut self, feature: Feature) -> CommandOutcome {
        if self.is_live(feature.primary()) {
            return self.deactivate(feature);
        }

        let mut started = Vec::new();
        match self.ensure_task(feature.primary(), &mut started) {
            Ok(()) => CommandOutcome::Started(started),
            Err(e) => {
                tracing::warn!("Failed to start {:?}: {}", feature, e);
                CommandOutcome::Refused(e.to_string())
            }
        }
    }

    /// Make sure `kind` is live, creating missing upstream tasks first
    fn ensure_task(&mut self, kind: TaskKind, started: &mut Vec<String>) -> Result<()> {
        if self.is_live(kind) {
            return Ok(());
        }
        if let TaskInputs::Pair(a, b) = kind.inputs() {
            self.ensure_task(a, started)?;
            self.ensure_task(b, started)?;
        }

        let task = self.spawn_task(kind)?;
        let name = kind.name().to_string();
        self.channels.insert(name.clone(), task.output_channel());
        self.tasks.insert(name.clone(), task);
        started.push(name);
        Ok(())
    }

    fn spawn_task(&self, kind: TaskKind) -> Result<Task> {
        let mut task = Task::new(kind.name());
        let idle = self.idle_delay;
        let root = Arc::clone(&self.root);

        match kind {
            TaskKind::Grayscale => task.start_unary(root, filters::grayscale, idle)?,
            TaskKind::Negative => task.start_unary(root, filters::negative, idle)?,
            TaskKind::Blur => task.start_unary(root, filters::blur5x5, idle)?,
            TaskKind::GradientX => task.start_unary(root, filters::sobel_x, idle)?,
            TaskKind::GradientY => task.start_unary(root, filters::sobel_y, idle)?,
            TaskKind::Quantize => {
                let levels = self.filters.quantize_levels;
                task.start_unary(root, move |f: &Frame| filters::quantize(f, levels), idle)?
            }
            TaskKind::Magnitude => task.start_binary(
                self.upstream(TaskKind::GradientX)?,
                self.upstream(TaskKind::GradientY)?,
                filters::magnitude,
                idle,
            )?,
            TaskKind::Cartoonize => {
                let threshold = self.filters.cartoon_threshold;
                task.start_binary(
                    self.upstream(TaskKind::Quantize)?,
                    self.upstream(TaskKind::Magnitude)?,
                    move |q: &Frame, m: &Frame| filters::cartoonize(q, m, threshold),
                    idle,
                )?
            }
        }
        Ok(task)
    }

    fn upstream(&self, kind: TaskKind) -> Result<Arc<SlotChannel<Frame>>> {
        self.output_channel(kind.name())
            .ok_or_else(|| VisionError::UnknownTask(kind.name().to_string()))
    }

    fn deactivate(&mut self, feature: Feature) -> CommandOutcome {
        let members = feature.members();
        let blockers: Vec<&str> = self
            .live_kinds()
            .into_iter()
            .filter(|live| !members.contains(live))
            .filter(|live| members.iter().any(|m| live.reads_from(*m)))
            .map(TaskKind::name)
            .collect();

        if !blockers.is_empty() {
            let reason = format!(
                "{:?} is still needed by {}",
                feature,
                blockers.join(", ")
            );
            tracing::warn!("Refusing to stop: {}", reason);
            return CommandOutcome::Refused(reason);
        }

        let stopped = members
            .iter()
            .filter_map(|kind| self.remove_task(kind.name()))
            .collect();
        CommandOutcome::Stopped(stopped)
    }

    /// Stop, join and unregister one task, closing its window
    fn remove_task(&mut self, name: &str) -> Option<String> {
        let mut task = self.tasks.remove(name)?;
        task.stop();
        self.channels.remove(name);
        self.sink.close(name);
        Some(name.to_string())
    }

    fn live_kinds(&self) -> Vec<TaskKind> {
        self.tasks
            .keys()
            .filter_map(|name| TaskKind::from_name(name))
            .collect()
    }

    fn toggle_pause(&mut self, feature: Feature) -> CommandOutcome {
        let changed: Vec<(String, bool)> = feature
            .members()
            .iter()
            .filter_map(|kind| self.tasks.get(kind.name()))
            .map(|task| {
                let running = task.toggle_running();
                tracing::info!("Toggling {}: running: {}", task.name(), running);
                (task.name().to_string(), running)
            })
            .collect();

        if changed.is_empty() {
            let reason = format!("{:?} is not running", feature);
            tracing::warn!("Cannot pause: {}", reason);
            return CommandOutcome::Refused(reason);
        }
        CommandOutcome::Paused(changed)
    }

    /// Snapshot every live task and log one line per task
    pub fn telemetry(&self) -> TelemetryReport {
        let tasks: Vec<TaskTelemetry> = self
            .tasks
            .values()
            .map(|task| TaskTelemetry {
                name: task.name().to_string(),
                snapshot: task.get_state(),
            })
            .collect();

        for entry in &tasks {
            tracing::info!(
                "{}: {} fps ({}ms){}",
                entry.name,
                entry.snapshot.fps,
                entry.snapshot.last_frame_time_ms,
                if entry.snapshot.running { "" } else { " [paused]" }
            );
        }
        TelemetryReport::new(tasks)
    }

    /// Show the root frame, then every live task with output
    pub fn display_all(&mut self) {
        let frame = self.root.read();
        if !frame.is_empty() {
            self.sink.show(ROOT_NAME, &frame);
        }
        for task in self.tasks.values() {
            task.display(self.sink.as_mut());
        }
    }

    /// One loop pass: display everything, then handle at most one command.
    ///
    /// Returns `false` once the orchestrator has shut down.
    pub fn step(&mut self, source: &mut dyn CommandSource) -> bool {
        if self.shut_down {
            return false;
        }

        self.display_all();
        if let Some(command) = source.poll() {
            if let CommandOutcome::Shutdown = self.dispatch(command) {
                return false;
            }
        }

        self.iterations += 1;
        if self.max_iterations.is_some_and(|max| self.iterations >= max) {
            tracing::info!("Reached {} iterations", self.iterations);
            self.shutdown();
            return false;
        }
        true
    }

    /// Run until a shutdown command or the iteration limit
    pub fn run(&mut self, source: &mut dyn CommandSource) {
        tracing::info!("Orchestrator started");
        while self.step(source) {}
        self.shutdown();
        tracing::info!("Orchestrator stopped after {} iterations", self.iterations);
    }

    /// Stop every task (dependents first), close all windows and stop
    /// capture. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let mut kinds = self.live_kinds();
        kinds.sort_by_key(|k| std::cmp::Reverse(k.rank()));
        for kind in kinds {
            if let Some(mut task) = self.tasks.remove(kind.name()) {
                task.stop();
            }
        }
        self.tasks.clear();
        self.channels.clear();
        self.sink.close_all();

        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
