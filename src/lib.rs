//! # vision-rs: live video processing pipeline
//!
//! A capture thread keeps the latest camera frame in a root channel. Filter
//! tasks, each on its own thread, pull the latest frame they can see, run a
//! transform and publish the result. Tasks are switched on and off at runtime,
//! and composite features pull in the tasks they depend on.
//!
//! ## Architecture
//!
//! - **Pipeline**: single-slot channels, drive loops with telemetry, tasks
//! - **Filters**: pure frame transforms (grayscale, blur, gradients, cartoonize, ...)
//! - **Capture**: devices and the producer thread feeding the root channel
//! - **Display**: sinks that receive every window's latest frame
//! - **Orchestrator**: task registry, dependency rules, command loop
//!
//! ## Example
//!
//! ```ignore
//! use vision_rs::{
//!     capture::{SyntheticCamera, SyntheticPattern},
//!     config::VisionConfig,
//!     display::LogSink,
//!     orchestrator::{Orchestrator, ScriptedCommands},
//! };
//!
//! let config = VisionConfig::default();
//! let mut orchestrator = Orchestrator::new(&config, Box::new(LogSink::new()));
//! orchestrator.attach_capture(SyntheticCamera::new(320, 240, SyntheticPattern::Bars))?;
//!
//! // cartoonize, report telemetry, then quit
//! let mut commands = ScriptedCommands::from_keys("cfx");
//! orchestrator.run(&mut commands);
//! ```

pub mod capture;
pub mod config;
pub mod display;
pub mod error;
pub mod filters;
pub mod orchestrator;
pub mod pipeline;
pub mod types;

pub use error::{Result, ResultExt, VisionError};
pub use types::{Frame, ProcessorSnapshot, TelemetryReport};
