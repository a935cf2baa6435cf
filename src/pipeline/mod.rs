//! Concurrent pipeline engine.
//!
//! Frames move between stages through single-slot channels; each stage runs
//! its own drive loop on a dedicated thread.
//!
//! # Architecture
//!
//! ```text
//! capture ──► [SlotChannel] ──► Task(Processor) ──► [SlotChannel] ──┐
//!                  │                                                 ├─► Task(DualProcessor) ──► [SlotChannel]
//!                  └──────────► Task(Processor) ──► [SlotChannel] ──┘
//! ```
//!
//! # Design
//!
//! - **Latest value only** - a [`SlotChannel`] never queues; slow readers skip frames.
//! - **Busy-poll loops** - workers spin on their inputs, gated by a run flag.
//! - **Cooperative exit** - [`ProcessorState::cancel`] ends a loop; [`Task::stop`] joins it.
//! - **Closures, two shapes** - unary and binary callbacks cover every stage.

pub mod channel;
pub mod processor;
pub mod state;
pub mod task;

pub use channel::SlotChannel;
pub use processor::{
    binary_callback, unary_callback, BinaryCallback, DualProcessor, Processor, UnaryCallback,
    DEFAULT_IDLE_DELAY, FPS_WINDOW,
};
pub use state::ProcessorState;
pub use task::Task;
