//! Core data types for vision-rs
//!
//! This module contains the values that flow between pipeline stages and the
//! telemetry records the orchestrator reports.
//!
//! # Main Types
//!
//! - [`Frame`] - One image flowing through a channel (color, gray or gradient)
//! - [`GradientImage`] - Signed 16-bit three-channel image produced by the gradient filters
//! - [`ProcessorSnapshot`] - Copy of a task's run flag and telemetry at one instant
//! - [`TelemetryReport`] - Snapshots of every live task, as returned by a telemetry query
//!
//! # Cloning
//!
//! Pixel buffers live behind an [`Arc`], so cloning a [`Frame`] out of a
//! channel never copies pixel data. Transforms always produce a new buffer.

use chrono::{DateTime, Utc};
use image::{GrayImage, ImageBuffer, Rgb, RgbImage};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Three-channel signed gradient image (range roughly -255..=255 per channel)
pub type GradientImage = ImageBuffer<Rgb<i16>, Vec<i16>>;

/// A single image value passed between pipeline stages.
///
/// `Frame::Empty` is the "no data yet" value every channel starts with.
#[derive(Clone, Default)]
pub enum Frame {
    #[default]
    Empty,
    Color(Arc<RgbImage>),
    Gray(Arc<GrayImage>),
    Gradient(Arc<GradientImage>),
}

impl Frame {
    pub fn color(image: RgbImage) -> Self {
        Frame::Color(Arc::new(image))
    }

    pub fn gray(image: GrayImage) -> Self {
        Frame::Gray(Arc::new(image))
    }

    pub fn gradient(image: GradientImage) -> Self {
        Frame::Gradient(Arc::new(image))
    }

    /// True for `Empty` and for zero-sized images
    pub fn is_empty(&self) -> bool {
        match self.dimensions() {
            None => true,
            Some((w, h)) => w == 0 || h == 0,
        }
    }

    /// Width and height, or `None` for an empty frame
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Frame::Empty => None,
            Frame::Color(img) => Some(img.dimensions()),
            Frame::Gray(img) => Some(img.dimensions()),
            Frame::Gradient(img) => Some(img.dimensions()),
        }
    }

    /// Short name of the pixel format
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Empty => "empty",
            Frame::Color(_) => "color",
            Frame::Gray(_) => "gray",
            Frame::Gradient(_) => "gradient",
        }
    }

    /// Convert to a displayable RGB image.
    ///
    /// Gray is replicated into all three channels. Gradients show the
    /// absolute value, saturated to 255.
    pub fn to_rgb(&self) -> Option<RgbImage> {
        if self.is_empty() {
            return None;
        }
        match self {
            Frame::Empty => None,
            Frame::Color(img) => Some((**img).clone()),
            Frame::Gray(img) => Some(RgbImage::from_fn(img.width(), img.height(), |x, y| {
                let v = img.get_pixel(x, y).0[0];
                Rgb([v, v, v])
            })),
            Frame::Gradient(img) => Some(RgbImage::from_fn(img.width(), img.height(), |x, y| {
                let p = img.get_pixel(x, y).0;
                Rgb(p.map(|v| v.unsigned_abs().min(255) as u8))
            })),
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dimensions() {
            Some((w, h)) => write!(f, "Frame::{}({}x{})", self.kind(), w, h),
            None => write!(f, "Frame::empty"),
        }
    }
}

/// Point-in-time copy of a task's run flag and telemetry.
///
/// Readers must tolerate values that are one iteration stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessorSnapshot {
    pub running: bool,
    pub fps: u32,
    pub last_frame_time_ms: u64,
}

/// Telemetry for one named task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskTelemetry {
    pub name: String,
    #[serde(flatten)]
    pub snapshot: ProcessorSnapshot,
}

/// Result of a telemetry query over every live task
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryReport {
    pub taken_at: DateTime<Utc>,
    pub tasks: Vec<TaskTelemetry>,
}

impl TelemetryReport {
    pub fn new(tasks: Vec<TaskTelemetry>) -> Self {
        Self {
            taken_at: Utc::now(),
            tasks,
        }
    }

    /// Look up one task's snapshot by display name
    pub fn get(&self, name: &str) -> Option<&ProcessorSnapshot> {
        self.tasks
            .iter()
            .find(|t| t.name == name)
            .map(|t| &t.snapshot)
    }
}
