//! Test data builders for frames and configs

use image::{Rgb, RgbImage};
use vision_rs::config::VisionConfig;
use vision_rs::Frame;

/// Builder for color test frames
pub struct FrameBuilder {
    width: u32,
    height: u32,
    edge: bool,
    color: [u8; 3],
}

impl FrameBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            edge: false,
            color: [128, 128, 128],
        }
    }

    pub fn color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }

    /// Black left half, `color` right half
    pub fn with_vertical_edge(mut self) -> Self {
        self.edge = true;
        self
    }

    pub fn build(self) -> Frame {
        let Self {
            width,
            height,
            edge,
            color,
        } = self;
        Frame::color(RgbImage::from_fn(width, height, |x, _| {
            if edge && x < width / 2 {
                Rgb([0, 0, 0])
            } else {
                Rgb(color)
            }
        }))
    }
}

/// Builder for configs tuned for fast tests
pub struct ConfigBuilder {
    config: VisionConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let mut config = VisionConfig::default();
        config.runtime.pause_idle_ms = 1;
        config.runtime.command_poll_ms = 0;
        Self { config }
    }

    pub fn capture_fps(mut self, fps: u32) -> Self {
        self.config.capture.fps = fps;
        self
    }

    pub fn max_iterations(mut self, n: u64) -> Self {
        self.config.runtime.max_iterations = Some(n);
        self
    }

    pub fn quantize_levels(mut self, levels: u32) -> Self {
        self.config.filters.quantize_levels = levels;
        self
    }

    pub fn build(self) -> VisionConfig {
        self.config
    }
}
