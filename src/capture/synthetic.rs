//! Generated test-pattern camera.
//!
//! Each pattern shifts a little every frame so downstream stages always see
//! motion.

use super::{CaptureDevice, FramePacer};
use crate::types::Frame;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Test pattern produced by [`SyntheticCamera`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyntheticPattern {
    /// Diagonal color ramp scrolling to the right
    Gradient,
    /// Black and white squares of `cell` pixels, drifting diagonally
    Checkerboard { cell: u32 },
    /// Pseudo-random noise, different every frame
    Noise,
    /// Vertical color bars scrolling left
    Bars,
}

impl Default for SyntheticPattern {
    fn default() -> Self {
        SyntheticPattern::Checkerboard { cell: 32 }
    }
}

#[derive(Debug)]
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    pattern: SyntheticPattern,
    tick: u32,
    seed: u64,
    pacer: FramePacer,
}

/// Animation phase wraps here
const TICK_PERIOD: u32 = 1 << 16;

const BAR_COLORS: [[u8; 3]; 7] = [
    [255, 255, 255],
    [255, 255, 0],
    [0, 255, 255],
    [0, 255, 0],
    [255, 0, 255],
    [255, 0, 0],
    [0, 0, 255],
];

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, pattern: SyntheticPattern) -> Self {
        Self {
            width,
            height,
            pattern,
            tick: 0,
            seed: 0x9E37_79B9_7F4A_7C15,
            pacer: FramePacer::new(0),
        }
    }

    /// Produce the next frame without pacing
    pub fn render(&mut self) -> RgbImage {
        let tick = self.tick;
        self.tick = (self.tick + 1) % TICK_PERIOD;
        let (w, h) = (self.width, self.height);

        match self.pattern {
            SyntheticPattern::Gradient => RgbImage::from_fn(w, h, |x, y| {
                let r = ((x + tick) % w.max(1) * 255 / w.max(1)) as u8;
                let g = (y * 255 / h.max(1)) as u8;
                let b = ((x + y + tick) % 256) as u8;
                Rgb([r, g, b])
            }),
            SyntheticPattern::Checkerboard { cell } => {
                let cell = cell.max(1);
                RgbImage::from_fn(w, h, |x, y| {
                    let on = ((x + tick) / cell + (y + tick) / cell) % 2 == 0;
                    if on {
                        Rgb([255, 255, 255])
                    } else {
                        Rgb([0, 0, 0])
                    }
                })
            }
            SyntheticPattern::Noise => {
                let mut state = self.seed ^ u64::from(tick);
                RgbImage::from_fn(w, h, |_, _| {
                    state = xorshift(state);
                    Rgb([state as u8, (state >> 8) as u8, (state >> 16) as u8])
                })
            }
            SyntheticPattern::Bars => {
                let bar = (w / BAR_COLORS.len() as u32).max(1);
                RgbImage::from_fn(w, h, |x, _| {
                    let idx = ((x + tick) / bar) as usize % BAR_COLORS.len();
                    Rgb(BAR_COLORS[idx])
                })
            }
        }
    }
}

impl CaptureDevice for SyntheticCamera {
    fn read(&mut self) -> Frame {
        if self.width == 0 || self.height == 0 {
            return Frame::Empty;
        }
        self.pacer.wait();
        Frame::color(self.render())
    }

    fn set_rate(&mut self, fps: u32) {
        self.pacer.set_rate(fps);
    }

    fn describe(&self) -> String {
        format!(
            "synthetic {:?} {}x{}",
            self.pattern, self.width, self.height
        )
    }
}

fn xorshift(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}
