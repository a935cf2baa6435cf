//! Pure frame transforms run by pipeline tasks.
//!
//! Every function takes one or two [`Frame`]s and returns a new one. None of
//! them touch channels or threads; the processor callbacks decide when to run
//! them and what to do with an error.
//!
//! # Formats
//!
//! | transform   | accepts              | produces |
//! |-------------|----------------------|----------|
//! | grayscale   | color, gray          | gray     |
//! | negative    | color, gray          | same     |
//! | blur5x5     | color, gray          | same     |
//! | sobel_x/y   | color, gray          | gradient |
//! | magnitude   | gradient, gradient   | gray     |
//! | quantize    | color, gray          | same     |
//! | cartoonize  | color/gray, gray     | color    |
//!
//! Convolutions mirror at the border: index `-1` reads `1`, index `len` reads
//! `len - 1`.

use crate::types::{Frame, GradientImage};
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::borrow::Cow;
use thiserror::Error;

/// Default number of levels per channel for [`quantize`]
pub const DEFAULT_QUANTIZE_LEVELS: u32 = 15;

/// Default edge threshold for [`cartoonize`]
pub const DEFAULT_CARTOON_THRESHOLD: u8 = 20;

const BLUR_KERNEL: [i32; 5] = [1, 2, 4, 2, 1];
const SOBEL_SMOOTH: [i32; 3] = [1, 2, 1];
const SOBEL_DERIVATIVE: [i32; 3] = [-1, 0, 1];

/// Per-frame transform failure. Never fatal to a drive loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("{op} does not accept {kind} frames")]
    UnsupportedFormat { op: &'static str, kind: &'static str },

    #[error("input sizes differ: {left:?} vs {right:?}")]
    DimensionMismatch {
        left: (u32, u32),
        right: (u32, u32),
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

type TransformResult = Result<Frame, TransformError>;

/// Luma from RGB using BT.601 weights
pub fn grayscale(frame: &Frame) -> TransformResult {
    match frame {
        Frame::Color(img) => Ok(Frame::gray(GrayImage::from_fn(
            img.width(),
            img.height(),
            |x, y| {
                let [r, g, b] = img.get_pixel(x, y).0;
                let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
                Luma([luma.round().min(255.0) as u8])
            },
        ))),
        Frame::Gray(_) => Ok(frame.clone()),
        other => Err(unsupported("grayscale", other)),
    }
}

/// Bitwise NOT of every sample
pub fn negative(frame: &Frame) -> TransformResult {
    match frame {
        Frame::Color(img) => {
            let mut out = (**img).clone();
            out.iter_mut().for_each(|v| *v = !*v);
            Ok(Frame::color(out))
        }
        Frame::Gray(img) => {
            let mut out = (**img).clone();
            out.iter_mut().for_each(|v| *v = !*v);
            Ok(Frame::gray(out))
        }
        other => Err(unsupported("negative", other)),
    }
}

/// Separable 5x5 blur with kernel `[1 2 4 2 1] / 10`, rows then columns
pub fn blur5x5(frame: &Frame) -> TransformResult {
    let sum: i32 = BLUR_KERNEL.iter().sum();
    match frame {
        Frame::Color(img) => {
            let (w, h) = img.dimensions();
            let data = blur_channels(img.as_raw(), w, h, 3, sum);
            RgbImage::from_raw(w, h, data)
                .map(Frame::color)
                .ok_or_else(|| buffer_size("blur5x5"))
        }
        Frame::Gray(img) => {
            let (w, h) = img.dimensions();
            let data = blur_channels(img.as_raw(), w, h, 1, sum);
            GrayImage::from_raw(w, h, data)
                .map(Frame::gray)
                .ok_or_else(|| buffer_size("blur5x5"))
        }
        other => Err(unsupported("blur5x5", other)),
    }
}

fn blur_channels(src: &[u8], w: u32, h: u32, channels: usize, sum: i32) -> Vec<u8> {
    let wide: Vec<i32> = src.iter().map(|&v| v as i32).collect();
    let rows = convolve(&wide, w, h, channels, &BLUR_KERNEL, sum, Axis::Vertical);
    let cols = convolve(&rows, w, h, channels, &BLUR_KERNEL, sum, Axis::Horizontal);
    cols.into_iter().map(|v| v.clamp(0, 255) as u8).collect()
}

/// Horizontal gradient: `[1 2 1]/4` down the columns, then `[-1 0 1]` across
pub fn sobel_x(frame: &Frame) -> TransformResult {
    sobel(frame, "sobel_x", Axis::Horizontal)
}

/// Vertical gradient: `[1 2 1]/4` across the rows, then `[-1 0 1]` down
pub fn sobel_y(frame: &Frame) -> TransformResult {
    sobel(frame, "sobel_y", Axis::Vertical)
}

fn sobel(frame: &Frame, op: &'static str, derivative_axis: Axis) -> TransformResult {
    let img = color_input(frame, op)?;
    let (w, h) = img.dimensions();
    let wide: Vec<i32> = img.as_raw().iter().map(|&v| v as i32).collect();
    let smooth_sum: i32 = SOBEL_SMOOTH.iter().sum();

    let smoothed = convolve(
        &wide,
        w,
        h,
        3,
        &SOBEL_SMOOTH,
        smooth_sum,
        derivative_axis.other(),
    );
    let gradient = convolve(&smoothed, w, h, 3, &SOBEL_DERIVATIVE, 1, derivative_axis);

    let data: Vec<i16> = gradient.into_iter().map(|v| v as i16).collect();
    GradientImage::from_raw(w, h, data)
        .map(Frame::gradient)
        .ok_or_else(|| buffer_size(op))
}

/// Gradient strength `sqrt(gx² + gy²)`, saturated to 255.
///
/// Only the first channel of each gradient contributes.
pub fn magnitude(gradient_x: &Frame, gradient_y: &Frame) -> TransformResult {
    let (gx, gy) = match (gradient_x, gradient_y) {
        (Frame::Gradient(gx), Frame::Gradient(gy)) => (gx, gy),
        (Frame::Gradient(_), other) | (other, _) => return Err(unsupported("magnitude", other)),
    };
    check_dimensions(gx.dimensions(), gy.dimensions())?;

    Ok(Frame::gray(GrayImage::from_fn(gx.width(), gx.height(), |x, y| {
        let dx = gx.get_pixel(x, y).0[0] as f32;
        let dy = gy.get_pixel(x, y).0[0] as f32;
        Luma([(dx * dx + dy * dy).sqrt().min(255.0) as u8])
    })))
}

/// Reduce each channel to `levels` buckets: `v / bucket * bucket` with
/// `bucket = 255 / levels`
pub fn quantize(frame: &Frame, levels: u32) -> TransformResult {
    if levels == 0 || levels > 255 {
        return Err(TransformError::InvalidParameter(format!(
            "quantize levels must be in 1..=255, got {}",
            levels
        )));
    }
    let bucket = (255 / levels) as u8;
    let step = |v: &mut u8| *v = (*v / bucket) * bucket;

    match frame {
        Frame::Color(img) => {
            let mut out = (**img).clone();
            out.iter_mut().for_each(step);
            Ok(Frame::color(out))
        }
        Frame::Gray(img) => {
            let mut out = (**img).clone();
            out.iter_mut().for_each(step);
            Ok(Frame::gray(out))
        }
        other => Err(unsupported("quantize", other)),
    }
}

/// Paint edges black on a quantized frame wherever the magnitude exceeds
/// `threshold`
pub fn cartoonize(quantized: &Frame, magnitude: &Frame, threshold: u8) -> TransformResult {
    let base = color_input(quantized, "cartoonize")?;
    let Frame::Gray(edges) = magnitude else {
        return Err(unsupported("cartoonize", magnitude));
    };
    check_dimensions(base.dimensions(), edges.dimensions())?;

    let mut out = base.into_owned();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if edges.get_pixel(x, y).0[0] > threshold {
            *pixel = Rgb([0, 0, 0]);
        }
    }
    Ok(Frame::color(out))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    fn other(self) -> Self {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

/// Mirror `index + offset` back into `0..len`
fn reflect_index(index: usize, offset: isize, len: usize) -> usize {
    let len = len as isize;
    let pos = index as isize + offset;
    let mirrored = if pos < 0 {
        -pos
    } else if pos >= len {
        2 * len - pos - 1
    } else {
        pos
    };
    mirrored.clamp(0, len - 1) as usize
}

/// One-dimensional convolution along `axis` over an interleaved buffer.
/// The kernel length must be odd; results are divided by `divisor`.
fn convolve(
    src: &[i32],
    w: u32,
    h: u32,
    channels: usize,
    kernel: &[i32],
    divisor: i32,
    axis: Axis,
) -> Vec<i32> {
    let (w, h) = (w as usize, h as usize);
    let radius = (kernel.len() / 2) as isize;
    let mut out = vec![0i32; src.len()];

    for y in 0..h {
        for x in 0..w {
            for c in 0..channels {
                let mut acc = 0;
                for (k, weight) in kernel.iter().enumerate() {
                    let offset = k as isize - radius;
                    let (sx, sy) = match axis {
                        Axis::Horizontal => (reflect_index(x, offset, w), y),
                        Axis::Vertical => (x, reflect_index(y, offset, h)),
                    };
                    acc += src[(sy * w + sx) * channels + c] * weight;
                }
                out[(y * w + x) * channels + c] = acc / divisor;
            }
        }
    }
    out
}

/// Borrow a color frame, or widen a gray one
fn color_input<'a>(frame: &'a Frame, op: &'static str) -> Result<Cow<'a, RgbImage>, TransformError> {
    match frame {
        Frame::Color(img) => Ok(Cow::Borrowed(&**img)),
        Frame::Gray(_) => frame
            .to_rgb()
            .map(Cow::Owned)
            .ok_or_else(|| unsupported(op, frame)),
        other => Err(unsupported(op, other)),
    }
}

fn check_dimensions(left: (u32, u32), right: (u32, u32)) -> Result<(), TransformError> {
    if left != right {
        return Err(TransformError::DimensionMismatch { left, right });
    }
    Ok(())
}

fn unsupported(op: &'static str, frame: &Frame) -> TransformError {
    TransformError::UnsupportedFormat {
        op,
        kind: frame.kind(),
    }
}

fn buffer_size(op: &str) -> TransformError {
    TransformError::InvalidParameter(format!("{}: output buffer size mismatch", op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> Frame {
        Frame::color(RgbImage::from_pixel(w, h, Rgb(rgb)))
    }

    /// Left half black, right half white
    fn vertical_edge(w: u32, h: u32) -> Frame {
        Frame::color(RgbImage::from_fn(w, h, |x, _| {
            if x < w / 2 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }))
    }

    fn gray_at(frame: &Frame, x: u32, y: u32) -> u8 {
        match frame {
            Frame::Gray(img) => img.get_pixel(x, y).0[0],
            other => panic!("Expected gray frame, got {:?}", other),
        }
    }

    fn gradient_at(frame: &Frame, x: u32, y: u32) -> [i16; 3] {
        match frame {
            Frame::Gradient(img) => img.get_pixel(x, y).0,
            other => panic!("Expected gradient frame, got {:?}", other),
        }
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(0, -1, 10), 1);
        assert_eq!(reflect_index(0, -2, 10), 2);
        assert_eq!(reflect_index(9, 1, 10), 9);
        assert_eq!(reflect_index(9, 2, 10), 8);
        assert_eq!(reflect_index(4, 1, 10), 5);
        assert_eq!(reflect_index(0, 2, 1), 0);
    }

    #[test]
    fn test_grayscale_weights() {
        let out = grayscale(&solid(2, 2, [255, 0, 0])).unwrap();
        assert_eq!(gray_at(&out, 0, 0), 76);
        let out = grayscale(&solid(2, 2, [255, 255, 255])).unwrap();
        assert_eq!(gray_at(&out, 1, 1), 255);
    }

    #[test]
    fn test_grayscale_rejects_gradient() {
        let err = grayscale(&Frame::gradient(GradientImage::new(2, 2))).unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedFormat { op: "grayscale", .. }));
    }

    #[test]
    fn test_negative_inverts() {
        let out = negative(&solid(1, 1, [0, 100, 255])).unwrap();
        assert_eq!(out.to_rgb().unwrap().get_pixel(0, 0).0, [255, 155, 0]);
    }

    #[test]
    fn test_blur_keeps_flat_image() {
        let out = blur5x5(&solid(7, 5, [100, 50, 200])).unwrap();
        let rgb = out.to_rgb().unwrap();
        assert!(rgb.pixels().all(|p| p.0 == [100, 50, 200]));
    }

    #[test]
    fn test_blur_softens_edge() {
        let out = blur5x5(&vertical_edge(10, 4)).unwrap();
        let rgb = out.to_rgb().unwrap();
        let left = rgb.get_pixel(4, 2).0[0];
        let right = rgb.get_pixel(5, 2).0[0];
        assert!(left > 0 && left < 255);
        assert!(right > 0 && right < 255);
        assert!(right > left);
    }

    #[test]
    fn test_sobel_x_responds_to_vertical_edge() {
        let frame = vertical_edge(8, 4);
        let gx = sobel_x(&frame).unwrap();
        let gy = sobel_y(&frame).unwrap();

        assert!(gradient_at(&gx, 4, 1)[0] > 200);
        assert_eq!(gradient_at(&gx, 1, 1)[0], 0);
        assert_eq!(gradient_at(&gy, 4, 1), [0, 0, 0]);
    }

    #[test]
    fn test_magnitude_combines_first_channel() {
        let gx = Frame::gradient(GradientImage::from_pixel(2, 2, Rgb([3, 100, 100])));
        let gy = Frame::gradient(GradientImage::from_pixel(2, 2, Rgb([-4, 100, 100])));
        let out = magnitude(&gx, &gy).unwrap();
        assert_eq!(gray_at(&out, 0, 0), 5);
    }

    #[test]
    fn test_magnitude_saturates() {
        let g = Frame::gradient(GradientImage::from_pixel(1, 1, Rgb([255, 0, 0])));
        assert_eq!(gray_at(&magnitude(&g, &g).unwrap(), 0, 0), 255);
    }

    #[test]
    fn test_magnitude_dimension_mismatch() {
        let a = Frame::gradient(GradientImage::new(4, 4));
        let b = Frame::gradient(GradientImage::new(4, 3));
        assert_eq!(
            magnitude(&a, &b).unwrap_err(),
            TransformError::DimensionMismatch {
                left: (4, 4),
                right: (4, 3)
            }
        );
    }

    #[test]
    fn test_magnitude_rejects_color_input() {
        let g = Frame::gradient(GradientImage::new(2, 2));
        let err = magnitude(&g, &solid(2, 2, [0, 0, 0])).unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedFormat { kind: "color", .. }));
    }

    #[test]
    fn test_quantize_buckets() {
        // 255 / 15 = 17
        let out = quantize(&solid(1, 1, [16, 17, 255]), 15).unwrap();
        assert_eq!(out.to_rgb().unwrap().get_pixel(0, 0).0, [0, 17, 255]);
    }

    #[test]
    fn test_quantize_rejects_bad_levels() {
        assert!(quantize(&solid(1, 1, [0, 0, 0]), 0).is_err());
        assert!(quantize(&solid(1, 1, [0, 0, 0]), 256).is_err());
    }

    #[test]
    fn test_cartoonize_blacks_out_edges() {
        let base = solid(2, 1, [120, 130, 140]);
        let edges = Frame::gray(GrayImage::from_raw(2, 1, vec![21, 20]).unwrap());
        let out = cartoonize(&base, &edges, 20).unwrap().to_rgb().unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(1, 0).0, [120, 130, 140]);
    }

    #[test]
    fn test_cartoonize_dimension_mismatch() {
        let edges = Frame::gray(GrayImage::new(3, 3));
        let err = cartoonize(&solid(2, 2, [0, 0, 0]), &edges, 20).unwrap_err();
        assert!(matches!(err, TransformError::DimensionMismatch { .. }));
    }

    proptest! {
        #[test]
        fn prop_filters_preserve_dimensions(w in 1u32..24, h in 1u32..24, seed in any::<u8>()) {
            let frame = Frame::color(RgbImage::from_fn(w, h, |x, y| {
                Rgb([seed.wrapping_add(x as u8), seed.wrapping_mul(y as u8), seed])
            }));
            for out in [
                grayscale(&frame).unwrap(),
                negative(&frame).unwrap(),
                blur5x5(&frame).unwrap(),
                sobel_x(&frame).unwrap(),
                sobel_y(&frame).unwrap(),
                quantize(&frame, DEFAULT_QUANTIZE_LEVELS).unwrap(),
            ] {
                prop_assert_eq!(out.dimensions(), Some((w, h)));
            }
        }

        #[test]
        fn prop_gradients_stay_in_range(w in 1u32..16, h in 1u32..16, seed in any::<u64>()) {
            let frame = Frame::color(RgbImage::from_fn(w, h, |x, y| {
                let v = seed.wrapping_mul(31).wrapping_add((x * 7 + y * 13) as u64);
                Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
            }));
            if let Frame::Gradient(img) = sobel_y(&frame).unwrap() {
                prop_assert!(img.iter().all(|v| (-255..=255).contains(v)));
            }
        }
    }
}
