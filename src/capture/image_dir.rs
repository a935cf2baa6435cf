//! Camera that replays a directory of still images in a loop.

use super::{CaptureDevice, FramePacer};
use crate::error::{Result, ResultExt, VisionError};
use crate::types::Frame;
use std::path::{Path, PathBuf};

const EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Cycles through every image in a directory, in file name order.
///
/// All images are decoded up front. They do not need to share a size.
#[derive(Debug)]
pub struct ImageDirCamera {
    dir: PathBuf,
    frames: Vec<Frame>,
    position: usize,
    pacer: FramePacer,
}

impl ImageDirCamera {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {:?}", dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let image = image::open(path)
                .map_err(VisionError::from)
                .with_context(|| format!("Failed to decode {:?}", path))?;
            frames.push(Frame::color(image.to_rgb8()));
        }

        if frames.is_empty() {
            return Err(VisionError::Capture(format!(
                "No images found in {:?}",
                dir
            )));
        }

        tracing::info!("Loaded {} frames from {:?}", frames.len(), dir);
        Ok(Self {
            dir: dir.to_path_buf(),
            frames,
            position: 0,
            pacer: FramePacer::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl CaptureDevice for ImageDirCamera {
    fn read(&mut self) -> Frame {
        let Some(frame) = self.frames.get(self.position).cloned() else {
            return Frame::Empty;
        };
        self.pacer.wait();
        self.position = (self.position + 1) % self.frames.len();
        frame
    }

    fn set_rate(&mut self, fps: u32) {
        self.pacer.set_rate(fps);
    }

    fn describe(&self) -> String {
        format!("image directory {:?} ({} frames)", self.dir, self.frames.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_cycles_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(2, 2, Rgb([200, 0, 0]))
            .save(dir.path().join("b.png"))
            .unwrap();
        RgbImage::from_pixel(3, 1, Rgb([0, 200, 0]))
            .save(dir.path().join("a.png"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let mut camera = ImageDirCamera::open(dir.path()).unwrap();
        assert_eq!(camera.len(), 2);
        assert_eq!(camera.read().dimensions(), Some((3, 1)));
        assert_eq!(camera.read().dimensions(), Some((2, 2)));
        assert_eq!(camera.read().dimensions(), Some((3, 1)));
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageDirCamera::open(dir.path()).unwrap_err();
        assert!(matches!(err, VisionError::Capture(_)));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageDirCamera::open(dir.path().join("missing")).is_err());
    }
}
