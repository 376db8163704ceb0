//! Still-image sources: one file or a directory of files.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::IMAGE_EXTENSIONS;
use crate::frame::Frame;

/// Finite, non-restartable sequence of image files.
pub struct StillsSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl StillsSource {
    pub fn single<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            paths: vec![path.as_ref().to_path_buf()],
            next: 0,
        })
    }

    /// Enumerate image files in directory-listing order. Files with other
    /// extensions are ignored.
    pub fn directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("failed to list image directory {}", dir.display()))?
        {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(anyhow!(
                "image directory {} contains no supported images",
                dir.display()
            ));
        }
        Ok(Self { paths, next: 0 })
    }

    pub fn remaining(&self) -> usize {
        self.paths.len() - self.next
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        let image = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?
            .to_rgb8();
        Ok(Some(Frame::new(image)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(dir: &Path, name: &str, color: [u8; 3]) {
        RgbImage::from_pixel(8, 8, Rgb(color))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn directory_yields_each_image_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", [255, 0, 0]);
        write_png(dir.path(), "b.png", [0, 255, 0]);
        std::fs::write(dir.path().join("skip.txt"), b"not an image").unwrap();

        let mut source = StillsSource::directory(dir.path()).unwrap();
        assert_eq!(source.remaining(), 2);
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
        // No wraparound.
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn empty_directory_is_a_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StillsSource::directory(dir.path()).is_err());
    }

    #[test]
    fn single_image_yields_exactly_one_frame() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "only.png", [1, 2, 3]);
        let mut source = StillsSource::single(dir.path().join("only.png")).unwrap();
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.width(), 8);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn undecodable_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.png"), b"garbage").unwrap();
        let mut source = StillsSource::single(dir.path().join("bad.png")).unwrap();
        assert!(source.next_frame().is_err());
    }
}
