//! Frame sources.
//!
//! Four input modalities are normalized into one per-frame iteration contract:
//! - a single image file,
//! - a directory of images,
//! - a video file (feature: source-ffmpeg),
//! - a live camera (feature: source-v4l2).
//!
//! `stub://video` and `stub://camera` route to synthetic streams so the
//! pipeline can run without hardware or codec backends.
//!
//! `next_frame` returns `Ok(None)` at end of stream: stills exhausted, video
//! fully decoded, or a camera read failure (logged, then treated as terminal).

mod camera;
mod stills;
mod synthetic;
mod video;

pub use camera::CameraSource;
pub use stills::StillsSource;
pub use video::VideoSource;

use std::path::Path;

use anyhow::{anyhow, Result};

use crate::config::Resolution;
use crate::frame::Frame;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["avi", "mp4", "mov", "mkv"];

/// Resolved input modality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    SingleImage,
    ImageSet,
    VideoFile,
    LiveCamera,
}

impl SourceKind {
    /// Streaming sources get the FPS overlay, short key-poll waits, and
    /// recording eligibility.
    pub fn is_streaming(&self) -> bool {
        matches!(self, SourceKind::VideoFile | SourceKind::LiveCamera)
    }
}

/// Resolve a specifier string to a source kind.
///
/// Applied in order: existing directory, existing file (by extension),
/// `stub://` synthetic streams, `usb<N>` camera index. Anything else is a
/// startup error. Resolution is idempotent: the same specifier always yields
/// the same kind.
pub fn resolve_kind(spec: &str) -> Result<SourceKind> {
    let path = Path::new(spec);
    if path.is_dir() {
        return Ok(SourceKind::ImageSet);
    }
    if path.is_file() {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(SourceKind::SingleImage);
        }
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(SourceKind::VideoFile);
        }
        return Err(anyhow!("unsupported file extension for source '{}'", spec));
    }
    if spec == "stub://video" {
        return Ok(SourceKind::VideoFile);
    }
    if spec == "stub://camera" {
        return Ok(SourceKind::LiveCamera);
    }
    if let Some(index) = spec.strip_prefix("usb") {
        if index.parse::<u32>().is_ok() {
            return Ok(SourceKind::LiveCamera);
        }
    }
    Err(anyhow!("invalid source specifier '{}'", spec))
}

/// A resolved frame source.
///
/// Owns the item list or capture handle for the run's duration. If a target
/// resolution is configured, every returned frame is resized to it: stills
/// after decode, captures both at open (preferred format) and again on read,
/// since the handle may not honor the preference.
pub struct FrameSource {
    kind: SourceKind,
    resolution: Option<Resolution>,
    inner: SourceInner,
}

enum SourceInner {
    Stills(StillsSource),
    Video(VideoSource),
    Camera(CameraSource),
}

impl FrameSource {
    /// Resolve and open a source. Unopenable video/camera sources are fatal
    /// startup errors.
    pub fn open(spec: &str, resolution: Option<Resolution>) -> Result<Self> {
        let kind = resolve_kind(spec)?;
        let inner = match kind {
            SourceKind::SingleImage => SourceInner::Stills(StillsSource::single(spec)?),
            SourceKind::ImageSet => SourceInner::Stills(StillsSource::directory(spec)?),
            SourceKind::VideoFile => SourceInner::Video(VideoSource::open(spec, resolution)?),
            SourceKind::LiveCamera => SourceInner::Camera(CameraSource::open(spec, resolution)?),
        };
        log::info!("source '{}' resolved as {:?}", spec, kind);
        Ok(Self {
            kind,
            resolution,
            inner,
        })
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Next frame, resized to the configured resolution, or `None` at end of
    /// stream. Not restartable once exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = match &mut self.inner {
            SourceInner::Stills(source) => source.next_frame()?,
            SourceInner::Video(source) => source.next_frame()?,
            SourceInner::Camera(source) => source.next_frame()?,
        };
        Ok(frame.map(|mut frame| {
            if let Some(resolution) = self.resolution {
                frame.resize_to(resolution);
            }
            frame
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn directory_resolves_to_image_set() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_kind(dir.path().to_str().unwrap()).unwrap(),
            SourceKind::ImageSet
        );
    }

    #[test]
    fn file_extension_selects_kind() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("shot.JPG");
        let vid = dir.path().join("clip.mp4");
        let other = dir.path().join("notes.txt");
        for path in [&img, &vid, &other] {
            fs::write(path, b"x").unwrap();
        }
        assert_eq!(
            resolve_kind(img.to_str().unwrap()).unwrap(),
            SourceKind::SingleImage
        );
        assert_eq!(
            resolve_kind(vid.to_str().unwrap()).unwrap(),
            SourceKind::VideoFile
        );
        assert!(resolve_kind(other.to_str().unwrap()).is_err());
    }

    #[test]
    fn usb_pattern_resolves_to_camera() {
        assert_eq!(resolve_kind("usb0").unwrap(), SourceKind::LiveCamera);
        assert_eq!(resolve_kind("usb12").unwrap(), SourceKind::LiveCamera);
        assert!(resolve_kind("usbcam").is_err());
        assert!(resolve_kind("nonsense").is_err());
    }

    #[test]
    fn resolution_is_idempotent() {
        assert_eq!(
            resolve_kind("stub://video").unwrap(),
            resolve_kind("stub://video").unwrap()
        );
        assert_eq!(resolve_kind("usb3").unwrap(), resolve_kind("usb3").unwrap());
    }

    #[test]
    fn synthetic_camera_frames_honor_target_resolution() {
        let resolution: Resolution = "320x240".parse().unwrap();
        let mut source = FrameSource::open("stub://camera", Some(resolution)).unwrap();
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.width(), 320);
        assert_eq!(frame.height(), 240);
        assert!(source.kind().is_streaming());
    }

    #[test]
    fn synthetic_video_reaches_end_of_stream() {
        let mut source = FrameSource::open("stub://video", None).unwrap();
        let mut frames = 0;
        while source.next_frame().unwrap().is_some() {
            frames += 1;
            assert!(frames < 10_000, "synthetic video never ended");
        }
        assert!(frames > 0);
        // Exhausted sources stay exhausted.
        assert!(source.next_frame().unwrap().is_none());
    }
}
