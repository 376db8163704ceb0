//! Stub backend for tests and synthetic demo runs.

use std::collections::VecDeque;

use anyhow::Result;

use super::clothing_class_names;
use crate::detect::{Detection, DetectorBackend};
use crate::frame::Frame;

/// Scripted detector double.
///
/// With a script, each `detect` call pops the next batch of detections; after
/// the script runs dry every frame is empty. Without a script it emits one
/// synthetic centered detection every other frame, which keeps demo runs
/// against `stub://` sources visually alive.
pub struct StubBackend {
    class_names: Vec<String>,
    script: Option<VecDeque<Vec<Detection>>>,
    frame_count: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            class_names: clothing_class_names(),
            script: None,
            frame_count: 0,
        }
    }

    /// Scripted mode: one entry per expected `detect` call.
    pub fn with_script(script: Vec<Vec<Detection>>) -> Self {
        Self {
            class_names: clothing_class_names(),
            script: Some(script.into()),
            frame_count: 0,
        }
    }

    fn synthetic_detection(&self, frame: &Frame) -> Detection {
        let width = frame.width().max(4);
        let height = frame.height().max(4);
        Detection {
            xmin: width / 4,
            ymin: height / 4,
            xmax: width * 3 / 4,
            ymax: height * 3 / 4,
            // Cycle through the class table so repeated runs exercise
            // different palette entries and comfort ranges.
            class_id: (self.frame_count as usize / 2) % self.class_names.len(),
            confidence: 0.9,
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        self.frame_count += 1;
        match &mut self.script {
            Some(script) => Ok(script.pop_front().unwrap_or_default()),
            None => {
                if self.frame_count % 2 == 0 {
                    Ok(vec![self.synthetic_detection(frame)])
                } else {
                    Ok(Vec::new())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn scripted_backend_replays_then_runs_dry() {
        let detection = Detection {
            xmin: 0,
            ymin: 0,
            xmax: 5,
            ymax: 5,
            class_id: 1,
            confidence: 0.7,
        };
        let mut backend = StubBackend::with_script(vec![vec![detection.clone()], vec![]]);
        let frame = Frame::new(RgbImage::new(32, 32));

        assert_eq!(backend.detect(&frame).unwrap(), vec![detection]);
        assert!(backend.detect(&frame).unwrap().is_empty());
        // Past the end of the script.
        assert!(backend.detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn synthetic_detections_stay_inside_the_frame() {
        let mut backend = StubBackend::new();
        let frame = Frame::new(RgbImage::new(64, 48));
        for _ in 0..10 {
            for d in backend.detect(&frame).unwrap() {
                assert!(d.xmax <= 64 && d.ymax <= 48);
                assert!(d.xmin <= d.xmax && d.ymin <= d.ymax);
                assert!(d.class_id < backend.class_names().len());
            }
        }
    }
}
