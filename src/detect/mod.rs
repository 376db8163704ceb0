//! Detection facade.
//!
//! `DetectorBackend` wraps an opaque model: one call per frame, raw detections
//! out. The [`Detector`] facade applies the confidence threshold so the run
//! loop only ever sees detections worth rendering.

mod backends;

pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;

use anyhow::{anyhow, Result};

use crate::config::AppConfig;
use crate::frame::Frame;

/// One model output: bounding box, class, confidence.
///
/// Box coordinates are integer pixels with `xmin <= xmax`, `ymin <= ymax`.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
    pub class_id: usize,
    pub confidence: f32,
}

/// Detector backend trait.
///
/// Implementations run the model once per `detect` call and return every raw
/// detection; thresholding is the facade's job. `class_id` values must index
/// into `class_names` — an out-of-range id is a backend bug, not a runtime
/// condition, and will panic at the lookup site.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Model-supplied class name table, indexed by `class_id`.
    fn class_names(&self) -> &[String];

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Thresholding facade over a detector backend.
pub struct Detector {
    backend: Box<dyn DetectorBackend>,
}

impl Detector {
    pub fn new(backend: Box<dyn DetectorBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Class name for a detection produced by this detector.
    pub fn class_name(&self, class_id: usize) -> &str {
        &self.backend.class_names()[class_id]
    }

    pub fn warm_up(&mut self) -> Result<()> {
        self.backend.warm_up()
    }

    /// Detect and keep only detections with confidence >= threshold.
    ///
    /// The boundary is inclusive: a detection exactly at the threshold is
    /// retained.
    pub fn detect(&mut self, frame: &Frame, threshold: f32) -> Result<Vec<Detection>> {
        let mut detections = self.backend.detect(frame)?;
        detections.retain(|d| d.confidence >= threshold);
        Ok(detections)
    }
}

/// Build the backend named in the configuration.
pub fn select_backend(config: &AppConfig) -> Result<Box<dyn DetectorBackend>> {
    match config.backend.as_str() {
        "stub" => Ok(Box::new(StubBackend::new())),
        #[cfg(feature = "backend-tract")]
        "tract" => {
            let model = config
                .model
                .as_ref()
                .ok_or_else(|| anyhow!("tract backend requires a model path"))?;
            Ok(Box::new(TractBackend::new(model)?))
        }
        #[cfg(not(feature = "backend-tract"))]
        "tract" => Err(anyhow!(
            "tract backend requires the backend-tract feature"
        )),
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn test_frame() -> Frame {
        Frame::new(RgbImage::new(64, 64))
    }

    fn det(confidence: f32) -> Detection {
        Detection {
            xmin: 1,
            ymin: 1,
            xmax: 10,
            ymax: 10,
            class_id: 0,
            confidence,
        }
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let script = vec![vec![det(0.49), det(0.5), det(0.51)]];
        let mut detector = Detector::new(Box::new(StubBackend::with_script(script)));
        let kept = detector.detect(&test_frame(), 0.5).unwrap();
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|d| d.confidence >= 0.5));
    }

    #[test]
    fn below_threshold_detections_are_dropped_silently() {
        let script = vec![vec![det(0.1), det(0.2)]];
        let mut detector = Detector::new(Box::new(StubBackend::with_script(script)));
        let kept = detector.detect(&test_frame(), 0.5).unwrap();
        assert!(kept.is_empty());
    }

    #[test]
    fn unknown_backend_name_is_a_startup_error() {
        let config = AppConfig {
            backend: "cuda".to_string(),
            ..AppConfig::default()
        };
        assert!(select_backend(&config).is_err());
    }
}
