use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use wearwatch::{
    advisory, AppConfig, Detection, Detector, Frame, FrameSink, FrameSource, HeadlessSink,
    KeyCommand, KeyWait, Pipeline, StubBackend, Verdict,
};

/// Replays a fixed key script; counts presented frames.
struct ScriptedSink {
    keys: VecDeque<Option<KeyCommand>>,
    presented: Arc<Mutex<u64>>,
}

impl ScriptedSink {
    fn new(keys: Vec<Option<KeyCommand>>) -> Self {
        Self {
            keys: keys.into(),
            presented: Arc::new(Mutex::new(0)),
        }
    }

    fn presented_handle(&self) -> Arc<Mutex<u64>> {
        self.presented.clone()
    }
}

impl FrameSink for ScriptedSink {
    fn present(&mut self, _frame: &Frame) -> Result<()> {
        *self.presented.lock().unwrap() += 1;
        Ok(())
    }

    fn poll_key(&mut self, _wait: KeyWait) -> Result<Option<KeyCommand>> {
        Ok(self.keys.pop_front().flatten())
    }
}

fn jacket(confidence: f32) -> Detection {
    Detection {
        xmin: 8,
        ymin: 8,
        xmax: 40,
        ymax: 56,
        class_id: 0,
        confidence,
    }
}

fn write_test_images(dir: &std::path::Path, count: u32) {
    for i in 0..count {
        let image = image::RgbImage::from_pixel(64, 64, image::Rgb([30 * i as u8, 80, 120]));
        image.save(dir.join(format!("frame{i}.png"))).unwrap();
    }
}

#[test]
fn directory_run_yields_labels_and_too_warm_advisory() {
    let dir = tempfile::tempdir().unwrap();
    write_test_images(dir.path(), 3);

    let config = AppConfig {
        source: dir.path().display().to_string(),
        threshold: 0.5,
        ..AppConfig::default()
    };
    let source = FrameSource::open(&config.source, config.resolution).unwrap();
    // Jacket on the second image only; the rest are empty.
    let script = vec![vec![], vec![jacket(0.9)], vec![]];
    let detector = Detector::new(Box::new(StubBackend::with_script(script)));
    // HeadlessSink never blocks, so the still set runs straight through.
    let sink = HeadlessSink::new();

    let mut pipeline = Pipeline::new(&config, source, detector, Box::new(sink)).unwrap();
    let report = pipeline.run().unwrap();

    assert_eq!(report.frames, 3);
    assert_eq!(
        report.labels.iter().collect::<Vec<_>>(),
        vec![&"Jacket".to_string()]
    );

    // A jacket at 20 degrees is past its comfort range.
    let advisories = advisory::evaluate(&report.labels, 20.0);
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].label, "Jacket");
    assert_eq!(advisories[0].verdict, Verdict::TooWarm);
}

#[test]
fn below_threshold_detections_never_reach_the_label_set() {
    let dir = tempfile::tempdir().unwrap();
    write_test_images(dir.path(), 2);

    let config = AppConfig {
        source: dir.path().display().to_string(),
        threshold: 0.5,
        ..AppConfig::default()
    };
    let source = FrameSource::open(&config.source, config.resolution).unwrap();
    let script = vec![vec![jacket(0.49)], vec![jacket(0.3)]];
    let detector = Detector::new(Box::new(StubBackend::with_script(script)));

    let mut pipeline =
        Pipeline::new(&config, source, detector, Box::new(HeadlessSink::new())).unwrap();
    let report = pipeline.run().unwrap();

    assert_eq!(report.frames, 2);
    assert!(report.labels.is_empty());
    assert!(advisory::evaluate(&report.labels, 20.0).is_empty());
}

#[test]
fn snapshot_key_writes_the_annotated_frame() {
    let dir = tempfile::tempdir().unwrap();
    write_test_images(dir.path(), 2);
    let snapshot_path = dir.path().join("snap.png");

    let config = AppConfig {
        source: dir.path().display().to_string(),
        snapshot_path: snapshot_path.clone(),
        ..AppConfig::default()
    };
    let source = FrameSource::open(&config.source, config.resolution).unwrap();
    let detector = Detector::new(Box::new(StubBackend::with_script(vec![vec![jacket(0.9)]])));
    let sink = ScriptedSink::new(vec![Some(KeyCommand::Snapshot), None]);
    let presented = sink.presented_handle();

    let mut pipeline = Pipeline::new(&config, source, detector, Box::new(sink)).unwrap();
    let report = pipeline.run().unwrap();

    assert_eq!(report.frames, 2);
    assert_eq!(*presented.lock().unwrap(), 2);

    let snapshot = image::open(&snapshot_path).unwrap().to_rgb8();
    let resolution = config.resolution.unwrap();
    assert_eq!(
        (snapshot.width(), snapshot.height()),
        (resolution.width, resolution.height)
    );
}
