//! The per-frame run loop.
//!
//! Pulls frames from the source, runs detection, annotates survivors,
//! accumulates the observed label set, feeds telemetry, presents and
//! optionally records each frame, and reacts to key commands. Single-threaded
//! and blocking throughout; the only pacing point is the key poll, bounded
//! for streaming sources and blocking for stills.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::annotate::Annotator;
use crate::config::AppConfig;
use crate::detect::Detector;
use crate::frame::Frame;
use crate::record::Recorder;
use crate::source::{FrameSource, SourceKind};
use crate::telemetry::FpsTracker;

/// Key-poll wait for streaming sources.
const STREAM_POLL_WAIT: Duration = Duration::from_millis(5);

/// Single-key commands polled once per iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCommand {
    Quit,
    Snapshot,
    Pause,
}

/// Wait policy for one key poll.
///
/// Stills block until a key press (single-step advance); streaming sources
/// wait briefly so playback stays near real time.
#[derive(Clone, Copy, Debug)]
pub enum KeyWait {
    Blocking,
    Timeout(Duration),
}

/// Presentation and interaction boundary.
///
/// A sink that cannot block (headless) may return `None` from a `Blocking`
/// poll; the loop treats that as "no key, keep going".
pub trait FrameSink {
    fn present(&mut self, frame: &Frame) -> Result<()>;
    fn poll_key(&mut self, wait: KeyWait) -> Result<Option<KeyCommand>>;
}

/// Default sink for environments without a display. Presentation is a debug
/// log; Ctrl-C is surfaced as the quit command.
pub struct HeadlessSink {
    quit: Arc<AtomicBool>,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self {
            quit: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Install a Ctrl-C handler mapped to quit. Call at most once per process.
    pub fn with_ctrlc() -> Result<Self> {
        let sink = Self::new();
        let quit = sink.quit.clone();
        ctrlc::set_handler(move || {
            quit.store(true, Ordering::SeqCst);
        })?;
        Ok(sink)
    }

    /// Externally visible quit flag (tests).
    pub fn quit_flag(&self) -> Arc<AtomicBool> {
        self.quit.clone()
    }
}

impl Default for HeadlessSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for HeadlessSink {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        log::debug!("frame presented ({}x{})", frame.width(), frame.height());
        Ok(())
    }

    fn poll_key(&mut self, wait: KeyWait) -> Result<Option<KeyCommand>> {
        if let KeyWait::Timeout(duration) = wait {
            std::thread::sleep(duration);
        }
        if self.quit.load(Ordering::SeqCst) {
            Ok(Some(KeyCommand::Quit))
        } else {
            Ok(None)
        }
    }
}

/// Loop state. `Draining` is the cleanup pass after the last processed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Running,
    Draining,
    Stopped,
}

/// What a finished run observed.
#[derive(Debug)]
pub struct RunReport {
    /// Deduplicated class names seen above threshold, grown monotonically
    /// during the run. Empty when no detection survived.
    pub labels: BTreeSet<String>,
    pub average_fps: Option<f64>,
    pub frames: u64,
}

pub struct Pipeline {
    source: FrameSource,
    detector: Detector,
    annotator: Annotator,
    sink: Box<dyn FrameSink>,
    recorder: Option<Recorder>,
    threshold: f32,
    snapshot_path: PathBuf,
}

impl Pipeline {
    /// Wire up a run. All recording preconditions are validated here, before
    /// any frame is read: recording needs a streaming source and a configured
    /// resolution.
    pub fn new(
        config: &AppConfig,
        source: FrameSource,
        detector: Detector,
        sink: Box<dyn FrameSink>,
    ) -> Result<Self> {
        let recorder = if config.record {
            if !source.kind().is_streaming() {
                return Err(anyhow!("recording is only supported for video/camera sources"));
            }
            let resolution = config
                .resolution
                .ok_or_else(|| anyhow!("recording requires a configured resolution"))?;
            Some(Recorder::create(&config.record_path, resolution)?)
        } else {
            None
        };

        Ok(Self {
            source,
            detector,
            annotator: Annotator::new()?,
            sink,
            recorder,
            threshold: config.threshold,
            snapshot_path: config.snapshot_path.clone(),
        })
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// Run to completion. Capture and recording handles are released exactly
    /// once on every exit path, error or normal exhaustion.
    pub fn run(&mut self) -> Result<RunReport> {
        let mut report = RunReport {
            labels: BTreeSet::new(),
            average_fps: None,
            frames: 0,
        };
        let outcome = self.run_inner(&mut report);

        // Unconditional, idempotent release; Drop covers panics.
        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(err) = recorder.finish() {
                log::warn!("failed to finalize recording: {err:#}");
            }
        }

        outcome.map(|_| report)
    }

    fn run_inner(&mut self, report: &mut RunReport) -> Result<()> {
        let streaming = self.source.kind().is_streaming();
        let mut tracker = FpsTracker::new();
        let mut state = RunState::Running;

        while state == RunState::Running {
            let start = Instant::now();

            let Some(mut frame) = self.source.next_frame()? else {
                state = RunState::Draining;
                continue;
            };

            let detections = self.detector.detect(&frame, self.threshold)?;
            for detection in &detections {
                let class_name = self.detector.class_name(detection.class_id).to_string();
                self.annotator.annotate(&mut frame, detection, &class_name);
                report.labels.insert(class_name);
            }

            tracker.record(start.elapsed());
            if streaming {
                if let Some(fps) = tracker.average_fps() {
                    self.annotator.draw_fps(&mut frame, fps);
                }
            }

            self.sink.present(&frame)?;
            if let Some(recorder) = self.recorder.as_mut() {
                recorder.write(&frame)?;
            }
            report.frames += 1;

            let wait = if streaming {
                KeyWait::Timeout(STREAM_POLL_WAIT)
            } else {
                KeyWait::Blocking
            };
            match self.sink.poll_key(wait)? {
                Some(KeyCommand::Quit) => state = RunState::Draining,
                Some(KeyCommand::Snapshot) => {
                    frame.save(&self.snapshot_path)?;
                    log::info!("snapshot written to {}", self.snapshot_path.display());
                }
                Some(KeyCommand::Pause) => {
                    // Block for the next key press; quit while paused stops
                    // the run, anything else resumes.
                    if self.sink.poll_key(KeyWait::Blocking)? == Some(KeyCommand::Quit) {
                        state = RunState::Draining;
                    }
                }
                None => {}
            }
        }

        if state == RunState::Draining {
            report.average_fps = tracker.average_fps();
            log::info!(
                "done with {:?} source after {} frames",
                self.source.kind(),
                report.frames
            );
        }
        Ok(())
    }
}
