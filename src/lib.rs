//! wearwatch
//!
//! A source-agnostic clothing-detection pipeline with weather-aware dressing
//! advisories.
//!
//! # Architecture
//!
//! - `source`: normalizes one of {single image, image directory, video file,
//!   live camera} into a uniform next-frame contract
//! - `detect`: detector backend trait plus a confidence-threshold facade
//! - `annotate`: boxes, labels, and the FPS overlay drawn onto frames
//! - `telemetry`: bounded rolling window for the FPS average
//! - `pipeline`: the per-frame run loop and its presentation boundary
//! - `record`: MJPEG-AVI recording sink
//! - `advisory`: comfort-range table and per-category verdicts
//! - `weather`: best-effort geolocation + temperature resolution
//!
//! The run loop produces a [`pipeline::RunReport`]; the binary feeds its
//! label set, together with the resolved temperature, into
//! [`advisory::evaluate`].

pub mod advisory;
pub mod annotate;
pub mod config;
pub mod detect;
pub mod frame;
pub mod pipeline;
pub mod record;
pub mod source;
pub mod telemetry;
pub mod ui;
pub mod weather;

pub use advisory::{evaluate, Advisory, ComfortRange, Verdict};
pub use annotate::Annotator;
pub use config::{AppConfig, Resolution};
pub use detect::{select_backend, Detection, Detector, DetectorBackend, StubBackend};
pub use frame::Frame;
pub use pipeline::{FrameSink, HeadlessSink, KeyCommand, KeyWait, Pipeline, RunReport};
pub use record::Recorder;
pub use source::{resolve_kind, FrameSource, SourceKind};
pub use telemetry::FpsTracker;
pub use weather::{EnvironmentResolver, WeatherReading};
