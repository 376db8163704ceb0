//! Startup configuration.
//!
//! Configuration is layered: built-in defaults, then an optional JSON config
//! file pointed to by `WEARWATCH_CONFIG`, then `WEARWATCH_*` environment
//! overrides. The binary merges CLI flags on top of the loaded config.
//!
//! Every validation failure here is fatal and happens before a single frame is
//! read.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::Deserialize;

const DEFAULT_SOURCE: &str = "usb0";
const DEFAULT_THRESHOLD: f32 = 0.5;
const DEFAULT_RESOLUTION: &str = "640x480";
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_RECORD_PATH: &str = "demo1.avi";
const DEFAULT_SNAPSHOT_PATH: &str = "snapshot.png";

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    source: Option<String>,
    threshold: Option<f32>,
    resolution: Option<String>,
    record: Option<bool>,
    detector: Option<DetectorConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    record_path: Option<PathBuf>,
    snapshot_path: Option<PathBuf>,
}

/// Target frame resolution, parsed from a `WIDTHxHEIGHT` string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Resolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .to_lowercase()
            .split_once('x')
            .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
            .ok_or_else(|| anyhow!("invalid resolution '{}'; use WIDTHxHEIGHT", s))?;
        let width: u32 = w
            .parse()
            .map_err(|_| anyhow!("invalid resolution width '{}'", w))?;
        let height: u32 = h
            .parse()
            .map_err(|_| anyhow!("invalid resolution height '{}'", h))?;
        if width == 0 || height == 0 {
            return Err(anyhow!("resolution dimensions must be non-zero"));
        }
        Ok(Resolution { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Resolved startup configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Source specifier: image path, directory, video file, or `usb<N>`.
    pub source: String,
    /// Minimum confidence for a detection to be rendered and counted.
    pub threshold: f32,
    /// Optional target resolution applied to every frame.
    pub resolution: Option<Resolution>,
    /// Write annotated frames to a video file.
    pub record: bool,
    /// Detector backend name ("stub", "tract").
    pub backend: String,
    /// Model file for backends that load one.
    pub model: Option<PathBuf>,
    pub record_path: PathBuf,
    pub snapshot_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            threshold: DEFAULT_THRESHOLD,
            resolution: DEFAULT_RESOLUTION.parse().ok(),
            record: false,
            backend: DEFAULT_BACKEND.to_string(),
            model: None,
            record_path: PathBuf::from(DEFAULT_RECORD_PATH),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then `WEARWATCH_CONFIG` file, then env.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("WEARWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(Path::new(path))?,
            None => ConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let resolution = match file.resolution {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(raw.parse()?),
            None => defaults.resolution,
        };
        Ok(Self {
            source: file.source.unwrap_or(defaults.source),
            threshold: file.threshold.unwrap_or(defaults.threshold),
            resolution,
            record: file.record.unwrap_or(defaults.record),
            backend: file
                .detector
                .as_ref()
                .and_then(|d| d.backend.clone())
                .unwrap_or(defaults.backend),
            model: file.detector.and_then(|d| d.model),
            record_path: file
                .output
                .as_ref()
                .and_then(|o| o.record_path.clone())
                .unwrap_or(defaults.record_path),
            snapshot_path: file
                .output
                .and_then(|o| o.snapshot_path)
                .unwrap_or(defaults.snapshot_path),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("WEARWATCH_SOURCE") {
            if !source.trim().is_empty() {
                self.source = source;
            }
        }
        if let Ok(threshold) = std::env::var("WEARWATCH_THRESHOLD") {
            self.threshold = threshold
                .parse()
                .map_err(|_| anyhow!("WEARWATCH_THRESHOLD must be a float"))?;
        }
        if let Ok(resolution) = std::env::var("WEARWATCH_RESOLUTION") {
            self.resolution = if resolution.trim().is_empty() {
                None
            } else {
                Some(resolution.parse()?)
            };
        }
        if let Ok(record) = std::env::var("WEARWATCH_RECORD") {
            self.record = matches!(record.trim(), "1" | "true" | "yes");
        }
        if let Ok(model) = std::env::var("WEARWATCH_MODEL") {
            if !model.trim().is_empty() {
                self.model = Some(PathBuf::from(model));
            }
        }
        Ok(())
    }

    /// Startup validation. Recording also requires a streaming source, which is
    /// checked after source resolution in the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(anyhow!("source specifier must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(anyhow!(
                "confidence threshold {} out of range [0,1]",
                self.threshold
            ));
        }
        if self.record && self.resolution.is_none() {
            return Err(anyhow!("recording requires a configured resolution"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
