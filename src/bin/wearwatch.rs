//! wearwatch - clothing detection with weather advisories
//!
//! Runs the detection loop over the configured source, then cross-references
//! the observed clothing categories against the current ambient temperature
//! and prints one advisory per category.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use wearwatch::ui::Ui;
use wearwatch::{
    select_backend, AppConfig, Detector, EnvironmentResolver, FrameSource, HeadlessSink, Pipeline,
    Resolution,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
struct Args {
    /// Source: image path, image directory, video file, or usb<N> camera.
    #[arg(value_name = "SOURCE")]
    source: Option<String>,
    /// Minimum detection confidence in [0,1].
    #[arg(long)]
    threshold: Option<f32>,
    /// Target resolution, WIDTHxHEIGHT. Pass an empty string to disable.
    #[arg(long)]
    resolution: Option<String>,
    /// Record annotated frames to a video file.
    #[arg(long, default_value_t = false)]
    record: bool,
    /// Detector backend ("stub", "tract").
    #[arg(long)]
    backend: Option<String>,
    /// Model file for backends that load one.
    #[arg(long, env = "WEARWATCH_MODEL")]
    model: Option<PathBuf>,
    /// Console output style: auto, plain, pretty.
    #[arg(long)]
    ui: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = merge_config(args.clone())?;
    let ui = Ui::from_flag(args.ui.as_deref());

    let detector = {
        let _stage = ui.stage("loading detector");
        let mut detector = Detector::new(select_backend(&config)?);
        detector.warm_up().context("detector warm-up failed")?;
        detector
    };

    let source = {
        let _stage = ui.stage("opening source");
        FrameSource::open(&config.source, config.resolution)?
    };
    log::info!(
        "running {:?} source with threshold {} ({} backend)",
        source.kind(),
        config.threshold,
        detector.backend_name()
    );

    let sink = HeadlessSink::with_ctrlc().context("failed to install Ctrl-C handler")?;
    let mut pipeline = Pipeline::new(&config, source, detector, Box::new(sink))?;
    let report = pipeline.run()?;

    if let Some(fps) = report.average_fps {
        println!("Average FPS: {fps:.2}");
    }
    if report.labels.is_empty() {
        println!("No clothing detected.");
    } else {
        let labels: Vec<&str> = report.labels.iter().map(String::as_str).collect();
        println!("Detected clothing: {}", labels.join(", "));
    }

    let reading = {
        let _stage = ui.stage("resolving weather");
        EnvironmentResolver::default().resolve()
    };
    match reading {
        Ok(reading) => {
            println!(
                "Current temperature in {}: {:.1}°C",
                reading.city, reading.temp_c
            );
            for advisory in wearwatch::evaluate(&report.labels, reading.temp_c) {
                println!(
                    "{} is {} for {:.1}°C",
                    advisory.label, advisory.verdict, reading.temp_c
                );
            }
        }
        Err(err) => {
            // Advisory suppression is informational, never a hard failure.
            log::warn!("weather lookup failed: {err:#}");
            println!("Weather unavailable; no dressing advisories.");
        }
    }

    Ok(())
}

/// CLI flags take precedence over config file and environment.
fn merge_config(args: Args) -> Result<AppConfig> {
    let mut config = AppConfig::load()?;
    if let Some(source) = args.source {
        config.source = source;
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(resolution) = args.resolution {
        config.resolution = if resolution.trim().is_empty() {
            None
        } else {
            Some(resolution.parse::<Resolution>()?)
        };
    }
    if args.record {
        config.record = true;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(model) = args.model {
        config.model = Some(model);
    }
    config.validate()?;
    Ok(config)
}
