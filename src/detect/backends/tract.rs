#![cfg(feature = "backend-tract")]

//! ONNX clothing detector backed by tract.
//!
//! Loads a YOLO-style export (output `[1, 4 + classes, anchors]`, boxes as
//! center/size in input-space pixels), letterboxes each frame to the model
//! input, and maps the decoded boxes back to frame coordinates. Duplicate
//! candidates are suppressed with a plain IoU pass; the facade applies the
//! user-facing confidence threshold on top of the decode floor.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use tract_onnx::prelude::*;

use super::clothing_class_names;
use crate::detect::{Detection, DetectorBackend};
use crate::frame::Frame;

const MODEL_INPUT: u32 = 640;
const LETTERBOX_FILL: u8 = 114;

// Candidates below this score are noise regardless of the user threshold.
const DECODE_FLOOR: f32 = 0.05;
const NMS_IOU: f32 = 0.45;

pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    class_names: Vec<String>,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, MODEL_INPUT as usize, MODEL_INPUT as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            class_names: clothing_class_names(),
        })
    }

    fn build_input(&self, frame: &Frame) -> (Tensor, Letterbox) {
        let letterbox = Letterbox::fit(frame.width(), frame.height());
        let resized = image::imageops::resize(
            frame.image(),
            letterbox.scaled_w,
            letterbox.scaled_h,
            FilterType::Triangle,
        );

        let size = MODEL_INPUT as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, size, size),
            |(_, channel, y, x)| {
                let fx = x as i64 - letterbox.pad_x as i64;
                let fy = y as i64 - letterbox.pad_y as i64;
                if fx < 0
                    || fy < 0
                    || fx >= letterbox.scaled_w as i64
                    || fy >= letterbox.scaled_h as i64
                {
                    LETTERBOX_FILL as f32 / 255.0
                } else {
                    resized.get_pixel(fx as u32, fy as u32).0[channel] as f32 / 255.0
                }
            },
        );

        (input.into_tensor(), letterbox)
    }

    fn decode_output(
        &self,
        outputs: TVec<TValue>,
        letterbox: &Letterbox,
        frame_w: u32,
        frame_h: u32,
    ) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape();
        if shape.len() != 3 || shape[1] < 4 + self.class_names.len() {
            return Err(anyhow!(
                "unexpected model output shape {:?}; expected [1, {}, anchors]",
                shape,
                4 + self.class_names.len()
            ));
        }

        let anchors = shape[2];
        let mut candidates = Vec::new();
        for a in 0..anchors {
            let (mut class_id, mut score) = (0usize, f32::NEG_INFINITY);
            for c in 0..self.class_names.len() {
                let s = view[[0, 4 + c, a]];
                if s > score {
                    score = s;
                    class_id = c;
                }
            }
            if score < DECODE_FLOOR {
                continue;
            }

            let cx = view[[0, 0, a]];
            let cy = view[[0, 1, a]];
            let w = view[[0, 2, a]];
            let h = view[[0, 3, a]];

            let xmin = letterbox.unmap_x(cx - w / 2.0, frame_w);
            let ymin = letterbox.unmap_y(cy - h / 2.0, frame_h);
            let xmax = letterbox.unmap_x(cx + w / 2.0, frame_w);
            let ymax = letterbox.unmap_y(cy + h / 2.0, frame_h);
            if xmax <= xmin || ymax <= ymin {
                continue;
            }

            candidates.push(Detection {
                xmin,
                ymin,
                xmax,
                ymax,
                class_id,
                confidence: score,
            });
        }

        Ok(suppress_overlaps(candidates))
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = Frame::from_rgb_bytes(
            vec![LETTERBOX_FILL; (MODEL_INPUT * MODEL_INPUT * 3) as usize],
            MODEL_INPUT,
            MODEL_INPUT,
        )?;
        self.detect(&blank).map(|_| ())
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let (input, letterbox) = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_output(outputs, &letterbox, frame.width(), frame.height())
    }
}

/// Aspect-preserving fit of a frame into the square model input.
struct Letterbox {
    scale: f32,
    scaled_w: u32,
    scaled_h: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn fit(frame_w: u32, frame_h: u32) -> Self {
        let scale = (MODEL_INPUT as f32 / frame_w as f32).min(MODEL_INPUT as f32 / frame_h as f32);
        let scaled_w = ((frame_w as f32 * scale).round() as u32).max(1);
        let scaled_h = ((frame_h as f32 * scale).round() as u32).max(1);
        Self {
            scale,
            scaled_w,
            scaled_h,
            pad_x: (MODEL_INPUT - scaled_w) / 2,
            pad_y: (MODEL_INPUT - scaled_h) / 2,
        }
    }

    fn unmap_x(&self, x: f32, frame_w: u32) -> u32 {
        (((x - self.pad_x as f32) / self.scale).round() as i64).clamp(0, frame_w as i64) as u32
    }

    fn unmap_y(&self, y: f32, frame_h: u32) -> u32 {
        (((y - self.pad_y as f32) / self.scale).round() as i64).clamp(0, frame_h as i64) as u32
    }
}

fn iou(a: &Detection, b: &Detection) -> f32 {
    let ix = (a.xmax.min(b.xmax).saturating_sub(a.xmin.max(b.xmin))) as f32;
    let iy = (a.ymax.min(b.ymax).saturating_sub(a.ymin.max(b.ymin))) as f32;
    let inter = ix * iy;
    let area_a = ((a.xmax - a.xmin) * (a.ymax - a.ymin)) as f32;
    let area_b = ((b.xmax - b.xmin) * (b.ymax - b.ymin)) as f32;
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

fn suppress_overlaps(mut candidates: Vec<Detection>) -> Vec<Detection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        let overlaps = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && iou(k, &candidate) > NMS_IOU);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}
