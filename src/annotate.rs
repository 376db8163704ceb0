//! Frame annotation.
//!
//! Draws bounding boxes, class labels with confidence, and the FPS overlay
//! directly onto the frame buffer. Color assignment is `class_id % 8` into a
//! fixed palette, so a class keeps its color across runs.

use ab_glyph::{FontRef, PxScale};
use anyhow::{Context, Result};
use image::Rgb;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::detect::Detection;
use crate::frame::Frame;

static FONT_BYTES: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");

/// Fixed 8-entry box palette. Colors repeat once class ids exceed 8.
const PALETTE: [[u8; 3]; 8] = [
    [87, 120, 164],
    [228, 148, 68],
    [209, 97, 93],
    [133, 182, 178],
    [106, 159, 88],
    [231, 202, 96],
    [168, 124, 159],
    [241, 162, 169],
];

const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const FPS_COLOR: Rgb<u8> = Rgb([0, 255, 255]);
const LABEL_SCALE: f32 = 16.0;
const FPS_SCALE: f32 = 22.0;
const LABEL_MARGIN: u32 = 10;
const BOX_THICKNESS: i32 = 2;

pub struct Annotator {
    font: FontRef<'static>,
}

impl Annotator {
    pub fn new() -> Result<Self> {
        let font = FontRef::try_from_slice(FONT_BYTES).context("failed to parse embedded font")?;
        Ok(Self { font })
    }

    /// Palette color for a class id.
    pub fn class_color(class_id: usize) -> Rgb<u8> {
        Rgb(PALETTE[class_id % PALETTE.len()])
    }

    /// Draw one detection onto the frame: box outline, filled label
    /// background, and `"<class>: <NN>%"` text.
    ///
    /// The label's bottom anchor is clamped to `max(ymin, text_height +
    /// margin)` so the background never renders above the top edge.
    pub fn annotate(&self, frame: &mut Frame, detection: &Detection, class_name: &str) {
        let color = Self::class_color(detection.class_id);
        let (frame_w, frame_h) = (frame.width(), frame.height());
        let image = frame.image_mut();

        let xmin = detection.xmin.min(frame_w.saturating_sub(1));
        let ymin = detection.ymin.min(frame_h.saturating_sub(1));
        let xmax = detection.xmax.clamp(xmin + 1, frame_w);
        let ymax = detection.ymax.clamp(ymin + 1, frame_h);

        for offset in 0..BOX_THICKNESS {
            let rect = Rect::at(xmin as i32 + offset, ymin as i32 + offset).of_size(
                (xmax - xmin).saturating_sub(2 * offset as u32).max(1),
                (ymax - ymin).saturating_sub(2 * offset as u32).max(1),
            );
            draw_hollow_rect_mut(image, rect, color);
        }

        let label = format!(
            "{}: {}%",
            class_name,
            (detection.confidence * 100.0).floor() as u32
        );
        let scale = PxScale::from(LABEL_SCALE);
        let (text_w, text_h) = text_size(scale, &self.font, &label);

        // Bottom anchor of the label background, clamped to the top edge.
        let label_bottom = ymin.max(text_h + LABEL_MARGIN);
        let bg_top = label_bottom - text_h - LABEL_MARGIN;
        let bg = Rect::at(xmin as i32, bg_top as i32)
            .of_size(text_w.max(1), text_h + LABEL_MARGIN + 5);
        draw_filled_rect_mut(image, bg, color);

        draw_text_mut(
            image,
            LABEL_TEXT_COLOR,
            xmin as i32,
            bg_top as i32 + 5,
            scale,
            &self.font,
            &label,
        );
    }

    /// Overlay the running average FPS (streaming sources only; the run loop
    /// decides when to call this).
    pub fn draw_fps(&self, frame: &mut Frame, fps: f64) {
        let text = format!("FPS: {:.2}", fps);
        draw_text_mut(
            frame.image_mut(),
            FPS_COLOR,
            10,
            10,
            PxScale::from(FPS_SCALE),
            &self.font,
            &text,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn blank_frame(w: u32, h: u32) -> Frame {
        Frame::new(RgbImage::new(w, h))
    }

    fn det(xmin: u32, ymin: u32, xmax: u32, ymax: u32) -> Detection {
        Detection {
            xmin,
            ymin,
            xmax,
            ymax,
            class_id: 0,
            confidence: 0.87,
        }
    }

    #[test]
    fn palette_wraps_after_eight_classes() {
        assert_eq!(Annotator::class_color(0), Annotator::class_color(8));
        assert_ne!(Annotator::class_color(0), Annotator::class_color(1));
    }

    #[test]
    fn annotation_mutates_the_frame() {
        let annotator = Annotator::new().unwrap();
        let mut frame = blank_frame(128, 128);
        annotator.annotate(&mut frame, &det(20, 40, 100, 120), "Jacket");
        // Box edge pixel takes the class-0 palette color.
        assert_eq!(*frame.image().get_pixel(20, 80), Annotator::class_color(0));
    }

    #[test]
    fn label_at_top_edge_does_not_panic() {
        let annotator = Annotator::new().unwrap();
        let mut frame = blank_frame(128, 128);
        // ymin == 0: label background must clamp inside the frame.
        annotator.annotate(&mut frame, &det(0, 0, 60, 60), "T-Shirt");
    }

    #[test]
    fn fps_overlay_draws_near_origin() {
        let annotator = Annotator::new().unwrap();
        let mut frame = blank_frame(128, 64);
        annotator.draw_fps(&mut frame, 29.97);
        let touched = (10..60).any(|x| (10..30).any(|y| frame.image().get_pixel(x, y).0 != [0, 0, 0]));
        assert!(touched);
    }
}
