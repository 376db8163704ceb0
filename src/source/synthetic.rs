//! Synthetic frame generator backing the `stub://` sources.

use anyhow::Result;

use crate::config::Resolution;
use crate::frame::Frame;

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

/// Deterministic pattern stream. A frame limit makes it behave like a finite
/// video file; without one it runs like a live camera.
pub(super) struct SyntheticStream {
    width: u32,
    height: u32,
    frame_count: u64,
    limit: Option<u64>,
    scene_state: u8,
}

impl SyntheticStream {
    pub(super) fn new(preferred: Option<Resolution>, limit: Option<u64>) -> Self {
        let (width, height) = match preferred {
            Some(res) => (res.width, res.height),
            None => (DEFAULT_WIDTH, DEFAULT_HEIGHT),
        };
        Self {
            width,
            height,
            frame_count: 0,
            limit,
            scene_state: 0,
        }
    }

    pub(super) fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(limit) = self.limit {
            if self.frame_count >= limit {
                return Ok(None);
            }
        }
        self.frame_count += 1;

        // Shift the pattern every 50 frames to simulate scene changes.
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let pixel_count = (self.width * self.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }

        Frame::from_rgb_bytes(pixels, self.width, self.height).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limited_stream_ends() {
        let mut stream = SyntheticStream::new(None, Some(3));
        for _ in 0..3 {
            assert!(stream.next_frame().unwrap().is_some());
        }
        assert!(stream.next_frame().unwrap().is_none());
    }

    #[test]
    fn unlimited_stream_keeps_producing() {
        let mut stream = SyntheticStream::new(
            Some(Resolution {
                width: 32,
                height: 24,
            }),
            None,
        );
        for _ in 0..100 {
            let frame = stream.next_frame().unwrap().unwrap();
            assert_eq!(frame.width(), 32);
        }
    }
}
