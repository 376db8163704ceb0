//! Rolling frame-rate telemetry.

use std::collections::VecDeque;
use std::time::Duration;

/// Number of recent frame durations kept for the moving average.
pub const FPS_WINDOW: usize = 100;

/// Bounded rolling window of per-frame processing durations.
///
/// The window holds the most recent [`FPS_WINDOW`] samples; the oldest sample
/// is evicted first once the window is full.
pub struct FpsTracker {
    window: VecDeque<f64>,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(FPS_WINDOW),
        }
    }

    /// Record one frame's processing duration.
    pub fn record(&mut self, elapsed: Duration) {
        while self.window.len() >= FPS_WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(elapsed.as_secs_f64());
    }

    /// Mean frames per second over the window, or `None` before the first
    /// sample.
    pub fn average_fps(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        let fps_sum: f64 = self
            .window
            .iter()
            .map(|secs| if *secs > 0.0 { 1.0 / secs } else { 0.0 })
            .sum();
        Some(fps_sum / self.window.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_has_no_average() {
        let tracker = FpsTracker::new();
        assert!(tracker.average_fps().is_none());
    }

    #[test]
    fn average_reflects_samples() {
        let mut tracker = FpsTracker::new();
        // 100ms per frame = 10 fps
        tracker.record(Duration::from_millis(100));
        tracker.record(Duration::from_millis(100));
        let fps = tracker.average_fps().unwrap();
        assert!((fps - 10.0).abs() < 0.01);
    }

    #[test]
    fn window_evicts_oldest_beyond_capacity() {
        let mut tracker = FpsTracker::new();
        // One slow outlier, then FPS_WINDOW fast frames push it out.
        tracker.record(Duration::from_secs(10));
        for _ in 0..FPS_WINDOW {
            tracker.record(Duration::from_millis(10));
        }
        assert_eq!(tracker.len(), FPS_WINDOW);
        let fps = tracker.average_fps().unwrap();
        // All remaining samples are 100 fps; the 0.1 fps outlier is gone.
        assert!((fps - 100.0).abs() < 0.01);
    }
}
