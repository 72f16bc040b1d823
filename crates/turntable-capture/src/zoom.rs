//! Writes back user zoom changes into the scene settings, throttled

use std::time::{Duration, Instant};
use tracing::debug;
use turntable_core::{CameraPatch, SceneSettings};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const ZOOM_THRESHOLD: f64 = 0.01;

/// Polled once per frame with the live camera zoom
#[derive(Debug, Clone)]
pub struct ZoomTracker {
    interval: Duration,
    threshold: f64,
    last_write: Option<Instant>,
    last_zoom: Option<f64>,
}

impl Default for ZoomTracker {
    fn default() -> Self {
        Self::new(POLL_INTERVAL, ZOOM_THRESHOLD)
    }
}

impl ZoomTracker {
    pub fn new(interval: Duration, threshold: f64) -> Self {
        Self {
            interval,
            threshold,
            last_write: None,
            last_zoom: None,
        }
    }

    /// Returns the stored zoom if this poll updated it.
    ///
    /// Writes are at least `interval` apart; the first change after a quiet
    /// period is written on the poll that sees it.
    pub fn poll(&mut self, now: Instant, zoom: f64, settings: &mut SceneSettings) -> Option<f64> {
        if let Some(last) = self.last_write {
            if now.duration_since(last) < self.interval {
                return None;
            }
        }

        let last_zoom = *self.last_zoom.get_or_insert(settings.camera.zoom);
        if (zoom - last_zoom).abs() <= self.threshold {
            return None;
        }

        debug!(zoom, "Camera zoom changed");
        settings.update_camera(&CameraPatch::zoom(zoom));
        self.last_zoom = Some(zoom);
        self.last_write = Some(now);
        Some(zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_and_throttle() {
        let mut settings = SceneSettings::new();
        let mut tracker = ZoomTracker::default();
        let start = Instant::now();

        // Below threshold
        assert_eq!(tracker.poll(start, 2.005, &mut settings), None);
        assert_eq!(settings.camera.zoom, 2.0);

        // Nothing written yet, so the first change goes straight through
        let first = start + Duration::from_millis(16);
        assert_eq!(tracker.poll(first, 3.0, &mut settings), Some(3.0));
        assert_eq!(settings.camera.zoom, 3.0);

        // Within the interval of the last write
        assert_eq!(tracker.poll(first + Duration::from_millis(100), 4.0, &mut settings), None);
        assert_eq!(settings.camera.zoom, 3.0);

        let later = first + Duration::from_millis(600);
        assert_eq!(tracker.poll(later, 4.0, &mut settings), Some(4.0));

        // Unchanged after an interval
        assert_eq!(tracker.poll(later + Duration::from_millis(600), 4.0, &mut settings), None);
    }

    #[test]
    fn test_change_after_quiet_period_is_written_next_frame() {
        let mut settings = SceneSettings::new();
        let mut tracker = ZoomTracker::default();
        let start = Instant::now();

        assert_eq!(tracker.poll(start, 3.0, &mut settings), Some(3.0));

        // Quiet polls past the interval do not restart the throttle
        let quiet = start + Duration::from_secs(5);
        assert_eq!(tracker.poll(quiet, 3.0, &mut settings), None);
        let next_frame = quiet + Duration::from_millis(16);
        assert_eq!(tracker.poll(next_frame, 5.0, &mut settings), Some(5.0));
        assert_eq!(settings.camera.zoom, 5.0);
    }
}
