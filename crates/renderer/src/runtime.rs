use std::time::{Duration, Instant};

/// Explicit redraw loop with a cancellation flag.
///
/// The host asks [`FrameLoop::ready_for_frame`] before every redraw and
/// reports completed frames through [`FrameLoop::mark_rendered`]. Once
/// [`FrameLoop::stop`] is called nothing is ever ready again until the loop
/// is restarted.
#[derive(Debug, Clone)]
pub struct FrameLoop {
    running: bool,
    frame_interval: Option<Duration>,
    last_frame: Option<Instant>,
    frames: u64,
}

impl FrameLoop {
    pub fn new(target_fps: Option<f32>) -> Self {
        Self {
            running: false,
            frame_interval: frame_interval_for(target_fps),
            last_frame: None,
            frames: 0,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
        self.last_frame = None;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn set_target_fps(&mut self, target_fps: Option<f32>) {
        self.frame_interval = frame_interval_for(target_fps);
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        if !self.running {
            return false;
        }
        match (self.frame_interval, self.last_frame) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_frame = Some(now);
        self.frames = self.frames.saturating_add(1);
    }

    /// When the next capped frame is due. `None` means either uncapped or stopped.
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.running {
            return None;
        }
        match (self.frame_interval, self.last_frame) {
            (Some(interval), Some(last)) => Some(last + interval),
            _ => None,
        }
    }
}

fn frame_interval_for(target_fps: Option<f32>) -> Option<Duration> {
    target_fps
        .filter(|fps| fps.is_finite() && *fps > 0.0)
        .map(|fps| Duration::from_nanos((1e9 / f64::from(fps)).round() as u64))
}

/// Rolling frame counter reported once per second.
#[derive(Debug)]
pub struct FrameStats {
    window_start: Instant,
    frames: u32,
}

impl FrameStats {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
        }
    }

    /// Counts a frame and returns the measured FPS when a full second has elapsed.
    pub fn record(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.window_start = now;
        self.frames = 0;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_loop_never_renders() {
        let mut frame_loop = FrameLoop::new(None);
        let now = Instant::now();
        assert!(!frame_loop.ready_for_frame(now));
        frame_loop.start();
        assert!(frame_loop.ready_for_frame(now));
        frame_loop.stop();
        assert!(!frame_loop.ready_for_frame(now + Duration::from_secs(1)));
        assert_eq!(frame_loop.next_deadline(), None);
    }

    #[test]
    fn fps_cap_spaces_frames() {
        let mut frame_loop = FrameLoop::new(Some(10.0));
        frame_loop.start();
        let start = Instant::now();
        assert!(frame_loop.ready_for_frame(start));
        frame_loop.mark_rendered(start);
        assert!(!frame_loop.ready_for_frame(start + Duration::from_millis(50)));
        assert!(frame_loop.ready_for_frame(start + Duration::from_millis(100)));
        assert_eq!(
            frame_loop.next_deadline(),
            Some(start + Duration::from_millis(100))
        );
        assert_eq!(frame_loop.frames(), 1);
    }

    #[test]
    fn invalid_fps_means_uncapped() {
        let mut frame_loop = FrameLoop::new(Some(0.0));
        frame_loop.start();
        let now = Instant::now();
        frame_loop.mark_rendered(now);
        assert!(frame_loop.ready_for_frame(now));
    }

    #[test]
    fn frame_stats_report_once_per_second() {
        let start = Instant::now();
        let mut stats = FrameStats::new(start);
        assert_eq!(stats.record(start + Duration::from_millis(500)), None);
        let fps = stats
            .record(start + Duration::from_secs(1))
            .expect("one second elapsed");
        assert!((fps - 2.0).abs() < 1e-3);
    }
}
