use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use crate::frame::{Frame, FrameContext};

/// Time span in fractional seconds. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Duration {
    seconds: f64,
}

impl Duration {
    /// Create a duration from seconds.
    pub fn from_seconds(s: f64) -> Self {
        Self {
            seconds: s.max(0.0),
        }
    }

    /// Create a duration from milliseconds.
    pub fn from_millis(ms: f64) -> Self {
        Self::from_seconds(ms / 1000.0)
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    pub fn as_millis(&self) -> f64 {
        self.seconds * 1000.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seconds < 1.0 {
            write!(f, "{:.0}ms", self.seconds * 1000.0)
        } else {
            write!(f, "{:.2}s", self.seconds)
        }
    }
}

/// Elapsed animation time, in seconds from the first frame.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Timestamp {
    seconds: f64,
}

impl Timestamp {
    /// Create a timestamp from seconds. Negative input clamps to zero.
    pub fn from_seconds(s: f64) -> Self {
        Self {
            seconds: s.max(0.0),
        }
    }

    /// Create a timestamp at the start (0.0).
    pub fn zero() -> Self {
        Self { seconds: 0.0 }
    }

    /// Get the time in seconds.
    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Convert to a frame index for a given FPS.
    pub fn to_frame(&self, fps: f64) -> u64 {
        (self.seconds * fps).floor() as u64
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp::from_seconds(self.seconds + rhs.as_seconds())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_ms = (self.seconds * 1000.0) as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let secs = (total_ms % 60_000) / 1_000;
        let ms = total_ms % 1_000;
        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
    }
}

/// Fixed-step clock that hands out one [`FrameContext`] per tick.
///
/// Stands in for a host frame callback when frames are produced offline.
#[derive(Debug, Clone)]
pub struct FrameClock {
    fps: f64,
    width: u32,
    height: u32,
    next: u64,
}

impl FrameClock {
    /// A clock at `fps` frames per second for a `width` x `height` surface.
    /// Non-positive rates fall back to 30 fps.
    pub fn new(fps: f64, width: u32, height: u32) -> Self {
        let fps = if fps > 0.0 { fps } else { 30.0 };
        Self {
            fps,
            width,
            height,
            next: 0,
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Time between consecutive ticks.
    pub fn interval(&self) -> Duration {
        Duration::from_seconds(1.0 / self.fps)
    }

    /// Change the surface size reported by subsequent ticks.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Produce the context for the next frame and advance.
    pub fn tick(&mut self) -> FrameContext {
        let frame = Frame::new(self.next);
        self.next += 1;
        FrameContext::new(frame.to_timestamp(self.fps), frame, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_to_frame() {
        assert_eq!(Timestamp::from_seconds(1.0).to_frame(30.0), 30);
    }

    #[test]
    fn test_timestamp_clamps_negative() {
        assert_eq!(Timestamp::from_seconds(-2.0), Timestamp::zero());
    }

    #[test]
    fn test_timestamp_display() {
        assert_eq!(format!("{}", Timestamp::from_seconds(3661.5)), "01:01:01.500");
    }

    #[test]
    fn test_duration_display() {
        assert_eq!(format!("{}", Duration::from_seconds(2.5)), "2.50s");
        assert_eq!(format!("{}", Duration::from_millis(500.0)), "500ms");
    }

    #[test]
    fn test_clock_ticks_at_fixed_rate() {
        let mut clock = FrameClock::new(10.0, 8, 8);
        let first = clock.tick();
        let second = clock.tick();
        assert_eq!(first.frame.index, 0);
        assert_eq!(second.frame.index, 1);
        assert!((second.seconds() - 0.1).abs() < 1e-9);
        assert!((clock.interval().as_millis() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_clock_rejects_bad_rate() {
        assert_eq!(FrameClock::new(0.0, 1, 1).fps(), 30.0);
    }

    #[test]
    fn test_clock_resize_applies_to_next_tick() {
        let mut clock = FrameClock::new(30.0, 4, 4);
        clock.set_size(16, 9);
        let ctx = clock.tick();
        assert_eq!((ctx.width, ctx.height), (16, 9));
    }
}
