//! Timestamp conversion and the presentation clock
//!
//! Decoders report timestamps in stream-specific units. [`Timeline`] turns them into
//! milliseconds on the presentation clock, and [`PresentationClock`] measures how far
//! playback has progressed since its origin.

use crate::error::SetupError;
use std::time::{Duration, Instant};

/// Duration of one native timestamp tick as the fraction `num / den` seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    pub num: i32,
    pub den: i32,
}

impl TimeBase {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }
}

/// Converts native timestamps to presentation milliseconds
///
/// The scale is fixed when the stream is opened. Conversion is exact integer
/// arithmetic, floored and saturated at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    /// Milliseconds per native tick, numerator
    ms_num: i128,
    /// Milliseconds per native tick, denominator
    ms_den: i128,
}

impl Timeline {
    /// Creates a timeline for a stream time base
    ///
    /// # Errors
    /// Returns [`SetupError::InvalidTimeBase`] when either term is not positive.
    pub fn new(time_base: TimeBase) -> Result<Self, SetupError> {
        if time_base.num <= 0 || time_base.den <= 0 {
            return Err(SetupError::InvalidTimeBase {
                num: time_base.num,
                den: time_base.den,
            });
        }

        Ok(Self {
            ms_num: i128::from(time_base.num) * 1000,
            ms_den: i128::from(time_base.den),
        })
    }

    /// Maps a native timestamp onto the presentation clock
    pub fn to_presentation_ms(&self, native_pts: i64) -> u64 {
        let ms = (i128::from(native_pts) * self.ms_num).div_euclid(self.ms_den);
        ms.clamp(0, i128::from(u64::MAX)) as u64
    }
}

/// Monotonic playback clock anchored at the start of decoding
///
/// Time spent paused is excluded, so "now" never jumps backwards and never resets.
#[derive(Debug, Clone)]
pub struct PresentationClock {
    origin: Instant,
    /// When the current pause began, if paused
    paused_at: Option<Instant>,
    /// Accumulated duration of finished pauses
    paused_total: Duration,
}

impl PresentationClock {
    /// Captures the origin now
    pub fn start() -> Self {
        Self::start_at(Instant::now())
    }

    pub fn start_at(origin: Instant) -> Self {
        Self {
            origin,
            paused_at: None,
            paused_total: Duration::ZERO,
        }
    }

    /// Milliseconds of playback since the origin
    pub fn now_ms(&self) -> u64 {
        self.elapsed_ms_at(Instant::now())
    }

    /// Milliseconds of playback at `instant`, excluding paused time
    pub fn elapsed_ms_at(&self, instant: Instant) -> u64 {
        let current_pause = self.paused_at.map(|paused_at| instant.saturating_duration_since(paused_at)).unwrap_or_default();
        let playing = instant.saturating_duration_since(self.origin).saturating_sub(self.paused_total + current_pause);

        u64::try_from(playing.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Freezes the clock; no effect if already paused
    pub fn pause_at(&mut self, instant: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(instant);
        }
    }

    /// Restarts the clock where it was frozen; no effect if not paused
    pub fn resume_at(&mut self, instant: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += instant.saturating_duration_since(paused_at);
        }
    }

    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pal_time_base() {
        let timeline = Timeline::new(TimeBase::new(1, 25)).unwrap();

        assert_eq!(timeline.to_presentation_ms(50), 2000);
        assert_eq!(timeline.to_presentation_ms(1), 40);
        assert_eq!(timeline.to_presentation_ms(0), 0);
    }

    #[test]
    fn test_mpeg_ts_time_base() {
        let timeline = Timeline::new(TimeBase::new(1, 90_000)).unwrap();

        assert_eq!(timeline.to_presentation_ms(90_000), 1000);
        // 3003 ticks is one frame at 29.97 fps
        assert_eq!(timeline.to_presentation_ms(3003), 33);
    }

    #[test]
    fn test_ntsc_time_base_has_no_drift() {
        let timeline = Timeline::new(TimeBase::new(1001, 30_000)).unwrap();

        // One tick per frame at 29.97 fps
        assert_eq!(timeline.to_presentation_ms(30), 1001);
        assert_eq!(timeline.to_presentation_ms(300), 10_010);
        assert_eq!(timeline.to_presentation_ms(1), 33);
    }

    #[test]
    fn test_negative_timestamps_saturate_at_zero() {
        let timeline = Timeline::new(TimeBase::new(1, 1000)).unwrap();

        assert_eq!(timeline.to_presentation_ms(-5), 0);
    }

    #[test]
    fn test_invalid_time_base() {
        assert!(matches!(Timeline::new(TimeBase::new(1, 0)), Err(SetupError::InvalidTimeBase { num: 1, den: 0 })));
        assert!(Timeline::new(TimeBase::new(0, 25)).is_err());
        assert!(Timeline::new(TimeBase::new(-1, 25)).is_err());
    }

    #[test]
    fn test_clock_measures_elapsed_time() {
        let origin = Instant::now();
        let clock = PresentationClock::start_at(origin);

        assert_eq!(clock.elapsed_ms_at(origin), 0);
        assert_eq!(clock.elapsed_ms_at(origin + Duration::from_millis(1500)), 1500);
    }

    #[test]
    fn test_clock_excludes_paused_time() {
        let origin = Instant::now();
        let mut clock = PresentationClock::start_at(origin);

        clock.pause_at(origin + Duration::from_millis(100));
        assert!(clock.is_paused());
        assert_eq!(clock.elapsed_ms_at(origin + Duration::from_millis(400)), 100);

        clock.resume_at(origin + Duration::from_millis(400));
        assert!(!clock.is_paused());
        assert_eq!(clock.elapsed_ms_at(origin + Duration::from_millis(450)), 150);
    }

    #[test]
    fn test_repeated_pause_keeps_first_instant() {
        let origin = Instant::now();
        let mut clock = PresentationClock::start_at(origin);

        clock.pause_at(origin + Duration::from_millis(100));
        clock.pause_at(origin + Duration::from_millis(300));
        clock.resume_at(origin + Duration::from_millis(500));

        assert_eq!(clock.elapsed_ms_at(origin + Duration::from_millis(500)), 100);
    }

    #[test]
    fn test_clock_is_monotonic_across_pauses() {
        let origin = Instant::now();
        let mut clock = PresentationClock::start_at(origin);
        let mut last = 0;

        for step in 0..100u64 {
            let instant = origin + Duration::from_millis(step * 10);
            if step % 20 == 5 {
                clock.pause_at(instant);
            } else if step % 20 == 12 {
                clock.resume_at(instant);
            }

            let now = clock.elapsed_ms_at(instant);
            assert!(now >= last);
            last = now;
        }
    }
}
