//! Fixed-period tick scheduling for an event loop
//!
//! The ticker owns no thread. The event loop asks for [`Ticker::next_deadline`] to
//! decide how long to sleep and calls [`Ticker::poll`] when it wakes. A late wake-up
//! yields one tick, not a burst of catch-up ticks.

use std::time::{Duration, Instant};

/// A stoppable periodic deadline
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    /// Next deadline, `None` once stopped
    next: Option<Instant>,
}

impl Ticker {
    /// Creates a stopped ticker
    pub fn new(interval: Duration) -> Self {
        Self { interval, next: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Schedules the first tick at `now`, so decoding and the first paint start immediately
    pub fn start(&mut self, now: Instant) {
        self.next = Some(now);
    }

    /// Cancels all further ticks
    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Whether a tick is due at `now`, scheduling the following one if so
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(deadline) = self.next else {
            return false;
        };

        if now < deadline {
            return false;
        }

        let mut following = deadline + self.interval;
        if following <= now {
            // Missed periods are skipped
            following = now + self.interval;
        }
        self.next = Some(following);

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(16);

    #[test]
    fn test_stopped_ticker_never_fires() {
        let mut ticker = Ticker::new(INTERVAL);
        let now = Instant::now();

        assert!(!ticker.is_running());
        assert!(!ticker.poll(now + INTERVAL * 10));
        assert_eq!(ticker.next_deadline(), None);
    }

    #[test]
    fn test_fires_once_per_interval() {
        let mut ticker = Ticker::new(INTERVAL);
        let start = Instant::now();
        ticker.start(start);

        assert!(ticker.poll(start));
        assert!(!ticker.poll(start + Duration::from_millis(10)));
        assert!(ticker.poll(start + INTERVAL));
        assert!(!ticker.poll(start + INTERVAL));
        assert_eq!(ticker.next_deadline(), Some(start + INTERVAL * 2));
    }

    #[test]
    fn test_first_tick_is_due_at_start() {
        let mut ticker = Ticker::new(INTERVAL);
        let start = Instant::now();
        ticker.start(start);

        assert_eq!(ticker.next_deadline(), Some(start));
        assert!(ticker.poll(start));
        assert_eq!(ticker.next_deadline(), Some(start + INTERVAL));
    }

    #[test]
    fn test_late_wakeup_does_not_burst() {
        let mut ticker = Ticker::new(INTERVAL);
        let start = Instant::now();
        ticker.start(start);

        assert!(ticker.poll(start));
        let late = start + Duration::from_millis(100);
        assert!(ticker.poll(late));
        assert!(!ticker.poll(late));
        assert_eq!(ticker.next_deadline(), Some(late + INTERVAL));
    }

    #[test]
    fn test_stop_cancels_pending_tick() {
        let mut ticker = Ticker::new(INTERVAL);
        let start = Instant::now();
        ticker.start(start);
        ticker.stop();

        assert!(!ticker.poll(start + INTERVAL * 2));
        assert!(!ticker.is_running());
    }
}
