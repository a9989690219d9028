//! Debouncing of raw viewport resize signals.
//!
//! Resizing the drawable target reallocates the framebuffer, so a drag
//! gesture producing dozens of signals per second must collapse into a
//! single recompute once the size stops changing.

use std::time::Duration;

use crate::events::{TimerHost, TimerId};

/// Collapses bursts of resize signals into one settled notification.
///
/// At most one timer is pending at a time; every new signal cancels the
/// previous one through the [`TimerHost`] and arms a fresh quiet window.
/// The settled notification is the [`fired`](Self::fired) call that matches
/// the pending timer; expirations of superseded timers are ignored.
#[derive(Debug)]
pub struct ResizeDebouncer {
    quiet: Duration,
    pending: Option<TimerId>,
}

impl ResizeDebouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Handles one raw resize signal: supersedes any pending timer and arms
    /// a new quiet window.
    pub fn signal(&mut self, timers: &mut dyn TimerHost) {
        if let Some(previous) = self.pending.take() {
            timers.cancel(previous);
        }
        self.pending = Some(timers.schedule(self.quiet));
    }

    /// Reports a timer expiration. Returns true exactly when `id` is the
    /// currently pending timer, meaning the quiet window elapsed without a
    /// newer signal and the resize has settled.
    pub fn fired(&mut self, id: TimerId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Drops the pending timer, if any. Used during teardown.
    pub fn cancel_pending(&mut self, timers: &mut dyn TimerHost) {
        if let Some(previous) = self.pending.take() {
            timers.cancel(previous);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Timer host double that records scheduling activity.
    struct RecordingTimers {
        next: u64,
        scheduled: Vec<(TimerId, Duration)>,
        cancelled: Vec<TimerId>,
    }

    impl RecordingTimers {
        fn new() -> Self {
            Self {
                next: 0,
                scheduled: Vec::new(),
                cancelled: Vec::new(),
            }
        }
    }

    impl TimerHost for RecordingTimers {
        fn schedule(&mut self, delay: Duration) -> TimerId {
            let id = TimerId(self.next);
            self.next += 1;
            self.scheduled.push((id, delay));
            id
        }

        fn cancel(&mut self, id: TimerId) {
            self.cancelled.push(id);
        }
    }

    #[test]
    fn burst_of_signals_keeps_one_timer_pending() {
        let mut timers = RecordingTimers::new();
        let mut debouncer = ResizeDebouncer::new(Duration::from_millis(1000));

        for _ in 0..5 {
            debouncer.signal(&mut timers);
        }

        assert_eq!(timers.scheduled.len(), 5);
        assert_eq!(timers.cancelled.len(), 4);
        assert!(debouncer.has_pending());
    }

    #[test]
    fn only_the_latest_timer_settles() {
        let mut timers = RecordingTimers::new();
        let mut debouncer = ResizeDebouncer::new(Duration::from_millis(1000));

        debouncer.signal(&mut timers);
        let stale = timers.scheduled[0].0;
        debouncer.signal(&mut timers);
        let live = timers.scheduled[1].0;

        assert!(!debouncer.fired(stale));
        assert!(debouncer.fired(live));
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn settles_at_most_once_per_quiet_period() {
        let mut timers = RecordingTimers::new();
        let mut debouncer = ResizeDebouncer::new(Duration::from_millis(1000));

        debouncer.signal(&mut timers);
        let id = timers.scheduled[0].0;
        assert!(debouncer.fired(id));
        assert!(!debouncer.fired(id));
    }

    #[test]
    fn schedules_with_the_configured_quiet_window() {
        let mut timers = RecordingTimers::new();
        let mut debouncer = ResizeDebouncer::new(Duration::from_millis(250));

        debouncer.signal(&mut timers);
        assert_eq!(timers.scheduled[0].1, Duration::from_millis(250));
    }

    #[test]
    fn cancel_pending_clears_the_timer() {
        let mut timers = RecordingTimers::new();
        let mut debouncer = ResizeDebouncer::new(Duration::from_millis(1000));

        debouncer.signal(&mut timers);
        debouncer.cancel_pending(&mut timers);

        assert!(!debouncer.has_pending());
        assert_eq!(timers.cancelled.len(), 1);

        // A second cancel finds nothing to do.
        debouncer.cancel_pending(&mut timers);
        assert_eq!(timers.cancelled.len(), 1);
    }
}
