//! The audio-rooted master clock.
//!
//! Visual sync is driven off the audio engine's hardware clock rather than
//! any wall clock, because an audible glitch is far more noticeable than a
//! repeated video frame. [`MediaClock`] turns the engine's free-running
//! clock into a value that advances only while playback is audible.

use std::cell::RefCell;
use std::rc::Rc;

/// Handle to the audio engine's output side.
///
/// The engine itself (device selection, decoding, mixing) is a collaborator
/// outside this crate; the clock only needs the hardware time reference and
/// the ability to start and stop audible playback of the decoded asset.
pub trait AudioOutput {
    /// The engine's hardware clock in seconds. Monotonically non-decreasing
    /// for the lifetime of the engine, independent of playback state.
    fn clock_seconds(&self) -> f64;
    /// Begins audible playback of the decoded asset.
    fn start(&mut self);
    /// Stops audible playback.
    fn stop(&mut self);
}

/// Monotonic playback time derived from the audio engine.
///
/// The clock accumulates audible run time across start/stop cycles:
/// `current_seconds` advances while running and freezes while stopped, and
/// the next `start` resumes from the accumulated offset.
pub struct MediaClock {
    output: Rc<RefCell<dyn AudioOutput>>,
    running: bool,
    accumulated: f64,
    resumed_at: f64,
}

impl MediaClock {
    pub fn new(output: Rc<RefCell<dyn AudioOutput>>) -> Self {
        Self {
            output,
            running: false,
            accumulated: 0.0,
            resumed_at: 0.0,
        }
    }

    /// Starts audible playback and begins advancing from the accumulated
    /// offset. No-op if already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.resumed_at = self.output.borrow().clock_seconds();
        self.output.borrow_mut().start();
        self.running = true;
        tracing::debug!(offset = self.accumulated, "media clock started");
    }

    /// Stops audible playback and freezes the clock value. No-op if already
    /// stopped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        let now = self.output.borrow().clock_seconds();
        self.accumulated += (now - self.resumed_at).max(0.0);
        self.output.borrow_mut().stop();
        self.running = false;
        tracing::debug!(offset = self.accumulated, "media clock stopped");
    }

    /// Elapsed audio-time in seconds. Monotonically non-decreasing while
    /// running, frozen while stopped.
    pub fn current_seconds(&self) -> f64 {
        if self.running {
            let now = self.output.borrow().clock_seconds();
            self.accumulated + (now - self.resumed_at).max(0.0)
        } else {
            self.accumulated
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl std::fmt::Debug for MediaClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaClock")
            .field("running", &self.running)
            .field("accumulated", &self.accumulated)
            .finish()
    }
}
