//! The decodable visual stream.
//!
//! A [`VisualSource`] reports and accepts a playback position, knows its
//! total duration, and notifies subscribers when a frame becomes visible.
//! Positioning is advisory: the controller writes the audio clock into the
//! source every cadence interval, so repeated near-identical writes must be
//! cheap. [`BufferedSource`] quantizes positions to frame boundaries, which
//! coalesces them naturally.

use crate::events::{Notifier, SubscriptionId};

/// Notifications emitted by a visual source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    /// The first decodable frame is available; used for the initial paint.
    Ready,
    /// The displayed position advanced to a new frame.
    PositionChanged,
}

/// A decodable visual stream with an addressable playback position.
pub trait VisualSource {
    /// Requests the frame nearest `seconds`. Advisory; the source may
    /// coalesce writes that land on the currently displayed frame.
    fn set_position(&mut self, seconds: f64);
    /// The position of the currently displayed frame, in seconds.
    fn current_position(&self) -> f64;
    /// Total duration of the stream, in seconds.
    fn duration(&self) -> f64;
    /// Registers an observer for [`SourceEvent`] notifications.
    fn subscribe(&mut self, observer: Box<dyn FnMut(&SourceEvent)>) -> SubscriptionId;
    /// Removes a previously registered observer.
    fn unsubscribe(&mut self, id: SubscriptionId);
}

/// In-memory visual stream with a fixed frame interval.
///
/// Stands in for a decoder-backed stream: requested positions resolve to an
/// integer frame index, `PositionChanged` fires only when the displayed
/// frame actually changes, and `Ready` fires once when loading completes.
pub struct BufferedSource {
    duration: f64,
    rate: f64,
    frame: u64,
    ready: bool,
    notifier: Notifier<SourceEvent>,
}

impl BufferedSource {
    /// Creates a stream of `duration` seconds decoded at `fps` frames per
    /// second. Degenerate inputs are clamped so the stream stays addressable.
    pub fn new(duration: f64, fps: u32) -> Self {
        Self {
            duration: duration.max(0.0),
            rate: f64::from(fps.max(1)),
            frame: 0,
            ready: false,
            notifier: Notifier::new(),
        }
    }

    /// Marks the first frame decodable and notifies subscribers. Subsequent
    /// calls are no-ops.
    pub fn finish_loading(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        tracing::debug!(duration = self.duration, "visual stream ready");
        self.notifier.emit(&SourceEvent::Ready);
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn frame_for(&self, seconds: f64) -> u64 {
        let clamped = seconds.clamp(0.0, self.duration);
        (clamped * self.rate).floor() as u64
    }
}

impl VisualSource for BufferedSource {
    fn set_position(&mut self, seconds: f64) {
        let frame = self.frame_for(seconds);
        if frame == self.frame {
            return;
        }
        self.frame = frame;
        self.notifier.emit(&SourceEvent::PositionChanged);
    }

    fn current_position(&self) -> f64 {
        self.frame as f64 / self.rate
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn subscribe(&mut self, observer: Box<dyn FnMut(&SourceEvent)>) -> SubscriptionId {
        self.notifier.subscribe(observer)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.notifier.unsubscribe(id);
    }
}

impl std::fmt::Debug for BufferedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedSource")
            .field("duration", &self.duration)
            .field("frame", &self.frame)
            .field("ready", &self.ready)
            .finish()
    }
}
