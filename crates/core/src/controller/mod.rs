//! The playback controller.
//!
//! Owns the play/pause state machine and runs the per-display-tick
//! synchronization step: while playing, the audio clock value is copied into
//! the visual source at the configured cadence, end-of-media is checked on
//! every tick, and the next tick is requested only if the controller decided
//! to stay playing. Rendering is driven separately, by the source's own
//! notifications, so the visible image tracks the decoder rather than the
//! sync cadence.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::clock::MediaClock;
use crate::events::{FrameScheduler, PlayerEvent, TimerHost};
use crate::resize::ResizeDebouncer;
use crate::source::VisualSource;
use crate::surface::{Surface, ViewportSize};

/// Whether the tick loop is live.
///
/// The single source of truth: the tick loop is scheduled iff the state is
/// `Playing`, and the audio clock runs iff the state is `Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Paused,
    Playing,
}

/// Minimum wall-time between successive position-sync writes.
///
/// Derived from a frames-per-second setting; caps how often the visual
/// source is repositioned, not how often the display refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncCadence {
    interval: Duration,
}

impl SyncCadence {
    pub fn from_fps(fps: u32) -> Self {
        Self {
            interval: Duration::from_nanos(1_000_000_000 / u64::from(fps.max(1))),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Drives the visual timeline from the audio clock.
pub struct PlaybackController {
    state: PlaybackState,
    cadence: SyncCadence,
    last_sync: Instant,
    viewport: ViewportSize,
    clock: MediaClock,
    source: Rc<RefCell<dyn VisualSource>>,
    surface: Rc<RefCell<dyn Surface>>,
    scheduler: Box<dyn FrameScheduler>,
    timers: Box<dyn TimerHost>,
    debouncer: ResizeDebouncer,
}

impl PlaybackController {
    /// Builds a controller around its collaborators and sizes the surface
    /// from the current layout.
    pub fn new(
        clock: MediaClock,
        source: Rc<RefCell<dyn VisualSource>>,
        surface: Rc<RefCell<dyn Surface>>,
        scheduler: Box<dyn FrameScheduler>,
        timers: Box<dyn TimerHost>,
        cadence: SyncCadence,
        resize_quiet: Duration,
    ) -> Self {
        let viewport = surface.borrow().layout_size();
        surface.borrow_mut().resize(viewport);
        Self {
            state: PlaybackState::Paused,
            cadence,
            last_sync: Instant::now(),
            viewport,
            clock,
            source,
            surface,
            scheduler,
            timers,
            debouncer: ResizeDebouncer::new(resize_quiet),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    /// Starts playback: records the sync reference, starts the audio clock
    /// and requests the first display tick. No-op while already playing.
    pub fn play(&mut self) {
        self.play_from(Instant::now());
    }

    fn play_from(&mut self, now: Instant) {
        if self.state == PlaybackState::Playing {
            return;
        }
        self.last_sync = now;
        self.clock.start();
        self.state = PlaybackState::Playing;
        tracing::debug!("playback started");
        self.scheduler.request_frame();
    }

    /// Stops the audio clock. The tick loop self-terminates on its next
    /// dispatch; nothing is rescheduled. No-op while already paused.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Paused {
            return;
        }
        self.clock.stop();
        self.state = PlaybackState::Paused;
        tracing::debug!("playback paused");
    }

    /// Starts or stops playback depending on the current state.
    pub fn toggle_play_pause(&mut self) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.play(),
        }
    }

    /// Dispatches one event from the host loop.
    pub fn handle(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Tick { now } => self.tick(now),
            PlayerEvent::PointerPressed => self.toggle_play_pause(),
            PlayerEvent::SourceReady | PlayerEvent::SourcePositionChanged => self.draw_frame(),
            PlayerEvent::ResizeSignal => self.debouncer.signal(self.timers.as_mut()),
            PlayerEvent::ResizeElapsed(id) => {
                if self.debouncer.fired(id) {
                    self.apply_settled_resize();
                }
            }
        }
    }

    /// One synchronization step. Runs only while playing; a tick delivered
    /// after a pause finds the state already `Paused` and does not re-arm.
    fn tick(&mut self, now: Instant) {
        if self.state != PlaybackState::Playing {
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_sync);
        if elapsed >= self.cadence.interval() {
            self.last_sync = now;
            let seconds = self.clock.current_seconds();
            self.source.borrow_mut().set_position(seconds);
        }

        // The end check runs on every tick, after the conditional sync
        // write, so the final tick cannot miss it.
        let (position, duration) = {
            let source = self.source.borrow();
            (source.current_position(), source.duration())
        };
        if position >= duration {
            tracing::debug!(position, "end of media reached");
            self.clock.stop();
            self.state = PlaybackState::Paused;
        }

        if self.state == PlaybackState::Playing {
            self.scheduler.request_frame();
        }
    }

    /// Paints the source's current frame onto the surface. A failed blit is
    /// a skipped frame, not a dead scheduler: log and move on.
    fn draw_frame(&mut self) {
        let source = self.source.borrow();
        if let Err(err) = self.surface.borrow_mut().blit(&*source, self.viewport) {
            tracing::warn!(error = %err, "frame blit failed");
        }
    }

    fn apply_settled_resize(&mut self) {
        let size = self.surface.borrow().layout_size();
        self.viewport = size;
        self.surface.borrow_mut().resize(size);
        tracing::debug!(width = size.width, height = size.height, "viewport settled");
        self.draw_frame();
    }

    /// Cancels any pending resize timer, stops the clock and parks the
    /// state machine. Used by session teardown.
    pub fn release(&mut self) {
        self.debouncer.cancel_pending(self.timers.as_mut());
        self.clock.stop();
        self.state = PlaybackState::Paused;
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.state)
            .field("viewport", &self.viewport)
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::clock::AudioOutput;
    use crate::events::TimerId;
    use crate::source::BufferedSource;
    use crate::surface::PixelSurface;

    /// Audio engine double with a manually advanced hardware clock.
    struct FakeAudio {
        seconds: f64,
        starts: u32,
        stops: u32,
    }

    impl AudioOutput for FakeAudio {
        fn clock_seconds(&self) -> f64 {
            self.seconds
        }

        fn start(&mut self) {
            self.starts += 1;
        }

        fn stop(&mut self) {
            self.stops += 1;
        }
    }

    struct CountingScheduler {
        requests: Rc<Cell<u64>>,
    }

    impl FrameScheduler for CountingScheduler {
        fn request_frame(&mut self) {
            self.requests.set(self.requests.get() + 1);
        }
    }

    struct SharedTimers {
        state: Rc<RefCell<TimerLog>>,
    }

    #[derive(Default)]
    struct TimerLog {
        next: u64,
        live: Vec<TimerId>,
    }

    impl TimerHost for SharedTimers {
        fn schedule(&mut self, _delay: Duration) -> TimerId {
            let mut log = self.state.borrow_mut();
            let id = TimerId(log.next);
            log.next += 1;
            log.live.push(id);
            id
        }

        fn cancel(&mut self, id: TimerId) {
            self.state.borrow_mut().live.retain(|live| *live != id);
        }
    }

    struct Rig {
        controller: PlaybackController,
        audio: Rc<RefCell<FakeAudio>>,
        source: Rc<RefCell<BufferedSource>>,
        surface: Rc<RefCell<PixelSurface>>,
        requests: Rc<Cell<u64>>,
        timers: Rc<RefCell<TimerLog>>,
        base: Instant,
    }

    fn rig(duration: f64) -> Rig {
        let audio = Rc::new(RefCell::new(FakeAudio {
            seconds: 0.0,
            starts: 0,
            stops: 0,
        }));
        let source = Rc::new(RefCell::new(BufferedSource::new(duration, 25)));
        let surface = Rc::new(RefCell::new(PixelSurface::new(ViewportSize::new(320, 240))));
        let requests = Rc::new(Cell::new(0));
        let timers = Rc::new(RefCell::new(TimerLog::default()));

        let controller = PlaybackController::new(
            MediaClock::new(audio.clone()),
            source.clone(),
            surface.clone(),
            Box::new(CountingScheduler {
                requests: requests.clone(),
            }),
            Box::new(SharedTimers {
                state: timers.clone(),
            }),
            SyncCadence::from_fps(25),
            Duration::from_millis(1000),
        );

        Rig {
            controller,
            audio,
            source,
            surface,
            requests,
            timers,
            base: Instant::now(),
        }
    }

    impl Rig {
        fn play(&mut self) {
            self.controller.play_from(self.base);
        }

        /// Delivers a tick with audio time and wall time advanced in
        /// lockstep at `millis` past the play reference.
        fn tick_at(&mut self, millis: u64) {
            self.audio.borrow_mut().seconds = millis as f64 / 1000.0;
            self.controller.handle(PlayerEvent::Tick {
                now: self.base + Duration::from_millis(millis),
            });
        }
    }

    #[test]
    fn tick_loop_is_scheduled_iff_playing() {
        let mut rig = rig(10.0);
        assert_eq!(rig.controller.state(), PlaybackState::Paused);
        assert_eq!(rig.requests.get(), 0);

        rig.play();
        assert_eq!(rig.requests.get(), 1);

        // A second play must not double-schedule.
        rig.controller.play();
        assert_eq!(rig.requests.get(), 1);

        rig.controller.pause();
        // An already-delivered tick self-terminates without re-arming.
        rig.tick_at(40);
        assert_eq!(rig.requests.get(), 1);
        assert_eq!(rig.controller.state(), PlaybackState::Paused);
    }

    #[test]
    fn pause_while_paused_is_a_no_op() {
        let mut rig = rig(10.0);
        rig.controller.pause();
        assert_eq!(rig.controller.state(), PlaybackState::Paused);
        assert_eq!(rig.audio.borrow().stops, 0);
    }

    #[test]
    fn toggle_twice_returns_to_paused() {
        let mut rig = rig(10.0);
        rig.controller.toggle_play_pause();
        assert_eq!(rig.controller.state(), PlaybackState::Playing);
        rig.controller.toggle_play_pause();
        assert_eq!(rig.controller.state(), PlaybackState::Paused);

        assert_eq!(rig.audio.borrow().starts, 1);
        assert_eq!(rig.audio.borrow().stops, 1);
    }

    #[test]
    fn ticks_below_the_cadence_do_not_both_sync() {
        let mut rig = rig(10.0);
        rig.play();

        rig.tick_at(40);
        let after_first = rig.source.borrow().current_position();
        rig.tick_at(59);
        assert_eq!(rig.source.borrow().current_position(), after_first);
    }

    #[test]
    fn ticks_at_or_above_the_cadence_each_sync() {
        let mut rig = rig(10.0);
        rig.play();

        rig.tick_at(40);
        let first = rig.source.borrow().current_position();
        rig.tick_at(80);
        let second = rig.source.borrow().current_position();

        assert!(first > 0.0);
        assert!(second > first);
    }

    #[test]
    fn end_of_media_pauses_within_one_tick() {
        let mut rig = rig(1.0);
        rig.play();

        for millis in (40..=1000).step_by(40) {
            rig.tick_at(millis);
        }

        assert_eq!(rig.controller.state(), PlaybackState::Paused);
        let requests_at_end = rig.requests.get();

        // No further ticks are requested, even if stray ticks arrive.
        rig.tick_at(1040);
        assert_eq!(rig.requests.get(), requests_at_end);
        assert_eq!(rig.audio.borrow().stops, 1);
    }

    #[test]
    fn end_check_runs_even_when_the_sync_write_is_skipped() {
        let mut rig = rig(1.0);
        rig.play();

        // Drive the source to its end through the cadence path.
        for millis in (40..=1000).step_by(40) {
            if rig.controller.state() == PlaybackState::Paused {
                break;
            }
            rig.tick_at(millis);
        }
        assert_eq!(rig.controller.state(), PlaybackState::Paused);

        // Restart; the very next tick is below the cadence threshold but
        // the position still sits at the duration, so it must pause again.
        rig.controller.play_from(rig.base + Duration::from_millis(1000));
        assert_eq!(rig.controller.state(), PlaybackState::Playing);
        rig.tick_at(1010);
        assert_eq!(rig.controller.state(), PlaybackState::Paused);
    }

    #[test]
    fn ten_second_scenario_at_exact_cadence() {
        let mut rig = rig(10.0);
        rig.play();

        let mut ticks = 0u32;
        for millis in (40..=10_000).step_by(40) {
            rig.tick_at(millis);
            ticks += 1;
        }

        assert_eq!(ticks, 250);
        assert_eq!(rig.controller.state(), PlaybackState::Paused);
        assert!((rig.source.borrow().current_position() - 10.0).abs() < 1e-9);

        // play() requested the first frame; every tick but the final one
        // requested the next.
        assert_eq!(rig.requests.get(), 250);

        let requests_at_end = rig.requests.get();
        rig.tick_at(10_040);
        assert_eq!(rig.requests.get(), requests_at_end);
    }

    #[test]
    fn source_notifications_drive_blits() {
        let mut rig = rig(10.0);
        assert_eq!(rig.surface.borrow().blit_count(), 0);

        rig.controller.handle(PlayerEvent::SourceReady);
        assert_eq!(rig.surface.borrow().blit_count(), 1);

        rig.controller.handle(PlayerEvent::SourcePositionChanged);
        rig.controller.handle(PlayerEvent::SourcePositionChanged);
        assert_eq!(rig.surface.borrow().blit_count(), 3);
    }

    #[test]
    fn pointer_press_toggles_playback() {
        let mut rig = rig(10.0);
        rig.controller.handle(PlayerEvent::PointerPressed);
        assert_eq!(rig.controller.state(), PlaybackState::Playing);
        rig.controller.handle(PlayerEvent::PointerPressed);
        assert_eq!(rig.controller.state(), PlaybackState::Paused);
    }

    #[test]
    fn resize_settles_once_with_the_latest_layout() {
        let mut rig = rig(10.0);
        assert_eq!(rig.controller.viewport(), ViewportSize::new(320, 240));

        rig.surface
            .borrow_mut()
            .set_layout_size(ViewportSize::new(640, 480));
        rig.controller.handle(PlayerEvent::ResizeSignal);
        let stale = rig.timers.borrow().live[0];

        rig.surface
            .borrow_mut()
            .set_layout_size(ViewportSize::new(800, 600));
        rig.controller.handle(PlayerEvent::ResizeSignal);
        let live = *rig.timers.borrow().live.last().unwrap();

        // The superseded timer must not settle anything.
        rig.controller.handle(PlayerEvent::ResizeElapsed(stale));
        assert_eq!(rig.controller.viewport(), ViewportSize::new(320, 240));

        let blits_before = rig.surface.borrow().blit_count();
        rig.controller.handle(PlayerEvent::ResizeElapsed(live));
        assert_eq!(rig.controller.viewport(), ViewportSize::new(800, 600));
        assert_eq!(rig.surface.borrow().pixel_size(), ViewportSize::new(800, 600));
        assert_eq!(rig.surface.borrow().blit_count(), blits_before + 1);
    }

    #[test]
    fn release_cancels_pending_resize_and_stops_playback() {
        let mut rig = rig(10.0);
        rig.play();
        rig.controller.handle(PlayerEvent::ResizeSignal);
        assert_eq!(rig.timers.borrow().live.len(), 1);

        rig.controller.release();
        assert_eq!(rig.controller.state(), PlaybackState::Paused);
        assert!(rig.timers.borrow().live.is_empty());
        assert_eq!(rig.audio.borrow().stops, 1);
    }

    #[test]
    fn cadence_derives_from_fps() {
        assert_eq!(
            SyncCadence::from_fps(25).interval(),
            Duration::from_millis(40)
        );
        assert_eq!(SyncCadence::from_fps(0).interval(), Duration::from_secs(1));
    }
}
